//! Headless display: a [`PresentationSink`] with a simulated vblank.
//!
//! Stands in for a scan-out device when no display is attached. A vblank
//! thread ticks at the refresh interval and reports a completed flip on the
//! first tick after a surface was queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::event_loop::{Event, EventSender};
use crate::traits::{ExchangeError, PresentationSink, Result, SurfaceId};

/// Display without scan-out hardware.
pub struct HeadlessDisplay {
    flip_pending: Arc<AtomicBool>,
    stop_signal: Arc<AtomicBool>,
    vblank: Option<JoinHandle<()>>,
    presented: u64,
}

impl HeadlessDisplay {
    /// Start the vblank thread, posting flips to `events`.
    pub fn new(refresh_interval: Duration, events: EventSender) -> Result<Self> {
        let flip_pending = Arc::new(AtomicBool::new(false));
        let stop_signal = Arc::new(AtomicBool::new(false));

        let pending = Arc::clone(&flip_pending);
        let stop = Arc::clone(&stop_signal);
        let vblank = thread::Builder::new()
            .name("vblank".to_owned())
            .spawn(move || {
                while !stop.load(Ordering::Acquire) {
                    thread::sleep(refresh_interval);
                    if pending.swap(false, Ordering::AcqRel)
                        && events.post(Event::FlipComplete).is_err()
                    {
                        debug!("event loop gone, vblank thread exiting");
                        break;
                    }
                }
            })?;

        info!(?refresh_interval, "headless display started");
        Ok(Self {
            flip_pending,
            stop_signal,
            vblank: Some(vblank),
            presented: 0,
        })
    }

    /// Surfaces accepted so far.
    pub const fn presented(&self) -> u64 {
        self.presented
    }

    fn shutdown(&mut self) -> Result<()> {
        self.stop_signal.store(true, Ordering::Release);
        let Some(handle) = self.vblank.take() else {
            return Ok(());
        };
        handle
            .join()
            .map_err(|_| ExchangeError::Display("vblank thread panicked".to_owned()))?;
        info!(presented = self.presented, "headless display stopped");
        Ok(())
    }
}

impl PresentationSink for HeadlessDisplay {
    fn queue_for_presentation(&mut self, surface: SurfaceId) -> Result<()> {
        if self.vblank.is_none() {
            return Err(ExchangeError::Display("display is stopped".to_owned()));
        }
        // One outstanding surface at a time, like a page flip on real hardware.
        if self
            .flip_pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ExchangeError::Display(format!(
                "{surface} queued while a flip is still pending"
            )));
        }
        self.presented += 1;
        debug!(%surface, "queued for vblank");
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.shutdown()
    }
}

impl Drop for HeadlessDisplay {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            warn!(%err, "headless display teardown failed");
        }
    }
}
