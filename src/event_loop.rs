//! Single-threaded dispatch of producer and display notifications.
//!
//! Producer completions and display flips arrive from independent sources,
//! possibly on other threads. They are funnelled through one channel into
//! an [`EventLoop`], which owns the [`ExchangeCoordinator`] and applies
//! events one at a time. The coordinator itself is never shared.

use std::ops::ControlFlow;
use std::time::Duration;

use crossbeam_channel as channel;
use tracing::{error, info, warn};

use crate::coordinator::{ExchangeCoordinator, ExchangeStats};
use crate::traits::{
    BufferId, CompletionSource, ExchangeError, FrameProducer, PresentationSink, Result,
};

/// Notification delivered to the event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// The producer completed a buffer.
    BufferReady(BufferId),
    /// The display finished a flip.
    FlipComplete,
    /// End the session.
    Shutdown,
}

/// Cloneable handle used by event sources to reach the loop.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: channel::Sender<Event>,
}

impl EventSender {
    /// Post `event` to the loop.
    ///
    /// Fails with [`ExchangeError::NotStreaming`] once the loop is gone.
    pub fn post(&self, event: Event) -> Result<()> {
        self.tx.send(event).map_err(|_| ExchangeError::NotStreaming)
    }

    /// Ask the loop to stop after the events already posted.
    pub fn shutdown(&self) -> Result<()> {
        self.post(Event::Shutdown)
    }
}

/// Receiving end of an event channel, consumed by [`EventLoop::new`].
#[derive(Debug)]
pub struct EventReceiver {
    rx: channel::Receiver<Event>,
}

#[cfg(test)]
impl EventReceiver {
    pub(crate) fn recv_timeout(&self, timeout: Duration) -> Option<Event> {
        self.rx.recv_timeout(timeout).ok()
    }
}

/// Create the channel connecting event sources to an [`EventLoop`].
///
/// The sender is created first so that collaborators which post events
/// (such as a display delivering flips) can be built before the loop.
pub fn event_channel() -> (EventSender, EventReceiver) {
    let (tx, rx) = channel::unbounded();
    (EventSender { tx }, EventReceiver { rx })
}

/// What a finished session did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    /// Events dispatched, including the final shutdown.
    pub events: u64,
    /// Coordinator counters at stop time.
    pub stats: ExchangeStats,
}

/// Owner of a coordinator for the duration of one streaming session.
pub struct EventLoop<P, D> {
    coordinator: ExchangeCoordinator<P, D>,
    events: channel::Receiver<Event>,
    frame_limit: Option<u64>,
    dispatched: u64,
}

impl<P, D> EventLoop<P, D>
where
    P: FrameProducer,
    D: PresentationSink,
{
    /// Wrap `coordinator`, dispatching what arrives on `events`.
    pub fn new(coordinator: ExchangeCoordinator<P, D>, events: EventReceiver) -> Self {
        Self {
            coordinator,
            events: events.rx,
            frame_limit: None,
            dispatched: 0,
        }
    }

    /// End the session once `limit` producer completions were accepted.
    #[must_use]
    pub fn with_frame_limit(mut self, limit: Option<u64>) -> Self {
        self.frame_limit = limit;
        self
    }

    /// Coordinator driven by this loop.
    pub const fn coordinator(&self) -> &ExchangeCoordinator<P, D> {
        &self.coordinator
    }

    /// Apply one event to the coordinator.
    pub fn dispatch(&mut self, event: Event) -> Result<ControlFlow<()>> {
        self.dispatched += 1;

        match event {
            Event::BufferReady(buffer) => self.coordinator.on_buffer_ready(buffer)?,
            Event::FlipComplete => {
                self.coordinator.on_flip_complete()?;
            }
            Event::Shutdown => return Ok(ControlFlow::Break(())),
        }

        let ready = self.coordinator.stats().buffers_ready;
        if self.frame_limit.is_some_and(|limit| ready >= limit) {
            info!(frames = ready, "frame limit reached");
            return Ok(ControlFlow::Break(()));
        }
        Ok(ControlFlow::Continue(()))
    }

    /// Start the session and dispatch posted events until shutdown, the
    /// frame limit, or every sender being dropped.
    ///
    /// The coordinator is stopped before returning, also on error.
    pub fn run(mut self) -> Result<SessionSummary> {
        self.coordinator.start()?;
        let outcome = self.pump();
        self.finish(outcome)
    }

    fn pump(&mut self) -> Result<()> {
        while let Ok(event) = self.events.recv() {
            if self.dispatch(event)?.is_break() {
                break;
            }
        }
        Ok(())
    }

    fn finish(mut self, outcome: Result<()>) -> Result<SessionSummary> {
        if let Err(err) = outcome {
            if err.is_protocol_violation() {
                error!(%err, "buffer ownership violated, terminating session");
            } else {
                error!(%err, "session failed");
            }
            if let Err(stop_err) = self.coordinator.stop() {
                warn!(%stop_err, "teardown after failure also failed");
            }
            return Err(err);
        }

        self.coordinator.stop()?;
        let summary = SessionSummary {
            events: self.dispatched,
            stats: self.coordinator.stats(),
        };
        info!(events = summary.events, "session finished");
        Ok(summary)
    }
}

impl<P, D> EventLoop<P, D>
where
    P: FrameProducer + CompletionSource,
    D: PresentationSink,
{
    /// Like [`EventLoop::run`], but also waits on the producer itself for
    /// completions, up to `poll_interval` per round.
    ///
    /// Used when the producer is a device the loop thread must dequeue from
    /// directly rather than a source posting [`Event::BufferReady`].
    pub fn run_polled(mut self, poll_interval: Duration) -> Result<SessionSummary> {
        self.coordinator.start()?;
        let outcome = self.pump_polled(poll_interval);
        self.finish(outcome)
    }

    fn pump_polled(&mut self, poll_interval: Duration) -> Result<()> {
        loop {
            loop {
                match self.events.try_recv() {
                    Ok(event) => {
                        if self.dispatch(event)?.is_break() {
                            return Ok(());
                        }
                    }
                    Err(channel::TryRecvError::Empty) => break,
                    Err(channel::TryRecvError::Disconnected) => return Ok(()),
                }
            }

            let completed = self.coordinator.producer_mut().poll_completion(poll_interval)?;
            if let Some(buffer) = completed {
                if self.dispatch(Event::BufferReady(buffer))?.is_break() {
                    return Ok(());
                }
            }
        }
    }
}
