//! Exchange coordinator: hands completed capture buffers to the display and
//! recycles them to the capture pipeline once they have left the screen.
//!
//! One coordinator exists per streaming session. It is driven from exactly
//! two entry points, [`ExchangeCoordinator::on_buffer_ready`] for producer
//! completions and [`ExchangeCoordinator::on_flip_complete`] for display
//! flips, and both must be called from a single thread (see
//! [`crate::event_loop`]).

use tracing::{debug, info, warn};

use crate::identity::IdentityMap;
use crate::queue::PendingQueue;
use crate::slots::{Flip, FlipSlots, SlotState};
use crate::traits::{
    BufferId, ExchangeError, FrameProducer, PresentationSink, Result, SurfaceId,
};

/// Counters collected over a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExchangeStats {
    /// Producer completions accepted.
    pub buffers_ready: u64,
    /// Flips that promoted an armed surface.
    pub flips: u64,
    /// Flip notifications with nothing armed.
    pub spurious_flips: u64,
    /// Surfaces queued on the display.
    pub submitted: u64,
    /// Buffers handed back to the producer.
    pub resubmitted: u64,
    /// Longest the pending queue has been.
    pub queue_high_water: usize,
}

/// Coordinates buffer ownership between a producer and a display.
pub struct ExchangeCoordinator<P, D> {
    identity: IdentityMap,
    slots: FlipSlots,
    pending: PendingQueue,
    producer: P,
    display: D,
    streaming: bool,
    stats: ExchangeStats,
}

impl<P, D> ExchangeCoordinator<P, D>
where
    P: FrameProducer,
    D: PresentationSink,
{
    /// Create a stopped coordinator over a fixed identity map.
    pub fn new(identity: IdentityMap, producer: P, display: D) -> Self {
        let pending = PendingQueue::with_capacity(identity.len());
        Self {
            identity,
            slots: FlipSlots::new(),
            pending,
            producer,
            display,
            streaming: false,
            stats: ExchangeStats::default(),
        }
    }

    /// Reset per-frame state and start the producer.
    pub fn start(&mut self) -> Result<()> {
        if self.streaming {
            return Err(ExchangeError::AlreadyStreaming);
        }

        self.pending.drain();
        self.slots.reset();
        self.stats = ExchangeStats::default();
        self.producer.start()?;
        self.streaming = true;

        info!(buffers = self.identity.len(), "exchange started");
        Ok(())
    }

    /// Drop pending surfaces, clear the slots and stop both collaborators.
    ///
    /// Buffers still owned by the producer or the display are reclaimed by
    /// their own teardown. Stopping a stopped coordinator does nothing.
    pub fn stop(&mut self) -> Result<()> {
        if !self.streaming {
            return Ok(());
        }
        self.streaming = false;

        let dropped = self.pending.drain();
        self.slots.reset();

        let display = self.display.stop();
        let producer = self.producer.stop();

        info!(dropped, stats = ?self.stats, "exchange stopped");
        display.and(producer)
    }

    /// Handle a buffer completed by the producer.
    ///
    /// The buffer's surface is armed immediately when the display has
    /// nothing armed, otherwise it waits in the pending queue.
    pub fn on_buffer_ready(&mut self, buffer: BufferId) -> Result<()> {
        if !self.streaming {
            return Err(ExchangeError::NotStreaming);
        }

        let surface = self.identity.surface_of(buffer)?;
        if self.pending.contains(surface) || self.slots.holds(surface) {
            return Err(ExchangeError::DoubleQueue(surface));
        }

        if self.slots.armed().is_none() {
            self.slots.submit(surface, &mut self.display)?;
            self.stats.submitted += 1;
        } else {
            self.pending.push(surface);
            self.stats.queue_high_water = self.stats.queue_high_water.max(self.pending.len());
            debug!(%buffer, %surface, depth = self.pending.len(), "queued behind armed flip");
        }

        self.stats.buffers_ready += 1;
        Ok(())
    }

    /// Handle a flip completion from the display.
    ///
    /// Arms the next pending surface before recycling the buffer that just
    /// left the screen, and returns that buffer.
    ///
    /// If the display refuses the next surface, it goes back to the head of
    /// the queue and the outgoing buffer is still recycled before the
    /// display error is returned.
    pub fn on_flip_complete(&mut self) -> Result<Option<BufferId>> {
        if !self.streaming {
            return Err(ExchangeError::NotStreaming);
        }

        let outgoing = match self.slots.on_flip_complete() {
            Flip::Completed { outgoing } => {
                self.stats.flips += 1;
                outgoing
            }
            Flip::Spurious => {
                self.stats.spurious_flips += 1;
                warn!(current = ?self.slots.current(), "flip completed with nothing armed");
                None
            }
        };

        // The outgoing surface has left the slots at this point, so it is
        // recycled even when arming the next one fails.
        let armed = self.arm_next_pending();
        let recycled = match outgoing {
            Some(surface) => self.recycle(surface).map(Some),
            None => Ok(None),
        };

        match (armed, recycled) {
            (Ok(()), recycled) => recycled,
            (Err(err), Ok(_)) => Err(err),
            (Err(err), Err(recycle_err)) => {
                warn!(%recycle_err, "recycling failed after display error");
                Err(err)
            }
        }
    }

    fn arm_next_pending(&mut self) -> Result<()> {
        let Some(next) = self.pending.pop() else {
            return Ok(());
        };
        if let Err(err) = self.slots.submit(next, &mut self.display) {
            self.pending.requeue(next);
            return Err(err);
        }
        self.stats.submitted += 1;
        Ok(())
    }

    fn recycle(&mut self, surface: SurfaceId) -> Result<BufferId> {
        let buffer = self.identity.buffer_of(surface)?;
        self.producer.resubmit(buffer)?;
        self.stats.resubmitted += 1;
        debug!(%buffer, %surface, "recycled to producer");
        Ok(buffer)
    }

    /// Whether the session is running.
    pub const fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Surface on screen.
    pub const fn current(&self) -> Option<SurfaceId> {
        self.slots.current()
    }

    /// Surface armed for the next flip.
    pub const fn armed(&self) -> Option<SurfaceId> {
        self.slots.armed()
    }

    /// Slot occupancy.
    pub const fn slot_state(&self) -> SlotState {
        self.slots.state()
    }

    /// Surfaces waiting for the armed slot, head first.
    pub fn pending(&self) -> impl Iterator<Item = SurfaceId> + '_ {
        self.pending.iter()
    }

    /// Session counters.
    pub const fn stats(&self) -> ExchangeStats {
        self.stats
    }

    /// Identity map the session was built with.
    pub const fn identity(&self) -> &IdentityMap {
        &self.identity
    }

    /// Producer, for event sources that need to wait on it.
    pub fn producer_mut(&mut self) -> &mut P {
        &mut self.producer
    }
}
