//! In-flight slot pair: the surface on screen and the one armed for the
//! next flip.

use tracing::debug;

use crate::traits::{ExchangeError, PresentationSink, Result, SurfaceId};

/// Occupancy of the slot pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Nothing shown, nothing armed.
    Empty,
    /// First surface of the session armed, nothing shown yet.
    ArmedOnly,
    /// One surface shown, nothing armed.
    CurrentOnly,
    /// One surface shown, one armed for the next flip.
    CurrentAndArmed,
}

/// Outcome of a flip notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flip {
    /// The armed surface is now on screen. `outgoing` is the surface it
    /// replaced, free for reuse; `None` on the first flip of a session.
    Completed {
        /// Surface that was on screen before the flip.
        outgoing: Option<SurfaceId>,
    },
    /// Nothing was armed. The slots are untouched.
    Spurious,
}

/// Slot state machine for a display that holds one surface in flight.
#[derive(Debug, Default, Clone)]
pub struct FlipSlots {
    current: Option<SurfaceId>,
    armed: Option<SurfaceId>,
}

impl FlipSlots {
    /// Create an empty slot pair.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            current: None,
            armed: None,
        }
    }

    /// Surface currently on screen.
    pub const fn current(&self) -> Option<SurfaceId> {
        self.current
    }

    /// Surface armed for the next flip.
    pub const fn armed(&self) -> Option<SurfaceId> {
        self.armed
    }

    /// Whether `surface` occupies either slot.
    pub fn holds(&self, surface: SurfaceId) -> bool {
        self.current == Some(surface) || self.armed == Some(surface)
    }

    /// Current occupancy.
    pub const fn state(&self) -> SlotState {
        match (self.current, self.armed) {
            (None, None) => SlotState::Empty,
            (None, Some(_)) => SlotState::ArmedOnly,
            (Some(_), None) => SlotState::CurrentOnly,
            (Some(_), Some(_)) => SlotState::CurrentAndArmed,
        }
    }

    /// Arm `surface` and queue it on `sink`.
    ///
    /// The armed slot must be empty. The slot is only filled once the sink
    /// has accepted the surface, so a sink failure leaves the pair as it was.
    pub fn submit<D>(&mut self, surface: SurfaceId, sink: &mut D) -> Result<()>
    where
        D: PresentationSink + ?Sized,
    {
        if let Some(armed) = self.armed {
            return Err(ExchangeError::FlipPending { surface, armed });
        }

        sink.queue_for_presentation(surface)?;
        self.armed = Some(surface);
        debug!(%surface, "armed for next flip");
        Ok(())
    }

    /// Apply a flip notification from the display.
    ///
    /// The surface returned as outgoing is always the one that was on
    /// screen before this flip, never the one just promoted.
    pub fn on_flip_complete(&mut self) -> Flip {
        let Some(armed) = self.armed.take() else {
            return Flip::Spurious;
        };

        let outgoing = self.current.replace(armed);
        debug!(current = %armed, ?outgoing, "flip complete");
        Flip::Completed { outgoing }
    }

    /// Clear both slots without reporting anything.
    pub fn reset(&mut self) {
        self.current = None;
        self.armed = None;
    }
}
