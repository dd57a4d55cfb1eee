//! Recording producer and display for testing without hardware.
//!
//! Both mocks append to one shared [`CallLog`], so tests can assert the
//! relative order of display submissions and producer resubmissions.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use crate::traits::{
    BufferId, CompletionSource, ExchangeError, FrameProducer, PresentationSink, Result, SurfaceId,
};

/// A collaborator call observed by the mocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    /// `PresentationSink::queue_for_presentation`.
    Present(SurfaceId),
    /// `FrameProducer::resubmit`.
    Resubmit(BufferId),
    /// `FrameProducer::start`.
    ProducerStart,
    /// `FrameProducer::stop`.
    ProducerStop,
    /// `PresentationSink::stop`.
    DisplayStop,
}

/// Shared, ordered record of collaborator calls.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Rc<RefCell<Vec<Call>>>);

impl CallLog {
    fn push(&self, call: Call) {
        self.0.borrow_mut().push(call);
    }

    /// Snapshot of every call so far.
    pub fn calls(&self) -> Vec<Call> {
        self.0.borrow().clone()
    }

    /// Buffers handed back to the producer, in order.
    pub fn resubmitted(&self) -> Vec<BufferId> {
        self.0
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::Resubmit(buffer) => Some(*buffer),
                _ => None,
            })
            .collect()
    }

    /// Surfaces queued on the display, in order.
    pub fn presented(&self) -> Vec<SurfaceId> {
        self.0
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::Present(surface) => Some(*surface),
                _ => None,
            })
            .collect()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

/// Mock capture pipeline.
///
/// Buffers listed with [`MockProducer::with_completions`] complete in order
/// when polled. Resubmitted buffers complete again after the ones already
/// in flight, the way a driver cycles its queue.
#[derive(Debug)]
pub struct MockProducer {
    log: CallLog,
    fail_next: bool,
    in_flight: VecDeque<BufferId>,
}

impl MockProducer {
    /// Create a producer recording into `log`.
    pub fn with_log(log: CallLog) -> Self {
        Self {
            log,
            fail_next: false,
            in_flight: VecDeque::new(),
        }
    }

    /// Queue `buffers` as owned by the producer, completing in order.
    #[must_use]
    pub fn with_completions<I>(mut self, buffers: I) -> Self
    where
        I: IntoIterator<Item = BufferId>,
    {
        self.in_flight.extend(buffers);
        self
    }

    /// Make the next `resubmit` fail.
    pub fn fail_next(&mut self) {
        self.fail_next = true;
    }
}

impl FrameProducer for MockProducer {
    fn resubmit(&mut self, buffer: BufferId) -> Result<()> {
        if std::mem::take(&mut self.fail_next) {
            return Err(ExchangeError::Producer(format!("cannot queue {buffer}")));
        }
        self.log.push(Call::Resubmit(buffer));
        self.in_flight.push_back(buffer);
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        self.log.push(Call::ProducerStart);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.log.push(Call::ProducerStop);
        Ok(())
    }
}

impl CompletionSource for MockProducer {
    fn poll_completion(&mut self, _timeout: Duration) -> Result<Option<BufferId>> {
        Ok(self.in_flight.pop_front())
    }
}

/// Mock display.
#[derive(Debug)]
pub struct MockDisplay {
    log: CallLog,
    fail_next: bool,
}

impl MockDisplay {
    /// Create a display with its own log.
    pub fn new() -> (Self, CallLog) {
        let log = CallLog::default();
        (Self::with_log(log.clone()), log)
    }

    /// Create a display recording into `log`.
    pub fn with_log(log: CallLog) -> Self {
        Self {
            log,
            fail_next: false,
        }
    }

    /// Make the next `queue_for_presentation` fail.
    pub fn fail_next(&mut self) {
        self.fail_next = true;
    }
}

impl PresentationSink for MockDisplay {
    fn queue_for_presentation(&mut self, surface: SurfaceId) -> Result<()> {
        if std::mem::take(&mut self.fail_next) {
            return Err(ExchangeError::Display(format!("commit of {surface} failed")));
        }
        self.log.push(Call::Present(surface));
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.log.push(Call::DisplayStop);
        Ok(())
    }
}

/// Producer and display sharing one log.
pub fn mock_pair() -> (MockProducer, MockDisplay, CallLog) {
    let log = CallLog::default();
    (
        MockProducer::with_log(log.clone()),
        MockDisplay::with_log(log.clone()),
        log,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_log_keeps_order() {
        let (mut producer, mut display, log) = mock_pair();

        display
            .queue_for_presentation(SurfaceId(1))
            .expect("queue should succeed");
        producer.resubmit(BufferId(0)).expect("resubmit should succeed");

        assert_eq!(
            log.calls(),
            vec![Call::Present(SurfaceId(1)), Call::Resubmit(BufferId(0))]
        );
        assert_eq!(log.presented(), vec![SurfaceId(1)]);
        assert_eq!(log.resubmitted(), vec![BufferId(0)]);
    }

    #[test]
    fn test_resubmitted_buffers_complete_again() {
        let log = CallLog::default();
        let mut producer = MockProducer::with_log(log).with_completions([BufferId(0), BufferId(1)]);
        let timeout = Duration::from_millis(1);

        assert_eq!(producer.poll_completion(timeout).expect("poll"), Some(BufferId(0)));
        producer.resubmit(BufferId(0)).expect("resubmit should succeed");
        assert_eq!(producer.poll_completion(timeout).expect("poll"), Some(BufferId(1)));
        assert_eq!(producer.poll_completion(timeout).expect("poll"), Some(BufferId(0)));
        assert_eq!(producer.poll_completion(timeout).expect("poll"), None);
    }

    #[test]
    fn test_failure_is_one_shot() {
        let (mut producer, _display, log) = mock_pair();
        producer.fail_next();

        assert!(producer.resubmit(BufferId(0)).is_err());
        assert!(producer.resubmit(BufferId(0)).is_ok());
        assert_eq!(log.resubmitted(), vec![BufferId(0)]);
    }
}
