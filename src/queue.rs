//! FIFO of surfaces completed by the producer and waiting for the display.

use std::collections::VecDeque;

use crate::traits::SurfaceId;

/// Surfaces waiting for the armed slot, in producer completion order.
///
/// Holds at most one entry per allocated buffer: the coordinator rejects a
/// surface that is already resident before pushing it.
#[derive(Debug, Default, Clone)]
pub struct PendingQueue {
    entries: VecDeque<SurfaceId>,
}

impl PendingQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty queue sized for `buffer_count` buffers.
    #[must_use]
    pub fn with_capacity(buffer_count: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(buffer_count),
        }
    }

    /// Append at the tail.
    pub fn push(&mut self, surface: SurfaceId) {
        self.entries.push_back(surface);
    }

    /// Put a surface back at the head after a failed submission.
    pub fn requeue(&mut self, surface: SurfaceId) {
        self.entries.push_front(surface);
    }

    /// Remove the head.
    pub fn pop(&mut self) -> Option<SurfaceId> {
        self.entries.pop_front()
    }

    /// Whether `surface` is waiting.
    pub fn contains(&self, surface: SurfaceId) -> bool {
        self.entries.contains(&surface)
    }

    /// Number of waiting surfaces.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Waiting surfaces, head first.
    pub fn iter(&self) -> impl Iterator<Item = SurfaceId> + '_ {
        self.entries.iter().copied()
    }

    /// Drop every waiting surface and return how many there were.
    pub fn drain(&mut self) -> usize {
        let dropped = self.entries.len();
        self.entries.clear();
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut queue = PendingQueue::with_capacity(3);
        queue.push(SurfaceId(3));
        queue.push(SurfaceId(1));
        queue.push(SurfaceId(2));

        assert_eq!(queue.pop(), Some(SurfaceId(3)));
        assert_eq!(queue.pop(), Some(SurfaceId(1)));
        assert_eq!(queue.pop(), Some(SurfaceId(2)));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_requeue_goes_to_head() {
        let mut queue = PendingQueue::new();
        queue.push(SurfaceId(1));
        queue.push(SurfaceId(2));

        let head = queue.pop().expect("queue is not empty");
        queue.requeue(head);

        assert_eq!(queue.iter().collect::<Vec<_>>(), vec![SurfaceId(1), SurfaceId(2)]);
    }

    #[test]
    fn test_contains_and_iter() {
        let mut queue = PendingQueue::new();
        queue.push(SurfaceId(5));
        queue.push(SurfaceId(6));

        assert!(queue.contains(SurfaceId(6)));
        assert!(!queue.contains(SurfaceId(7)));
        assert_eq!(queue.iter().collect::<Vec<_>>(), vec![SurfaceId(5), SurfaceId(6)]);
    }

    #[test]
    fn test_drain_empties_queue() {
        let mut queue = PendingQueue::new();
        queue.push(SurfaceId(1));
        queue.push(SurfaceId(2));

        assert_eq!(queue.drain(), 2);
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.drain(), 0);
    }
}
