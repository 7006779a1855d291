//! Priority-ordered discrete event queue.
//!
//! Events are totally ordered by `(time, priority, seq)`. The priority is
//! intrinsic to the event kind; `seq` is assigned at insertion and keeps
//! equal-time equal-priority events in FIFO order, which makes replay
//! deterministic for a fixed random seed.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// What the dispatcher does when an event fires.
///
/// The discriminant is the dispatch priority: among events at the same
/// simulation time, lower values are served first, so transmissions finish
/// before new ones start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    TxEnd = 0,
    TxStart = 1,
    Mobility = 2,
    ReceiveWindow = 3,
}

/// One scheduled simulation event.
#[derive(Debug, Clone, Copy)]
pub struct Event {
    pub time: f64,
    pub kind: EventKind,
    /// Identifier shared by the tx-start/tx-end pair of one transmission;
    /// receive-window and mobility events get their own ids.
    pub event_id: u64,
    /// Index of the node this event belongs to.
    pub node: usize,
    seq: u64,
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Event {}

impl Ord for Event {
    // BinaryHeap is a max-heap; reverse the comparison so the earliest
    // (time, priority, seq) pops first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| (other.kind as u8).cmp(&(self.kind as u8)))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The simulator's time-ordered queue.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Event>,
    seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, time: f64, kind: EventKind, event_id: u64, node: usize) {
        let seq = self.seq;
        self.seq += 1;
        self.heap.push(Event {
            time,
            kind,
            event_id,
            node,
            seq,
        });
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.heap.pop()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }

    /// Drop everything except in-flight transmission ends. Used when the
    /// packet budget is reached: started transmissions still complete, but
    /// nothing new begins.
    pub fn retain_tx_end(&mut self) {
        let kept: BinaryHeap<Event> = std::mem::take(&mut self.heap)
            .into_iter()
            .filter(|event| event.kind == EventKind::TxEnd)
            .collect();
        self.heap = kept;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orders_by_time() {
        let mut queue = EventQueue::new();
        queue.push(2.0, EventKind::TxStart, 1, 0);
        queue.push(1.0, EventKind::TxStart, 2, 0);
        queue.push(3.0, EventKind::TxStart, 3, 0);
        assert_eq!(queue.pop().unwrap().event_id, 2);
        assert_eq!(queue.pop().unwrap().event_id, 1);
        assert_eq!(queue.pop().unwrap().event_id, 3);
    }

    #[test]
    fn test_priority_breaks_time_ties() {
        let mut queue = EventQueue::new();
        queue.push(1.0, EventKind::ReceiveWindow, 1, 0);
        queue.push(1.0, EventKind::TxStart, 2, 0);
        queue.push(1.0, EventKind::TxEnd, 3, 0);
        queue.push(1.0, EventKind::Mobility, 4, 0);
        let order: Vec<u64> = std::iter::from_fn(|| queue.pop().map(|e| e.event_id)).collect();
        assert_eq!(order, vec![3, 2, 4, 1]);
    }

    #[test]
    fn test_fifo_among_equal_events() {
        let mut queue = EventQueue::new();
        for id in 0..5 {
            queue.push(1.0, EventKind::TxStart, id, 0);
        }
        let order: Vec<u64> = std::iter::from_fn(|| queue.pop().map(|e| e.event_id)).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_retain_tx_end() {
        let mut queue = EventQueue::new();
        queue.push(1.0, EventKind::TxStart, 1, 0);
        queue.push(2.0, EventKind::TxEnd, 2, 0);
        queue.push(3.0, EventKind::ReceiveWindow, 3, 0);
        queue.push(4.0, EventKind::Mobility, 4, 0);
        queue.retain_tx_end();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pop().unwrap().event_id, 2);
    }
}
