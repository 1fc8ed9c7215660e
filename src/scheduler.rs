//! Timeline of delayed wire deliveries.
//!
//! A `BinaryHeap` with reversed ordering acts as a min-heap keyed by
//! `(at, seq)`. The sequence number grows with every scheduled event, so
//! simultaneous events pop in the order they were scheduled.

use crate::node::NodeId;
use crate::types::SimTime;
use crate::value::LogicValue;
use crate::wire::WireId;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A pending `(time, node, value)` application carried by `wire`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineEvent {
    pub seq: u64,
    pub at: SimTime,
    pub wire: WireId,
    pub node: NodeId,
    pub value: LogicValue,
}

impl Ord for TimelineEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so BinaryHeap pops the earliest event first.
        other
            .at
            .cmp(&self.at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for TimelineEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Timeline {
    queue: BinaryHeap<TimelineEvent>,
    next_seq: u64,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, at: SimTime, wire: WireId, node: NodeId, value: LogicValue) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(TimelineEvent {
            seq,
            at,
            wire,
            node,
            value,
        });
        seq
    }

    /// Pop the next event if it is due at or before `now`.
    pub fn pop_due(&mut self, now: SimTime) -> Option<TimelineEvent> {
        if self.queue.peek().map_or(false, |e| e.at <= now) {
            self.queue.pop()
        } else {
            None
        }
    }

    pub fn peek(&self) -> Option<&TimelineEvent> {
        self.queue.peek()
    }

    /// Drop every event carried by `wire`. Returns how many were removed.
    pub fn cancel_wire(&mut self, wire: WireId) -> usize {
        let before = self.queue.len();
        self.queue.retain(|e| e.wire != wire);
        before - self.queue.len()
    }

    /// Drop every event targeting `node`.
    pub fn cancel_node(&mut self, node: NodeId) -> usize {
        let before = self.queue.len();
        self.queue.retain(|e| e.node != node);
        before - self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// All pending events in the order they would be applied.
    pub fn pending_ordered(&self) -> Vec<TimelineEvent> {
        let mut events: Vec<TimelineEvent> = self.queue.iter().cloned().collect();
        events.sort_by(|a, b| b.cmp(a));
        events
    }
}
