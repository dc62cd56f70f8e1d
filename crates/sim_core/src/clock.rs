//! Simulation time: a global event priority queue driving simulated time.
//!
//! All timestamps are in simulation seconds. The timeline advances by popping
//! the next scheduled event (same-time events are ordered by insertion —
//! FIFO — via a monotonic `tiebreak`, not by event kind, so reproducibility
//! does not depend on variant declaration order).

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use bevy_ecs::prelude::{Entity, Resource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    AgentMove,
    ResourceAnnounce,
    ResourceExpire,
    AgentArriveAtResource,
    AgentArriveAtDropoff,
    /// Synthetic housekeeping event: closes the current batch window even if
    /// no resource arrives past the horizon before the run ends.
    BatchWindowClose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSubject {
    Agent(Entity),
    Resource(Entity),
}

/// Simulation event. `time` is in simulation seconds. `tiebreak` is a
/// monotonically increasing sequence number assigned at `schedule` time,
/// breaking ties between equal-`time` events in insertion (FIFO) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub time: u64,
    pub tiebreak: u64,
    pub kind: EventKind,
    pub subject: Option<EventSubject>,
    /// Generation the subject's agent/resource was at when this event was
    /// scheduled. Lazily validated against the current generation on pop;
    /// mismatches are discarded silently (§4.3 cancellation rule).
    pub generation: u64,
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse both keys to get a min-heap by
        // (time, tiebreak).
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.tiebreak.cmp(&self.tiebreak))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The event currently being dispatched, inserted as a resource before each
/// schedule run.
#[derive(Debug, Clone, Copy, Resource)]
pub struct CurrentEvent(pub Event);

/// Min-heap of events keyed by `(time, tiebreak)`. Pop is the sole source of
/// simulated time advancement.
#[derive(Debug, Resource)]
pub struct EventQueue {
    now: u64,
    next_tiebreak: u64,
    events: BinaryHeap<Event>,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self {
            now: 0,
            next_tiebreak: 0,
            events: BinaryHeap::new(),
        }
    }
}

impl EventQueue {
    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn pending_event_count(&self) -> usize {
        self.events.len()
    }

    /// Timestamp of the next scheduled event without popping it.
    pub fn peek_time(&self) -> Option<u64> {
        self.events.peek().map(|e| e.time)
    }

    /// Schedule an event at an absolute simulation time. Assigns the next
    /// tiebreak sequence number; callers never set `tiebreak` themselves.
    pub fn schedule(
        &mut self,
        time: u64,
        kind: EventKind,
        subject: Option<EventSubject>,
        generation: u64,
    ) {
        let tiebreak = self.next_tiebreak;
        self.next_tiebreak += 1;
        self.events.push(Event {
            time,
            tiebreak,
            kind,
            subject,
            generation,
        });
    }

    /// Schedule an event `delta` seconds from now.
    pub fn schedule_in(
        &mut self,
        delta: u64,
        kind: EventKind,
        subject: Option<EventSubject>,
        generation: u64,
    ) {
        self.schedule(self.now.saturating_add(delta), kind, subject, generation);
    }

    /// Pop the next event (earliest time; FIFO among equal times). Advances
    /// `now` monotonically: `now <- max(now, popped.time)`.
    pub fn pop_next(&mut self) -> Option<Event> {
        let event = self.events.pop()?;
        self.now = self.now.max(event.time);
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_events_in_time_order() {
        let mut queue = EventQueue::default();
        queue.schedule(20, EventKind::AgentMove, None, 0);
        queue.schedule(5, EventKind::AgentMove, None, 0);
        queue.schedule(10, EventKind::AgentMove, None, 0);

        assert_eq!(queue.pop_next().unwrap().time, 5);
        assert_eq!(queue.now(), 5);
        assert_eq!(queue.pop_next().unwrap().time, 10);
        assert_eq!(queue.pop_next().unwrap().time, 20);
        assert!(queue.pop_next().is_none());
    }

    #[test]
    fn equal_times_are_fifo_by_insertion_not_kind() {
        let mut queue = EventQueue::default();
        // ResourceAnnounce inserted first at t=5, then AgentMove at t=5.
        // Event kind ordinal would put AgentMove first if ties broke on kind;
        // FIFO tiebreak must keep insertion order instead.
        queue.schedule(5, EventKind::ResourceAnnounce, None, 0);
        queue.schedule(5, EventKind::AgentMove, None, 0);

        let first = queue.pop_next().unwrap();
        let second = queue.pop_next().unwrap();
        assert_eq!(first.kind, EventKind::ResourceAnnounce);
        assert_eq!(second.kind, EventKind::AgentMove);
    }

    #[test]
    fn now_is_monotone_even_if_a_stale_event_had_an_earlier_time() {
        let mut queue = EventQueue::default();
        queue.schedule(10, EventKind::AgentMove, None, 0);
        queue.pop_next();
        assert_eq!(queue.now(), 10);
        queue.schedule(10, EventKind::AgentMove, None, 0);
        assert_eq!(queue.pop_next().unwrap().time, 10);
        assert_eq!(queue.now(), 10);
    }
}
