//! Batching Window (C6): accumulates resource arrivals up to a fixed
//! horizon, then flushes. Pure bookkeeping only — the expiry/matching side
//! effects of a close live in `systems::batch_close`, which owns the ECS
//! state this module doesn't touch.

use bevy_ecs::prelude::{Entity, Resource};

/// What a resource arrival means for the window. The caller performs the
/// close procedure (§4.4 steps 3a-3c) for `Closed` before committing the new
/// window via `reopen`.
pub enum ArrivalOutcome {
    /// Window was empty; this arrival opens it.
    Opened,
    /// Window was open and this arrival still falls inside the horizon.
    Added,
    /// This arrival is past the horizon. `closed` is every resource that was
    /// in the window (the caller still needs to prune overdue ones out of
    /// it before matching). The window itself is left untouched — call
    /// `reopen` after running the close procedure.
    Closed { closed: Vec<Entity> },
}

/// Tracks the current batch: `start_time` is unset until the first
/// resource (of this window) arrives.
#[derive(Debug, Default, Resource)]
pub struct BatchWindow {
    pub start_time: Option<u64>,
    pub waiting: Vec<Entity>,
}

impl BatchWindow {
    pub fn horizon(&self, batch_frame: u64) -> Option<u64> {
        self.start_time.map(|s| s + batch_frame)
    }

    /// §4.4 steps 1-3 (minus the close procedure's ECS side effects).
    pub fn on_arrival(&mut self, resource: Entity, announce_time: u64, batch_frame: u64) -> ArrivalOutcome {
        match self.start_time {
            None => {
                self.start_time = Some(announce_time);
                self.waiting.push(resource);
                ArrivalOutcome::Opened
            }
            Some(start) if announce_time <= start + batch_frame => {
                self.waiting.push(resource);
                ArrivalOutcome::Added
            }
            Some(_) => ArrivalOutcome::Closed {
                closed: self.waiting.clone(),
            },
        }
    }

    /// Commit the new window after a `Closed` arrival outcome: `unmatched`
    /// (older resources the matcher didn't place) come first, in their
    /// prior order, followed by the arrival that triggered the close.
    pub fn reopen(&mut self, unmatched: Vec<Entity>, resource: Entity, announce_time: u64) {
        self.start_time = Some(announce_time);
        self.waiting = unmatched;
        self.waiting.push(resource);
    }

    /// Close the window with no new arrival (`BatchWindowClose`, or
    /// end-of-run reaping). Returns every resource that was waiting and
    /// clears `start_time`; the caller decides what happens to them next
    /// via `reopen_stragglers` (or leaves the window closed at end of run).
    pub fn close(&mut self) -> Vec<Entity> {
        self.start_time = None;
        std::mem::take(&mut self.waiting)
    }

    /// Reopens the window around stragglers left over from a
    /// `BatchWindowClose` that had no concurrent arrival to anchor a new
    /// window. Without this, resources the matcher left unmatched would
    /// sit with `start_time == None` forever — nothing re-evaluates them
    /// until another resource happens to announce, even once an agent
    /// that could serve them frees up. Returns `true` if it actually
    /// reopened (`unmatched` non-empty), which tells the caller whether to
    /// schedule the next `BatchWindowClose`.
    pub fn reopen_stragglers(&mut self, unmatched: Vec<Entity>, at: u64) -> bool {
        if unmatched.is_empty() {
            return false;
        }
        self.start_time = Some(at);
        self.waiting = unmatched;
        true
    }
}
