//! Per-actor FIFO of events waiting to be processed.
//!
//! An actor with a non-empty entry has a drain task running. Events for
//! different actors are processed concurrently; events from one actor never
//! overlap and keep their arrival order.

use dispatch_core::event::InboundEvent;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Default)]
pub struct ActorQueues {
    pending: Mutex<HashMap<String, VecDeque<InboundEvent>>>,
}

impl ActorQueues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event. Returns `true` if the actor was idle, in which case
    /// the caller must start draining it.
    pub fn enqueue(&self, event: InboundEvent) -> bool {
        let mut pending = self.pending.lock().unwrap_or_else(|p| p.into_inner());
        match pending.get_mut(&event.actor_id) {
            Some(queue) => {
                queue.push_back(event);
                false
            }
            None => {
                // The first event is taken straight away by the new drain
                // task; an empty queue marks the actor as busy.
                let actor = event.actor_id.clone();
                let mut queue = VecDeque::new();
                queue.push_back(event);
                pending.insert(actor, queue);
                true
            }
        }
    }

    /// Take the actor's next event. Marks the actor idle when nothing is
    /// left.
    pub fn next(&self, actor_id: &str) -> Option<InboundEvent> {
        let mut pending = self.pending.lock().unwrap_or_else(|p| p.into_inner());
        let queue = pending.get_mut(actor_id)?;
        match queue.pop_front() {
            Some(event) => Some(event),
            None => {
                pending.remove(actor_id);
                None
            }
        }
    }

    /// Number of actors with work queued or in progress.
    pub fn active(&self) -> usize {
        self.pending.lock().unwrap_or_else(|p| p.into_inner()).len()
    }
}
