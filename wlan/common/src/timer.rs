// Copyright 2021 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

#[derive(PartialEq, Eq, Hash, Debug, Copy, Clone)]
pub struct EventId(pub u64);

/// Scheduling backend provided by the embedder. Fires scheduled deadlines
/// back into the owning event loop, which then calls `Timer::triggered`.
pub trait Scheduler {
    /// Requests to schedule an event. Returns a unique ID used to cancel the
    /// scheduled event.
    fn schedule(&mut self, from_now: Duration) -> EventId;
    /// Cancels a previously scheduled event.
    fn cancel(&mut self, id: EventId);
}

/// A timer to schedule and cancel timeouts and retrieve triggered events.
pub struct Timer<E> {
    events: HashMap<EventId, E>,
    scheduler: Box<dyn Scheduler>,
}

impl<E> Timer<E> {
    pub fn new(scheduler: Box<dyn Scheduler>) -> Self {
        Self { events: HashMap::default(), scheduler }
    }

    /// Takes the event belonging to a fired deadline. Returns `None` if the
    /// event was already consumed or canceled, which makes stale deadline
    /// deliveries harmless.
    pub fn triggered(&mut self, event_id: &EventId) -> Option<E> {
        self.events.remove(event_id)
    }

    pub fn schedule_after(&mut self, from_now: Duration, event: E) -> EventId {
        let event_id = self.scheduler.schedule(from_now);
        self.events.insert(event_id, event);
        event_id
    }

    pub fn cancel_event(&mut self, event_id: EventId) {
        self.events.remove(&event_id);
        self.scheduler.cancel(event_id);
    }

    pub fn cancel_all(&mut self) {
        for (event_id, _event) in self.events.drain() {
            self.scheduler.cancel(event_id);
        }
    }

    pub fn scheduled_count(&self) -> usize {
        self.events.len()
    }
}

/// Deterministic scheduler for tests. Clones share state so a test can hold
/// one handle while the `Timer` owns another.
#[derive(Clone)]
pub struct FakeScheduler {
    state: Rc<RefCell<FakeSchedulerState>>,
}

#[derive(Default)]
struct FakeSchedulerState {
    next_id: u64,
    scheduled: Vec<(EventId, Duration)>,
    canceled: Vec<EventId>,
}

impl FakeScheduler {
    pub fn new() -> Self {
        Self { state: Rc::new(RefCell::new(FakeSchedulerState::default())) }
    }

    pub fn scheduled_deadlines(&self) -> Vec<(EventId, Duration)> {
        self.state.borrow().scheduled.clone()
    }

    pub fn canceled_ids(&self) -> Vec<EventId> {
        self.state.borrow().canceled.clone()
    }
}

impl Scheduler for FakeScheduler {
    fn schedule(&mut self, from_now: Duration) -> EventId {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let id = EventId(state.next_id);
        state.scheduled.push((id, from_now));
        id
    }

    fn cancel(&mut self, id: EventId) {
        self.state.borrow_mut().canceled.push(id);
    }
}
