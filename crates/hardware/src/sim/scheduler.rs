//! Wake-time scheduler.
//!
//! Each timed peripheral instance owns one slot holding its pending wake time. The scheduler
//! keeps the earliest pending time cached, recomputing it after every change, so the driver
//! can jump simulated time straight to the next completion.

use crate::common::SimTime;

/// Per-slot wake times with a cached global minimum.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    slots: Vec<Option<SimTime>>,
    next: Option<SimTime>,
}

impl Scheduler {
    /// Creates `slots` idle slots.
    pub fn new(slots: usize) -> Self {
        Self {
            slots: vec![None; slots],
            next: None,
        }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if there are no slots at all.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Sets (or with `None`, cancels) the wake time of `slot`. Out-of-range slots are ignored.
    pub fn set(&mut self, slot: usize, wake: Option<SimTime>) {
        let Some(entry) = self.slots.get_mut(slot) else {
            tracing::warn!(slot, "wake time for unknown scheduler slot dropped");
            return;
        };
        if *entry == wake {
            return;
        }
        *entry = wake;
        self.next = self.slots.iter().flatten().copied().min();
    }

    /// Wake time of `slot`.
    pub fn get(&self, slot: usize) -> Option<SimTime> {
        self.slots.get(slot).copied().flatten()
    }

    /// Earliest pending wake time across all slots.
    pub const fn next_wake(&self) -> Option<SimTime> {
        self.next
    }

    /// Slots whose wake time is at or before `now`, in ascending slot order.
    pub fn due(&self, now: SimTime) -> Vec<usize> {
        if self.next.is_none_or(|next| next > now) {
            return Vec::new();
        }
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, wake)| wake.is_some_and(|t| t <= now))
            .map(|(slot, _)| slot)
            .collect()
    }
}
