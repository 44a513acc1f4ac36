//! Insertion-ordered set of events waiting for the next flush, keyed by digest.

use crate::check_in::digest::Digest;
use crate::check_in::event::CheckInEvent;
use indexmap::map::Entry;
use indexmap::IndexMap;

/// Outcome of adding an event to the pending set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    Scheduled,
    Replaced,
}

#[derive(Debug, Default)]
pub struct PendingSet {
    events: IndexMap<Digest, CheckInEvent>,
}

impl PendingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event. An event whose digest is already pending replaces the
    /// earlier payload and keeps its first-seen position.
    pub fn insert(&mut self, event: CheckInEvent) -> Insertion {
        match self.events.entry(event.digest) {
            Entry::Occupied(mut slot) => {
                slot.insert(event);
                Insertion::Replaced
            }
            Entry::Vacant(slot) => {
                slot.insert(event);
                Insertion::Scheduled
            }
        }
    }

    /// Take every pending event in first-seen order, leaving the set empty.
    pub fn take(&mut self) -> Vec<CheckInEvent> {
        std::mem::take(&mut self.events).into_values().collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> impl Iterator<Item = &CheckInEvent> {
        self.events.values()
    }
}
