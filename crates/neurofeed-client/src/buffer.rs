//! Length-capped, newest-first event buffer.

use std::collections::VecDeque;

use neurofeed_core::NeurofeedbackEvent;
use neurofeed_core::constants::MAX_BUFFERED_EVENTS;

/// The most recent events, newest first.
///
/// Holds at most [`MAX_BUFFERED_EVENTS`]; pushing onto a full buffer evicts
/// the oldest event. No deduplication is performed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventBuffer {
    events: VecDeque<NeurofeedbackEvent>,
}

impl EventBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend `event`, evicting the oldest entry when over capacity.
    pub fn push(&mut self, event: NeurofeedbackEvent) {
        self.events.push_front(event);
        self.events.truncate(MAX_BUFFERED_EVENTS);
    }

    /// Number of buffered events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The most recently received event.
    pub fn latest(&self) -> Option<&NeurofeedbackEvent> {
        self.events.front()
    }

    /// Iterate newest first.
    pub fn iter(&self) -> impl Iterator<Item = &NeurofeedbackEvent> {
        self.events.iter()
    }

    /// Copy out the buffered events, newest first.
    pub fn to_vec(&self) -> Vec<NeurofeedbackEvent> {
        self.events.iter().cloned().collect()
    }

    /// Drop every buffered event.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}
