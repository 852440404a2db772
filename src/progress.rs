//! Observational progress channel for plan execution.

/// Receives coarse progress while a plan runs. Implementations must not fail.
pub trait Progress {
    /// A group with `max` statements is about to run; `0` once it is done.
    fn range(&mut self, max: usize);
    /// Statement `index` (1-based) of the current group ran.
    fn advance(&mut self, index: usize);
    /// Section label, or error text on failure.
    fn message(&mut self, text: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl Progress for Silent {
    fn range(&mut self, _max: usize) {}
    fn advance(&mut self, _index: usize) {}
    fn message(&mut self, _text: &str) {}
}

/// Keeps every event in order. Handy when the caller wants to replay them.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub events: Vec<ProgressEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Range(usize),
    Advance(usize),
    Message(String),
}

impl Progress for Recorded {
    fn range(&mut self, max: usize) {
        self.events.push(ProgressEvent::Range(max));
    }

    fn advance(&mut self, index: usize) {
        self.events.push(ProgressEvent::Advance(index));
    }

    fn message(&mut self, text: &str) {
        self.events.push(ProgressEvent::Message(text.to_string()));
    }
}
