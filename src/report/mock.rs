//! Recording reporter for tests.
//!
//! `MockReporter` implements the `Reporter` trait and captures every
//! message for later assertion.

use std::cell::RefCell;

use super::{Level, Reporter};

/// Reporter that records every message.
#[derive(Debug, Default)]
pub struct MockReporter {
    entries: RefCell<Vec<(Level, String)>>,
}

impl MockReporter {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All captured messages in report order.
    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries.borrow().clone()
    }

    /// Captured messages at exactly the given level.
    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// Captured warnings.
    pub fn warnings(&self) -> Vec<String> {
        self.messages_at(Level::Warn)
    }

    /// Whether any warning contains `needle`.
    pub fn has_warning(&self, needle: &str) -> bool {
        self.warnings().iter().any(|m| m.contains(needle))
    }

    /// Whether any message at any level contains `needle`.
    pub fn has_message(&self, needle: &str) -> bool {
        self.entries.borrow().iter().any(|(_, m)| m.contains(needle))
    }
}

impl Reporter for MockReporter {
    fn report(&self, level: Level, msg: &str) {
        self.entries.borrow_mut().push((level, msg.to_string()));
    }
}
