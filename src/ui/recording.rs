//! In-memory message sink

use std::cell::{Cell, RefCell};

use super::{MessageKind, MessageSink};
use crate::config::Verbosity;

/// Keeps every message instead of printing it
///
/// Used to validate archive specifications silently and to inspect
/// messages in tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    verbosity: Verbosity,
    messages: RefCell<Vec<(MessageKind, String)>>,
    lines: RefCell<Vec<String>>,
    worst: Cell<Option<MessageKind>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_verbosity(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            ..Self::default()
        }
    }

    /// All messages delivered so far
    pub fn messages(&self) -> Vec<(MessageKind, String)> {
        self.messages.borrow().clone()
    }

    /// Messages of one kind
    pub fn messages_of(&self, kind: MessageKind) -> Vec<String> {
        self.messages
            .borrow()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.messages_of(MessageKind::Warning)
    }

    pub fn errors(&self) -> Vec<String> {
        self.messages_of(MessageKind::Error)
    }

    /// Lines of regular output
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    /// Whether a message of `kind` containing `needle` was delivered
    pub fn contains(&self, kind: MessageKind, needle: &str) -> bool {
        self.messages
            .borrow()
            .iter()
            .any(|(k, m)| *k == kind && m.contains(needle))
    }
}

impl MessageSink for RecordingSink {
    fn show_message(&self, kind: MessageKind, message: &str) {
        if self.worst.get().map_or(true, |worst| kind > worst) {
            self.worst.set(Some(kind));
        }
        self.messages.borrow_mut().push((kind, message.to_string()));
    }

    fn present_line(&self, line: &str) {
        self.lines.borrow_mut().push(line.to_string());
    }

    fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    fn worst_kind(&self) -> Option<MessageKind> {
        self.worst.get()
    }

    fn reset_worst_kind(&self) {
        self.worst.set(None);
    }
}
