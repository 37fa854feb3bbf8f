//! Terminal message sink

use std::cell::{Cell, RefCell};

use super::{MessageKind, MessageSink};
use crate::config::Verbosity;

/// Program name used as message prefix
const PROGRAM_NAME: &str = "autoarch";

/// Prints messages to the terminal
///
/// Errors and warnings go to stderr, everything else to stdout. Messages
/// are prefixed with the archive being processed, if any.
#[derive(Debug)]
pub struct ConsoleUi {
    verbosity: Verbosity,
    processed_archive: RefCell<Option<String>>,
    worst: Cell<Option<MessageKind>>,
}

impl ConsoleUi {
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            processed_archive: RefCell::new(None),
            worst: Cell::new(None),
        }
    }

    /// Whether a message of `kind` is printed at the current verbosity
    pub fn is_shown(&self, kind: MessageKind) -> bool {
        match self.verbosity {
            Verbosity::Quiet => kind == MessageKind::Error,
            Verbosity::Normal => kind != MessageKind::Verbose,
            Verbosity::Verbose => true,
        }
    }

    /// Format a message the way it is printed
    pub fn format_message(&self, kind: MessageKind, message: &str) -> String {
        let archive = self.processed_archive.borrow();
        let mut prefix = String::from(PROGRAM_NAME);
        if let Some(name) = archive.as_deref() {
            prefix.push_str(": ");
            prefix.push_str(name);
        }

        match kind {
            MessageKind::Error | MessageKind::Warning => {
                format!("{}: {}: {}", prefix, kind, message)
            }
            MessageKind::Info => format!("{}: {}", prefix, message),
            MessageKind::Verbose => message.to_string(),
        }
    }
}

impl MessageSink for ConsoleUi {
    fn show_message(&self, kind: MessageKind, message: &str) {
        if self.worst.get().map_or(true, |worst| kind > worst) {
            self.worst.set(Some(kind));
        }

        tracing::debug!(
            kind = %kind,
            archive = self.processed_archive.borrow().as_deref().unwrap_or("-"),
            "{}",
            message
        );

        if !self.is_shown(kind) {
            return;
        }

        let line = self.format_message(kind, message);
        match kind {
            MessageKind::Error | MessageKind::Warning => eprintln!("{}", line),
            MessageKind::Info | MessageKind::Verbose => println!("{}", line),
        }
    }

    fn present_line(&self, line: &str) {
        println!("{}", line);
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

    fn set_processed_archive(&self, archive: Option<&str>) {
        *self.processed_archive.borrow_mut() = archive.map(str::to_string);
    }
}
