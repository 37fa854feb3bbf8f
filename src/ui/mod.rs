//! User-facing messages
//!
//! Everything the user should read about a run goes through a
//! [`MessageSink`]. Diagnostics meant for developers use `tracing` instead.

pub mod console;
pub mod recording;

pub use console::ConsoleUi;
pub use recording::RecordingSink;

use std::fmt;

use crate::config::Verbosity;

/// Severity of a user message, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MessageKind {
    Verbose,
    Info,
    Warning,
    Error,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verbose => write!(f, "verbose"),
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Receiver of user-facing messages
pub trait MessageSink {
    /// Deliver one message
    fn show_message(&self, kind: MessageKind, message: &str);

    /// Print a line of regular program output
    fn present_line(&self, line: &str);

    /// Current output verbosity
    fn verbosity(&self) -> Verbosity;

    /// Most severe message kind delivered since the last reset
    fn worst_kind(&self) -> Option<MessageKind>;

    /// Forget the most severe message kind seen so far
    fn reset_worst_kind(&self);

    /// Name the archive subsequent messages are about
    fn set_processed_archive(&self, _archive: Option<&str>) {}

    fn show_error(&self, message: &str) {
        self.show_message(MessageKind::Error, message);
    }

    fn show_warning(&self, message: &str) {
        self.show_message(MessageKind::Warning, message);
    }

    fn show_info(&self, message: &str) {
        self.show_message(MessageKind::Info, message);
    }

    fn show_verbose(&self, message: &str) {
        self.show_message(MessageKind::Verbose, message);
    }
}
