//! Configuration module for autoarch
//!
//! This module provides configuration management including:
//! - XDG-compliant path resolution
//! - Global settings persistence
//! - The typed archive option schema and its override layers

pub mod configuration;
pub mod options;
pub mod paths;
pub mod settings;

pub use configuration::{Configuration, ResolvedOptions};
pub use options::{ArchiveOption, ArchiveOptions};
pub use paths::AppPaths;
pub use settings::{Settings, Verbosity};
