//! autoarch - incremental backup archiver
//!
//! Creates tar backups of directory trees described by small declaration
//! files. Backups can be incremental: each level holds the changes since the
//! backup one level below, and levels are restarted automatically based on
//! count, age and size limits.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Paths, settings and the layered archive options
//! - `error`: Custom error types
//! - `models`: Archive specifications, history and restart decisions
//! - `spec`: Declaration file loading and validation
//! - `storage`: JSON key/value store with the backup history
//! - `archiver`: Tar backends (in-process and GNU tar)
//! - `archiving`: Level decisions and backup orchestration
//! - `cli`: The create, list and purge actions
//! - `display`: Terminal formatting of archive information
//! - `ui`: User message sinks
//!
//! # Example
//!
//! ```rust,ignore
//! use autoarch::config::{AppPaths, Configuration, Settings};
//!
//! let paths = AppPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let config = Configuration::from_settings(&settings, &paths);
//! ```

pub mod archiver;
pub mod archiving;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod logging;
pub mod models;
pub mod spec;
pub mod storage;
pub mod ui;

pub use error::{ArchiveError, ArchiveResult};
