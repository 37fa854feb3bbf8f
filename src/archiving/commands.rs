//! User shell commands run around backups

use std::process::{Command, ExitStatus};

use crate::error::{ArchiveError, ArchiveResult};

/// Run `command` with `sh -c` and wait for it
///
/// The command shares the program's standard streams.
///
/// # Errors
///
/// `Command` when the shell cannot be started or the command does not exit
/// with status 0.
pub fn run_command(command: &str) -> ArchiveResult<()> {
    tracing::debug!(command, "running command");
    let status = Command::new("sh")
        .arg("-c")
        .arg(command)
        .status()
        .map_err(|e| ArchiveError::Command(format!("Unable to run \"{}\": {}", command, e)))?;

    if status.success() {
        Ok(())
    } else {
        Err(ArchiveError::Command(format!(
            "\"{}\" {}.",
            command,
            describe_failure(status)
        )))
    }
}

fn describe_failure(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exited with status {}", code),
        None => "was terminated by a signal".to_string(),
    }
}
