//! Backup-level restart decision values

use std::fmt;

/// Why the next backup level was lowered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RestartReason {
    /// The automatically chosen level is used as is
    NoRestart,
    /// Too many restarts since the last full backup
    RestartCountLimitReached,
    /// Too many days since the last full backup
    LastFullRestartAgeLimitReached,
    /// The level grew beyond `restart-after-level`
    BackupLevelLimitReached,
    /// Too many days since the last restart
    LastRestartAgeLimitReached,
}

impl RestartReason {
    /// Whether this reason lowers the level
    pub fn is_restart(&self) -> bool {
        !matches!(self, Self::NoRestart)
    }

    /// Warning shown when a backup is created with this reason
    ///
    /// Returns `None` for `NoRestart`.
    pub fn warning(&self, level: u32) -> Option<String> {
        match self {
            Self::NoRestart => None,
            Self::RestartCountLimitReached => Some(
                "Maximal backup level restart count reached. Restarting to level 0.".to_string(),
            ),
            Self::LastFullRestartAgeLimitReached => Some(
                "Maximal backup level full restart age reached. Restarting to level 0."
                    .to_string(),
            ),
            Self::BackupLevelLimitReached => Some(format!(
                "Maximal backup level reached. Restarting to level {}.",
                level
            )),
            Self::LastRestartAgeLimitReached => Some(format!(
                "Maximal backup level restart age reached. Restarting to level {}.",
                level
            )),
        }
    }
}

impl fmt::Display for RestartReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRestart => write!(f, "No restart scheduled for the next backup."),
            Self::RestartCountLimitReached => write!(f, "Maximal restart count reached."),
            Self::LastFullRestartAgeLimitReached => {
                write!(f, "Maximal age without full restart reached.")
            }
            Self::BackupLevelLimitReached => write!(f, "Maximal backup level reached."),
            Self::LastRestartAgeLimitReached => {
                write!(f, "Maximal age without a restart reached.")
            }
        }
    }
}

/// Outcome of one backup-level decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartDecision {
    /// Level of the backup to create
    pub next_level: u32,
    /// Why `next_level` differs from the automatic level, if it does
    pub reason: RestartReason,
}

impl RestartDecision {
    /// A decision that keeps the candidate level
    pub fn keep(level: u32) -> Self {
        Self {
            next_level: level,
            reason: RestartReason::NoRestart,
        }
    }

    /// A decision that restarts to `level`
    pub fn restart(level: u32, reason: RestartReason) -> Self {
        Self {
            next_level: level,
            reason,
        }
    }
}
