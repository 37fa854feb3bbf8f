//! Backup level and restart decisions
//!
//! Pure functions over an [`ArchiveSpec`] and its [`BackupHistory`]. Missing
//! history values are replaced by defaults and reported in `warnings`; they
//! never make a decision fail.

use chrono::NaiveDate;

use crate::models::{ArchiveSpec, BackupHistory, RestartDecision, RestartReason};

/// Decide the level of the next backup
///
/// `max_level` is the level the archiver would create next and
/// `configured_level` an explicitly requested level. A requested level above
/// `max_level` is clamped to it; the caller reports that.
pub fn decide(
    max_level: u32,
    configured_level: Option<u32>,
    spec: &ArchiveSpec,
    history: &BackupHistory,
    today: NaiveDate,
    warnings: &mut Vec<String>,
) -> RestartDecision {
    let candidate = match configured_level {
        Some(level) if level <= max_level => level,
        _ => max_level,
    };

    // Restarts only apply to automatically chosen levels
    if !spec.restarting || configured_level.is_some() {
        return RestartDecision::keep(candidate);
    }
    if candidate < 1 {
        return RestartDecision::keep(candidate);
    }

    if let Some(limit) = spec.full_restart_after_count {
        let count = history.restart_count.unwrap_or_else(|| {
            warnings.push("Backup level restart count is not known. Using 0.".to_string());
            0
        });
        if count >= limit {
            return RestartDecision::restart(0, RestartReason::RestartCountLimitReached);
        }
    }

    if let Some(limit) = spec.full_restart_after_age_days {
        let last = known_date(
            history.last_full_restart_date,
            "Date of the last full restart is not known. Using today.",
            today,
            warnings,
        );
        if days_between(last, today) > i64::from(limit) {
            return RestartDecision::restart(0, RestartReason::LastFullRestartAgeLimitReached);
        }
    }

    if candidate < 2 {
        return RestartDecision::keep(candidate);
    }

    if candidate > spec.restart_after_level {
        return RestartDecision::restart(
            restart_level(max_level, spec, history, warnings),
            RestartReason::BackupLevelLimitReached,
        );
    }

    if let Some(limit) = spec.restart_after_age_days {
        let last = known_date(
            history.last_restart_date,
            "Date of the last restart is not known. Using today.",
            today,
            warnings,
        );
        if days_between(last, today) > i64::from(limit) {
            return RestartDecision::restart(
                restart_level(max_level, spec, history, warnings),
                RestartReason::LastRestartAgeLimitReached,
            );
        }
    }

    RestartDecision::keep(candidate)
}

/// Level a non-full restart goes back to
///
/// The lowest level from 1 upward whose recorded backup size stays within
/// `max-restart-level-size` percent of the level 0 backup, searching no
/// higher than `max_level - 1`. Always at least 1.
pub fn restart_level(
    max_level: u32,
    spec: &ArchiveSpec,
    history: &BackupHistory,
    warnings: &mut Vec<String>,
) -> u32 {
    let percent = match spec.max_restart_level_size_percent {
        Some(percent) => u128::from(percent),
        None => return 1,
    };
    let size0 = match history.backup_size(0) {
        Some(size) if size > 0 => u128::from(size),
        _ => return 1,
    };

    let mut level = 1;
    while level + 1 < max_level {
        let size = history.backup_size(level).unwrap_or_else(|| {
            warnings.push(format!(
                "Size of the level {} backup is not known. Using 0.",
                level
            ));
            0
        });
        if u128::from(size) * 100 <= percent * size0 {
            break;
        }
        level += 1;
    }
    level
}

fn known_date(
    date: Option<NaiveDate>,
    warning: &str,
    today: NaiveDate,
    warnings: &mut Vec<String>,
) -> NaiveDate {
    date.unwrap_or_else(|| {
        warnings.push(warning.to_string());
        today
    })
}

fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn days_ago(days: i64) -> Option<NaiveDate> {
        Some(today() - chrono::Duration::days(days))
    }

    fn restarting_spec() -> ArchiveSpec {
        let mut spec = ArchiveSpec::new("home", "/home/user");
        spec.incremental = true;
        spec.restarting = true;
        spec.restart_after_level = 2;
        spec
    }

    fn run(max_level: u32, configured: Option<u32>, spec: &ArchiveSpec, history: &BackupHistory) -> RestartDecision {
        decide(max_level, configured, spec, history, today(), &mut Vec::new())
    }

    #[test]
    fn test_without_restarting_level_is_max_level() {
        let spec = ArchiveSpec::new("home", "/home/user");
        let history = BackupHistory {
            restart_count: Some(100),
            ..Default::default()
        };
        for max_level in 0..20 {
            assert_eq!(run(max_level, None, &spec, &history), RestartDecision::keep(max_level));
        }
    }

    #[test]
    fn test_configured_level_is_clamped_and_never_restarts() {
        let spec = restarting_spec();
        let history = BackupHistory::default();

        assert_eq!(run(3, Some(1), &spec, &history), RestartDecision::keep(1));
        for configured in [4, 5, 1000, u32::MAX] {
            assert_eq!(run(3, Some(configured), &spec, &history), RestartDecision::keep(3));
        }
        // Above restart-after-level but explicitly requested
        assert_eq!(run(7, Some(7), &spec, &history), RestartDecision::keep(7));
    }

    #[test]
    fn test_low_levels_only_see_full_restarts() {
        let mut spec = restarting_spec();
        spec.restart_after_level = 0;
        spec.restart_after_age_days = Some(1);
        let history = BackupHistory {
            last_restart_date: days_ago(100),
            ..Default::default()
        };

        assert_eq!(run(0, None, &spec, &history), RestartDecision::keep(0));
        assert_eq!(run(1, None, &spec, &history), RestartDecision::keep(1));

        spec.full_restart_after_count = Some(2);
        let history = BackupHistory {
            restart_count: Some(2),
            ..history
        };
        assert_eq!(
            run(1, None, &spec, &history),
            RestartDecision::restart(0, RestartReason::RestartCountLimitReached)
        );
    }

    #[test]
    fn test_full_restart_age_is_strictly_greater() {
        let mut spec = restarting_spec();
        spec.full_restart_after_age_days = Some(30);

        let at_limit = BackupHistory {
            last_full_restart_date: days_ago(30),
            ..Default::default()
        };
        assert_eq!(run(2, None, &spec, &at_limit), RestartDecision::keep(2));

        let past_limit = BackupHistory {
            last_full_restart_date: days_ago(31),
            ..Default::default()
        };
        assert_eq!(
            run(2, None, &spec, &past_limit),
            RestartDecision::restart(0, RestartReason::LastFullRestartAgeLimitReached)
        );
    }

    #[test]
    fn test_restart_age_restarts_to_level_one() {
        let mut spec = restarting_spec();
        spec.restart_after_level = 10;
        spec.restart_after_age_days = Some(7);
        let history = BackupHistory {
            last_restart_date: days_ago(8),
            ..Default::default()
        };

        assert_eq!(
            run(4, None, &spec, &history),
            RestartDecision::restart(1, RestartReason::LastRestartAgeLimitReached)
        );
    }

    #[test]
    fn test_restart_age_is_strictly_greater() {
        let mut spec = restarting_spec();
        spec.restart_after_level = 10;
        spec.restart_after_age_days = Some(7);
        let at_limit = BackupHistory {
            last_restart_date: days_ago(7),
            ..Default::default()
        };

        assert_eq!(run(4, None, &spec, &at_limit), RestartDecision::keep(4));
    }

    #[test]
    fn test_missing_history_values_warn_and_use_defaults() {
        let mut spec = restarting_spec();
        spec.full_restart_after_count = Some(3);
        spec.full_restart_after_age_days = Some(10);
        spec.restart_after_age_days = Some(10);
        let mut warnings = Vec::new();

        let decision = decide(2, None, &spec, &BackupHistory::default(), today(), &mut warnings);

        assert_eq!(decision, RestartDecision::keep(2));
        assert_eq!(warnings.len(), 3);
        assert!(warnings[0].contains("restart count"));
    }

    #[test]
    fn test_decide_is_idempotent() {
        let mut spec = restarting_spec();
        spec.max_restart_level_size_percent = Some(50);
        spec.full_restart_after_age_days = Some(5);
        let history = BackupHistory {
            last_full_restart_date: days_ago(2),
            backup_size_by_level: [(0, 100), (1, 80), (2, 30)].into_iter().collect(),
            ..Default::default()
        };

        let first = run(5, None, &spec, &history);
        let second = run(5, None, &spec, &history);
        assert_eq!(first, second);
        assert_eq!(first, RestartDecision::restart(2, RestartReason::BackupLevelLimitReached));
    }

    #[test]
    fn test_restart_level_without_size_ceiling() {
        let spec = restarting_spec();
        let history = BackupHistory {
            backup_size_by_level: [(0, 10), (1, 1000)].into_iter().collect(),
            ..Default::default()
        };
        assert_eq!(restart_level(9, &spec, &history, &mut Vec::new()), 1);
    }

    #[test]
    fn test_restart_level_size_ceiling() {
        let mut spec = restarting_spec();
        spec.max_restart_level_size_percent = Some(60);

        let large = BackupHistory {
            backup_size_by_level: [(0, 10), (1, 7)].into_iter().collect(),
            ..Default::default()
        };
        assert_eq!(
            run(3, None, &spec, &large),
            RestartDecision::restart(2, RestartReason::BackupLevelLimitReached)
        );

        let small = BackupHistory {
            backup_size_by_level: [(0, 10), (1, 4)].into_iter().collect(),
            ..Default::default()
        };
        assert_eq!(
            run(3, None, &spec, &small),
            RestartDecision::restart(1, RestartReason::BackupLevelLimitReached)
        );
    }

    #[test]
    fn test_restart_level_stays_below_max_level() {
        let mut spec = restarting_spec();
        spec.max_restart_level_size_percent = Some(1);
        let history = BackupHistory {
            backup_size_by_level: (0..10).map(|level| (level, 1000)).collect(),
            ..Default::default()
        };

        for max_level in 2..10 {
            let level = restart_level(max_level, &spec, &history, &mut Vec::new());
            assert!(level >= 1);
            assert!(level <= max_level - 1, "{} for max level {}", level, max_level);
        }
    }

    #[test]
    fn test_restart_level_missing_sizes() {
        let mut spec = restarting_spec();
        spec.max_restart_level_size_percent = Some(50);

        // No level 0 size yet
        let mut warnings = Vec::new();
        assert_eq!(restart_level(6, &spec, &BackupHistory::default(), &mut warnings), 1);
        assert!(warnings.is_empty());

        // Level 2 size missing counts as an empty backup
        let history = BackupHistory {
            backup_size_by_level: [(0, 100), (1, 90)].into_iter().collect(),
            ..Default::default()
        };
        assert_eq!(restart_level(6, &spec, &history, &mut warnings), 2);
        assert_eq!(warnings.len(), 1);

        let zero_base = BackupHistory {
            backup_size_by_level: [(0, 0), (1, 90)].into_iter().collect(),
            ..Default::default()
        };
        assert_eq!(restart_level(6, &spec, &zero_base, &mut Vec::new()), 1);
    }

    #[test]
    fn test_huge_sizes_do_not_overflow() {
        let mut spec = restarting_spec();
        spec.max_restart_level_size_percent = Some(100);
        let history = BackupHistory {
            backup_size_by_level: [(0, u64::MAX), (1, u64::MAX)].into_iter().collect(),
            ..Default::default()
        };
        assert_eq!(restart_level(5, &spec, &history, &mut Vec::new()), 1);
    }
}
