//! Retention configuration structures.

use chrono::{TimeDelta, Weekday};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const HOUR: u64 = 3600;
const DAY: u64 = 24 * HOUR;

/// Retention run configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Dry-run mode: log deletions without executing them.
    ///
    /// Env: SNAPSHOT_LIFECYCLE__RETENTION__DRY_RUN
    #[serde(default)]
    pub dry_run: bool,

    /// Treat per-snapshot deletion failures as a failed run.
    ///
    /// Env: SNAPSHOT_LIFECYCLE__RETENTION__STRICT
    #[serde(default)]
    pub strict: bool,

    /// Delete prefixes under the snapshot namespace that are not valid identifiers.
    ///
    /// Env: SNAPSHOT_LIFECYCLE__RETENTION__PURGE_INVALID
    #[serde(default = "default_purge_invalid")]
    pub purge_invalid: bool,

    /// Wall-clock budget for the deletion sweep. Checked between snapshots only.
    ///
    /// Env: SNAPSHOT_LIFECYCLE__RETENTION__RUN_BUDGET
    #[serde(with = "humantime_serde", default)]
    pub run_budget: Option<Duration>,

    /// Tier windows.
    #[serde(default)]
    pub policy: TierPolicy,
}

fn default_purge_invalid() -> bool {
    true
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            strict: false,
            purge_invalid: default_purge_invalid(),
            run_budget: None,
            policy: TierPolicy::default(),
        }
    }
}

impl RetentionConfig {
    pub fn validate(&self) -> Result<(), PolicyError> {
        if let Some(budget) = self.run_budget {
            if budget.is_zero() {
                return Err(PolicyError::InvalidRunBudget(budget));
            }
        }
        self.policy.validate()
    }
}

/// Age windows of the tiered policy.
///
/// - younger than `keep_all_within`: always kept
/// - younger than `daily_within`: kept at 00:00 UTC
/// - younger than `weekly_within`: kept at 00:00 UTC on `weekly_checkpoint_day`
/// - anything older: expired
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierPolicy {
    /// Env: SNAPSHOT_LIFECYCLE__RETENTION__POLICY__KEEP_ALL_WITHIN
    #[serde(with = "humantime_serde", default = "default_keep_all_within")]
    pub keep_all_within: Duration,

    /// Env: SNAPSHOT_LIFECYCLE__RETENTION__POLICY__DAILY_WITHIN
    #[serde(with = "humantime_serde", default = "default_daily_within")]
    pub daily_within: Duration,

    /// Env: SNAPSHOT_LIFECYCLE__RETENTION__POLICY__WEEKLY_WITHIN
    #[serde(with = "humantime_serde", default = "default_weekly_within")]
    pub weekly_within: Duration,

    /// Env: SNAPSHOT_LIFECYCLE__RETENTION__POLICY__WEEKLY_CHECKPOINT_DAY
    #[serde(default = "default_weekly_checkpoint_day")]
    pub weekly_checkpoint_day: Weekday,
}

fn default_keep_all_within() -> Duration {
    Duration::from_secs(24 * HOUR)
}

fn default_daily_within() -> Duration {
    Duration::from_secs(7 * DAY)
}

fn default_weekly_within() -> Duration {
    Duration::from_secs(30 * DAY)
}

fn default_weekly_checkpoint_day() -> Weekday {
    Weekday::Fri
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self {
            keep_all_within: default_keep_all_within(),
            daily_within: default_daily_within(),
            weekly_within: default_weekly_within(),
            weekly_checkpoint_day: default_weekly_checkpoint_day(),
        }
    }
}

impl TierPolicy {
    /// Validate the tier windows.
    ///
    /// Checks:
    /// - Every window is positive
    /// - Windows are strictly increasing
    /// - Windows fit in a `chrono::TimeDelta`
    pub fn validate(&self) -> Result<(), PolicyError> {
        let windows = [
            ("keep_all_within", self.keep_all_within),
            ("daily_within", self.daily_within),
            ("weekly_within", self.weekly_within),
        ];

        for (window, duration) in windows {
            if duration.is_zero() {
                return Err(PolicyError::ZeroWindow { window, duration });
            }
            to_time_delta(duration)?;
        }

        for pair in windows.windows(2) {
            let (previous, previous_duration) = pair[0];
            let (window, duration) = pair[1];
            if duration <= previous_duration {
                return Err(PolicyError::NonIncreasingWindows {
                    window,
                    duration,
                    previous,
                    previous_duration,
                });
            }
        }

        Ok(())
    }
}

pub(crate) fn to_time_delta(duration: Duration) -> Result<TimeDelta, PolicyError> {
    TimeDelta::from_std(duration).map_err(|e| PolicyError::DurationConversion {
        duration,
        message: e.to_string(),
    })
}

/// Errors raised while validating retention configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Invalid {window} window: {duration:?} must be positive")]
    ZeroWindow {
        window: &'static str,
        duration: Duration,
    },

    #[error(
        "Invalid {window} window: {duration:?} must be longer than {previous} ({previous_duration:?})"
    )]
    NonIncreasingWindows {
        window: &'static str,
        duration: Duration,
        previous: &'static str,
        previous_duration: Duration,
    },

    #[error("Duration conversion error for {duration:?}: {message}")]
    DurationConversion { duration: Duration, message: String },

    #[error("Invalid run budget: {0:?} must be positive")]
    InvalidRunBudget(Duration),
}
