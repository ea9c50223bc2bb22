//! Tiered, age-based snapshot retention.
//!
//! Every snapshot is decided by exactly one tier, chosen by its age relative
//! to a single clock reading:
//!
//! | Tier      | Age                               | Kept when                          |
//! |-----------|-----------------------------------|------------------------------------|
//! | `Recent`  | `< keep_all_within`               | always                             |
//! | `Daily`   | `[keep_all_within, daily_within)` | taken at 00:00 UTC                 |
//! | `Weekly`  | `[daily_within, weekly_within)`   | taken at 00:00 UTC on the weekly day |
//! | `Expired` | `>= weekly_within`                | never                              |
//!
//! Snapshots dated in the future have a negative age and land in `Recent`.

use chrono::{DateTime, TimeDelta, Utc, Weekday};
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, warn};

use crate::config::{PolicyError, TierPolicy, to_time_delta};
use crate::snapshot::{SnapshotId, is_daily_checkpoint, is_weekly_checkpoint};

/// Retention tier a snapshot falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Recent,
    Daily,
    Weekly,
    Expired,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::Recent => "recent",
            Tier::Daily => "daily",
            Tier::Weekly => "weekly",
            Tier::Expired => "expired",
        };
        f.write_str(name)
    }
}

/// Outcome of classifying one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub tier: Tier,
    pub keep: bool,
}

/// Partition of a listing produced by [`RetentionPolicy::plan`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionPlan {
    /// Valid identifiers the policy preserves.
    pub keep: BTreeSet<String>,
    /// Valid identifiers the policy no longer preserves.
    pub expire: BTreeSet<String>,
    /// Identifiers that could not be parsed.
    pub invalid: BTreeSet<String>,
}

/// Evaluates the tiered policy. Holds no state besides the windows.
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    config: TierPolicy,
    keep_all_within: TimeDelta,
    daily_within: TimeDelta,
    weekly_within: TimeDelta,
    weekly_checkpoint_day: Weekday,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            config: TierPolicy::default(),
            keep_all_within: TimeDelta::hours(24),
            daily_within: TimeDelta::days(7),
            weekly_within: TimeDelta::days(30),
            weekly_checkpoint_day: Weekday::Fri,
        }
    }
}

impl RetentionPolicy {
    /// Create a policy from validated tier windows.
    ///
    /// # Errors
    ///
    /// Returns an error if a window is zero, the windows are not strictly
    /// increasing, or a window does not fit in a `TimeDelta`.
    pub fn new(config: TierPolicy) -> Result<Self, PolicyError> {
        config.validate()?;

        Ok(Self {
            keep_all_within: to_time_delta(config.keep_all_within)?,
            daily_within: to_time_delta(config.daily_within)?,
            weekly_within: to_time_delta(config.weekly_within)?,
            weekly_checkpoint_day: config.weekly_checkpoint_day,
            config,
        })
    }

    pub fn config(&self) -> &TierPolicy {
        &self.config
    }

    /// Decide the tier of a snapshot taken at `instant`, as seen from `now`.
    pub fn classify(&self, instant: DateTime<Utc>, now: DateTime<Utc>) -> Decision {
        let age = now.signed_duration_since(instant);

        if age < self.keep_all_within {
            Decision {
                tier: Tier::Recent,
                keep: true,
            }
        } else if age < self.daily_within {
            Decision {
                tier: Tier::Daily,
                keep: is_daily_checkpoint(instant),
            }
        } else if age < self.weekly_within {
            Decision {
                tier: Tier::Weekly,
                keep: is_daily_checkpoint(instant)
                    && is_weekly_checkpoint(instant, self.weekly_checkpoint_day),
            }
        } else {
            Decision {
                tier: Tier::Expired,
                keep: false,
            }
        }
    }

    /// Split identifiers into kept, expired and unparseable sets.
    ///
    /// Identifiers are returned exactly as supplied. Unparseable ones are
    /// logged and never appear in `keep` or `expire`.
    pub fn plan<I, S>(&self, ids: I, now: DateTime<Utc>) -> RetentionPlan
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut plan = RetentionPlan::default();

        for raw in ids {
            let raw = raw.as_ref();
            let id = match SnapshotId::parse(raw) {
                Ok(id) => id,
                Err(e) => {
                    if plan.invalid.insert(raw.to_string()) {
                        warn!(id = %raw, reason = %e, "Skipping invalid snapshot identifier");
                    }
                    continue;
                }
            };

            let decision = self.classify(id.instant(), now);
            debug!(
                id = %id,
                tier = %decision.tier,
                keep = decision.keep,
                "Snapshot classified"
            );

            if decision.keep {
                plan.keep.insert(id.into_string());
            } else {
                plan.expire.insert(id.into_string());
            }
        }

        plan
    }

    /// The set of identifiers to keep.
    pub fn evaluate<I, S>(&self, ids: I, now: DateTime<Utc>) -> BTreeSet<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.plan(ids, now).keep
    }
}
