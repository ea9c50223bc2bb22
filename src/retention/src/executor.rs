//! Retention Executor
//!
//! Lists every snapshot, asks the policy which ones survive, and deletes the
//! rest in ascending order.
//!
//! ## Guarantees
//!
//! - A failed listing aborts the run before anything is deleted
//! - One failed deletion never stops the remaining deletions
//! - Dry-run mode only logs what would be removed
//! - An optional run budget is checked between snapshots, never mid-deletion

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{PolicyError, RetentionConfig};
use crate::metrics::RetentionMetrics;
use crate::policy::RetentionPolicy;
use crate::store::{SnapshotStore, StoreError};

/// Executor settings derived from [`RetentionConfig`].
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub dry_run: bool,
    pub purge_invalid: bool,
    pub run_budget: Option<Duration>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self::from(&RetentionConfig::default())
    }
}

impl From<&RetentionConfig> for ExecutorConfig {
    fn from(config: &RetentionConfig) -> Self {
        Self {
            dry_run: config.dry_run,
            purge_invalid: config.purge_invalid,
            run_budget: config.run_budget,
        }
    }
}

/// Partition of one listing, before anything is deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunPlan {
    pub listed: BTreeSet<String>,
    pub keep: BTreeSet<String>,
    pub to_delete: BTreeSet<String>,
    pub invalid: BTreeSet<String>,
}

/// A snapshot whose deletion failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionFailure {
    pub id: String,
    pub error: String,
}

/// Result of a retention run.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub run_id: String,
    pub now: DateTime<Utc>,
    pub dry_run: bool,
    pub total_listed: usize,
    pub kept: BTreeSet<String>,
    /// Snapshots deleted, or that would have been in dry-run mode.
    pub deleted: Vec<String>,
    /// Objects removed, or counted in dry-run mode.
    pub objects_deleted: u64,
    pub invalid: BTreeSet<String>,
    pub failures: Vec<DeletionFailure>,
    /// Snapshots left for a later run because the run budget ran out.
    pub deferred: Vec<String>,
    pub duration: Duration,
}

impl ExecutionReport {
    pub fn total_kept(&self) -> usize {
        self.kept.len()
    }

    pub fn total_deleted(&self) -> usize {
        self.deleted.len()
    }

    /// True when every scheduled deletion succeeded.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn log(&self) {
        info!(
            run_id = %self.run_id,
            now = %self.now.to_rfc3339(),
            dry_run = self.dry_run,
            listed = self.total_listed,
            kept = self.total_kept(),
            deleted = self.total_deleted(),
            objects_deleted = self.objects_deleted,
            invalid = self.invalid.len(),
            failed = self.failures.len(),
            deferred = self.deferred.len(),
            duration = %humantime::format_duration(self.duration),
            "Retention run summary"
        );

        for failure in &self.failures {
            warn!(
                run_id = %self.run_id,
                id = %failure.id,
                error = %failure.error,
                "Snapshot was not deleted"
            );
        }
    }
}

/// Errors that abort a retention run.
#[derive(Error, Debug)]
pub enum RetentionError {
    #[error("Snapshot listing failed, nothing was deleted: {0}")]
    Listing(#[source] StoreError),
}

/// Retention Executor
///
/// Coordinates listing, policy evaluation and deletion for one snapshot store.
pub struct RetentionExecutor {
    store: Arc<dyn SnapshotStore>,
    policy: RetentionPolicy,
    config: ExecutorConfig,
    metrics: RetentionMetrics,
}

impl RetentionExecutor {
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        policy: RetentionPolicy,
        config: ExecutorConfig,
        metrics: RetentionMetrics,
    ) -> Self {
        Self {
            store,
            policy,
            config,
            metrics,
        }
    }

    /// Create an executor from retention configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration fails validation.
    pub fn from_config(
        store: Arc<dyn SnapshotStore>,
        config: &RetentionConfig,
        metrics: RetentionMetrics,
    ) -> Result<Self, PolicyError> {
        config.validate()?;
        let policy = RetentionPolicy::new(config.policy.clone())?;
        Ok(Self::new(store, policy, ExecutorConfig::from(config), metrics))
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    /// List the store and partition the listing without deleting anything.
    pub async fn plan(&self, now: DateTime<Utc>) -> Result<RunPlan, RetentionError> {
        let listed = self.store.list_backup_ids().await.map_err(|e| {
            warn!(error = %e, "Snapshot listing failed, aborting run");
            RetentionError::Listing(e)
        })?;

        info!(
            listed = listed.len(),
            now = %now.to_rfc3339(),
            "Listed snapshots"
        );

        let plan = self.policy.plan(&listed, now);

        let mut to_delete = plan.expire;
        if self.config.purge_invalid {
            to_delete.extend(plan.invalid.iter().cloned());
        }

        info!(
            keep = plan.keep.len(),
            delete = to_delete.len(),
            invalid = plan.invalid.len(),
            purge_invalid = self.config.purge_invalid,
            "Retention policy evaluated"
        );

        Ok(RunPlan {
            listed,
            keep: plan.keep,
            to_delete,
            invalid: plan.invalid,
        })
    }

    /// Run retention against the store as of `now`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the listing fails. Individual deletion
    /// failures are recorded in the report.
    pub async fn apply(&self, now: DateTime<Utc>) -> Result<ExecutionReport, RetentionError> {
        let run_id = format!("retention_{}", now.timestamp_millis());
        let started = Instant::now();
        self.metrics.record_run();

        info!(
            run_id = %run_id,
            dry_run = self.config.dry_run,
            "Starting retention run"
        );

        let plan = self.plan(now).await?;

        self.metrics.record_snapshots_listed(plan.listed.len());
        self.metrics.record_snapshots_kept(plan.keep.len());
        self.metrics.record_invalid_ids(plan.invalid.len());

        let mut deleted = Vec::new();
        let mut failures = Vec::new();
        let mut deferred = Vec::new();
        let mut objects_deleted = 0u64;

        if plan.to_delete.is_empty() {
            info!(run_id = %run_id, "No snapshots to delete");
        }

        let mut pending = plan.to_delete.iter();
        while let Some(id) = pending.next() {
            if let Some(budget) = self.config.run_budget {
                if started.elapsed() >= budget {
                    deferred.push(id.clone());
                    deferred.extend(pending.by_ref().cloned());
                    warn!(
                        run_id = %run_id,
                        budget = %humantime::format_duration(budget),
                        deferred = deferred.len(),
                        "Run budget exhausted, deferring remaining snapshots"
                    );
                    break;
                }
            }

            if self.config.dry_run {
                let objects = match self.store.object_count(id).await {
                    Ok(count) => count,
                    Err(e) => {
                        warn!(run_id = %run_id, id = %id, error = %e, "Failed to count snapshot objects");
                        None
                    }
                };

                info!(
                    run_id = %run_id,
                    id = %id,
                    objects = ?objects,
                    "[DRY RUN] Would delete snapshot"
                );

                let objects = objects.unwrap_or(0) as u64;
                objects_deleted += objects;
                self.metrics.record_snapshot_deleted(objects);
                deleted.push(id.clone());
                continue;
            }

            match self.store.delete_backup(id).await {
                Ok(count) => {
                    info!(
                        run_id = %run_id,
                        id = %id,
                        objects = count,
                        "Snapshot deleted"
                    );
                    objects_deleted += count as u64;
                    self.metrics.record_snapshot_deleted(count as u64);
                    deleted.push(id.clone());
                }
                Err(e) => {
                    warn!(
                        run_id = %run_id,
                        id = %id,
                        error = %e,
                        "Failed to delete snapshot, continuing"
                    );
                    self.metrics.record_deletion_failure();
                    failures.push(DeletionFailure {
                        id: id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let duration = started.elapsed();
        self.metrics
            .record_duration_ms(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX));

        let report = ExecutionReport {
            run_id,
            now,
            dry_run: self.config.dry_run,
            total_listed: plan.listed.len(),
            kept: plan.keep,
            deleted,
            objects_deleted,
            invalid: plan.invalid,
            failures,
            deferred,
            duration,
        };
        report.log();

        Ok(report)
    }
}
