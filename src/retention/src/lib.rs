//! Snapshot retention library.
//!
//! Decides which timestamped snapshots under `snapshots/` survive a tiered,
//! age-based policy and removes the rest from an object store.
//!
//! ## Architecture
//!
//! - `snapshot`: identifier parsing and checkpoint predicates
//! - `config`: policy windows and run settings (serde, humantime)
//! - `policy`: pure keep/expire evaluation
//! - `store`: storage trait and `object_store` implementation
//! - `executor`: list → evaluate → delete orchestration
//!
//! ## Usage
//!
//! ```no_run
//! use retention::{ObjectStoreSnapshotStore, RetentionConfig, RetentionExecutor, RetentionMetrics};
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let store = Arc::new(ObjectStoreSnapshotStore::new(Arc::new(
//!     object_store::memory::InMemory::new(),
//! )));
//! let executor =
//!     RetentionExecutor::from_config(store, &RetentionConfig::default(), RetentionMetrics::new())?;
//! let report = executor.apply(chrono::Utc::now()).await?;
//! println!("deleted {} snapshots", report.total_deleted());
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod executor;
pub mod metrics;
pub mod policy;
pub mod snapshot;
pub mod store;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used types
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{PolicyError, RetentionConfig, TierPolicy};
pub use executor::{
    DeletionFailure, ExecutionReport, ExecutorConfig, RetentionError, RetentionExecutor, RunPlan,
};
pub use metrics::RetentionMetrics;
pub use policy::{Decision, RetentionPlan, RetentionPolicy, Tier};
pub use snapshot::{InvalidSnapshotId, SnapshotId};
pub use store::{ObjectStoreSnapshotStore, SnapshotStore, StoreError};
