//! Nightly performance-ranking engine.
//!
//! Each run resolves stale informational flags, locks the day's sessions, then scores, gates,
//! ranks and snapshots every sport pool. The pure pieces (aggregate, adjust, eligibility,
//! rank, trend) take plain data; store access is confined to `pool`, `housekeeping`, `writer`
//! and `job`.

pub mod adjust;
pub mod aggregate;
pub mod domain;
pub mod eligibility;
pub mod housekeeping;
pub mod import;
pub mod job;
pub mod memory;
pub mod policy;
pub mod pool;
pub mod rank;
mod retry;
pub mod store;
pub mod summary;
pub mod trend;
pub mod writer;

#[cfg(test)]
mod tests;

pub use domain::{
    AthleteId, AthleteRankingSettings, EligibilityGates, FlagSeverity, FlagStatus,
    GovernanceFlag, MpiSnapshot, SessionRecord, SnapshotKey, Sport, TrendDirection,
};
pub use housekeeping::{HousekeepingReport, HousekeepingStep};
pub use import::{DataDirectory, ImportError};
pub use job::{JobError, NightlyRankingJob};
pub use memory::InMemoryRankingStore;
pub use policy::{IneligibleHandling, PolicyError, RankingPolicy, RetryPolicy};
pub use store::{
    FlagStore, InsertReport, RankingStore, SessionStore, SettingsCursor, SettingsStore,
    SnapshotStore, StoreError,
};
pub use summary::{AthleteFailure, AthleteStage, PoolSummary, RunSummary};
