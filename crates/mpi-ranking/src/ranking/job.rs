use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::domain::Sport;
use super::housekeeping::{run_housekeeping, HousekeepingStep};
use super::policy::RankingPolicy;
use super::pool::process_pool;
use super::retry::with_retry;
use super::store::{RankingStore, StoreError};
use super::summary::{PoolSummary, RunSummary};

/// Errors that stop a run before any pool is ranked.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("housekeeping step '{}' failed: {source}", .step.label())]
    Housekeeping {
        step: HousekeepingStep,
        #[source]
        source: StoreError,
    },
    #[error("failed to list sport pools: {0}")]
    ListPools(#[source] StoreError),
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Nightly entry point: housekeeping, then every sport pool in parallel.
///
/// The job does not guard against concurrent invocations; the scheduler must not start a run
/// while another is in flight. Re-running a calculation date is safe: housekeeping is
/// idempotent and existing snapshots are reported as conflicts instead of duplicated.
pub struct NightlyRankingJob<S> {
    store: Arc<S>,
    policy: Arc<RankingPolicy>,
}

impl<S> NightlyRankingJob<S>
where
    S: RankingStore + 'static,
{
    pub fn new(store: Arc<S>, policy: RankingPolicy) -> Self {
        Self {
            store,
            policy: Arc::new(policy),
        }
    }

    pub async fn run(
        &self,
        calculation_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<RunSummary, JobError> {
        info!(%calculation_date, "starting nightly ranking run");

        let store = Arc::clone(&self.store);
        let policy = Arc::clone(&self.policy);
        let housekeeping =
            tokio::task::spawn_blocking(move || run_housekeeping(&*store, now, &policy))
                .await?
                .map_err(|(step, source)| {
                    error!(step = step.label(), error = %source, "housekeeping failed, aborting run");
                    JobError::Housekeeping { step, source }
                })?;

        let store = Arc::clone(&self.store);
        let policy = Arc::clone(&self.policy);
        let sports = tokio::task::spawn_blocking(move || {
            with_retry(&policy.retry, "sports", || store.sports())
        })
        .await?
        .map_err(JobError::ListPools)?;

        let handles = sports
            .into_iter()
            .map(|sport| {
                let store = Arc::clone(&self.store);
                let policy = Arc::clone(&self.policy);
                let pool_sport = sport.clone();
                let handle = tokio::task::spawn_blocking(move || {
                    process_pool(&*store, &pool_sport, calculation_date, &policy)
                });
                (sport, handle)
            })
            .collect();
        let pools = join_pools(handles).await;

        let summary = RunSummary {
            calculation_date,
            started_at: now,
            flags_resolved: housekeeping.flags_resolved,
            sessions_locked: housekeeping.sessions_locked,
            pools,
        };

        info!(
            %calculation_date,
            pools = summary.pools.len(),
            snapshots = summary.snapshots_written(),
            failures = summary.failure_count(),
            conflicts = summary.conflict_count(),
            "nightly ranking run finished"
        );
        Ok(summary)
    }
}

/// Await every pool task in listing order. A task that panicked or was cancelled becomes a
/// failed pool summary.
pub(crate) async fn join_pools(handles: Vec<(Sport, JoinHandle<PoolSummary>)>) -> Vec<PoolSummary> {
    let mut pools = Vec::with_capacity(handles.len());
    for (sport, handle) in handles {
        let summary = match handle.await {
            Ok(summary) => summary,
            Err(err) => {
                error!(%sport, error = %err, "pool task failed");
                PoolSummary::failed(sport, format!("pool task failed: {err}"))
            }
        };
        pools.push(summary);
    }
    pools
}
