use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::info;

use super::policy::RankingPolicy;
use super::retry::with_retry;
use super::store::{FlagStore, SessionStore, StoreError};

/// Housekeeping step that failed; both are fatal for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HousekeepingStep {
    FlagResolution,
    SessionLock,
}

impl HousekeepingStep {
    pub const fn label(self) -> &'static str {
        match self {
            HousekeepingStep::FlagResolution => "flag resolution",
            HousekeepingStep::SessionLock => "session lock",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HousekeepingReport {
    pub flags_resolved: usize,
    pub sessions_locked: usize,
}

/// Resolve pending `info` flags older than the configured age. Already-resolved flags are
/// filtered out by status, so a second call resolves nothing.
pub fn resolve_stale_info_flags<S: FlagStore + ?Sized>(
    store: &S,
    now: DateTime<Utc>,
    policy: &RankingPolicy,
) -> Result<usize, StoreError> {
    let cutoff = now - Duration::days(i64::from(policy.flag_auto_resolve_days));
    let resolved = with_retry(&policy.retry, "resolve_stale_info", || {
        store.resolve_stale_info(cutoff)
    })?;
    info!(resolved, %cutoff, "auto-resolved stale info flags");
    Ok(resolved)
}

/// Lock every unlocked, non-deleted session. Only rows still unlocked are touched.
pub fn lock_sessions<S: SessionStore + ?Sized>(
    store: &S,
    policy: &RankingPolicy,
) -> Result<usize, StoreError> {
    let locked = with_retry(&policy.retry, "lock_unlocked", || store.lock_unlocked())?;
    info!(locked, "locked sessions for nightly run");
    Ok(locked)
}

/// Both housekeeping steps in order, reporting which one failed.
pub fn run_housekeeping<S: FlagStore + SessionStore + ?Sized>(
    store: &S,
    now: DateTime<Utc>,
    policy: &RankingPolicy,
) -> Result<HousekeepingReport, (HousekeepingStep, StoreError)> {
    let flags_resolved = resolve_stale_info_flags(store, now, policy)
        .map_err(|err| (HousekeepingStep::FlagResolution, err))?;
    let sessions_locked =
        lock_sessions(store, policy).map_err(|err| (HousekeepingStep::SessionLock, err))?;

    Ok(HousekeepingReport {
        flags_resolved,
        sessions_locked,
    })
}
