use chrono::{DateTime, NaiveDate, Utc};

use super::domain::{
    AthleteId, AthleteRankingSettings, EligibilityGates, GovernanceFlag, MpiSnapshot,
    SessionRecord, SnapshotKey, Sport,
};
use super::policy::RetryPolicy;
use super::retry::with_retry;

/// Error enumeration for store failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Only unavailability is worth retrying; conflicts and missing rows will not change.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

pub trait SessionStore: Send + Sync {
    /// All sessions for the athlete in the sport, deleted rows included.
    fn sessions_for(
        &self,
        athlete: &AthleteId,
        sport: &Sport,
    ) -> Result<Vec<SessionRecord>, StoreError>;

    /// Conditionally lock every unlocked, non-deleted session. Returns how many changed.
    fn lock_unlocked(&self) -> Result<usize, StoreError>;
}

pub trait FlagStore: Send + Sync {
    fn pending_flags(&self, athlete: &AthleteId) -> Result<Vec<GovernanceFlag>, StoreError>;

    /// Resolve pending `info` flags created before `cutoff`. Returns how many changed.
    fn resolve_stale_info(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError>;
}

pub trait SettingsStore: Send + Sync {
    fn sports(&self) -> Result<Vec<Sport>, StoreError>;

    /// Next page of non-excluded settings for `sport`, ordered by athlete id and starting
    /// strictly after `after`.
    fn settings_page(
        &self,
        sport: &Sport,
        after: Option<&AthleteId>,
        limit: usize,
    ) -> Result<Vec<AthleteRankingSettings>, StoreError>;

    fn update_gates(
        &self,
        athlete: &AthleteId,
        sport: &Sport,
        gates: EligibilityGates,
    ) -> Result<(), StoreError>;
}

/// Outcome of a batch snapshot insert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertReport {
    pub inserted: usize,
    pub conflicts: Vec<SnapshotKey>,
}

pub trait SnapshotStore: Send + Sync {
    /// Most recent snapshot for the athlete and sport dated strictly before `date`.
    fn latest_before(
        &self,
        athlete: &AthleteId,
        sport: &Sport,
        date: NaiveDate,
    ) -> Result<Option<MpiSnapshot>, StoreError>;

    /// Insert a pool's snapshots so that readers see either all of them or none. Keys that
    /// already exist are skipped and reported as conflicts.
    fn insert_batch(&self, rows: Vec<MpiSnapshot>) -> Result<InsertReport, StoreError>;

    fn snapshots_for(
        &self,
        sport: &Sport,
        date: NaiveDate,
    ) -> Result<Vec<MpiSnapshot>, StoreError>;
}

/// Everything the nightly job reads from and writes to.
pub trait RankingStore: SessionStore + FlagStore + SettingsStore + SnapshotStore {}

impl<T> RankingStore for T where T: SessionStore + FlagStore + SettingsStore + SnapshotStore {}

/// Cursor that pages through a sport's settings instead of loading the whole pool at once.
pub struct SettingsCursor<'a, S: SettingsStore + ?Sized> {
    store: &'a S,
    sport: &'a Sport,
    page_size: usize,
    retry: RetryPolicy,
    after: Option<AthleteId>,
    exhausted: bool,
}

impl<'a, S: SettingsStore + ?Sized> SettingsCursor<'a, S> {
    pub fn new(store: &'a S, sport: &'a Sport, page_size: usize) -> Self {
        Self {
            store,
            sport,
            page_size: page_size.max(1),
            retry: RetryPolicy {
                max_attempts: 1,
                initial_backoff_ms: 0,
            },
            after: None,
            exhausted: false,
        }
    }

    /// Retry transient page reads before giving up on the cursor.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl<S: SettingsStore + ?Sized> Iterator for SettingsCursor<'_, S> {
    type Item = Result<Vec<AthleteRankingSettings>, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }

        let fetched = with_retry(&self.retry, "settings_page", || {
            self.store
                .settings_page(self.sport, self.after.as_ref(), self.page_size)
        });

        match fetched {
            Ok(page) => {
                if page.len() < self.page_size {
                    self.exhausted = true;
                }
                match page.last() {
                    Some(last) => {
                        self.after = Some(last.athlete_id.clone());
                        Some(Ok(page))
                    }
                    None => None,
                }
            }
            Err(err) => {
                self.exhausted = true;
                Some(Err(err))
            }
        }
    }
}
