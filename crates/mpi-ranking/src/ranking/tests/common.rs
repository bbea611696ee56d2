use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use crate::ranking::domain::{
    AthleteId, AthleteRankingSettings, EligibilityGates, FlagSeverity, FlagStatus,
    GovernanceFlag, MpiSnapshot, SessionRecord, Sport, TrendDirection,
};
use crate::ranking::memory::InMemoryRankingStore;
use crate::ranking::policy::{RankingPolicy, RetryPolicy};
use crate::ranking::store::{
    FlagStore, InsertReport, SessionStore, SettingsStore, SnapshotStore, StoreError,
};

pub(super) const STRONG: [f64; 5] = [80.0, 70.0, 60.0, 90.0, 85.0];
pub(super) const WEAK: [f64; 5] = [60.0, 50.0, 40.0, 70.0, 65.0];

pub(super) fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 30).expect("valid date")
}

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 30, 2, 0, 0).unwrap()
}

pub(super) fn athlete(id: &str) -> AthleteId {
    AthleteId(id.to_string())
}

pub(super) fn baseball() -> Sport {
    Sport("baseball".to_string())
}

pub(super) fn policy() -> RankingPolicy {
    RankingPolicy {
        retry: RetryPolicy {
            max_attempts: 3,
            initial_backoff_ms: 0,
        },
        ..RankingPolicy::default()
    }
}

pub(super) fn session(
    athlete_id: &str,
    sport: &Sport,
    index: usize,
    days_ago: i64,
    values: [f64; 5],
) -> SessionRecord {
    let keys = ["bqi", "fqi", "pei", "decision", "competitive_execution"];
    SessionRecord {
        session_id: format!("{athlete_id}-{}-{index}", sport.0),
        athlete_id: athlete(athlete_id),
        sport: sport.clone(),
        session_date: as_of() - Duration::days(days_ago),
        sub_indexes: keys
            .iter()
            .zip(values)
            .map(|(key, value)| (key.to_string(), value))
            .collect::<BTreeMap<_, _>>(),
        player_grade: None,
        coach_grade: None,
        locked: false,
        deleted_at: None,
    }
}

pub(super) fn settings(athlete_id: &str, sport: &Sport, tier: &str) -> AthleteRankingSettings {
    AthleteRankingSettings {
        athlete_id: athlete(athlete_id),
        sport: sport.clone(),
        tier: tier.to_string(),
        admin_ranking_excluded: false,
        gates: EligibilityGates::default(),
    }
}

pub(super) fn flag(
    id: &str,
    athlete_id: &str,
    severity: FlagSeverity,
    age_days: i64,
) -> GovernanceFlag {
    GovernanceFlag {
        flag_id: id.to_string(),
        athlete_id: athlete(athlete_id),
        severity,
        status: FlagStatus::Pending,
        created_at: now() - Duration::days(age_days),
    }
}

/// Two sessions from the reference scenario: weighs out to an average of 67.5.
pub(super) fn seed_two_session_athlete(
    store: &InMemoryRankingStore,
    athlete_id: &str,
    sport: &Sport,
    tier: &str,
) {
    store
        .upsert_settings(settings(athlete_id, sport, tier))
        .expect("settings stored");
    store
        .insert_session(session(athlete_id, sport, 0, 1, STRONG))
        .expect("session stored");
    store
        .insert_session(session(athlete_id, sport, 1, 2, WEAK))
        .expect("session stored");
}

/// Sixty dual-graded sessions with identical sub-indexes: passes every gate.
pub(super) fn seed_eligible_athlete(
    store: &InMemoryRankingStore,
    athlete_id: &str,
    sport: &Sport,
    tier: &str,
    value: f64,
) {
    store
        .upsert_settings(settings(athlete_id, sport, tier))
        .expect("settings stored");
    for index in 0..60 {
        let mut record = session(athlete_id, sport, index, (index % 80) as i64, [value; 5]);
        record.player_grade = Some(70.0);
        record.coach_grade = Some(65.0);
        store.insert_session(record).expect("session stored");
    }
}

pub(super) fn prior_snapshot(
    athlete_id: &str,
    sport: &Sport,
    days_ago: i64,
    adjusted_score: f64,
) -> MpiSnapshot {
    MpiSnapshot {
        athlete_id: athlete(athlete_id),
        sport: sport.clone(),
        calculation_date: as_of() - Duration::days(days_ago),
        adjusted_score,
        avg_score: adjusted_score,
        tier_multiplier: 1.0,
        integrity_score: 100.0,
        grading_delta: 0.0,
        session_count: 10,
        global_rank: Some(1),
        global_percentile: Some(0.0),
        pool_size: 1,
        pro_probability: adjusted_score * 1.1,
        pro_probability_capped: false,
        trend_direction: TrendDirection::Stable,
        trend_delta: 0.0,
        ranking_eligible: true,
        components: BTreeMap::new(),
    }
}

pub(super) fn approx(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() < 1e-9
}

/// Store wrapper that injects failures around an in-memory store.
#[derive(Default)]
pub(super) struct FaultyStore {
    pub(super) inner: InMemoryRankingStore,
    pub(super) broken_athlete: Option<AthleteId>,
    pub(super) fail_lock: bool,
    pub(super) fail_flag_resolution: bool,
    pub(super) fail_insert: bool,
    pub(super) transient_session_failures: AtomicUsize,
}

impl FaultyStore {
    pub(super) fn wrap(inner: InMemoryRankingStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    pub(super) fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

fn offline() -> StoreError {
    StoreError::Unavailable("database offline".to_string())
}

impl SessionStore for FaultyStore {
    fn sessions_for(
        &self,
        athlete: &AthleteId,
        sport: &Sport,
    ) -> Result<Vec<SessionRecord>, StoreError> {
        if self.broken_athlete.as_ref() == Some(athlete) {
            return Err(offline());
        }
        let remaining = self.transient_session_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.transient_session_failures
                .store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Unavailable("connection reset".to_string()));
        }
        self.inner.sessions_for(athlete, sport)
    }

    fn lock_unlocked(&self) -> Result<usize, StoreError> {
        if self.fail_lock {
            return Err(offline());
        }
        self.inner.lock_unlocked()
    }
}

impl FlagStore for FaultyStore {
    fn pending_flags(&self, athlete: &AthleteId) -> Result<Vec<GovernanceFlag>, StoreError> {
        self.inner.pending_flags(athlete)
    }

    fn resolve_stale_info(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        if self.fail_flag_resolution {
            return Err(offline());
        }
        self.inner.resolve_stale_info(cutoff)
    }
}

impl SettingsStore for FaultyStore {
    fn sports(&self) -> Result<Vec<Sport>, StoreError> {
        self.inner.sports()
    }

    fn settings_page(
        &self,
        sport: &Sport,
        after: Option<&AthleteId>,
        limit: usize,
    ) -> Result<Vec<AthleteRankingSettings>, StoreError> {
        self.inner.settings_page(sport, after, limit)
    }

    fn update_gates(
        &self,
        athlete: &AthleteId,
        sport: &Sport,
        gates: EligibilityGates,
    ) -> Result<(), StoreError> {
        self.inner.update_gates(athlete, sport, gates)
    }
}

impl SnapshotStore for FaultyStore {
    fn latest_before(
        &self,
        athlete: &AthleteId,
        sport: &Sport,
        date: NaiveDate,
    ) -> Result<Option<MpiSnapshot>, StoreError> {
        self.inner.latest_before(athlete, sport, date)
    }

    fn insert_batch(&self, rows: Vec<MpiSnapshot>) -> Result<InsertReport, StoreError> {
        if self.fail_insert {
            return Err(offline());
        }
        self.inner.insert_batch(rows)
    }

    fn snapshots_for(
        &self,
        sport: &Sport,
        date: NaiveDate,
    ) -> Result<Vec<MpiSnapshot>, StoreError> {
        self.inner.snapshots_for(sport, date)
    }
}
