use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};

use super::domain::{
    AthleteId, AthleteRankingSettings, EligibilityGates, FlagSeverity, FlagStatus,
    GovernanceFlag, MpiSnapshot, SessionRecord, SnapshotKey, Sport,
};
use super::store::{
    FlagStore, InsertReport, SessionStore, SettingsStore, SnapshotStore, StoreError,
};

#[derive(Debug, Default)]
struct StoreState {
    sessions: Vec<SessionRecord>,
    flags: Vec<GovernanceFlag>,
    settings: BTreeMap<(Sport, AthleteId), AthleteRankingSettings>,
    snapshots: BTreeMap<SnapshotKey, MpiSnapshot>,
}

/// Store backed by process memory. A single lock guards all tables, which gives the batch
/// snapshot insert its all-or-nothing visibility.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRankingStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryRankingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".to_string()))
    }

    pub fn insert_session(&self, session: SessionRecord) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if state
            .sessions
            .iter()
            .any(|existing| existing.session_id == session.session_id)
        {
            return Err(StoreError::Conflict);
        }
        state.sessions.push(session);
        Ok(())
    }

    pub fn insert_flag(&self, flag: GovernanceFlag) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if state
            .flags
            .iter()
            .any(|existing| existing.flag_id == flag.flag_id)
        {
            return Err(StoreError::Conflict);
        }
        state.flags.push(flag);
        Ok(())
    }

    pub fn upsert_settings(&self, settings: AthleteRankingSettings) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        state.settings.insert(
            (settings.sport.clone(), settings.athlete_id.clone()),
            settings,
        );
        Ok(())
    }

    pub fn sessions(&self) -> Result<Vec<SessionRecord>, StoreError> {
        Ok(self.lock()?.sessions.clone())
    }

    pub fn flags(&self) -> Result<Vec<GovernanceFlag>, StoreError> {
        Ok(self.lock()?.flags.clone())
    }

    pub fn settings(&self) -> Result<Vec<AthleteRankingSettings>, StoreError> {
        Ok(self.lock()?.settings.values().cloned().collect())
    }

    pub fn settings_for(
        &self,
        athlete: &AthleteId,
        sport: &Sport,
    ) -> Result<Option<AthleteRankingSettings>, StoreError> {
        Ok(self
            .lock()?
            .settings
            .get(&(sport.clone(), athlete.clone()))
            .cloned())
    }

    pub fn snapshots(&self) -> Result<Vec<MpiSnapshot>, StoreError> {
        Ok(self.lock()?.snapshots.values().cloned().collect())
    }
}

impl SessionStore for InMemoryRankingStore {
    fn sessions_for(
        &self,
        athlete: &AthleteId,
        sport: &Sport,
    ) -> Result<Vec<SessionRecord>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .sessions
            .iter()
            .filter(|session| &session.athlete_id == athlete && &session.sport == sport)
            .cloned()
            .collect())
    }

    fn lock_unlocked(&self) -> Result<usize, StoreError> {
        let mut state = self.lock()?;
        let mut locked = 0;
        for session in state
            .sessions
            .iter_mut()
            .filter(|session| !session.locked && !session.is_deleted())
        {
            session.locked = true;
            locked += 1;
        }
        Ok(locked)
    }
}

impl FlagStore for InMemoryRankingStore {
    fn pending_flags(&self, athlete: &AthleteId) -> Result<Vec<GovernanceFlag>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .flags
            .iter()
            .filter(|flag| &flag.athlete_id == athlete && flag.is_pending())
            .cloned()
            .collect())
    }

    fn resolve_stale_info(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut state = self.lock()?;
        let mut resolved = 0;
        for flag in state.flags.iter_mut().filter(|flag| {
            flag.severity == FlagSeverity::Info && flag.is_pending() && flag.created_at < cutoff
        }) {
            flag.status = FlagStatus::Resolved;
            resolved += 1;
        }
        Ok(resolved)
    }
}

impl SettingsStore for InMemoryRankingStore {
    fn sports(&self) -> Result<Vec<Sport>, StoreError> {
        let state = self.lock()?;
        let mut sports: Vec<Sport> = state.settings.keys().map(|(sport, _)| sport.clone()).collect();
        sports.dedup();
        Ok(sports)
    }

    fn settings_page(
        &self,
        sport: &Sport,
        after: Option<&AthleteId>,
        limit: usize,
    ) -> Result<Vec<AthleteRankingSettings>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .settings
            .range((sport.clone(), AthleteId(String::new()))..)
            .take_while(|((entry_sport, _), _)| entry_sport == sport)
            .filter(|((_, athlete), _)| after.map_or(true, |after| athlete > after))
            .map(|(_, settings)| settings)
            .filter(|settings| !settings.admin_ranking_excluded)
            .take(limit)
            .cloned()
            .collect())
    }

    fn update_gates(
        &self,
        athlete: &AthleteId,
        sport: &Sport,
        gates: EligibilityGates,
    ) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let settings = state
            .settings
            .get_mut(&(sport.clone(), athlete.clone()))
            .ok_or(StoreError::NotFound)?;
        settings.gates = gates;
        Ok(())
    }
}

impl SnapshotStore for InMemoryRankingStore {
    fn latest_before(
        &self,
        athlete: &AthleteId,
        sport: &Sport,
        date: NaiveDate,
    ) -> Result<Option<MpiSnapshot>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .snapshots
            .values()
            .filter(|snapshot| {
                &snapshot.athlete_id == athlete
                    && &snapshot.sport == sport
                    && snapshot.calculation_date < date
            })
            .max_by_key(|snapshot| snapshot.calculation_date)
            .cloned())
    }

    fn insert_batch(&self, rows: Vec<MpiSnapshot>) -> Result<InsertReport, StoreError> {
        let mut state = self.lock()?;
        let mut report = InsertReport::default();
        for row in rows {
            let key = row.key();
            if state.snapshots.contains_key(&key) {
                report.conflicts.push(key);
                continue;
            }
            state.snapshots.insert(key, row);
            report.inserted += 1;
        }
        Ok(report)
    }

    fn snapshots_for(
        &self,
        sport: &Sport,
        date: NaiveDate,
    ) -> Result<Vec<MpiSnapshot>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .snapshots
            .values()
            .filter(|snapshot| &snapshot.sport == sport && snapshot.calculation_date == date)
            .cloned()
            .collect())
    }
}
