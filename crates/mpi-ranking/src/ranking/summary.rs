use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::domain::{AthleteId, SnapshotKey, Sport};

/// Per-athlete step that failed; the athlete is dropped from its pool for this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AthleteStage {
    LoadSessions,
    LoadFlags,
    LoadPriorSnapshot,
    UpdateGates,
}

impl AthleteStage {
    pub const fn label(self) -> &'static str {
        match self {
            AthleteStage::LoadSessions => "load sessions",
            AthleteStage::LoadFlags => "load flags",
            AthleteStage::LoadPriorSnapshot => "load prior snapshot",
            AthleteStage::UpdateGates => "update gates",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AthleteFailure {
    pub athlete_id: AthleteId,
    pub stage: AthleteStage,
    pub message: String,
}

/// Outcome of one sport pool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolSummary {
    pub sport: Sport,
    pub athletes_considered: usize,
    pub skipped_no_sessions: usize,
    pub ranked: usize,
    pub unranked: usize,
    pub excluded_ineligible: usize,
    pub snapshots_written: usize,
    pub conflicts: Vec<SnapshotKey>,
    pub failures: Vec<AthleteFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PoolSummary {
    pub fn new(sport: Sport) -> Self {
        Self {
            sport,
            athletes_considered: 0,
            skipped_no_sessions: 0,
            ranked: 0,
            unranked: 0,
            excluded_ineligible: 0,
            snapshots_written: 0,
            conflicts: Vec::new(),
            failures: Vec::new(),
            error: None,
        }
    }

    pub fn failed(sport: Sport, error: impl Into<String>) -> Self {
        let mut summary = Self::new(sport);
        summary.error = Some(error.into());
        summary
    }

    pub fn is_clean(&self) -> bool {
        self.error.is_none() && self.failures.is_empty() && self.conflicts.is_empty()
    }
}

/// Report for one nightly run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub calculation_date: NaiveDate,
    pub started_at: DateTime<Utc>,
    pub flags_resolved: usize,
    pub sessions_locked: usize,
    pub pools: Vec<PoolSummary>,
}

impl RunSummary {
    pub fn snapshots_written(&self) -> usize {
        self.pools.iter().map(|pool| pool.snapshots_written).sum()
    }

    pub fn failure_count(&self) -> usize {
        self.pools
            .iter()
            .map(|pool| pool.failures.len() + usize::from(pool.error.is_some()))
            .sum()
    }

    pub fn conflict_count(&self) -> usize {
        self.pools.iter().map(|pool| pool.conflicts.len()).sum()
    }

    pub fn pool(&self, sport: &Sport) -> Option<&PoolSummary> {
        self.pools.iter().find(|pool| &pool.sport == sport)
    }

    pub fn is_clean(&self) -> bool {
        self.pools.iter().all(PoolSummary::is_clean)
    }
}
