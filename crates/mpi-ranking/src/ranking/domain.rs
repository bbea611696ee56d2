use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for athletes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AthleteId(pub String);

impl fmt::Display for AthleteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sport slug identifying a ranking pool (e.g. `baseball`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Sport(pub String);

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Performance session captured upstream; only `locked` is ever written by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub athlete_id: AthleteId,
    pub sport: Sport,
    pub session_date: NaiveDate,
    pub sub_indexes: BTreeMap<String, f64>,
    pub player_grade: Option<f64>,
    pub coach_grade: Option<f64>,
    pub locked: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl SessionRecord {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Both the player and the coach submitted a grade for this session.
    pub fn grading_pair(&self) -> Option<(f64, f64)> {
        match (self.player_grade, self.coach_grade) {
            (Some(player), Some(coach)) => Some((player, coach)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagSeverity {
    Info,
    Warning,
    Critical,
}

impl FlagSeverity {
    pub const fn label(self) -> &'static str {
        match self {
            FlagSeverity::Info => "info",
            FlagSeverity::Warning => "warning",
            FlagSeverity::Critical => "critical",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "info" => Some(Self::Info),
            "warning" | "warn" => Some(Self::Warning),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagStatus {
    Pending,
    Resolved,
}

impl FlagStatus {
    pub const fn label(self) -> &'static str {
        match self {
            FlagStatus::Pending => "pending",
            FlagStatus::Resolved => "resolved",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "resolved" => Some(Self::Resolved),
            _ => None,
        }
    }
}

/// Governance or integrity flag raised against an athlete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceFlag {
    pub flag_id: String,
    pub athlete_id: AthleteId,
    pub severity: FlagSeverity,
    pub status: FlagStatus,
    pub created_at: DateTime<Utc>,
}

impl GovernanceFlag {
    pub fn is_pending(&self) -> bool {
        self.status == FlagStatus::Pending
    }
}

/// The four eligibility gates plus their conjunction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityGates {
    pub games_minimum_met: bool,
    pub integrity_threshold_met: bool,
    pub coach_validation_met: bool,
    pub data_span_met: bool,
    pub ranking_eligible: bool,
}

impl EligibilityGates {
    pub fn new(
        games_minimum_met: bool,
        integrity_threshold_met: bool,
        coach_validation_met: bool,
        data_span_met: bool,
    ) -> Self {
        Self {
            games_minimum_met,
            integrity_threshold_met,
            coach_validation_met,
            data_span_met,
            ranking_eligible: games_minimum_met
                && integrity_threshold_met
                && coach_validation_met
                && data_span_met,
        }
    }
}

/// Per-athlete ranking configuration; the engine only writes `gates`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteRankingSettings {
    pub athlete_id: AthleteId,
    pub sport: Sport,
    pub tier: String,
    pub admin_ranking_excluded: bool,
    #[serde(default)]
    pub gates: EligibilityGates,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Rising,
    Stable,
    Dropping,
}

impl TrendDirection {
    pub const fn label(self) -> &'static str {
        match self {
            TrendDirection::Rising => "rising",
            TrendDirection::Stable => "stable",
            TrendDirection::Dropping => "dropping",
        }
    }
}

/// Immutable daily ranking result for one athlete in one sport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MpiSnapshot {
    pub athlete_id: AthleteId,
    pub sport: Sport,
    pub calculation_date: NaiveDate,
    pub adjusted_score: f64,
    pub avg_score: f64,
    pub tier_multiplier: f64,
    pub integrity_score: f64,
    pub grading_delta: f64,
    pub session_count: usize,
    pub global_rank: Option<u32>,
    pub global_percentile: Option<f64>,
    pub pool_size: usize,
    pub pro_probability: f64,
    pub pro_probability_capped: bool,
    pub trend_direction: TrendDirection,
    pub trend_delta: f64,
    pub ranking_eligible: bool,
    pub components: BTreeMap<String, f64>,
}

impl MpiSnapshot {
    pub fn key(&self) -> SnapshotKey {
        SnapshotKey {
            athlete_id: self.athlete_id.clone(),
            sport: self.sport.clone(),
            calculation_date: self.calculation_date,
        }
    }

    pub fn is_ranked(&self) -> bool {
        self.global_rank.is_some()
    }
}

/// Uniqueness key for snapshots.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SnapshotKey {
    pub athlete_id: AthleteId,
    pub sport: Sport,
    pub calculation_date: NaiveDate,
}

impl fmt::Display for SnapshotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.athlete_id, self.sport, self.calculation_date
        )
    }
}
