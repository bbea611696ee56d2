use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::FlagSeverity;

/// Tunable policy for the nightly ranking run. Every numeric threshold lives here so it can
/// be changed through configuration rather than code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingPolicy {
    pub window_days: u32,
    pub sub_index_weights: BTreeMap<String, f64>,
    pub tier_multipliers: BTreeMap<String, f64>,
    pub penalties: PenaltyWeights,
    pub eligibility: EligibilityThresholds,
    pub trend_threshold: f64,
    pub probability: ProbabilityPolicy,
    pub flag_auto_resolve_days: u32,
    pub ineligible_handling: IneligibleHandling,
    pub settings_page_size: usize,
    pub retry: RetryPolicy,
}

impl Default for RankingPolicy {
    fn default() -> Self {
        Self {
            window_days: 90,
            sub_index_weights: default_sub_index_weights(),
            tier_multipliers: default_tier_multipliers(),
            penalties: PenaltyWeights::default(),
            eligibility: EligibilityThresholds::default(),
            trend_threshold: 2.0,
            probability: ProbabilityPolicy::default(),
            flag_auto_resolve_days: 7,
            ineligible_handling: IneligibleHandling::default(),
            settings_page_size: 500,
            retry: RetryPolicy::default(),
        }
    }
}

impl RankingPolicy {
    /// Multiplier for a tier slug, or `None` when the tier is not in the table.
    pub fn tier_multiplier(&self, tier: &str) -> Option<f64> {
        let slug = tier.trim().to_ascii_lowercase();
        self.tier_multipliers.get(&slug).copied()
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.window_days == 0 {
            return Err(PolicyError::InvalidWindow);
        }
        if self.settings_page_size == 0 {
            return Err(PolicyError::InvalidPageSize);
        }

        for (key, weight) in &self.sub_index_weights {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(PolicyError::InvalidWeight {
                    name: key.clone(),
                    value: *weight,
                });
            }
        }

        for (tier, multiplier) in &self.tier_multipliers {
            if !multiplier.is_finite() || *multiplier < 0.0 {
                return Err(PolicyError::InvalidWeight {
                    name: format!("tier:{tier}"),
                    value: *multiplier,
                });
            }
        }

        let thresholds = [
            ("trend_threshold", self.trend_threshold),
            ("probability.multiplier", self.probability.multiplier),
            ("probability.cap", self.probability.cap),
            ("eligibility.min_integrity", self.eligibility.min_integrity),
            (
                "eligibility.min_coach_validation_ratio",
                self.eligibility.min_coach_validation_ratio,
            ),
            ("penalties.critical", self.penalties.critical),
            ("penalties.warning", self.penalties.warning),
            ("penalties.info", self.penalties.info),
        ];
        for (name, value) in thresholds {
            if !value.is_finite() || value < 0.0 {
                return Err(PolicyError::InvalidWeight {
                    name: name.to_string(),
                    value,
                });
            }
        }

        Ok(())
    }
}

/// Integrity points deducted per pending flag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PenaltyWeights {
    pub critical: f64,
    pub warning: f64,
    pub info: f64,
}

impl PenaltyWeights {
    pub fn for_severity(&self, severity: FlagSeverity) -> f64 {
        match severity {
            FlagSeverity::Critical => self.critical,
            FlagSeverity::Warning => self.warning,
            FlagSeverity::Info => self.info,
        }
    }
}

impl Default for PenaltyWeights {
    fn default() -> Self {
        Self {
            critical: 15.0,
            warning: 5.0,
            info: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EligibilityThresholds {
    pub min_sessions: usize,
    pub min_integrity: f64,
    pub min_coach_validation_ratio: f64,
    pub min_data_span_sessions: usize,
}

impl Default for EligibilityThresholds {
    fn default() -> Self {
        Self {
            min_sessions: 60,
            min_integrity: 80.0,
            min_coach_validation_ratio: 0.40,
            min_data_span_sessions: 14,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbabilityPolicy {
    pub multiplier: f64,
    pub cap: f64,
}

impl Default for ProbabilityPolicy {
    fn default() -> Self {
        Self {
            multiplier: 1.1,
            cap: 99.0,
        }
    }
}

/// What happens to athletes whose `ranking_eligible` gate is false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IneligibleHandling {
    /// No snapshot is written.
    Exclude,
    /// Snapshot is written without rank or percentile.
    #[default]
    Unranked,
    /// Ranked alongside eligible athletes.
    Rank,
}

impl IneligibleHandling {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "exclude" => Some(Self::Exclude),
            "unranked" => Some(Self::Unranked),
            "rank" => Some(Self::Rank),
            _ => None,
        }
    }
}

/// Bounded exponential backoff for transient store errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PolicyError {
    #[error("window_days must be greater than zero")]
    InvalidWindow,
    #[error("settings_page_size must be greater than zero")]
    InvalidPageSize,
    #[error("{name} must be a finite, non-negative number (found {value})")]
    InvalidWeight { name: String, value: f64 },
}

pub const BQI: &str = "bqi";
pub const FQI: &str = "fqi";
pub const PEI: &str = "pei";
pub const DECISION: &str = "decision";
pub const COMPETITIVE_EXECUTION: &str = "competitive_execution";

fn default_sub_index_weights() -> BTreeMap<String, f64> {
    [
        (BQI, 0.25),
        (FQI, 0.15),
        (PEI, 0.20),
        (DECISION, 0.20),
        (COMPETITIVE_EXECUTION, 0.20),
    ]
    .into_iter()
    .map(|(key, weight)| (key.to_string(), weight))
    .collect()
}

fn default_tier_multipliers() -> BTreeMap<String, f64> {
    [
        ("rec", 0.60),
        ("youth_travel", 0.70),
        ("high_school_jv", 0.75),
        ("high_school_varsity", 0.85),
        ("juco", 0.90),
        ("college_d3", 0.95),
        ("college_d2", 1.00),
        ("college_naia", 1.00),
        ("college_d1", 1.05),
        ("independent_pro", 1.15),
        ("minor_league", 1.30),
        ("international_pro", 1.40),
        ("mlb", 1.50),
    ]
    .into_iter()
    .map(|(tier, multiplier)| (tier.to_string(), multiplier))
    .collect()
}
