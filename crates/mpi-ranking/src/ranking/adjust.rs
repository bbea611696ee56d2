use tracing::warn;

use super::domain::GovernanceFlag;
use super::policy::RankingPolicy;

const NEUTRAL_MULTIPLIER: f64 = 1.0;
const MAX_INTEGRITY: f64 = 100.0;

/// Raw score after tier and integrity adjustment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjustedScore {
    pub tier_multiplier: f64,
    pub integrity_score: f64,
    pub adjusted_score: f64,
}

/// Multiplier for the athlete's tier. Unknown tiers fall back to a neutral multiplier.
pub fn tier_multiplier(tier: &str, policy: &RankingPolicy) -> f64 {
    match policy.tier_multiplier(tier) {
        Some(multiplier) => multiplier,
        None => {
            warn!(tier, "unknown competition tier, using neutral multiplier");
            NEUTRAL_MULTIPLIER
        }
    }
}

/// 100 minus the penalty of every pending flag, clamped to `[0, 100]`.
pub fn integrity_score(flags: &[GovernanceFlag], policy: &RankingPolicy) -> f64 {
    let penalty: f64 = flags
        .iter()
        .filter(|flag| flag.is_pending())
        .map(|flag| policy.penalties.for_severity(flag.severity))
        .sum();

    (MAX_INTEGRITY - penalty).clamp(0.0, MAX_INTEGRITY)
}

pub fn adjust_score(
    avg_score: f64,
    tier: &str,
    flags: &[GovernanceFlag],
    policy: &RankingPolicy,
) -> AdjustedScore {
    let tier_multiplier = tier_multiplier(tier, policy);
    let integrity_score = integrity_score(flags, policy);

    AdjustedScore {
        tier_multiplier,
        integrity_score,
        adjusted_score: avg_score * tier_multiplier * (integrity_score / MAX_INTEGRITY),
    }
}
