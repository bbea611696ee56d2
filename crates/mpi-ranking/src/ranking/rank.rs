use std::cmp::Ordering;

use super::domain::AthleteId;
use super::policy::ProbabilityPolicy;

/// One athlete's entry into the pool ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolEntry {
    pub athlete_id: AthleteId,
    pub adjusted_score: f64,
    pub session_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry {
    pub athlete_id: AthleteId,
    pub adjusted_score: f64,
    pub session_count: usize,
    pub rank: u32,
    pub percentile: f64,
    pub pool_size: usize,
    pub pro_probability: f64,
    pub pro_probability_capped: bool,
}

/// `(probability, capped)` derived from an adjusted score.
pub fn pro_probability(adjusted_score: f64, policy: &ProbabilityPolicy) -> (f64, bool) {
    let raw = adjusted_score * policy.multiplier;
    (raw.min(policy.cap), raw >= policy.cap)
}

/// Order a pool by descending score and assign 1-based ranks.
///
/// The sort is stable, so tied scores keep their input order and still receive distinct,
/// increasing ranks. NaN scores sink to the bottom.
pub fn rank_pool(mut entries: Vec<PoolEntry>, policy: &ProbabilityPolicy) -> Vec<RankedEntry> {
    entries.sort_by(|a, b| descending(a.adjusted_score, b.adjusted_score));
    let pool_size = entries.len();

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let rank = index + 1;
            let percentile = (pool_size - rank) as f64 / pool_size as f64 * 100.0;
            let (pro_probability, pro_probability_capped) =
                pro_probability(entry.adjusted_score, policy);

            RankedEntry {
                athlete_id: entry.athlete_id,
                adjusted_score: entry.adjusted_score,
                session_count: entry.session_count,
                rank: u32::try_from(rank).unwrap_or(u32::MAX),
                percentile,
                pool_size,
                pro_probability,
                pro_probability_capped,
            }
        })
        .collect()
}

fn descending(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}
