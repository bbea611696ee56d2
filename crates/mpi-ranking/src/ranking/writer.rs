use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{debug, warn};

use super::domain::{AthleteId, MpiSnapshot, Sport};
use super::policy::{IneligibleHandling, RankingPolicy, RetryPolicy};
use super::pool::ScoredAthlete;
use super::rank::{pro_probability, rank_pool, PoolEntry, RankedEntry};
use super::retry::with_retry;
use super::store::{InsertReport, SnapshotStore, StoreError};
use super::trend::compute_trend;

/// Snapshot rows for one pool, ready to be written as a single batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoolSnapshots {
    pub rows: Vec<MpiSnapshot>,
    pub ranked: usize,
    pub unranked: usize,
    pub excluded_ineligible: usize,
}

/// Rank the pool and turn every admitted athlete into a snapshot row.
pub fn build_pool_snapshots(
    sport: &Sport,
    calculation_date: NaiveDate,
    scored: Vec<ScoredAthlete>,
    policy: &RankingPolicy,
) -> PoolSnapshots {
    let rank_everyone = policy.ineligible_handling == IneligibleHandling::Rank;
    let (rankable, ineligible): (Vec<_>, Vec<_>) = scored
        .into_iter()
        .partition(|athlete| rank_everyone || athlete.gates.ranking_eligible);

    let entries = rankable
        .iter()
        .map(|athlete| PoolEntry {
            athlete_id: athlete.athlete_id.clone(),
            adjusted_score: athlete.adjusted.adjusted_score,
            session_count: athlete.aggregate.session_count,
        })
        .collect();
    let ranked = rank_pool(entries, &policy.probability);
    let pool_size = ranked.len();

    let mut by_athlete: HashMap<AthleteId, ScoredAthlete> = rankable
        .into_iter()
        .map(|athlete| (athlete.athlete_id.clone(), athlete))
        .collect();

    let mut snapshots = PoolSnapshots::default();
    for entry in &ranked {
        if let Some(athlete) = by_athlete.remove(&entry.athlete_id) {
            snapshots.rows.push(snapshot_row(
                sport,
                calculation_date,
                &athlete,
                Some(entry),
                pool_size,
                policy,
            ));
            snapshots.ranked += 1;
        }
    }

    match policy.ineligible_handling {
        IneligibleHandling::Unranked => {
            for athlete in &ineligible {
                snapshots.rows.push(snapshot_row(
                    sport,
                    calculation_date,
                    athlete,
                    None,
                    pool_size,
                    policy,
                ));
                snapshots.unranked += 1;
            }
        }
        IneligibleHandling::Exclude | IneligibleHandling::Rank => {
            snapshots.excluded_ineligible = ineligible.len();
        }
    }

    debug!(
        %sport,
        ranked = snapshots.ranked,
        unranked = snapshots.unranked,
        excluded = snapshots.excluded_ineligible,
        "built pool snapshots"
    );
    snapshots
}

fn snapshot_row(
    sport: &Sport,
    calculation_date: NaiveDate,
    athlete: &ScoredAthlete,
    ranked: Option<&RankedEntry>,
    pool_size: usize,
    policy: &RankingPolicy,
) -> MpiSnapshot {
    let adjusted_score = athlete.adjusted.adjusted_score;
    let trend = compute_trend(adjusted_score, athlete.previous_score, policy.trend_threshold);
    let (pro_probability, pro_probability_capped) = match ranked {
        Some(entry) => (entry.pro_probability, entry.pro_probability_capped),
        None => pro_probability(adjusted_score, &policy.probability),
    };

    MpiSnapshot {
        athlete_id: athlete.athlete_id.clone(),
        sport: sport.clone(),
        calculation_date,
        adjusted_score,
        avg_score: athlete.aggregate.avg_score,
        tier_multiplier: athlete.adjusted.tier_multiplier,
        integrity_score: athlete.adjusted.integrity_score,
        grading_delta: athlete.aggregate.grading_delta,
        session_count: athlete.aggregate.session_count,
        global_rank: ranked.map(|entry| entry.rank),
        global_percentile: ranked.map(|entry| entry.percentile),
        pool_size,
        pro_probability,
        pro_probability_capped,
        trend_direction: trend.direction,
        trend_delta: trend.delta,
        ranking_eligible: athlete.gates.ranking_eligible,
        components: athlete.aggregate.components.clone(),
    }
}

/// Insert a pool's rows in one batch. Existing keys come back as conflicts and are not retried.
pub fn write_pool<S: SnapshotStore + ?Sized>(
    store: &S,
    sport: &Sport,
    rows: Vec<MpiSnapshot>,
    retry: &RetryPolicy,
) -> Result<InsertReport, StoreError> {
    if rows.is_empty() {
        return Ok(InsertReport::default());
    }

    let report = with_retry(retry, "insert_batch", || store.insert_batch(rows.clone()))?;
    for key in &report.conflicts {
        warn!(%sport, snapshot = %key, "snapshot already exists, skipping");
    }
    Ok(report)
}
