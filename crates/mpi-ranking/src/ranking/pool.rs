use chrono::NaiveDate;
use tracing::{error, info, warn};

use super::adjust::{adjust_score, AdjustedScore};
use super::aggregate::{aggregate_sessions, AggregateScore};
use super::domain::{AthleteId, AthleteRankingSettings, EligibilityGates, Sport};
use super::eligibility::evaluate_gates;
use super::policy::RankingPolicy;
use super::retry::with_retry;
use super::store::{RankingStore, SettingsCursor, StoreError};
use super::summary::{AthleteFailure, AthleteStage, PoolSummary};
use super::writer::{build_pool_snapshots, write_pool};

/// Everything computed for one athlete before pool-level ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredAthlete {
    pub athlete_id: AthleteId,
    pub aggregate: AggregateScore,
    pub adjusted: AdjustedScore,
    pub gates: EligibilityGates,
    pub previous_score: Option<f64>,
}

/// Score, rank and persist one sport pool. Athlete-level failures are collected on the
/// summary; only pool-wide reads and the batch insert can fail the pool.
pub fn process_pool<S: RankingStore + ?Sized>(
    store: &S,
    sport: &Sport,
    calculation_date: NaiveDate,
    policy: &RankingPolicy,
) -> PoolSummary {
    let mut summary = PoolSummary::new(sport.clone());
    let mut scored = Vec::new();

    let cursor =
        SettingsCursor::new(store, sport, policy.settings_page_size).with_retry(policy.retry);
    for page in cursor {
        let page = match page {
            Ok(page) => page,
            Err(err) => {
                error!(%sport, error = %err, "failed to page athlete settings");
                summary.error = Some(format!("failed to load settings: {err}"));
                return summary;
            }
        };

        for settings in page {
            summary.athletes_considered += 1;
            match score_athlete(store, &settings, calculation_date, policy) {
                Ok(Some(athlete)) => scored.push(athlete),
                Ok(None) => summary.skipped_no_sessions += 1,
                Err(failure) => {
                    warn!(
                        %sport,
                        athlete = %failure.athlete_id,
                        stage = failure.stage.label(),
                        error = %failure.message,
                        "athlete skipped for this run"
                    );
                    summary.failures.push(failure);
                }
            }
        }
    }

    let snapshots = build_pool_snapshots(sport, calculation_date, scored, policy);
    summary.ranked = snapshots.ranked;
    summary.unranked = snapshots.unranked;
    summary.excluded_ineligible = snapshots.excluded_ineligible;

    match write_pool(store, sport, snapshots.rows, &policy.retry) {
        Ok(report) => {
            summary.snapshots_written = report.inserted;
            summary.conflicts = report.conflicts;
        }
        Err(err) => {
            error!(%sport, error = %err, "failed to write pool snapshots");
            summary.error = Some(format!("failed to write snapshots: {err}"));
        }
    }

    info!(
        %sport,
        considered = summary.athletes_considered,
        ranked = summary.ranked,
        unranked = summary.unranked,
        written = summary.snapshots_written,
        failures = summary.failures.len(),
        "pool processed"
    );
    summary
}

/// Aggregate, adjust and gate one athlete. `Ok(None)` means no qualifying sessions.
pub fn score_athlete<S: RankingStore + ?Sized>(
    store: &S,
    settings: &AthleteRankingSettings,
    calculation_date: NaiveDate,
    policy: &RankingPolicy,
) -> Result<Option<ScoredAthlete>, AthleteFailure> {
    let athlete = &settings.athlete_id;
    let sport = &settings.sport;
    let fail = move |stage: AthleteStage| {
        move |err: StoreError| AthleteFailure {
            athlete_id: athlete.clone(),
            stage,
            message: err.to_string(),
        }
    };

    let sessions = with_retry(&policy.retry, "sessions_for", || {
        store.sessions_for(athlete, sport)
    })
    .map_err(fail(AthleteStage::LoadSessions))?;

    let Some(aggregate) = aggregate_sessions(&sessions, calculation_date, policy) else {
        return Ok(None);
    };

    let flags = with_retry(&policy.retry, "pending_flags", || store.pending_flags(athlete))
        .map_err(fail(AthleteStage::LoadFlags))?;

    let previous_score = with_retry(&policy.retry, "latest_before", || {
        store.latest_before(athlete, sport, calculation_date)
    })
    .map_err(fail(AthleteStage::LoadPriorSnapshot))?
    .map(|snapshot| snapshot.adjusted_score);

    let adjusted = adjust_score(aggregate.avg_score, &settings.tier, &flags, policy);
    let gates = evaluate_gates(&aggregate, adjusted.integrity_score, &policy.eligibility);

    with_retry(&policy.retry, "update_gates", || {
        store.update_gates(athlete, sport, gates)
    })
    .map_err(fail(AthleteStage::UpdateGates))?;

    Ok(Some(ScoredAthlete {
        athlete_id: athlete.clone(),
        aggregate,
        adjusted,
        gates,
        previous_score,
    }))
}
