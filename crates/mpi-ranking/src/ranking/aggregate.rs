use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use tracing::warn;

use super::domain::SessionRecord;
use super::policy::RankingPolicy;

/// Reduction of one athlete's trailing-window sessions.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateScore {
    pub avg_score: f64,
    pub session_count: usize,
    pub dual_graded_count: usize,
    pub grading_delta: f64,
    /// Mean of `weight * value` per sub-index; sums to `avg_score`.
    pub components: BTreeMap<String, f64>,
}

impl AggregateScore {
    pub fn coach_validation_ratio(&self) -> f64 {
        if self.session_count == 0 {
            return 0.0;
        }
        self.dual_graded_count as f64 / self.session_count as f64
    }
}

/// First date still inside the trailing window ending at `as_of`.
pub fn window_start(as_of: NaiveDate, window_days: u32) -> NaiveDate {
    as_of - Duration::days(i64::from(window_days))
}

pub fn qualifies(session: &SessionRecord, as_of: NaiveDate, window_days: u32) -> bool {
    !session.is_deleted()
        && session.session_date >= window_start(as_of, window_days)
        && session.session_date <= as_of
}

/// Aggregate the qualifying sessions. Returns `None` when nothing qualifies, which keeps the
/// athlete out of the run entirely.
pub fn aggregate_sessions(
    sessions: &[SessionRecord],
    as_of: NaiveDate,
    policy: &RankingPolicy,
) -> Option<AggregateScore> {
    let mut session_count = 0usize;
    let mut score_total = 0.0;
    let mut component_totals: BTreeMap<String, f64> = policy
        .sub_index_weights
        .keys()
        .map(|key| (key.clone(), 0.0))
        .collect();
    let mut dual_graded_count = 0usize;
    let mut grading_total = 0.0;

    for session in sessions
        .iter()
        .filter(|session| qualifies(session, as_of, policy.window_days))
    {
        session_count += 1;

        for (key, weight) in &policy.sub_index_weights {
            let value = sub_index_value(session, key);
            let weighted = weight * value;
            score_total += weighted;
            if let Some(total) = component_totals.get_mut(key) {
                *total += weighted;
            }
        }

        if let Some((player, coach)) = valid_grading_pair(session) {
            dual_graded_count += 1;
            grading_total += (player - coach).abs();
        }
    }

    if session_count == 0 {
        return None;
    }

    let count = session_count as f64;
    let grading_delta = if dual_graded_count == 0 {
        0.0
    } else {
        grading_total / dual_graded_count as f64
    };

    Some(AggregateScore {
        avg_score: score_total / count,
        session_count,
        dual_graded_count,
        grading_delta,
        components: component_totals
            .into_iter()
            .map(|(key, total)| (key, total / count))
            .collect(),
    })
}

/// Both grades, provided each is a finite 0..=100 value. A bad grade makes the session count as
/// not dual-graded.
fn valid_grading_pair(session: &SessionRecord) -> Option<(f64, f64)> {
    let (player, coach) = session.grading_pair()?;
    let valid = |grade: f64| grade.is_finite() && (0.0..=100.0).contains(&grade);
    if valid(player) && valid(coach) {
        return Some((player, coach));
    }

    warn!(
        athlete = %session.athlete_id,
        session = %session.session_id,
        player_grade = player,
        coach_grade = coach,
        "invalid grade ignored"
    );
    None
}

fn sub_index_value(session: &SessionRecord, key: &str) -> f64 {
    match session.sub_indexes.get(key) {
        None => 0.0,
        Some(value) if value.is_finite() && (0.0..=100.0).contains(value) => *value,
        Some(value) => {
            warn!(
                athlete = %session.athlete_id,
                session = %session.session_id,
                sub_index = key,
                value = *value,
                "invalid sub-index value treated as zero"
            );
            0.0
        }
    }
}
