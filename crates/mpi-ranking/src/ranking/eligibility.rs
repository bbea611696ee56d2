use super::aggregate::AggregateScore;
use super::domain::EligibilityGates;
use super::policy::EligibilityThresholds;

/// Evaluate the four independent ranking gates.
///
/// The data-span gate reuses the qualifying session count as a proxy for a minimum reporting
/// window.
pub fn evaluate_gates(
    aggregate: &AggregateScore,
    integrity_score: f64,
    thresholds: &EligibilityThresholds,
) -> EligibilityGates {
    EligibilityGates::new(
        aggregate.session_count >= thresholds.min_sessions,
        integrity_score >= thresholds.min_integrity,
        aggregate.session_count > 0
            && aggregate.coach_validation_ratio() >= thresholds.min_coach_validation_ratio,
        aggregate.session_count >= thresholds.min_data_span_sessions,
    )
}
