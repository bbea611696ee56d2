use super::domain::TrendDirection;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trend {
    pub direction: TrendDirection,
    pub delta: f64,
}

/// Compare against the most recent prior score. No prior snapshot means a stable cold start.
pub fn compute_trend(current: f64, previous: Option<f64>, threshold: f64) -> Trend {
    let previous = previous.unwrap_or(current);
    let delta = current - previous;

    let direction = if delta > threshold {
        TrendDirection::Rising
    } else if delta < -threshold {
        TrendDirection::Dropping
    } else {
        TrendDirection::Stable
    };

    Trend { direction, delta }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cold_start_is_stable_with_zero_delta() {
        let trend = compute_trend(70.35, None, 2.0);
        assert_eq!(trend.direction, TrendDirection::Stable);
        assert_eq!(trend.delta, 0.0);
    }

    #[test]
    fn threshold_is_exclusive() {
        assert_eq!(
            compute_trend(62.0, Some(60.0), 2.0).direction,
            TrendDirection::Stable
        );
        assert_eq!(
            compute_trend(62.5, Some(60.0), 2.0).direction,
            TrendDirection::Rising
        );
        assert_eq!(
            compute_trend(58.0, Some(60.0), 2.0).direction,
            TrendDirection::Stable
        );
        let dropping = compute_trend(50.0, Some(60.0), 2.0);
        assert_eq!(dropping.direction, TrendDirection::Dropping);
        assert_eq!(dropping.delta, -10.0);
    }
}
