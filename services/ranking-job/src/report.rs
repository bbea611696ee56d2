use mpi_ranking::ranking::RunSummary;
use std::fmt::Write;

/// Plain-text run report for operators reading the job log.
pub(crate) fn render_summary(summary: &RunSummary, dry_run: bool) -> String {
    let mut out = String::new();
    let mode = if dry_run { " (dry run)" } else { "" };
    let _ = writeln!(
        out,
        "MPI ranking run for {}{mode}",
        summary.calculation_date
    );
    let _ = writeln!(
        out,
        "  housekeeping: {} info flags resolved, {} sessions locked",
        summary.flags_resolved, summary.sessions_locked
    );

    if summary.pools.is_empty() {
        let _ = writeln!(out, "  no sport pools found");
    }

    for pool in &summary.pools {
        let _ = writeln!(
            out,
            "  {}: {} considered, {} ranked, {} unranked, {} excluded, {} written, {} conflicts",
            pool.sport,
            pool.athletes_considered,
            pool.ranked,
            pool.unranked,
            pool.excluded_ineligible,
            pool.snapshots_written,
            pool.conflicts.len()
        );
        if let Some(error) = &pool.error {
            let _ = writeln!(out, "    ! pool error: {error}");
        }
        for failure in &pool.failures {
            let _ = writeln!(
                out,
                "    ! {} ({}): {}",
                failure.athlete_id,
                failure.stage.label(),
                failure.message
            );
        }
    }

    let _ = writeln!(
        out,
        "  total: {} snapshots written, {} failures, {} conflicts",
        summary.snapshots_written(),
        summary.failure_count(),
        summary.conflict_count()
    );
    out
}
