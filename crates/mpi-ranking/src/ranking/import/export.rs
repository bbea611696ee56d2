use std::collections::BTreeSet;
use std::io::Write;

use super::parser::SESSION_COLUMNS;
use super::ImportError;
use crate::ranking::domain::{AthleteRankingSettings, GovernanceFlag, SessionRecord};

/// Write sessions with one column per sub-index seen across the export.
pub(crate) fn write_sessions<W: Write>(
    writer: W,
    sessions: &[SessionRecord],
) -> Result<(), ImportError> {
    let sub_index_names: BTreeSet<&str> = sessions
        .iter()
        .flat_map(|session| session.sub_indexes.keys().map(String::as_str))
        .collect();

    let mut csv_writer = csv::Writer::from_writer(writer);
    let mut header: Vec<&str> = SESSION_COLUMNS.to_vec();
    header.extend(sub_index_names.iter().copied());
    csv_writer.write_record(&header)?;

    for session in sessions {
        let mut row = vec![
            session.session_id.clone(),
            session.athlete_id.0.clone(),
            session.sport.0.clone(),
            session.session_date.format("%Y-%m-%d").to_string(),
            optional_number(session.player_grade),
            optional_number(session.coach_grade),
            session.locked.to_string(),
            session
                .deleted_at
                .map(|deleted| deleted.to_rfc3339())
                .unwrap_or_default(),
        ];
        row.extend(
            sub_index_names
                .iter()
                .map(|name| optional_number(session.sub_indexes.get(*name).copied())),
        );
        csv_writer.write_record(&row)?;
    }

    csv_writer.flush()?;
    Ok(())
}

pub(crate) fn write_flags<W: Write>(
    writer: W,
    flags: &[GovernanceFlag],
) -> Result<(), ImportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["flag_id", "athlete_id", "severity", "status", "created_at"])?;

    for flag in flags {
        csv_writer.write_record([
            flag.flag_id.as_str(),
            flag.athlete_id.0.as_str(),
            flag.severity.label(),
            flag.status.label(),
            flag.created_at.to_rfc3339().as_str(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

pub(crate) fn write_settings<W: Write>(
    writer: W,
    settings: &[AthleteRankingSettings],
) -> Result<(), ImportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record([
        "athlete_id",
        "sport",
        "tier",
        "admin_ranking_excluded",
        "games_minimum_met",
        "integrity_threshold_met",
        "coach_validation_met",
        "data_span_met",
        "ranking_eligible",
    ])?;

    for entry in settings {
        let gates = entry.gates;
        csv_writer.write_record([
            entry.athlete_id.0.clone(),
            entry.sport.0.clone(),
            entry.tier.clone(),
            entry.admin_ranking_excluded.to_string(),
            gates.games_minimum_met.to_string(),
            gates.integrity_threshold_met.to_string(),
            gates.coach_validation_met.to_string(),
            gates.data_span_met.to_string(),
            gates.ranking_eligible.to_string(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

fn optional_number(value: Option<f64>) -> String {
    value.map(|number| number.to_string()).unwrap_or_default()
}
