use std::collections::BTreeMap;
use std::io::Read;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Deserializer};
use tracing::warn;

use super::{ImportError, FLAGS_FILE, SESSIONS_FILE, SETTINGS_FILE};
use crate::ranking::domain::{
    AthleteId, AthleteRankingSettings, EligibilityGates, FlagSeverity, FlagStatus,
    GovernanceFlag, SessionRecord, Sport,
};

pub(crate) const SESSION_COLUMNS: [&str; 8] = [
    "session_id",
    "athlete_id",
    "sport",
    "session_date",
    "player_grade",
    "coach_grade",
    "locked",
    "deleted_at",
];

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
}

/// Parse a session export. Columns outside the fixed set are read as sub-indexes.
pub(crate) fn parse_sessions<R: Read>(reader: R) -> Result<Vec<SessionRecord>, ImportError> {
    let mut csv_reader = csv_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|header| header == name);

    let required = |name: &'static str| {
        column(name).ok_or_else(|| ImportError::MissingColumn {
            file: SESSIONS_FILE,
            column: name,
        })
    };
    let session_id_idx = required("session_id")?;
    let athlete_idx = required("athlete_id")?;
    let sport_idx = required("sport")?;
    let date_idx = required("session_date")?;
    let player_idx = column("player_grade");
    let coach_idx = column("coach_grade");
    let locked_idx = column("locked");
    let deleted_idx = column("deleted_at");

    let sub_index_columns: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(_, header)| !SESSION_COLUMNS.contains(header))
        .map(|(idx, header)| (idx, header.to_ascii_lowercase()))
        .collect();

    let mut sessions = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |position| position.line());
        let cell = |idx: Option<usize>| {
            idx.and_then(|idx| record.get(idx))
                .filter(|value| !value.is_empty())
        };
        let invalid = |field: &str, value: &str| ImportError::InvalidField {
            file: SESSIONS_FILE,
            line,
            field: field.to_string(),
            value: value.to_string(),
        };

        let session_id = required_cell(cell(Some(session_id_idx)), || invalid("session_id", ""))?;
        let athlete_id = required_cell(cell(Some(athlete_idx)), || invalid("athlete_id", ""))?;
        let sport = required_cell(cell(Some(sport_idx)), || invalid("sport", ""))?;
        let raw_date = required_cell(cell(Some(date_idx)), || invalid("session_date", ""))?;
        let session_date = parse_date(raw_date).ok_or_else(|| invalid("session_date", raw_date))?;

        let player_grade = cell(player_idx)
            .map(|raw| raw.parse::<f64>().map_err(|_| invalid("player_grade", raw)))
            .transpose()?;
        let coach_grade = cell(coach_idx)
            .map(|raw| raw.parse::<f64>().map_err(|_| invalid("coach_grade", raw)))
            .transpose()?;
        let locked = match cell(locked_idx) {
            Some(raw) => parse_bool(raw).ok_or_else(|| invalid("locked", raw))?,
            None => false,
        };
        let deleted_at = cell(deleted_idx)
            .map(|raw| parse_datetime(raw).ok_or_else(|| invalid("deleted_at", raw)))
            .transpose()?;

        let mut sub_indexes = BTreeMap::new();
        for (idx, name) in &sub_index_columns {
            let Some(raw) = cell(Some(*idx)) else {
                continue;
            };
            match raw.parse::<f64>() {
                Ok(value) => {
                    sub_indexes.insert(name.clone(), value);
                }
                Err(_) => warn!(
                    session = session_id,
                    sub_index = name.as_str(),
                    value = raw,
                    "non-numeric sub-index ignored"
                ),
            }
        }

        sessions.push(SessionRecord {
            session_id: session_id.to_string(),
            athlete_id: AthleteId(athlete_id.to_string()),
            sport: Sport(sport.to_ascii_lowercase()),
            session_date,
            sub_indexes,
            player_grade,
            coach_grade,
            locked,
            deleted_at,
        });
    }

    Ok(sessions)
}

#[derive(Debug, Deserialize)]
struct FlagRow {
    flag_id: String,
    athlete_id: String,
    severity: String,
    status: String,
    created_at: String,
}

pub(crate) fn parse_flags<R: Read>(reader: R) -> Result<Vec<GovernanceFlag>, ImportError> {
    let mut csv_reader = csv_reader(reader);
    let mut flags = Vec::new();

    for (offset, row) in csv_reader.deserialize::<FlagRow>().enumerate() {
        let row = row?;
        let line = offset as u64 + 2;
        let invalid = |field: &str, value: &str| ImportError::InvalidField {
            file: FLAGS_FILE,
            line,
            field: field.to_string(),
            value: value.to_string(),
        };

        flags.push(GovernanceFlag {
            severity: FlagSeverity::parse(&row.severity)
                .ok_or_else(|| invalid("severity", &row.severity))?,
            status: FlagStatus::parse(&row.status).ok_or_else(|| invalid("status", &row.status))?,
            created_at: parse_datetime(&row.created_at)
                .ok_or_else(|| invalid("created_at", &row.created_at))?,
            flag_id: row.flag_id,
            athlete_id: AthleteId(row.athlete_id),
        });
    }

    Ok(flags)
}

#[derive(Debug, Deserialize)]
struct SettingsRow {
    athlete_id: String,
    sport: String,
    #[serde(default)]
    tier: String,
    #[serde(default, deserialize_with = "flexible_bool")]
    admin_ranking_excluded: bool,
    #[serde(default, deserialize_with = "flexible_bool")]
    games_minimum_met: bool,
    #[serde(default, deserialize_with = "flexible_bool")]
    integrity_threshold_met: bool,
    #[serde(default, deserialize_with = "flexible_bool")]
    coach_validation_met: bool,
    #[serde(default, deserialize_with = "flexible_bool")]
    data_span_met: bool,
}

pub(crate) fn parse_settings<R: Read>(
    reader: R,
) -> Result<Vec<AthleteRankingSettings>, ImportError> {
    let mut csv_reader = csv_reader(reader);
    let mut settings = Vec::new();

    for row in csv_reader.deserialize::<SettingsRow>() {
        let row = row?;
        settings.push(AthleteRankingSettings {
            athlete_id: AthleteId(row.athlete_id),
            sport: Sport(row.sport.to_ascii_lowercase()),
            tier: row.tier,
            admin_ranking_excluded: row.admin_ranking_excluded,
            gates: EligibilityGates::new(
                row.games_minimum_met,
                row.integrity_threshold_met,
                row.coach_validation_met,
                row.data_span_met,
            ),
        });
    }

    if settings.is_empty() {
        warn!(file = SETTINGS_FILE, "no athlete settings found");
    }

    Ok(settings)
}

fn required_cell<'a, F>(value: Option<&'a str>, err: F) -> Result<&'a str, ImportError>
where
    F: FnOnce() -> ImportError,
{
    value.ok_or_else(err)
}

fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(false),
        Some(value) => parse_bool(value)
            .ok_or_else(|| serde::de::Error::custom(format!("'{value}' is not a boolean"))),
    }
}

pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" => Some(true),
        "false" | "f" | "0" | "no" | "n" => Some(false),
        _ => None,
    }
}

pub(crate) fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// RFC 3339 timestamps, or bare dates read as midnight UTC.
pub(crate) fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    parse_date(trimmed)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sessions_read_extra_columns_as_sub_indexes() {
        let csv = "session_id,athlete_id,sport,session_date,bqi,fqi,player_grade,coach_grade,locked,deleted_at\n\
s-1,ath-1,Baseball,2025-06-01,80,,72,70,false,\n\
s-2,ath-1,baseball,2025-06-02,abc,55,,,true,2025-06-03T08:00:00Z\n";

        let sessions = parse_sessions(csv.as_bytes()).expect("sessions parse");

        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].sport, Sport("baseball".to_string()));
        assert_eq!(sessions[0].sub_indexes.get("bqi"), Some(&80.0));
        assert!(!sessions[0].sub_indexes.contains_key("fqi"));
        assert_eq!(sessions[0].grading_pair(), Some((72.0, 70.0)));
        assert!(!sessions[1].sub_indexes.contains_key("bqi"));
        assert!(sessions[1].locked);
        assert!(sessions[1].is_deleted());
    }

    #[test]
    fn sessions_reject_bad_dates() {
        let csv = "session_id,athlete_id,sport,session_date\ns-1,ath-1,baseball,06/01/2025\n";
        match parse_sessions(csv.as_bytes()) {
            Err(ImportError::InvalidField { field, line, .. }) => {
                assert_eq!(field, "session_date");
                assert_eq!(line, 2);
            }
            other => panic!("expected invalid field, got {other:?}"),
        }
    }

    #[test]
    fn sessions_require_identity_columns() {
        let csv = "athlete_id,sport,session_date\nath-1,baseball,2025-06-01\n";
        assert!(matches!(
            parse_sessions(csv.as_bytes()),
            Err(ImportError::MissingColumn {
                column: "session_id",
                ..
            })
        ));
    }

    #[test]
    fn flags_parse_dates_and_enums() {
        let csv = "flag_id,athlete_id,severity,status,created_at\n\
f-1,ath-1,Critical,pending,2025-06-01T12:00:00Z\n\
f-2,ath-1,info,resolved,2025-05-01\n";

        let flags = parse_flags(csv.as_bytes()).expect("flags parse");
        assert_eq!(flags[0].severity, FlagSeverity::Critical);
        assert!(flags[0].is_pending());
        assert_eq!(flags[1].status, FlagStatus::Resolved);
        assert_eq!(
            flags[1].created_at,
            parse_datetime("2025-05-01T00:00:00Z").expect("valid timestamp")
        );
    }

    #[test]
    fn flags_reject_unknown_severity() {
        let csv = "flag_id,athlete_id,severity,status,created_at\nf-1,ath-1,fatal,pending,2025-06-01\n";
        assert!(matches!(
            parse_flags(csv.as_bytes()),
            Err(ImportError::InvalidField { .. })
        ));
    }

    #[test]
    fn settings_accept_optional_gate_columns() {
        let csv = "athlete_id,sport,tier,admin_ranking_excluded\nath-1,baseball,college_d1,\nath-2,baseball,mlb,yes\n";
        let settings = parse_settings(csv.as_bytes()).expect("settings parse");
        assert_eq!(settings.len(), 2);
        assert!(!settings[0].admin_ranking_excluded);
        assert!(settings[1].admin_ranking_excluded);
        assert!(!settings[0].gates.ranking_eligible);
    }
}
