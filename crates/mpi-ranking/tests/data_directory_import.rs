use std::fs;
use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use mpi_ranking::ranking::{
    AthleteId, DataDirectory, FlagStatus, ImportError, NightlyRankingJob, RankingPolicy,
    SessionStore, SettingsStore, SnapshotStore, Sport,
};

const SETTINGS: &str = "athlete_id,sport,tier,admin_ranking_excluded\n\
A,Baseball,college_d1,false\n\
X,baseball,mlb,true\n";

const SESSIONS: &str = "session_id,athlete_id,sport,session_date,bqi,fqi,pei,decision,competitive_execution,player_grade,coach_grade,locked,deleted_at\n\
s1,A,baseball,2025-06-29,80,70,60,90,85,,,false,\n\
s2,A,baseball,2025-06-28,60,50,40,70,65,72,64,false,\n\
s3,A,baseball,2025-06-27,100,100,100,100,100,,,false,2025-06-28T09:00:00Z\n";

const FLAGS: &str = "flag_id,athlete_id,severity,status,created_at\n\
f1,A,info,pending,2025-06-01T00:00:00Z\n\
f2,A,warning,pending,2025-06-29\n";

fn calculation_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 30).expect("valid date")
}

fn write_fixture(dir: &std::path::Path) {
    fs::write(dir.join("settings.csv"), SETTINGS).expect("write settings");
    fs::write(dir.join("sessions.csv"), SESSIONS).expect("write sessions");
    fs::write(dir.join("flags.csv"), FLAGS).expect("write flags");
}

#[test]
fn load_reads_every_table() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_fixture(dir.path());

    let store = DataDirectory::new(dir.path()).load().expect("fixture loads");
    let sport = Sport("baseball".to_string());

    let sessions = store
        .sessions_for(&AthleteId("A".to_string()), &sport)
        .expect("sessions readable");
    assert_eq!(sessions.len(), 3);
    assert_eq!(sessions.iter().filter(|session| session.is_deleted()).count(), 1);
    let graded = sessions
        .iter()
        .find(|session| session.session_id == "s2")
        .expect("s2 present");
    assert_eq!(graded.grading_pair(), Some((72.0, 64.0)));
    assert_eq!(graded.sub_indexes.get("bqi"), Some(&60.0));

    let page = store
        .settings_page(&sport, None, 10)
        .expect("settings readable");
    assert_eq!(page.len(), 1, "excluded athletes are not paged");
    assert_eq!(store.flags().expect("flags readable").len(), 2);
}

#[test]
fn missing_directory_loads_empty_store() {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = DataDirectory::new(dir.path().join("absent"))
        .load()
        .expect("empty store");
    assert!(store.sports().expect("sports readable").is_empty());
}

#[test]
fn missing_session_column_is_rejected() {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::write(
        dir.path().join("sessions.csv"),
        "session_id,athlete_id,session_date\ns1,A,2025-06-29\n",
    )
    .expect("write sessions");

    match DataDirectory::new(dir.path()).load() {
        Err(ImportError::MissingColumn { column: "sport", .. }) => {}
        other => panic!("expected missing sport column, got {other:?}"),
    }
}

#[test]
fn invalid_flag_severity_is_rejected() {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::write(
        dir.path().join("flags.csv"),
        "flag_id,athlete_id,severity,status,created_at\nf1,A,severe,pending,2025-06-01\n",
    )
    .expect("write flags");

    match DataDirectory::new(dir.path()).load() {
        Err(ImportError::InvalidField { field, line: 2, .. }) if field == "severity" => {}
        other => panic!("expected invalid severity, got {other:?}"),
    }
}

#[tokio::test]
async fn run_and_save_round_trips_state() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_fixture(dir.path());
    let data_dir = DataDirectory::new(dir.path());
    let now = Utc.with_ymd_and_hms(2025, 6, 30, 2, 0, 0).unwrap();

    let store = data_dir.load().expect("fixture loads");
    let job = NightlyRankingJob::new(Arc::new(store.clone()), RankingPolicy::default());
    let summary = job.run(calculation_date(), now).await.expect("run succeeds");
    assert_eq!(summary.flags_resolved, 1);
    assert_eq!(summary.sessions_locked, 2);
    assert_eq!(summary.snapshots_written(), 1);
    data_dir.save(&store).expect("state saved");

    let reloaded = data_dir.load().expect("saved state loads");
    let sport = Sport("baseball".to_string());
    let snapshots = reloaded
        .snapshots_for(&sport, calculation_date())
        .expect("snapshots readable");
    let original = store.snapshots().expect("snapshots readable");
    assert_eq!(snapshots.len(), original.len());
    for (loaded, written) in snapshots.iter().zip(&original) {
        assert_eq!(loaded.key(), written.key());
        assert_eq!(loaded.global_rank, written.global_rank);
        assert!((loaded.adjusted_score - written.adjusted_score).abs() < 1e-9);
    }

    let sessions = reloaded.sessions().expect("sessions readable");
    assert!(sessions
        .iter()
        .filter(|session| !session.is_deleted())
        .all(|session| session.locked));
    let resolved = reloaded
        .flags()
        .expect("flags readable")
        .into_iter()
        .filter(|flag| flag.status == FlagStatus::Resolved)
        .count();
    assert_eq!(resolved, 1);

    let rerun = NightlyRankingJob::new(Arc::new(reloaded), RankingPolicy::default())
        .run(calculation_date(), now)
        .await
        .expect("rerun succeeds");
    assert_eq!(rerun.snapshots_written(), 0);
    assert_eq!(rerun.conflict_count(), 1);
}

#[tokio::test]
async fn non_numeric_grades_do_not_break_saved_snapshots() {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::write(dir.path().join("settings.csv"), "athlete_id,sport,tier\nA,baseball,juco\n")
        .expect("write settings");
    fs::write(
        dir.path().join("sessions.csv"),
        "session_id,athlete_id,sport,session_date,player_grade,coach_grade,bqi\n\
s1,A,baseball,2025-06-29,NaN,70,80\n\
s2,A,baseball,2025-06-28,inf,70,80\n",
    )
    .expect("write sessions");
    let data_dir = DataDirectory::new(dir.path());
    let now = Utc.with_ymd_and_hms(2025, 6, 30, 2, 0, 0).unwrap();

    let store = data_dir.load().expect("fixture loads");
    let summary = NightlyRankingJob::new(Arc::new(store.clone()), RankingPolicy::default())
        .run(calculation_date(), now)
        .await
        .expect("run succeeds");
    assert_eq!(summary.snapshots_written(), 1);
    data_dir.save(&store).expect("state saved");

    let reloaded = data_dir.load().expect("saved state loads");
    let snapshots = reloaded
        .snapshots_for(&Sport("baseball".to_string()), calculation_date())
        .expect("snapshots readable");
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].grading_delta, 0.0);
    assert!(snapshots[0].adjusted_score.is_finite());
}
