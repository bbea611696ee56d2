use chrono::{NaiveDate, Utc};
use mpi_ranking::error::AppError;
use mpi_ranking::ranking::{DataDirectory, NightlyRankingJob, RankingPolicy, RunSummary};
use std::sync::Arc;
use tracing::info;

/// Load the data directory, run the nightly job and, unless this is a dry run, write the
/// resulting state back.
pub(crate) async fn run_once(
    data_dir: &DataDirectory,
    policy: &RankingPolicy,
    calculation_date: NaiveDate,
    persist: bool,
) -> Result<RunSummary, AppError> {
    let store = data_dir.load()?;
    let job = NightlyRankingJob::new(Arc::new(store.clone()), policy.clone());
    let summary = job.run(calculation_date, Utc::now()).await?;

    if persist {
        data_dir.save(&store)?;
    } else {
        info!(root = %data_dir.root().display(), "dry run, data directory left untouched");
    }
    Ok(summary)
}
