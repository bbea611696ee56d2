use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use mpi_ranking::error::AppError;
use mpi_ranking::ranking::{DataDirectory, RankingPolicy, RunSummary};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) runs: RunRegistry,
}

/// Tracks the single run allowed at a time and the summary of the last finished one.
#[derive(Clone)]
pub(crate) struct RunRegistry {
    pub(crate) data_dir: DataDirectory,
    pub(crate) policy: Arc<RankingPolicy>,
    in_progress: Arc<AtomicBool>,
    latest: Arc<RwLock<Option<RunSummary>>>,
}

impl RunRegistry {
    pub(crate) fn new(data_dir: DataDirectory, policy: RankingPolicy) -> Self {
        Self {
            data_dir,
            policy: Arc::new(policy),
            in_progress: Arc::new(AtomicBool::new(false)),
            latest: Arc::new(RwLock::new(None)),
        }
    }

    /// Claim the run slot; the returned guard releases it when dropped.
    pub(crate) fn begin(&self) -> Result<RunGuard, AppError> {
        self.in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AppError::RunInProgress)?;
        Ok(RunGuard {
            flag: Arc::clone(&self.in_progress),
        })
    }

    pub(crate) async fn record(&self, summary: RunSummary) {
        *self.latest.write().await = Some(summary);
    }

    pub(crate) async fn latest(&self) -> Option<RunSummary> {
        self.latest.read().await.clone()
    }
}

pub(crate) struct RunGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn deserialize_optional_date<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.map(|value| parse_date(&value).map_err(serde::de::Error::custom))
        .transpose()
}
