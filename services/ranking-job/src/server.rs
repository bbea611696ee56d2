use crate::cli::ServeArgs;
use crate::infra::{AppState, RunRegistry};
use crate::routes::admin_router;
use axum_prometheus::PrometheusMetricLayer;
use mpi_ranking::config::AppConfig;
use mpi_ranking::error::AppError;
use mpi_ranking::ranking::DataDirectory;
use mpi_ranking::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        runs: RunRegistry::new(
            DataDirectory::new(config.ranking.data_dir.clone()),
            config.ranking.policy.clone(),
        ),
    };

    let app = admin_router(app_state).layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        data_dir = %config.ranking.data_dir.display(),
        "ranking admin service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
