mod cli;
mod infra;
mod report;
mod routes;
mod runner;
mod server;

use mpi_ranking::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
