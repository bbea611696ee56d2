use mpi_ranking_job::run;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("ranking job error: {err}");
        std::process::exit(1);
    }
}
