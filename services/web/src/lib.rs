mod cli;
mod infra;
mod offline;
mod pages;
mod routes;
mod server;

use conformly::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
