pub mod builder;
pub mod cli;
pub mod commands;
pub mod db;
pub mod garmin;
pub mod logging;
pub mod models;
pub mod pace;
pub mod payload;
pub mod schedule;
pub mod sync;
pub mod translate;

#[cfg(test)]
mod test_utils;

use clap::Parser;
use std::process::ExitCode;
use tracing::error;

use cli::Cli;

/// Binary entry point: exit code 0 only when every workout operation succeeded
pub async fn run() -> ExitCode {
  // Load environment variables from .env file
  dotenvy::dotenv().ok();

  let cli = Cli::parse();
  logging::init(cli.verbose);

  match commands::dispatch(&cli).await {
    Ok(true) => ExitCode::SUCCESS,
    Ok(false) => ExitCode::FAILURE,
    Err(e) => {
      error!("{:#}", e);
      ExitCode::FAILURE
    }
  }
}
