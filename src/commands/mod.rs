pub mod garmin;
pub mod preview;
pub mod sync;

use anyhow::Context;
use std::path::Path;

use crate::cli::{Cli, Command};
use crate::garmin::{session_db_from_env, GarminConfig};
use crate::models::plan::TrainingPlan;

/// Run one CLI command. `Ok(false)` means it ran but some workouts failed.
pub async fn dispatch(cli: &Cli) -> anyhow::Result<bool> {
  match &cli.command {
    Command::Preview { week } => preview::preview(&cli.plan, *week),
    Command::UploadAll => sync::upload_all(&GarminConfig::from_env()?, &cli.plan).await,
    Command::DeleteAll => sync::delete_all(&GarminConfig::from_env()?, &cli.plan).await,
    Command::UpdateWeek { week } => sync::update_week(&GarminConfig::from_env()?, &cli.plan, *week).await,
    Command::Inspect { workout_id } => preview::inspect(&GarminConfig::from_env()?, *workout_id).await,
    Command::Logout => garmin::logout(&session_db_from_env()?).await,
  }
}

pub(crate) fn load_plan(path: &Path) -> anyhow::Result<TrainingPlan> {
  TrainingPlan::load(path).with_context(|| format!("Failed to load plan {}", path.display()))
}
