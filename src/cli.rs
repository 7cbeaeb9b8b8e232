use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::models::RemoteId;

#[derive(Parser, Debug)]
#[command(name = "plan-sync", version)]
#[command(about = "Upload a YAML marathon training plan to Garmin Connect as scheduled workouts")]
pub struct Cli {
  /// Training plan YAML file
  #[arg(long, global = true, env = "PLAN_SYNC_PLAN", default_value = "plans/training_plan.yaml")]
  pub plan: PathBuf,

  /// Enable debug logging
  #[arg(long, short = 'v', global = true)]
  pub verbose: bool,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
  /// Upload and schedule every workout in the plan
  UploadAll,

  /// Delete every workout of this plan from Garmin Connect
  DeleteAll,

  /// Replace one week's workouts with the current plan contents
  UpdateWeek {
    /// Plan week number (1 = first training week)
    week: u32,
  },

  /// Print the workout payloads without contacting Garmin Connect
  Preview {
    /// Only this week
    #[arg(long)]
    week: Option<u32>,
  },

  /// Fetch one uploaded workout and print it as JSON
  Inspect {
    /// Garmin workout id
    workout_id: RemoteId,
  },

  /// Forget the cached Garmin session
  Logout,
}
