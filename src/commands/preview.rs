use std::fmt::Write as _;
use std::path::Path;

use super::{garmin, load_plan};
use crate::garmin::GarminConfig;
use crate::models::plan::TrainingPlan;
use crate::models::RemoteId;
use crate::payload::WorkoutPayload;
use crate::schedule::week_span;
use crate::translate::translate;

/// ---------------------------------------------------------------------------
/// Preview (dry run)
/// ---------------------------------------------------------------------------

/// Print what an upload would send, without signing in
pub fn preview(plan_path: &Path, week: Option<u32>) -> anyhow::Result<bool> {
  let plan = load_plan(plan_path)?;
  print!("{}", render_preview(&plan, week)?);
  Ok(true)
}

/// Each workout's date and wire payload, then a one-line total
pub fn render_preview(plan: &TrainingPlan, week: Option<u32>) -> anyhow::Result<String> {
  let workouts = translate(plan, week)?;
  let mut out = String::new();

  if let Some(week) = week {
    let (monday, sunday) = week_span(plan.goal_event.date, plan.total_weeks(), week)?;
    writeln!(out, "Week {} of {}: {} to {}", week, plan.total_weeks(), monday, sunday)?;
  }

  for workout in &workouts {
    let payload = WorkoutPayload::from(workout);
    writeln!(out, "=== {} ({}) ===", workout.name, workout.date)?;
    writeln!(out, "{}", serde_json::to_string_pretty(&payload)?)?;
  }

  let total_secs: u64 = workouts.iter().map(|w| u64::from(w.estimated_duration_secs)).sum();
  writeln!(out, "{}", summary_line(workouts.len(), total_secs))?;

  Ok(out)
}

fn summary_line(count: usize, total_secs: u64) -> String {
  format!("{} workouts, about {}h{:02}m of running", count, total_secs / 3600, (total_secs % 3600) / 60)
}

/// ---------------------------------------------------------------------------
/// Inspect
/// ---------------------------------------------------------------------------

/// Fetch an uploaded workout and print the platform's copy
pub async fn inspect(config: &GarminConfig, workout_id: RemoteId) -> anyhow::Result<bool> {
  let (_db, client) = garmin::open(config).await?;
  let workout = client.get_workout(workout_id).await?;
  println!("{}", serde_json::to_string_pretty(&workout)?);
  Ok(true)
}
