use std::path::Path;
use tracing::info;

use super::{garmin, load_plan};
use crate::garmin::GarminConfig;
use crate::sync::{self, SyncSummary, WeekUpdate};

/// ---------------------------------------------------------------------------
/// Batch Commands
/// ---------------------------------------------------------------------------

pub async fn upload_all(config: &GarminConfig, plan_path: &Path) -> anyhow::Result<bool> {
  let plan = load_plan(plan_path)?;
  let (db, client) = garmin::open(config).await?;

  let summary = sync::upload_all(&client, &plan).await?;
  garmin::update_sync_time(&db).await?;

  report("Upload", &summary);
  Ok(summary.is_success())
}

pub async fn delete_all(config: &GarminConfig, plan_path: &Path) -> anyhow::Result<bool> {
  let plan = load_plan(plan_path)?;
  let (db, client) = garmin::open(config).await?;

  let summary = sync::delete_all(&client, &plan).await?;
  garmin::update_sync_time(&db).await?;

  report("Delete", &summary);
  Ok(summary.is_success())
}

pub async fn update_week(config: &GarminConfig, plan_path: &Path, week: u32) -> anyhow::Result<bool> {
  let plan = load_plan(plan_path)?;
  let (db, client) = garmin::open(config).await?;

  info!(week, "replacing week");
  let update = sync::update_week(&client, &plan, week).await?;
  garmin::update_sync_time(&db).await?;

  report_week(week, &update);
  Ok(update.is_success())
}

/// ---------------------------------------------------------------------------
/// Reporting
/// ---------------------------------------------------------------------------

fn report(operation: &str, summary: &SyncSummary) {
  println!("{}: {}", operation, summary);
}

fn report_week(week: u32, update: &WeekUpdate) {
  println!("Week {} delete: {}", week, update.deleted);
  println!("Week {} upload: {}", week, update.uploaded);
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
