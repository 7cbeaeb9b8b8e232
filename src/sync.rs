//! Sync orchestration
//!
//! Batch operations against the remote workout library. Per-workout remote
//! failures are collected into a [`SyncSummary`] instead of aborting the batch;
//! a workout whose creation failed is never scheduled.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::fmt;
use tracing::{error, info, warn};

use crate::garmin::GarminError;
use crate::models::plan::{PlanError, TrainingPlan};
use crate::models::{RemoteId, RemoteWorkout, ResolvedWorkout};
use crate::payload::WorkoutPayload;
use crate::translate::{plan_prefix, translate, week_prefix};

/// ---------------------------------------------------------------------------
/// Remote Workout API
/// ---------------------------------------------------------------------------

/// Operations the orchestrator needs from the remote platform
#[async_trait]
pub trait WorkoutApi: Send + Sync {
  /// Create a workout in the library, returning its remote id
  async fn create_workout(&self, payload: &WorkoutPayload) -> Result<RemoteId, GarminError>;

  /// Put an existing workout on the calendar
  async fn schedule_workout(&self, id: RemoteId, date: NaiveDate) -> Result<(), GarminError>;

  /// Remove a workout. Deleting an id that no longer exists is not an error.
  async fn delete_workout(&self, id: RemoteId) -> Result<(), GarminError>;

  /// Library workouts whose name starts with `name_prefix`
  async fn list_workouts(&self, name_prefix: &str) -> Result<Vec<RemoteWorkout>, GarminError>;
}

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyncError {
  #[error(transparent)]
  Plan(#[from] PlanError),

  #[error("Failed to create workout: {0}")]
  RemoteCreateFailed(String),

  #[error("Failed to schedule workout: {0}")]
  RemoteScheduleFailed(String),

  #[error("Failed to delete workout: {0}")]
  RemoteDeleteFailed(String),

  #[error("Failed to list workouts: {0}")]
  RemoteListFailed(String),
}

/// ---------------------------------------------------------------------------
/// Batch Summary
/// ---------------------------------------------------------------------------

/// One workout that did not make it, with enough context to redo it by hand
#[derive(Debug, Clone, PartialEq)]
pub struct SyncFailure {
  pub name: String,
  pub date: Option<NaiveDate>,
  pub error: SyncError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncSummary {
  pub succeeded: Vec<String>,
  pub failed: Vec<SyncFailure>,
}

impl SyncSummary {
  pub fn is_success(&self) -> bool {
    self.failed.is_empty()
  }

  pub fn failed_names(&self) -> Vec<&str> {
    self.failed.iter().map(|f| f.name.as_str()).collect()
  }

  fn fail(&mut self, name: &str, date: Option<NaiveDate>, error: SyncError) {
    match date {
      Some(date) => error!(workout = name, %date, "{}", error),
      None => error!(workout = name, "{}", error),
    }
    self.failed.push(SyncFailure {
      name: name.to_string(),
      date,
      error,
    });
  }
}

impl fmt::Display for SyncSummary {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} succeeded, {} failed", self.succeeded.len(), self.failed.len())?;
    for failure in &self.failed {
      write!(f, "\n  - {}", failure.name)?;
      if let Some(date) = failure.date {
        write!(f, " ({})", date)?;
      }
      write!(f, ": {}", failure.error)?;
    }
    Ok(())
  }
}

/// Outcome of replacing one week: the removal pass and the re-upload pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeekUpdate {
  pub deleted: SyncSummary,
  pub uploaded: SyncSummary,
}

impl WeekUpdate {
  pub fn is_success(&self) -> bool {
    self.deleted.is_success() && self.uploaded.is_success()
  }
}

/// ---------------------------------------------------------------------------
/// Operations
/// ---------------------------------------------------------------------------

/// Create then schedule each workout, in order
pub async fn upload_workouts(api: &dyn WorkoutApi, workouts: &[ResolvedWorkout]) -> SyncSummary {
  let mut summary = SyncSummary::default();

  for workout in workouts {
    let payload = WorkoutPayload::from(workout);

    let id = match api.create_workout(&payload).await {
      Ok(id) => id,
      Err(e) => {
        summary.fail(&workout.name, Some(workout.date), SyncError::RemoteCreateFailed(e.to_string()));
        continue;
      }
    };

    if let Err(e) = api.schedule_workout(id, workout.date).await {
      summary.fail(&workout.name, Some(workout.date), SyncError::RemoteScheduleFailed(e.to_string()));
      continue;
    }

    info!(workout = %workout.name, date = %workout.date, workout_id = id, "uploaded and scheduled");
    summary.succeeded.push(workout.name.clone());
  }

  summary
}

/// Translate the whole plan and upload every workout
pub async fn upload_all(api: &dyn WorkoutApi, plan: &TrainingPlan) -> Result<SyncSummary, SyncError> {
  let workouts = translate(plan, None)?;
  info!(count = workouts.len(), "uploading plan workouts");
  Ok(upload_workouts(api, &workouts).await)
}

/// Delete every remote workout whose name starts with `name_prefix`.
///
/// Listing failures abort the operation; individual delete failures do not.
pub async fn delete_matching(api: &dyn WorkoutApi, name_prefix: &str) -> Result<SyncSummary, SyncError> {
  let existing = api
    .list_workouts(name_prefix)
    .await
    .map_err(|e| SyncError::RemoteListFailed(e.to_string()))?;

  let mut summary = SyncSummary::default();
  for workout in existing {
    match api.delete_workout(workout.workout_id).await {
      Ok(()) => {
        info!(workout = %workout.workout_name, workout_id = workout.workout_id, "deleted");
        summary.succeeded.push(workout.workout_name);
      }
      Err(e) => summary.fail(&workout.workout_name, None, SyncError::RemoteDeleteFailed(e.to_string())),
    }
  }

  Ok(summary)
}

/// Delete every remote workout that belongs to this plan
pub async fn delete_all(api: &dyn WorkoutApi, plan: &TrainingPlan) -> Result<SyncSummary, SyncError> {
  delete_matching(api, &plan_prefix(&plan.goal_event.name)).await
}

/// Replace one week: delete its remote workouts, then upload it again.
///
/// The week is translated before anything remote is touched, so a bad plan
/// changes nothing. A workout whose old copy could not be deleted is not
/// re-uploaded, which would leave a duplicate behind.
pub async fn update_week(api: &dyn WorkoutApi, plan: &TrainingPlan, week: u32) -> Result<WeekUpdate, SyncError> {
  let workouts = translate(plan, Some(week))?;
  let deleted = delete_matching(api, &week_prefix(&plan.goal_event.name, week)).await?;

  let (to_upload, blocked): (Vec<ResolvedWorkout>, Vec<ResolvedWorkout>) = workouts
    .into_iter()
    .partition(|w| !deleted.failed.iter().any(|f| f.name == w.name));

  let mut uploaded = upload_workouts(api, &to_upload).await;
  for workout in blocked {
    warn!(workout = %workout.name, "old copy still present, not re-uploading");
    uploaded.fail(
      &workout.name,
      Some(workout.date),
      SyncError::RemoteDeleteFailed("previous version could not be removed".into()),
    );
  }

  Ok(WeekUpdate { deleted, uploaded })
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::*;

  fn week_18_names() -> Vec<String> {
    translate(&sample_plan(), Some(18))
      .unwrap()
      .into_iter()
      .map(|w| w.name)
      .collect()
  }

  #[tokio::test]
  async fn test_upload_all_creates_and_schedules_everything() {
    let api = MockWorkoutApi::new();
    let plan = sample_plan();
    let expected = translate(&plan, None).unwrap();

    let summary = upload_all(&api, &plan).await.unwrap();

    assert!(summary.is_success());
    assert_eq!(summary.succeeded.len(), expected.len());
    assert_eq!(api.remote_count(), expected.len());
    for workout in &expected {
      assert_eq!(api.scheduled_date(&workout.name), Some(workout.date), "{}", workout.name);
    }
  }

  #[tokio::test]
  async fn test_create_failure_is_skipped_and_reported() {
    let api = MockWorkoutApi::new();
    api.fail_create_for("NYC Marathon 2026 - Week 18 - Tuesday");
    let plan = sample_plan();
    let total = translate(&plan, None).unwrap().len();

    let summary = upload_all(&api, &plan).await.unwrap();

    assert!(!summary.is_success());
    assert_eq!(summary.succeeded.len(), total - 1);
    assert_eq!(summary.failed_names(), vec!["NYC Marathon 2026 - Week 18 - Tuesday"]);

    let failure = &summary.failed[0];
    assert_eq!(failure.date, NaiveDate::from_ymd_opt(2026, 10, 27));
    assert!(matches!(failure.error, SyncError::RemoteCreateFailed(_)));

    // Nothing was scheduled for the workout that never got an id
    let schedules = api.calls().iter().filter(|c| matches!(c, ApiCall::Schedule(..))).count();
    assert_eq!(schedules, total - 1);
  }

  #[tokio::test]
  async fn test_schedule_failure_is_reported() {
    let api = MockWorkoutApi::new();
    api.fail_schedule_for("NYC Marathon 2026 - Week 17 - Sunday");

    let summary = upload_all(&api, &sample_plan()).await.unwrap();

    assert_eq!(summary.failed.len(), 1);
    assert!(matches!(summary.failed[0].error, SyncError::RemoteScheduleFailed(_)));
    assert_eq!(api.scheduled_date("NYC Marathon 2026 - Week 17 - Sunday"), None);
  }

  #[tokio::test]
  async fn test_upload_all_rejects_bad_plan_before_remote_calls() {
    let api = MockWorkoutApi::new();
    let mut plan = sample_plan();
    plan.paces.insert("vo2max".into(), "fast".into());

    let err = upload_all(&api, &plan).await.unwrap_err();
    assert_eq!(err, SyncError::Plan(PlanError::InvalidPaceFormat("fast".into())));
    assert!(api.calls().is_empty());
  }

  #[tokio::test]
  async fn test_delete_all_only_touches_this_plan() {
    let api = MockWorkoutApi::new();
    api.seed("NYC Marathon 2026 - Week 1 - Monday");
    api.seed("NYC Marathon 2026 - Week 12 - Sunday");
    api.seed("Boston 2027 - Week 1 - Monday");
    api.seed("Strength circuit");

    let summary = delete_all(&api, &sample_plan()).await.unwrap();

    assert!(summary.is_success());
    assert_eq!(summary.succeeded.len(), 2);
    assert_eq!(
      api.remote_names(),
      vec!["Boston 2027 - Week 1 - Monday".to_string(), "Strength circuit".to_string()]
    );
  }

  #[tokio::test]
  async fn test_delete_failure_does_not_stop_batch() {
    let api = MockWorkoutApi::new();
    let stuck = api.seed("NYC Marathon 2026 - Week 2 - Monday");
    api.seed("NYC Marathon 2026 - Week 3 - Monday");
    api.fail_delete_for(stuck);

    let summary = delete_all(&api, &sample_plan()).await.unwrap();

    assert_eq!(summary.succeeded, vec!["NYC Marathon 2026 - Week 3 - Monday".to_string()]);
    assert_eq!(summary.failed_names(), vec!["NYC Marathon 2026 - Week 2 - Monday"]);
    assert!(matches!(summary.failed[0].error, SyncError::RemoteDeleteFailed(_)));
  }

  #[tokio::test]
  async fn test_delete_all_list_failure() {
    let api = MockWorkoutApi::new();
    api.fail_list();

    let err = delete_all(&api, &sample_plan()).await.unwrap_err();
    assert!(matches!(err, SyncError::RemoteListFailed(_)));
  }

  #[tokio::test]
  async fn test_update_week_leaves_no_duplicates() {
    let api = MockWorkoutApi::new();
    let plan = sample_plan();
    upload_all(&api, &plan).await.unwrap();

    let before_week = api.remote_names_with_prefix("NYC Marathon 2026 - Week 18 - ");
    let before_total = api.remote_count();

    let update = update_week(&api, &plan, 18).await.unwrap();

    assert!(update.is_success());
    assert_eq!(update.deleted.succeeded.len(), before_week.len());
    assert_eq!(update.uploaded.succeeded, week_18_names());

    let after_week = api.remote_names_with_prefix("NYC Marathon 2026 - Week 18 - ");
    assert_eq!(after_week.len(), before_week.len());
    assert_eq!(api.remote_count(), before_total);

    // Week 17 was left alone
    let deletes = api.calls().iter().filter(|c| matches!(c, ApiCall::Delete(_))).count();
    assert_eq!(deletes, before_week.len());
  }

  #[tokio::test]
  async fn test_update_week_on_empty_remote_just_uploads() {
    let api = MockWorkoutApi::new();

    let update = update_week(&api, &sample_plan(), 18).await.unwrap();

    assert!(update.deleted.succeeded.is_empty());
    assert_eq!(update.uploaded.succeeded, week_18_names());
  }

  #[tokio::test]
  async fn test_update_week_missing_week_touches_nothing() {
    let api = MockWorkoutApi::new();
    api.seed("NYC Marathon 2026 - Week 3 - Monday");

    let err = update_week(&api, &sample_plan(), 3).await.unwrap_err();

    assert_eq!(err, SyncError::Plan(PlanError::WeekNotFound(3)));
    assert!(api.calls().iter().all(|c| !matches!(c, ApiCall::Delete(_) | ApiCall::List(_))));
    assert_eq!(api.remote_count(), 1);
  }

  #[tokio::test]
  async fn test_update_week_skips_workout_whose_old_copy_remains() {
    let api = MockWorkoutApi::new();
    let plan = sample_plan();
    upload_all(&api, &plan).await.unwrap();

    let tuesday = "NYC Marathon 2026 - Week 18 - Tuesday";
    let stuck = api.id_of(tuesday).expect("uploaded tuesday");
    api.fail_delete_for(stuck);

    let update = update_week(&api, &plan, 18).await.unwrap();

    assert!(!update.is_success());
    assert_eq!(update.deleted.failed_names(), vec![tuesday]);
    assert_eq!(update.uploaded.failed_names(), vec![tuesday]);
    assert_eq!(api.remote_names_with_prefix(tuesday).len(), 1);
  }

  #[tokio::test]
  async fn test_update_week_list_failure_uploads_nothing() {
    let api = MockWorkoutApi::new();
    api.fail_list();

    let err = update_week(&api, &sample_plan(), 18).await.unwrap_err();

    assert!(matches!(err, SyncError::RemoteListFailed(_)));
    assert_eq!(api.remote_count(), 0);
  }

  #[test]
  fn test_summary_display() {
    let summary = SyncSummary {
      succeeded: vec!["A".into(), "B".into()],
      failed: vec![SyncFailure {
        name: "Race - Week 2 - Monday".into(),
        date: NaiveDate::from_ymd_opt(2026, 7, 6),
        error: SyncError::RemoteCreateFailed("HTTP 500".into()),
      }],
    };

    assert_eq!(
      summary.to_string(),
      "2 succeeded, 1 failed\n  - Race - Week 2 - Monday (2026-07-06): Failed to create workout: HTTP 500"
    );
  }
}
