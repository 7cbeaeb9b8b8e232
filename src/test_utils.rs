//! Test utilities and helpers for unit testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Sample plans and pace zones
//! - A recording fake of the remote workout API

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::SqlitePool;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use crate::garmin::GarminError;
use crate::models::plan::{TrainingPlan, Unit, Weekday, WorkoutSpec, WorkoutType};
use crate::models::{RemoteId, RemoteWorkout};
use crate::pace::PaceZones;
use crate::payload::WorkoutPayload;
use crate::sync::WorkoutApi;

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// ---------------------------------------------------------------------------
/// Plan Fixtures
/// ---------------------------------------------------------------------------

/// Last two weeks of an 18-week marathon plan ending Sunday 2026-11-01
pub const SAMPLE_PLAN_YAML: &str = r#"
goal_event:
  name: "NYC Marathon 2026"
  date: 2026-11-01
  race_type: marathon
  distance: 26.2
  goal_time: "3:10:00"

plan:
  name: "Pfitzinger 18/55"
  duration_weeks: 18
  peak_mileage: 55
  units: miles

paces:
  recovery: "9:45"
  general_aerobic: "8:30"
  endurance: "8:10"
  marathon_pace: "7:15"
  lactate_threshold: "6:40"
  vo2max: "6:05"

weeks:
  - week: 17
    block: Taper
    weeks_to_goal: 1
    workouts:
      monday:
        type: rest
      tuesday:
        type: vo2max
        distance: 8
        description: "5 x 1000m at 5K pace"
        structure:
          warmup: { distance: 2 }
          intervals:
            repeat: 5
            work: { distance: 1000, unit: meters, pace: vo2max }
            rest: { type: jog, duration: "2-3 min" }
          cooldown: { distance: 2 }
      wednesday:
        type: recovery
        distance: 5
      thursday:
        type: general_aerobic
        distance: "8-10"
        description: "Steady aerobic miles"
      friday: ~
      saturday:
        type: marathon_pace
        distance: 9
        description: "6 miles at goal marathon pace"
        structure:
          warmup: { distance: 2 }
          main: { distance: 6, pace: marathon_pace }
          cooldown: { distance: 1 }
      sunday:
        type: long_run
        distance: "12-13"

  - week: 18
    block: Race
    weeks_to_goal: 0
    workouts:
      monday:
        type: rest
        description: "Off"
      tuesday:
        type: lactate_threshold
        distance: "8-9"
        description: "LT run with 20-25 min at threshold"
        structure:
          warmup: { distance: 2, pace: general_aerobic }
          main: { duration: "20-25 min", pace: lactate_threshold }
          cooldown: { distance: 2, pace: general_aerobic }
      wednesday:
        type: recovery
        duration: "30 min"
      thursday:
        type: general_aerobic
        distance: 5
      friday:
        type: rest
      saturday:
        type: recovery
        distance: 3
        description: "Shakeout with strides"
      sunday:
        type: race
        distance: 26.2
        description: "Race day"
"#;

pub fn sample_plan() -> TrainingPlan {
  TrainingPlan::from_yaml_str(SAMPLE_PLAN_YAML).expect("sample plan should load")
}

/// Minimal plan document with one easy Monday per listed week, in the given order
pub fn plan_yaml_with_weeks(weeks: &[u32]) -> String {
  let duration = weeks.iter().copied().max().unwrap_or(1);
  let mut yaml = format!(
    r#"
goal_event: {{ name: "Test Race", date: 2026-11-01 }}
plan: {{ name: "Test Plan", duration_weeks: {} }}
paces: {{ general_aerobic: "8:30" }}
weeks:
"#,
    duration
  );

  for week in weeks {
    yaml.push_str(&format!(
      "  - week: {}\n    block: Base\n    workouts:\n      monday: {{ type: easy, distance: 5 }}\n",
      week
    ));
  }

  yaml
}

/// Plan of `week` weeks whose final week has nothing but rest days
pub fn plan_with_rest_week(week: u32) -> TrainingPlan {
  let numbers: Vec<u32> = (1..=week).collect();
  let mut plan = TrainingPlan::from_yaml_str(&plan_yaml_with_weeks(&numbers)).expect("generated plan should load");

  let rest = WorkoutSpec {
    workout_type: WorkoutType::Rest,
    distance: None,
    duration: None,
    description: Some("Rest".into()),
    structure: None,
  };
  if let Some(last) = plan.weeks.iter_mut().find(|w| w.week == week) {
    last.workouts = Weekday::ALL.iter().map(|day| (*day, Some(rest.clone()))).collect();
  }

  plan
}

/// Zones of the sample plan, in miles
pub fn sample_zones() -> PaceZones {
  PaceZones::resolve(&sample_plan().paces, Unit::Miles).expect("sample paces should resolve")
}

/// Zones from `(name, "M:SS")` pairs, in miles
pub fn zones_from(paces: &[(&str, &str)]) -> PaceZones {
  let paces: BTreeMap<String, String> = paces
    .iter()
    .map(|(name, pace)| (name.to_string(), pace.to_string()))
    .collect();
  PaceZones::resolve(&paces, Unit::Miles).expect("test paces should resolve")
}

/// ---------------------------------------------------------------------------
/// Fake Remote API
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
  Create(String),
  Schedule(RemoteId, NaiveDate),
  Delete(RemoteId),
  List(String),
}

#[derive(Debug, Clone)]
struct StoredWorkout {
  name: String,
  date: Option<NaiveDate>,
}

#[derive(Debug, Default)]
struct MockState {
  next_id: RemoteId,
  remote: BTreeMap<RemoteId, StoredWorkout>,
  calls: Vec<ApiCall>,
  fail_create: HashSet<String>,
  fail_schedule: HashSet<String>,
  fail_delete: HashSet<RemoteId>,
  fail_list: bool,
}

/// In-memory workout library that records every call and fails on demand
#[derive(Debug, Default)]
pub struct MockWorkoutApi {
  state: Mutex<MockState>,
}

fn injected(what: &str) -> GarminError {
  GarminError::Api {
    status: 500,
    message: format!("injected {} failure", what),
  }
}

impl MockWorkoutApi {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn fail_create_for(&self, name: &str) {
    self.state.lock().unwrap().fail_create.insert(name.to_string());
  }

  pub fn fail_schedule_for(&self, name: &str) {
    self.state.lock().unwrap().fail_schedule.insert(name.to_string());
  }

  pub fn fail_delete_for(&self, id: RemoteId) {
    self.state.lock().unwrap().fail_delete.insert(id);
  }

  pub fn fail_list(&self) {
    self.state.lock().unwrap().fail_list = true;
  }

  /// Put an unscheduled workout in the library without recording a call
  pub fn seed(&self, name: &str) -> RemoteId {
    let mut state = self.state.lock().unwrap();
    state.next_id += 1;
    let id = state.next_id;
    state.remote.insert(
      id,
      StoredWorkout {
        name: name.to_string(),
        date: None,
      },
    );
    id
  }

  pub fn calls(&self) -> Vec<ApiCall> {
    self.state.lock().unwrap().calls.clone()
  }

  pub fn remote_count(&self) -> usize {
    self.state.lock().unwrap().remote.len()
  }

  pub fn remote_names(&self) -> Vec<String> {
    self.state.lock().unwrap().remote.values().map(|w| w.name.clone()).collect()
  }

  pub fn remote_names_with_prefix(&self, prefix: &str) -> Vec<String> {
    self
      .remote_names()
      .into_iter()
      .filter(|name| name.starts_with(prefix))
      .collect()
  }

  pub fn id_of(&self, name: &str) -> Option<RemoteId> {
    let state = self.state.lock().unwrap();
    state.remote.iter().find(|(_, w)| w.name == name).map(|(id, _)| *id)
  }

  pub fn scheduled_date(&self, name: &str) -> Option<NaiveDate> {
    let state = self.state.lock().unwrap();
    state.remote.values().find(|w| w.name == name).and_then(|w| w.date)
  }
}

#[async_trait]
impl WorkoutApi for MockWorkoutApi {
  async fn create_workout(&self, payload: &WorkoutPayload) -> Result<RemoteId, GarminError> {
    let mut state = self.state.lock().unwrap();
    state.calls.push(ApiCall::Create(payload.workout_name.clone()));

    if state.fail_create.contains(&payload.workout_name) {
      return Err(injected("create"));
    }

    state.next_id += 1;
    let id = state.next_id;
    state.remote.insert(
      id,
      StoredWorkout {
        name: payload.workout_name.clone(),
        date: None,
      },
    );
    Ok(id)
  }

  async fn schedule_workout(&self, id: RemoteId, date: NaiveDate) -> Result<(), GarminError> {
    let mut state = self.state.lock().unwrap();
    state.calls.push(ApiCall::Schedule(id, date));

    let name = state.remote.get(&id).map(|w| w.name.clone()).ok_or(GarminError::Api {
      status: 404,
      message: format!("workout {} not found", id),
    })?;
    if state.fail_schedule.contains(&name) {
      return Err(injected("schedule"));
    }

    if let Some(workout) = state.remote.get_mut(&id) {
      workout.date = Some(date);
    }
    Ok(())
  }

  async fn delete_workout(&self, id: RemoteId) -> Result<(), GarminError> {
    let mut state = self.state.lock().unwrap();
    state.calls.push(ApiCall::Delete(id));

    if state.fail_delete.contains(&id) {
      return Err(injected("delete"));
    }
    state.remote.remove(&id);
    Ok(())
  }

  async fn list_workouts(&self, name_prefix: &str) -> Result<Vec<RemoteWorkout>, GarminError> {
    let mut state = self.state.lock().unwrap();
    state.calls.push(ApiCall::List(name_prefix.to_string()));

    if state.fail_list {
      return Err(injected("list"));
    }

    Ok(
      state
        .remote
        .iter()
        .filter(|(_, w)| w.name.starts_with(name_prefix))
        .map(|(id, w)| RemoteWorkout {
          workout_id: *id,
          workout_name: w.name.clone(),
        })
        .collect(),
    )
  }
}

/// ---------------------------------------------------------------------------
/// Test Macros
/// ---------------------------------------------------------------------------

/// Assert two floats are approximately equal within a tolerance
#[macro_export]
macro_rules! assert_approx_eq {
  ($left:expr, $right:expr, $tolerance:expr) => {{
    let diff = ($left - $right).abs();
    assert!(
      diff < $tolerance,
      "Values not approximately equal: {} vs {} (diff: {}, tolerance: {})",
      $left,
      $right,
      diff,
      $tolerance
    );
  }};
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    let tables: Vec<(String,)> =
      sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table' AND name = 'sync_state'")
        .fetch_all(&pool)
        .await
        .expect("Failed to query tables");

    assert_eq!(tables.len(), 1);

    teardown_test_db(pool).await;
  }

  #[test]
  fn test_plan_factories_load() {
    let plan = sample_plan();
    assert_eq!(plan.weeks.iter().map(|w| w.week).collect::<Vec<_>>(), vec![17, 18]);

    let rest = plan_with_rest_week(5);
    assert_eq!(rest.total_weeks(), 5);
    assert!(rest.weeks[4].workouts.values().flatten().all(WorkoutSpec::is_rest));
    assert!(sample_zones().contains("vo2max"));
  }

  #[tokio::test]
  async fn test_mock_api_round_trip() {
    let api = MockWorkoutApi::new();
    let date = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
    let seeded = api.seed("Race - Week 1 - Wednesday");

    api.schedule_workout(seeded, date).await.unwrap();
    assert_eq!(api.scheduled_date("Race - Week 1 - Wednesday"), Some(date));

    let listed = api.list_workouts("Race - Week 1 - ").await.unwrap();
    assert_eq!(listed.len(), 1);

    api.delete_workout(seeded).await.unwrap();
    // Already gone
    api.delete_workout(seeded).await.unwrap();
    assert_eq!(api.remote_count(), 0);
    assert_eq!(api.calls().len(), 4);
  }
}
