use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::plan::{Weekday, WorkoutType};

/// Identifier the remote platform assigns to an uploaded workout
pub type RemoteId = i64;

/// ---------------------------------------------------------------------------
/// Steps
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
  Warmup,
  Cooldown,
  Interval,
  Recovery,
  Rest,
}

impl StepType {
  pub fn id(&self) -> u32 {
    match self {
      StepType::Warmup => 1,
      StepType::Cooldown => 2,
      StepType::Interval => 3,
      StepType::Recovery => 4,
      StepType::Rest => 5,
    }
  }

  pub fn key(&self) -> &'static str {
    match self {
      StepType::Warmup => "warmup",
      StepType::Cooldown => "cooldown",
      StepType::Interval => "interval",
      StepType::Recovery => "recovery",
      StepType::Rest => "rest",
    }
  }
}

/// Wire id/key of the repeat-group step type
pub const REPEAT_STEP_TYPE_ID: u32 = 6;
pub const REPEAT_STEP_TYPE_KEY: &str = "repeat";

/// What terminates a step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndCondition {
  LapButton,
  Time { seconds: u32 },
  Distance { meters: f64 },
}

impl EndCondition {
  pub fn id(&self) -> u32 {
    match self {
      EndCondition::LapButton => 1,
      EndCondition::Time { .. } => 2,
      EndCondition::Distance { .. } => 3,
    }
  }

  pub fn key(&self) -> &'static str {
    match self {
      EndCondition::LapButton => "lap.button",
      EndCondition::Time { .. } => "time",
      EndCondition::Distance { .. } => "distance",
    }
  }

  /// Seconds for time, meters for distance, nothing for the lap button
  pub fn value(&self) -> Option<f64> {
    match self {
      EndCondition::LapButton => None,
      EndCondition::Time { seconds } => Some(f64::from(*seconds)),
      EndCondition::Distance { meters } => Some(*meters),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
  None,
  HeartRateZone,
  Cadence,
  HeartRateCustom,
  Speed,
  PaceZone,
  Power,
}

impl TargetType {
  pub fn id(&self) -> u32 {
    match self {
      TargetType::None => 1,
      TargetType::HeartRateZone => 2,
      TargetType::Cadence => 3,
      TargetType::HeartRateCustom => 4,
      TargetType::Speed => 5,
      TargetType::PaceZone => 6,
      TargetType::Power => 7,
    }
  }

  pub fn key(&self) -> &'static str {
    match self {
      TargetType::None => "no.target",
      TargetType::HeartRateZone => "heart.rate.zone",
      TargetType::Cadence => "cadence",
      TargetType::HeartRateCustom => "heart.rate.custom",
      TargetType::Speed => "speed.zone",
      TargetType::PaceZone => "pace.zone",
      TargetType::Power => "power.zone",
    }
  }
}

/// Step target. Pace-zone values are speeds in meters per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Target {
  pub target_type: TargetType,
  pub value_one: Option<f64>,
  pub value_two: Option<f64>,
}

impl Target {
  pub fn none() -> Self {
    Self {
      target_type: TargetType::None,
      value_one: None,
      value_two: None,
    }
  }

  pub fn pace_zone(low: f64, high: f64) -> Self {
    Self {
      target_type: TargetType::PaceZone,
      value_one: Some(low),
      value_two: Some(high),
    }
  }

  /// Midpoint speed of a two-valued target
  pub fn midpoint(&self) -> Option<f64> {
    match (self.value_one, self.value_two) {
      (Some(low), Some(high)) => Some((low + high) / 2.0),
      (Some(only), None) | (None, Some(only)) => Some(only),
      (None, None) => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutableStep {
  pub order: u32,
  pub step_type: StepType,
  pub end_condition: EndCondition,
  pub target: Target,
}

/// A fixed count of nested steps, ordered 1..N inside the group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepeatGroup {
  pub order: u32,
  pub iterations: u32,
  pub steps: Vec<ExecutableStep>,
}

/// One level of nesting only: the platform rejects repeat groups inside repeat groups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
  Executable(ExecutableStep),
  Repeat(RepeatGroup),
}

impl Step {
  pub fn order(&self) -> u32 {
    match self {
      Step::Executable(step) => step.order,
      Step::Repeat(group) => group.order,
    }
  }
}

/// ---------------------------------------------------------------------------
/// Translation Output
/// ---------------------------------------------------------------------------

/// A dated, named workout ready for upload. Has no identity until the
/// remote platform assigns it a [`RemoteId`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedWorkout {
  pub name: String,
  pub description: String,
  pub date: NaiveDate,
  pub week: u32,
  pub weekday: Weekday,
  pub workout_type: WorkoutType,
  pub estimated_duration_secs: u32,
  pub steps: Vec<Step>,
}

/// Workout summary as listed by the remote platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteWorkout {
  pub workout_id: RemoteId,
  #[serde(default)]
  pub workout_name: String,
}
