//! Garmin Connect workout wire format
//!
//! The platform is strict about field names and nesting, so the payload is
//! modelled field-for-field rather than serialized from the domain types.
//! Target values sit on the step itself, not inside `targetType`.

use serde::Serialize;

use crate::models::workout::{REPEAT_STEP_TYPE_ID, REPEAT_STEP_TYPE_KEY};
use crate::models::{ExecutableStep, RepeatGroup, ResolvedWorkout, Step};

const RUNNING_SPORT_TYPE_ID: u32 = 1;
const RUNNING_SPORT_TYPE_KEY: &str = "running";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutPayload {
  pub workout_name: String,
  pub description: String,
  pub sport_type: SportType,
  pub estimated_duration_in_secs: u32,
  pub workout_segments: Vec<WorkoutSegment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SportType {
  pub sport_type_id: u32,
  pub sport_type_key: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub display_order: Option<u32>,
}

impl SportType {
  fn running() -> Self {
    Self {
      sport_type_id: RUNNING_SPORT_TYPE_ID,
      sport_type_key: RUNNING_SPORT_TYPE_KEY.to_string(),
      display_order: None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSegment {
  pub segment_order: u32,
  pub sport_type: SportType,
  pub workout_steps: Vec<StepPayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum StepPayload {
  #[serde(rename = "ExecutableStepDTO")]
  Executable(ExecutableStepPayload),
  #[serde(rename = "RepeatGroupDTO")]
  Repeat(RepeatGroupPayload),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepTypePayload {
  pub step_type_id: u32,
  pub step_type_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndConditionPayload {
  pub condition_type_id: u32,
  pub condition_type_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetTypePayload {
  pub workout_target_type_id: u32,
  pub workout_target_type_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutableStepPayload {
  pub step_order: u32,
  pub step_type: StepTypePayload,
  pub end_condition: EndConditionPayload,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub end_condition_value: Option<f64>,
  pub target_type: TargetTypePayload,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub target_value_one: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub target_value_two: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepeatGroupPayload {
  pub step_order: u32,
  pub step_type: StepTypePayload,
  pub number_of_iterations: u32,
  pub workout_steps: Vec<StepPayload>,
}

/// ---------------------------------------------------------------------------
/// Conversion
/// ---------------------------------------------------------------------------

impl From<&ResolvedWorkout> for WorkoutPayload {
  fn from(workout: &ResolvedWorkout) -> Self {
    Self {
      workout_name: workout.name.clone(),
      description: workout.description.clone(),
      sport_type: SportType::running(),
      estimated_duration_in_secs: workout.estimated_duration_secs,
      workout_segments: vec![WorkoutSegment {
        segment_order: 1,
        sport_type: SportType {
          display_order: Some(1),
          ..SportType::running()
        },
        workout_steps: workout.steps.iter().map(StepPayload::from).collect(),
      }],
    }
  }
}

impl From<&Step> for StepPayload {
  fn from(step: &Step) -> Self {
    match step {
      Step::Executable(step) => StepPayload::Executable(step.into()),
      Step::Repeat(group) => StepPayload::Repeat(group.into()),
    }
  }
}

impl From<&ExecutableStep> for ExecutableStepPayload {
  fn from(step: &ExecutableStep) -> Self {
    Self {
      step_order: step.order,
      step_type: StepTypePayload {
        step_type_id: step.step_type.id(),
        step_type_key: step.step_type.key().to_string(),
      },
      end_condition: EndConditionPayload {
        condition_type_id: step.end_condition.id(),
        condition_type_key: step.end_condition.key().to_string(),
      },
      end_condition_value: step.end_condition.value(),
      target_type: TargetTypePayload {
        workout_target_type_id: step.target.target_type.id(),
        workout_target_type_key: step.target.target_type.key().to_string(),
      },
      target_value_one: step.target.value_one,
      target_value_two: step.target.value_two,
    }
  }
}

impl From<&RepeatGroup> for RepeatGroupPayload {
  fn from(group: &RepeatGroup) -> Self {
    Self {
      step_order: group.order,
      step_type: StepTypePayload {
        step_type_id: REPEAT_STEP_TYPE_ID,
        step_type_key: REPEAT_STEP_TYPE_KEY.to_string(),
      },
      number_of_iterations: group.iterations,
      workout_steps: group
        .steps
        .iter()
        .map(|s| StepPayload::Executable(s.into()))
        .collect(),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
