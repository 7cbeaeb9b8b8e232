pub mod plan;
pub mod sync_state;
pub mod workout;

pub use plan::{PlanError, TrainingPlan, Weekday, WorkoutSpec, WorkoutType};
pub use sync_state::SyncState;
pub use workout::{
  EndCondition, ExecutableStep, RemoteId, RemoteWorkout, RepeatGroup, ResolvedWorkout, Step,
  StepType, Target, TargetType,
};
