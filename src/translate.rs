//! Plan translation
//!
//! Walks the plan week by week (Monday to Sunday inside each week) and
//! produces one dated, named [`ResolvedWorkout`] per training day. Pure and
//! deterministic: the same plan always yields the same workouts, which is
//! what makes delete-then-recreate of a week safe.

use tracing::debug;

use crate::builder::{build_steps, estimate_duration};
use crate::models::plan::{PlanError, TrainingPlan, Week, Weekday};
use crate::models::ResolvedWorkout;
use crate::pace::PaceZones;
use crate::schedule::resolve_date;

/// ---------------------------------------------------------------------------
/// Workout Naming
/// ---------------------------------------------------------------------------

/// `"{event} - Week {week} - {Weekday}"`
pub fn workout_name(event_name: &str, week: u32, weekday: Weekday) -> String {
  format!("{} - Week {} - {}", event_name, week, weekday)
}

/// Prefix shared by every workout of the plan
pub fn plan_prefix(event_name: &str) -> String {
  format!("{} - Week ", event_name)
}

/// Prefix shared by every workout of one week. The trailing separator keeps
/// week 1 from matching weeks 10-19.
pub fn week_prefix(event_name: &str, week: u32) -> String {
  format!("{} - Week {} - ", event_name, week)
}

/// ---------------------------------------------------------------------------
/// Translation
/// ---------------------------------------------------------------------------

/// Translate the whole plan, or only `week_filter` when given.
///
/// Rest days and days that build no steps are left out. Output is ordered by
/// week ascending, then Monday to Sunday.
pub fn translate(plan: &TrainingPlan, week_filter: Option<u32>) -> Result<Vec<ResolvedWorkout>, PlanError> {
  let zones = PaceZones::resolve(&plan.paces, plan.plan.units)?;

  let mut weeks: Vec<&Week> = match week_filter {
    Some(number) => vec![plan.find_week(number).ok_or(PlanError::WeekNotFound(number))?],
    None => plan.weeks.iter().collect(),
  };
  weeks.sort_by_key(|w| w.week);

  let mut workouts = Vec::new();
  for week in weeks {
    translate_week(plan, week, &zones, &mut workouts)?;
  }

  Ok(workouts)
}

fn translate_week(
  plan: &TrainingPlan,
  week: &Week,
  zones: &PaceZones,
  out: &mut Vec<ResolvedWorkout>,
) -> Result<(), PlanError> {
  // BTreeMap keys iterate Monday..Sunday
  for (weekday, spec) in &week.workouts {
    let Some(spec) = spec else {
      continue;
    };

    let steps = build_steps(spec, zones)?;
    if steps.is_empty() {
      debug!(week = week.week, day = %weekday, "rest day");
      continue;
    }

    let date = resolve_date(plan.goal_event.date, plan.total_weeks(), week.week, *weekday)?;

    out.push(ResolvedWorkout {
      name: workout_name(&plan.goal_event.name, week.week, *weekday),
      description: spec.description.clone().unwrap_or_default(),
      date,
      week: week.week,
      weekday: *weekday,
      workout_type: spec.workout_type,
      estimated_duration_secs: estimate_duration(&steps, zones.estimate_speed()),
      steps,
    });
  }

  Ok(())
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
