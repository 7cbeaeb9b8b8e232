//! Workout step builder
//!
//! Turns one day's [`WorkoutSpec`] into the ordered step list the platform
//! expects. Structured workouts become warmup / main / cooldown steps (the
//! main set may be a repeat group); plain runs become a single step.
//!
//! Ranges always resolve to their upper bound: "8-9" miles is 9 miles,
//! "20-25 min" is 25 minutes.

use crate::models::plan::{
  Block, DistanceSpec, DurationSpec, IntervalRest, IntervalWork, Intervals, PlanError, RestKind,
  Structure, Unit, WorkoutSpec, WorkoutType,
};
use crate::models::{EndCondition, ExecutableStep, RepeatGroup, Step, StepType, Target};
use crate::pace::PaceZones;

/// Zones used when a block does not name one
const WARMUP_ZONE: &str = "general_aerobic";
const COOLDOWN_ZONE: &str = "general_aerobic";
const MAIN_TIME_ZONE: &str = "lactate_threshold";
const MAIN_DISTANCE_ZONE: &str = "marathon_pace";
const WORK_ZONE: &str = "vo2max";

/// Recovery jog length when a rest block gives none
const DEFAULT_REST_SECS: u32 = 150;

/// ---------------------------------------------------------------------------
/// Distance & Duration Parsing
/// ---------------------------------------------------------------------------

/// Resolve a distance in plan units; ranges `"a-b"` resolve to `b`
pub fn resolve_distance(distance: &DistanceSpec) -> Result<f64, PlanError> {
  let value = match distance {
    DistanceSpec::Exact(value) => *value,
    DistanceSpec::Text(text) => {
      let unresolvable = || PlanError::UnresolvableDistance(format!("distance {:?}", text));
      match text.split_once('-') {
        Some((low, high)) => {
          low.trim().parse::<f64>().map_err(|_| unresolvable())?;
          high.trim().parse::<f64>().map_err(|_| unresolvable())?
        }
        None => text.trim().parse::<f64>().map_err(|_| unresolvable())?,
      }
    }
  };

  if !value.is_finite() || value <= 0.0 {
    return Err(PlanError::UnresolvableDistance(format!("distance {}", value)));
  }
  Ok(value)
}

/// Parse a duration into whole seconds.
///
/// Accepts bare seconds, `"N min"`, `"N sec"`, `"H:MM:SS"`, `"MM:SS"`, and
/// ranges like `"20-25 min"`.
pub fn parse_duration(duration: &DurationSpec) -> Result<u32, PlanError> {
  let seconds = match duration {
    DurationSpec::Seconds(value) => *value,
    DurationSpec::Text(text) => parse_duration_text(text)
      .ok_or_else(|| PlanError::UnresolvableDistance(format!("duration {:?}", text)))?,
  };

  if !seconds.is_finite() || seconds <= 0.0 || seconds > f64::from(u32::MAX) {
    return Err(PlanError::UnresolvableDistance(format!("duration {} seconds", seconds)));
  }
  Ok(seconds.round() as u32)
}

fn parse_duration_text(text: &str) -> Option<f64> {
  let text = text.trim().to_lowercase();

  // Both sides of a range must be durations; the upper bound is used
  match text.split_once('-') {
    Some((low, high)) => {
      let low = parse_single_duration(low.trim())?;
      if !low.is_finite() || low < 0.0 {
        return None;
      }
      parse_single_duration(high.trim())
    }
    None => parse_single_duration(&text),
  }
}

fn parse_single_duration(text: &str) -> Option<f64> {
  if let Some(minutes) = strip_unit(text, &["minutes", "minute", "mins", "min"]) {
    return minutes.parse::<f64>().ok().map(|m| m * 60.0);
  }
  if let Some(seconds) = strip_unit(text, &["seconds", "second", "secs", "sec"]) {
    return seconds.parse::<f64>().ok();
  }

  if text.contains(':') {
    let parts: Vec<f64> = text
      .split(':')
      .map(|p| p.trim().parse::<u32>().ok().map(f64::from))
      .collect::<Option<Vec<_>>>()?;
    // Out-of-range totals are rejected by the caller
    return match parts.as_slice() {
      [h, m, s] => Some(h * 3600.0 + m * 60.0 + s),
      [m, s] => Some(m * 60.0 + s),
      _ => None,
    };
  }

  text.parse::<f64>().ok()
}

fn strip_unit<'a>(text: &'a str, suffixes: &[&str]) -> Option<&'a str> {
  suffixes
    .iter()
    .find_map(|suffix| text.strip_suffix(suffix))
    .map(str::trim)
}

/// ---------------------------------------------------------------------------
/// Step Building
/// ---------------------------------------------------------------------------

/// Build the ordered steps for one day's workout.
///
/// Rest days yield no steps; the caller skips them.
pub fn build_steps(spec: &WorkoutSpec, zones: &PaceZones) -> Result<Vec<Step>, PlanError> {
  if spec.is_rest() {
    return Ok(Vec::new());
  }

  // A malformed top-level distance fails even when the structure drives the steps
  if let Some(distance) = &spec.distance {
    resolve_distance(distance)?;
  }

  match &spec.structure {
    Some(structure) if !structure.is_empty() => build_structured(structure, zones),
    _ => build_simple(spec, zones).map(|step| vec![Step::Executable(step)]),
  }
}

fn build_structured(structure: &Structure, zones: &PaceZones) -> Result<Vec<Step>, PlanError> {
  let unit = zones.unit();
  let mut steps = Vec::new();

  if let Some(warmup) = &structure.warmup {
    steps.push(Step::Executable(block_step(
      next_order(&steps),
      StepType::Warmup,
      warmup,
      WARMUP_ZONE,
      WARMUP_ZONE,
      unit,
      zones,
    )?));
  }

  if let Some(intervals) = structure.main_intervals() {
    steps.push(Step::Repeat(repeat_group(next_order(&steps), intervals, zones)?));
  } else if let Some(main) = &structure.main {
    steps.push(Step::Executable(block_step(
      next_order(&steps),
      StepType::Interval,
      main,
      MAIN_DISTANCE_ZONE,
      MAIN_TIME_ZONE,
      unit,
      zones,
    )?));
  }

  if let Some(cooldown) = &structure.cooldown {
    steps.push(Step::Executable(block_step(
      next_order(&steps),
      StepType::Cooldown,
      cooldown,
      COOLDOWN_ZONE,
      COOLDOWN_ZONE,
      unit,
      zones,
    )?));
  }

  Ok(steps)
}

fn next_order(steps: &[Step]) -> u32 {
  steps.len() as u32 + 1
}

/// Single executable step for a block. The default zone depends on whether
/// the block ends on distance or on time.
fn block_step(
  order: u32,
  step_type: StepType,
  block: &Block,
  distance_zone: &str,
  time_zone: &str,
  unit: Unit,
  zones: &PaceZones,
) -> Result<ExecutableStep, PlanError> {
  let end_condition = end_condition(
    block.distance.as_ref(),
    block.duration.as_ref(),
    unit,
    step_type.key(),
  )?;

  let default_zone = match end_condition {
    EndCondition::Time { .. } => time_zone,
    _ => distance_zone,
  };
  let zone = block.pace.as_deref().unwrap_or(default_zone);

  Ok(ExecutableStep {
    order,
    step_type,
    end_condition,
    target: zones.target(zone)?,
  })
}

fn repeat_group(order: u32, intervals: &Intervals, zones: &PaceZones) -> Result<RepeatGroup, PlanError> {
  if intervals.repeat == 0 {
    return Err(PlanError::MalformedPlan("interval repeat count must be at least 1".into()));
  }

  let mut steps = vec![work_step(&intervals.work, zones)?];
  if let Some(rest) = &intervals.rest {
    steps.push(rest_step(2, rest, zones)?);
  }

  Ok(RepeatGroup {
    order,
    iterations: intervals.repeat,
    steps,
  })
}

fn work_step(work: &IntervalWork, zones: &PaceZones) -> Result<ExecutableStep, PlanError> {
  let unit = work.unit.unwrap_or(zones.unit());
  let end_condition = end_condition(work.distance.as_ref(), work.duration.as_ref(), unit, "work interval")?;
  let zone = work.pace.as_deref().unwrap_or(WORK_ZONE);

  Ok(ExecutableStep {
    order: 1,
    step_type: StepType::Interval,
    end_condition,
    target: zones.target(zone)?,
  })
}

fn rest_step(order: u32, rest: &IntervalRest, zones: &PaceZones) -> Result<ExecutableStep, PlanError> {
  let end_condition = if rest.distance.is_none() && rest.duration.is_none() {
    EndCondition::Time { seconds: DEFAULT_REST_SECS }
  } else {
    end_condition(rest.distance.as_ref(), rest.duration.as_ref(), zones.unit(), "rest interval")?
  };

  let step_type = match rest.kind {
    RestKind::Jog => StepType::Recovery,
    RestKind::Stand => StepType::Rest,
  };

  let target = match rest.pace.as_deref() {
    Some(zone) => zones.target(zone)?,
    None => Target::none(),
  };

  Ok(ExecutableStep {
    order,
    step_type,
    end_condition,
    target,
  })
}

/// Unstructured run: one step over the whole distance (or duration)
fn build_simple(spec: &WorkoutSpec, zones: &PaceZones) -> Result<ExecutableStep, PlanError> {
  let end_condition = end_condition(
    spec.distance.as_ref(),
    spec.duration.as_ref(),
    zones.unit(),
    spec.workout_type.as_str(),
  )?;

  let step_type = match spec.workout_type {
    WorkoutType::Recovery => StepType::Recovery,
    _ => StepType::Interval,
  };

  // Implied zones are a convenience; a plan without that zone just gets no target
  let target = match spec.workout_type.implied_zone() {
    Some(zone) if zones.contains(zone) => zones.target(zone)?,
    _ => Target::none(),
  };

  Ok(ExecutableStep {
    order: 1,
    step_type,
    end_condition,
    target,
  })
}

/// Distance wins over duration when a block gives both
fn end_condition(
  distance: Option<&DistanceSpec>,
  duration: Option<&DurationSpec>,
  unit: Unit,
  what: &str,
) -> Result<EndCondition, PlanError> {
  match (distance, duration) {
    (Some(distance), _) => Ok(EndCondition::Distance {
      meters: resolve_distance(distance)? * unit.meters(),
    }),
    (None, Some(duration)) => Ok(EndCondition::Time {
      seconds: parse_duration(duration)?,
    }),
    (None, None) => Err(PlanError::UnresolvableDistance(format!(
      "{} has neither distance nor duration",
      what
    ))),
  }
}

/// ---------------------------------------------------------------------------
/// Duration Estimate
/// ---------------------------------------------------------------------------

/// Rough workout length in seconds: time steps count as-is, distance steps
/// are divided by their target's midpoint speed (or `fallback_speed`).
pub fn estimate_duration(steps: &[Step], fallback_speed: f64) -> u32 {
  let total: f64 = steps
    .iter()
    .map(|step| match step {
      Step::Executable(step) => step_seconds(step, fallback_speed),
      Step::Repeat(group) => {
        let once: f64 = group.steps.iter().map(|s| step_seconds(s, fallback_speed)).sum();
        once * f64::from(group.iterations)
      }
    })
    .sum();

  total.round() as u32
}

fn step_seconds(step: &ExecutableStep, fallback_speed: f64) -> f64 {
  match step.end_condition {
    EndCondition::Time { seconds } => f64::from(seconds),
    EndCondition::Distance { meters } => {
      let speed = step
        .target
        .midpoint()
        .filter(|s| *s > 0.0)
        .unwrap_or(fallback_speed);
      meters / speed
    }
    EndCondition::LapButton => 0.0,
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
