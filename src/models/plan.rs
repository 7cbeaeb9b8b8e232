use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

/// Validation and translation failures. All of them are local and fatal to
/// the translation they occur in; nothing here is retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlanError {
  #[error("Invalid pace format: {0:?} (expected M:SS)")]
  InvalidPaceFormat(String),

  #[error("Week {week} is outside the plan (1..={total_weeks})")]
  WeekNumberOutOfRange { week: u32, total_weeks: u32 },

  #[error("Cannot resolve distance or duration: {0}")]
  UnresolvableDistance(String),

  #[error("Unknown pace zone: {0}")]
  UnknownPaceZone(String),

  #[error("Week {0} not found in plan")]
  WeekNotFound(u32),

  #[error("Malformed plan: {0}")]
  MalformedPlan(String),

  #[error("Failed to read plan file {path}: {message}")]
  Io { path: String, message: String },
}

/// ---------------------------------------------------------------------------
/// Plan Document
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingPlan {
  pub goal_event: GoalEvent,
  pub plan: PlanInfo,
  pub paces: BTreeMap<String, String>,
  pub weeks: Vec<Week>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalEvent {
  pub name: String,
  pub date: NaiveDate,
  #[serde(default)]
  pub race_type: Option<String>,
  #[serde(default)]
  pub distance: Option<DistanceSpec>,
  #[serde(default)]
  pub goal_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanInfo {
  pub name: String,
  pub duration_weeks: u32,
  #[serde(default)]
  pub peak_mileage: Option<f64>,
  #[serde(default)]
  pub units: Unit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Week {
  pub week: u32,
  pub block: String,
  #[serde(default)]
  pub weeks_to_goal: Option<i32>,
  /// Absent days and `null` days are rest days
  #[serde(default)]
  pub workouts: BTreeMap<Weekday, Option<WorkoutSpec>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSpec {
  #[serde(rename = "type")]
  pub workout_type: WorkoutType,
  #[serde(default)]
  pub distance: Option<DistanceSpec>,
  #[serde(default)]
  pub duration: Option<DurationSpec>,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub structure: Option<Structure>,
}

impl WorkoutSpec {
  pub fn is_rest(&self) -> bool {
    self.workout_type == WorkoutType::Rest
  }
}

/// Named sub-blocks of a structured workout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Structure {
  #[serde(default)]
  pub warmup: Option<Block>,
  #[serde(default)]
  pub main: Option<Block>,
  #[serde(default)]
  pub intervals: Option<Intervals>,
  #[serde(default)]
  pub cooldown: Option<Block>,
}

impl Structure {
  pub fn is_empty(&self) -> bool {
    self.warmup.is_none() && self.main.is_none() && self.intervals.is_none() && self.cooldown.is_none()
  }

  /// Repeat structure for the main set, whether declared beside `main` or inside it
  pub fn main_intervals(&self) -> Option<&Intervals> {
    self
      .intervals
      .as_ref()
      .or_else(|| self.main.as_ref().and_then(|m| m.intervals.as_ref()))
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
  #[serde(default)]
  pub distance: Option<DistanceSpec>,
  #[serde(default)]
  pub duration: Option<DurationSpec>,
  #[serde(default)]
  pub pace: Option<String>,
  #[serde(default)]
  pub intervals: Option<Intervals>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intervals {
  pub repeat: u32,
  pub work: IntervalWork,
  #[serde(default)]
  pub rest: Option<IntervalRest>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntervalWork {
  #[serde(default)]
  pub distance: Option<DistanceSpec>,
  #[serde(default)]
  pub duration: Option<DurationSpec>,
  /// Overrides the plan unit for this distance (e.g. `meters` for 800m repeats)
  #[serde(default)]
  pub unit: Option<Unit>,
  #[serde(default)]
  pub pace: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntervalRest {
  #[serde(rename = "type", default)]
  pub kind: RestKind,
  #[serde(default)]
  pub distance: Option<DistanceSpec>,
  #[serde(default)]
  pub duration: Option<DurationSpec>,
  #[serde(default)]
  pub pace: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestKind {
  #[default]
  Jog,
  Stand,
}

/// A distance in plan units: either a number or text such as `"9"` or `"8-9"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DistanceSpec {
  Exact(f64),
  Text(String),
}

/// A duration: bare seconds, or text such as `"20-25 min"`, `"30 sec"`, `"1:30:00"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DurationSpec {
  Seconds(f64),
  Text(String),
}

/// ---------------------------------------------------------------------------
/// Closed Vocabularies
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
  #[default]
  Miles,
  Kilometers,
  Meters,
}

impl Unit {
  pub fn meters(&self) -> f64 {
    match self {
      Unit::Miles => 1609.34,
      Unit::Kilometers => 1000.0,
      Unit::Meters => 1.0,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutType {
  Rest,
  Recovery,
  Easy,
  GeneralAerobic,
  Endurance,
  MediumLongRun,
  LongRun,
  #[serde(alias = "marathon_pace_run")]
  MarathonPace,
  LactateThreshold,
  Tempo,
  #[serde(rename = "vo2max")]
  Vo2Max,
  Interval,
  Race,
}

impl WorkoutType {
  /// Pace zone a plain (unstructured) run of this type is targeted at
  pub fn implied_zone(&self) -> Option<&'static str> {
    match self {
      WorkoutType::Rest => None,
      WorkoutType::Recovery => Some("recovery"),
      WorkoutType::Easy | WorkoutType::GeneralAerobic => Some("general_aerobic"),
      WorkoutType::Endurance | WorkoutType::MediumLongRun | WorkoutType::LongRun => Some("endurance"),
      WorkoutType::MarathonPace | WorkoutType::Race => Some("marathon_pace"),
      WorkoutType::LactateThreshold | WorkoutType::Tempo => Some("lactate_threshold"),
      WorkoutType::Vo2Max | WorkoutType::Interval => Some("vo2max"),
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      WorkoutType::Rest => "rest",
      WorkoutType::Recovery => "recovery",
      WorkoutType::Easy => "easy",
      WorkoutType::GeneralAerobic => "general_aerobic",
      WorkoutType::Endurance => "endurance",
      WorkoutType::MediumLongRun => "medium_long_run",
      WorkoutType::LongRun => "long_run",
      WorkoutType::MarathonPace => "marathon_pace",
      WorkoutType::LactateThreshold => "lactate_threshold",
      WorkoutType::Tempo => "tempo",
      WorkoutType::Vo2Max => "vo2max",
      WorkoutType::Interval => "interval",
      WorkoutType::Race => "race",
    }
  }
}

/// Days of the plan week, ordered Monday first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
  Monday,
  Tuesday,
  Wednesday,
  Thursday,
  Friday,
  Saturday,
  Sunday,
}

impl Weekday {
  pub const ALL: [Weekday; 7] = [
    Weekday::Monday,
    Weekday::Tuesday,
    Weekday::Wednesday,
    Weekday::Thursday,
    Weekday::Friday,
    Weekday::Saturday,
    Weekday::Sunday,
  ];

  /// 0 = Monday .. 6 = Sunday
  pub fn offset(&self) -> u32 {
    *self as u32
  }
}

impl std::fmt::Display for Weekday {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      Weekday::Monday => "Monday",
      Weekday::Tuesday => "Tuesday",
      Weekday::Wednesday => "Wednesday",
      Weekday::Thursday => "Thursday",
      Weekday::Friday => "Friday",
      Weekday::Saturday => "Saturday",
      Weekday::Sunday => "Sunday",
    };
    write!(f, "{}", name)
  }
}

/// ---------------------------------------------------------------------------
/// Loading & Validation
/// ---------------------------------------------------------------------------

impl TrainingPlan {
  /// Read and validate a plan file
  pub fn load(path: &Path) -> Result<Self, PlanError> {
    let text = fs::read_to_string(path).map_err(|e| PlanError::Io {
      path: path.display().to_string(),
      message: e.to_string(),
    })?;
    Self::from_yaml_str(&text)
  }

  /// Parse a YAML plan document. This is the only place the loosely-typed
  /// document is inspected; everything downstream works on the typed plan.
  pub fn from_yaml_str(text: &str) -> Result<Self, PlanError> {
    let mut plan: TrainingPlan =
      serde_yaml::from_str(text).map_err(|e| PlanError::MalformedPlan(e.to_string()))?;
    plan.validate()?;
    plan.weeks.sort_by_key(|w| w.week);
    Ok(plan)
  }

  fn validate(&self) -> Result<(), PlanError> {
    if self.goal_event.name.trim().is_empty() {
      return Err(PlanError::MalformedPlan("goal_event.name is empty".into()));
    }
    if self.plan.duration_weeks == 0 {
      return Err(PlanError::MalformedPlan("plan.duration_weeks must be at least 1".into()));
    }
    if self.weeks.is_empty() {
      return Err(PlanError::MalformedPlan("plan has no weeks".into()));
    }

    let mut seen = BTreeSet::new();
    for week in &self.weeks {
      if week.week == 0 {
        return Err(PlanError::MalformedPlan("week numbers start at 1".into()));
      }
      if !seen.insert(week.week) {
        return Err(PlanError::MalformedPlan(format!("week {} appears more than once", week.week)));
      }
    }

    // BTreeSet iterates ascending, so gaps show up between neighbours
    let numbers: Vec<u32> = seen.into_iter().collect();
    if let Some(pair) = numbers.windows(2).find(|pair| pair[1] != pair[0] + 1) {
      return Err(PlanError::MalformedPlan(format!(
        "week numbers are not contiguous: {} is followed by {}",
        pair[0], pair[1]
      )));
    }

    Ok(())
  }

  pub fn total_weeks(&self) -> u32 {
    self.plan.duration_weeks
  }

  pub fn find_week(&self, number: u32) -> Option<&Week> {
    self.weeks.iter().find(|w| w.week == number)
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
