//! Pace conversion
//!
//! Plans express effort as pace ("6:40" = 6 minutes 40 seconds per plan
//! unit). The platform wants speed targets in meters per second with a
//! tolerance band, so every zone is converted once per plan load.

use std::collections::BTreeMap;

use crate::models::plan::{PlanError, Unit};
use crate::models::Target;

/// Band applied around every pace-zone speed target
pub const DEFAULT_TOLERANCE_PCT: f64 = 5.0;

/// Pace assumed for untargeted steps when estimating duration (9:00 per unit)
const DEFAULT_ESTIMATE_PACE_SECS: f64 = 540.0;

/// ---------------------------------------------------------------------------
/// Conversions
/// ---------------------------------------------------------------------------

/// Parse `"M:SS"` into total seconds per unit.
///
/// Minutes are any non-negative integer, seconds are exactly two digits in
/// 0..=59, and the total must be positive.
pub fn parse_pace(pace: &str) -> Result<u32, PlanError> {
  let invalid = || PlanError::InvalidPaceFormat(pace.to_string());

  let (minutes, seconds) = pace.trim().split_once(':').ok_or_else(invalid)?;

  if minutes.is_empty() || !minutes.chars().all(|c| c.is_ascii_digit()) {
    return Err(invalid());
  }
  if seconds.len() != 2 || !seconds.chars().all(|c| c.is_ascii_digit()) {
    return Err(invalid());
  }

  let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
  let seconds: u32 = seconds.parse().map_err(|_| invalid())?;
  if seconds > 59 {
    return Err(invalid());
  }

  let total = minutes
    .checked_mul(60)
    .and_then(|m| m.checked_add(seconds))
    .ok_or_else(invalid)?;
  if total == 0 {
    return Err(invalid());
  }

  Ok(total)
}

/// Convert a pace string to speed in meters per second
pub fn pace_to_speed(pace: &str, unit: Unit) -> Result<f64, PlanError> {
  let seconds = parse_pace(pace)?;
  Ok(unit.meters() / f64::from(seconds))
}

/// Symmetric band around `speed`: `(speed * (1 - pct/100), speed * (1 + pct/100))`
pub fn speed_range(speed: f64, tolerance_pct: f64) -> (f64, f64) {
  let factor = tolerance_pct / 100.0;
  (speed * (1.0 - factor), speed * (1.0 + factor))
}

/// ---------------------------------------------------------------------------
/// Pace Zones
/// ---------------------------------------------------------------------------

/// Plan pace zones resolved to speeds, keyed by zone name
#[derive(Debug, Clone, PartialEq)]
pub struct PaceZones {
  unit: Unit,
  speeds: BTreeMap<String, f64>,
}

impl PaceZones {
  pub fn resolve(paces: &BTreeMap<String, String>, unit: Unit) -> Result<Self, PlanError> {
    let speeds = paces
      .iter()
      .map(|(name, pace)| Ok((name.clone(), pace_to_speed(pace, unit)?)))
      .collect::<Result<BTreeMap<_, _>, PlanError>>()?;

    Ok(Self { unit, speeds })
  }

  pub fn unit(&self) -> Unit {
    self.unit
  }

  pub fn contains(&self, zone: &str) -> bool {
    self.speeds.contains_key(zone)
  }

  pub fn speed(&self, zone: &str) -> Result<f64, PlanError> {
    self
      .speeds
      .get(zone)
      .copied()
      .ok_or_else(|| PlanError::UnknownPaceZone(zone.to_string()))
  }

  /// Pace-zone target for a named zone, with the default tolerance band
  pub fn target(&self, zone: &str) -> Result<Target, PlanError> {
    let (low, high) = speed_range(self.speed(zone)?, DEFAULT_TOLERANCE_PCT);
    Ok(Target::pace_zone(low, high))
  }

  /// Speed used to estimate untargeted distance steps
  pub fn estimate_speed(&self) -> f64 {
    self.unit.meters() / DEFAULT_ESTIMATE_PACE_SECS
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::assert_approx_eq;
  use crate::models::TargetType;

  #[test]
  fn test_parse_pace() {
    assert_eq!(parse_pace("6:40"), Ok(400));
    assert_eq!(parse_pace("10:05"), Ok(605));
    assert_eq!(parse_pace("0:59"), Ok(59));
    assert_eq!(parse_pace(" 8:30 "), Ok(510));
  }

  #[test]
  fn test_parse_pace_rejects_bad_input() {
    for bad in ["", "640", "6:4", "6:60", "-6:40", "6:40:00", "a:bc", "0:00", ":40", "6:4a"] {
      assert_eq!(
        parse_pace(bad),
        Err(PlanError::InvalidPaceFormat(bad.to_string())),
        "expected {:?} to be rejected",
        bad
      );
    }
  }

  #[test]
  fn test_pace_to_speed_miles() {
    // 1609.34m / 400s
    let speed = pace_to_speed("6:40", Unit::Miles).unwrap();
    assert_approx_eq!(speed, 4.02335, 1e-4);
  }

  #[test]
  fn test_pace_to_speed_kilometers() {
    // 1000m / 300s
    let speed = pace_to_speed("5:00", Unit::Kilometers).unwrap();
    assert_approx_eq!(speed, 3.33333, 1e-4);
  }

  #[test]
  fn test_slower_pace_is_lower_speed() {
    let paces = ["4:59", "5:00", "6:40", "7:02", "8:30", "10:00", "12:15"];
    let speeds: Vec<f64> = paces
      .iter()
      .map(|p| pace_to_speed(p, Unit::Miles).unwrap())
      .collect();

    assert!(speeds.iter().all(|s| *s > 0.0));
    assert!(speeds.windows(2).all(|w| w[0] > w[1]), "speeds not decreasing: {:?}", speeds);
  }

  #[test]
  fn test_speed_range_five_percent() {
    for speed in [0.5, 3.1557, 4.02335, 10.0] {
      let (low, high) = speed_range(speed, DEFAULT_TOLERANCE_PCT);
      assert_approx_eq!(low, speed * 0.95, 1e-12);
      assert_approx_eq!(high, speed * 1.05, 1e-12);
      assert!(low < speed && speed < high);
    }
  }

  #[test]
  fn test_pace_zones_resolve_and_target() {
    let mut paces = BTreeMap::new();
    paces.insert("general_aerobic".to_string(), "8:30".to_string());
    paces.insert("lactate_threshold".to_string(), "6:40".to_string());

    let zones = PaceZones::resolve(&paces, Unit::Miles).unwrap();
    assert!(zones.contains("general_aerobic"));

    let target = zones.target("lactate_threshold").unwrap();
    assert_eq!(target.target_type, TargetType::PaceZone);
    assert_approx_eq!(target.value_one.unwrap(), 4.02335 * 0.95, 1e-4);
    assert_approx_eq!(target.value_two.unwrap(), 4.02335 * 1.05, 1e-4);

    assert_eq!(
      zones.target("vo2max"),
      Err(PlanError::UnknownPaceZone("vo2max".to_string()))
    );
  }

  #[test]
  fn test_pace_zones_reject_bad_pace() {
    let mut paces = BTreeMap::new();
    paces.insert("easy".to_string(), "slow".to_string());

    assert_eq!(
      PaceZones::resolve(&paces, Unit::Miles),
      Err(PlanError::InvalidPaceFormat("slow".to_string()))
    );
  }
}
