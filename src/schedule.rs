//! Calendar placement
//!
//! Plans count weeks forward (week 1 is the first training week) while the
//! calendar is anchored on race day: the last week ends on the race date and
//! every earlier week sits exactly seven days before the next.

use chrono::{Datelike, Duration, NaiveDate};

use crate::models::plan::{PlanError, Weekday};

/// Calendar date of `weekday` in `week_number` of a `total_weeks` plan.
///
/// `date = race_date - (total_weeks - week_number) * 7 days + (weekday - race_weekday)`
pub fn resolve_date(
  race_date: NaiveDate,
  total_weeks: u32,
  week_number: u32,
  weekday: Weekday,
) -> Result<NaiveDate, PlanError> {
  if week_number < 1 || week_number > total_weeks {
    return Err(PlanError::WeekNumberOutOfRange {
      week: week_number,
      total_weeks,
    });
  }

  let weeks_before_race = i64::from(total_weeks - week_number);
  let race_offset = i64::from(race_date.weekday().num_days_from_monday());
  let day_shift = i64::from(weekday.offset()) - race_offset;

  race_date
    .checked_sub_signed(Duration::weeks(weeks_before_race))
    .and_then(|d| d.checked_add_signed(Duration::days(day_shift)))
    .ok_or_else(|| PlanError::MalformedPlan(format!("date for week {} is out of range", week_number)))
}

/// First and last calendar day (Monday, Sunday) of a plan week
pub fn week_span(
  race_date: NaiveDate,
  total_weeks: u32,
  week_number: u32,
) -> Result<(NaiveDate, NaiveDate), PlanError> {
  Ok((
    resolve_date(race_date, total_weeks, week_number, Weekday::Monday)?,
    resolve_date(race_date, total_weeks, week_number, Weekday::Sunday)?,
  ))
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
