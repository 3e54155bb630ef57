//! # Cron cursor: successive fire instants of one expression.
//!
//! Parsing and calendar arithmetic are delegated to the [`cron`] crate. This module
//! only normalises the accepted syntax and keeps the cursor position.
//!
//! ## Accepted syntax
//! ```text
//! 5 fields  min hour dom month dow          standard crontab (dow 0-7, 0/7 = Sunday)
//! 6 fields  sec min hour dom month dow      cron crate syntax (dow 1-7, 1 = Sunday)
//! 7 fields  sec min hour dom month dow year
//! @hourly, @daily, ...                       macros understood by the cron crate
//! ```
//!
//! ## Rules
//! - Instants are strictly increasing: each one is computed *after* the previous.
//! - The cursor never looks back; instants that already passed are not replayed.

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;

use crate::error::SchedulerError;

/// Parses a cron expression, accepting standard 5-field crontab lines.
pub(crate) fn parse(expression: &str) -> Result<Schedule, SchedulerError> {
    let invalid = |reason: String| SchedulerError::InvalidExpression {
        expression: expression.to_string(),
        reason,
    };
    let normalized = normalize(expression).map_err(invalid)?;
    Schedule::from_str(&normalized).map_err(|e| invalid(e.to_string()))
}

/// Rewrites a 5-field crontab line into the cron crate's 6-field form.
///
/// Prepends a zero seconds field and shifts numeric weekdays from crontab
/// numbering (0-7, Sunday = 0 or 7) to the crate's (1-7, Sunday = 1).
fn normalize(expression: &str) -> Result<String, String> {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    if fields.len() != 5 {
        return Ok(expression.trim().to_string());
    }
    let dow = shift_weekdays(fields[4])?;
    Ok(format!(
        "0 {} {} {} {} {}",
        fields[0], fields[1], fields[2], fields[3], dow
    ))
}

fn shift_weekdays(field: &str) -> Result<String, String> {
    let items = field
        .split(',')
        .map(shift_weekday_item)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(items.join(","))
}

/// Shifts one comma-separated weekday item.
///
/// Numeric items are expanded into an explicit day list, so that a range or
/// step touching Sunday as 7 wraps to the crate's 1. Names and `*` pass through.
fn shift_weekday_item(item: &str) -> Result<String, String> {
    let (range, step) = match item.split_once('/') {
        Some((range, step)) => (range, Some(step)),
        None => (item, None),
    };
    let bounds = match range.split_once('-') {
        Some((lo, hi)) => match (lo.parse::<u8>(), hi.parse::<u8>()) {
            (Ok(lo), Ok(hi)) => Some((lo, hi)),
            _ => None,
        },
        // "N/S" runs from N to the end of the week.
        None => range
            .parse::<u8>()
            .ok()
            .map(|day| (day, if step.is_some() { 7 } else { day })),
    };
    let Some((lo, hi)) = bounds else {
        return Ok(item.to_string());
    };
    if lo > 7 || hi > 7 {
        return Err(format!("weekday `{item}` out of range 0-7"));
    }
    if lo > hi {
        return Err(format!("weekday range `{range}` is descending"));
    }
    let step = match step {
        Some(step) => match step.parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ => return Err(format!("invalid weekday step in `{item}`")),
        },
        None => 1,
    };

    let days: BTreeSet<u8> = (lo..=hi).step_by(step).map(|day| day % 7 + 1).collect();
    Ok(days
        .iter()
        .map(u8::to_string)
        .collect::<Vec<_>>()
        .join(","))
}

/// Monotonically advancing sequence of fire instants.
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use cronvisor::CronCursor;
///
/// let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let mut cursor = CronCursor::parse("*/15 * * * *", t0).unwrap();
/// assert_eq!(cursor.next(), Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 15, 0).unwrap()));
/// assert_eq!(cursor.next(), Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 30, 0).unwrap()));
/// ```
#[derive(Clone, Debug)]
pub struct CronCursor {
    schedule: Schedule,
    position: DateTime<Utc>,
}

impl CronCursor {
    /// Creates a cursor yielding instants strictly after `start`.
    pub fn new(schedule: Schedule, start: DateTime<Utc>) -> Self {
        Self {
            schedule,
            position: start,
        }
    }

    /// Parses `expression` and creates a cursor starting at `start`.
    pub fn parse(expression: &str, start: DateTime<Utc>) -> Result<Self, SchedulerError> {
        Ok(Self::new(parse(expression)?, start))
    }

    /// Last yielded instant (or the start point if nothing was yielded yet).
    pub fn position(&self) -> DateTime<Utc> {
        self.position
    }

    /// Moves the cursor forward so that the next instant is strictly after `at`.
    ///
    /// Never moves backwards. Used to coalesce instants missed while the caller was late.
    pub fn skip_past(&mut self, at: DateTime<Utc>) {
        if at > self.position {
            self.position = at;
        }
    }
}

impl Iterator for CronCursor {
    type Item = DateTime<Utc>;

    /// Returns the next instant, or `None` once the schedule is exhausted.
    fn next(&mut self) -> Option<Self::Item> {
        let next = self.schedule.after(&self.position).next()?;
        self.position = next;
        Some(next)
    }
}
