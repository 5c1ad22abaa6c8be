//! Cron expression parsing and evaluation.
//!
//! Supports standard 5-field cron expressions, evaluated in UTC:
//! ```text
//! ┌───────────── minute (0-59)
//! │ ┌───────────── hour (0-23)
//! │ │ ┌───────────── day of month (1-31)
//! │ │ │ ┌───────────── month (1-12 or jan-dec)
//! │ │ │ │ ┌───────────── day of week (0-7 or sun-sat, 0 and 7 = Sunday)
//! │ │ │ │ │
//! * * * * *
//! ```
//!
//! The `@hourly`, `@daily`/`@midnight`, `@weekly`, `@monthly` and
//! `@yearly`/`@annually` shorthands are accepted as well.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Timelike, Utc};
use thiserror::Error;

/// How far `next_after` and `prev_at_or_before` search. Eight years always
/// includes a Feb 29, even across a skipped century leap year.
const SEARCH_HORIZON_DAYS: i64 = 8 * 366;

const MONTH_NAMES: &[&str] = &[
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];
const WEEKDAY_NAMES: &[&str] = &["sun", "mon", "tue", "wed", "thu", "fri", "sat"];

/// Errors that can occur when parsing cron expressions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CronParseError {
    #[error("Invalid cron expression: expected 5 fields, got {0}")]
    InvalidFieldCount(usize),
    #[error("Unknown cron shorthand '{0}'")]
    UnknownShorthand(String),
    #[error("Invalid {field} field '{value}': {reason}")]
    InvalidField {
        field: &'static str,
        value: String,
        reason: String,
    },
    #[error("Value {value} is out of range [{min}, {max}] for {field}")]
    OutOfRange {
        field: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },
    #[error("Invalid range in {field}: {start}-{end}")]
    InvalidRange {
        field: &'static str,
        start: u32,
        end: u32,
    },
    #[error("Invalid step value in {field}: '{step}'")]
    InvalidStep { field: &'static str, step: String },
}

/// A single field in a cron expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronField {
    name: &'static str,
    /// The set of valid values for this field.
    pub values: BTreeSet<u32>,
    min: u32,
    max: u32,
    /// Field started with `*`, which matters for day-of-month/day-of-week matching.
    wildcard: bool,
    names: &'static [&'static str],
    name_offset: u32,
}

impl CronField {
    fn new(name: &'static str, min: u32, max: u32) -> Self {
        Self {
            name,
            values: BTreeSet::new(),
            min,
            max,
            wildcard: false,
            names: &[],
            name_offset: 0,
        }
    }

    fn with_names(mut self, names: &'static [&'static str], offset: u32) -> Self {
        self.names = names;
        self.name_offset = offset;
        self
    }

    fn parse(mut self, expr: &str) -> Result<Self, CronParseError> {
        self.wildcard = expr.starts_with('*');
        for part in expr.split(',') {
            self.parse_part(part)?;
        }
        Ok(self)
    }

    fn parse_part(&mut self, part: &str) -> Result<(), CronParseError> {
        // Step values (e.g., */5, 0-30/5, 10/15)
        let (range_part, step) = match part.split_once('/') {
            Some((range, step_str)) => {
                let step = step_str
                    .parse::<u32>()
                    .ok()
                    .filter(|s| *s > 0)
                    .ok_or_else(|| CronParseError::InvalidStep {
                        field: self.name,
                        step: step_str.to_string(),
                    })?;
                (range, Some(step))
            }
            None => (part, None),
        };

        let (start, end) = if range_part == "*" {
            (self.min, self.max)
        } else if let Some((start, end)) = range_part.split_once('-') {
            let start = self.parse_value(start)?;
            let end = self.parse_value(end)?;
            if start > end {
                return Err(CronParseError::InvalidRange {
                    field: self.name,
                    start,
                    end,
                });
            }
            (start, end)
        } else {
            let value = self.parse_value(range_part)?;
            // "10/15" means every 15 starting at 10
            match step {
                Some(_) => (value, self.max),
                None => (value, value),
            }
        };

        for value in [start, end] {
            if value < self.min || value > self.max {
                return Err(CronParseError::OutOfRange {
                    field: self.name,
                    value,
                    min: self.min,
                    max: self.max,
                });
            }
        }

        self.values
            .extend((start..=end).step_by(step.unwrap_or(1) as usize));
        Ok(())
    }

    fn parse_value(&self, token: &str) -> Result<u32, CronParseError> {
        if let Ok(value) = token.parse::<u32>() {
            return Ok(value);
        }
        let lower = token.to_ascii_lowercase();
        self.names
            .iter()
            .position(|n| *n == lower)
            .map(|idx| idx as u32 + self.name_offset)
            .ok_or_else(|| CronParseError::InvalidField {
                field: self.name,
                value: token.to_string(),
                reason: "expected a number or a name".to_string(),
            })
    }

    /// Check if a value matches this field.
    pub fn matches(&self, value: u32) -> bool {
        self.values.contains(&value)
    }

    /// Get the next matching value >= given value.
    pub fn next(&self, value: u32) -> Option<u32> {
        self.values.range(value..).next().copied()
    }

    /// Get the last matching value <= given value.
    pub fn prev(&self, value: u32) -> Option<u32> {
        self.values.range(..=value).next_back().copied()
    }

    /// Get the first matching value.
    pub fn first(&self) -> Option<u32> {
        self.values.iter().next().copied()
    }
}

/// A parsed cron expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronExpr {
    expr: String,
    pub minute: CronField,
    pub hour: CronField,
    pub day_of_month: CronField,
    pub month: CronField,
    /// Day of week, 0 = Sunday. A 7 in the source is folded into 0.
    pub day_of_week: CronField,
}

impl CronExpr {
    /// Parse a cron expression string.
    pub fn parse(expr: &str) -> Result<Self, CronParseError> {
        let trimmed = expr.trim();
        let expanded = if trimmed.starts_with('@') {
            expand_shorthand(trimmed)?
        } else {
            trimmed
        };

        let parts: Vec<&str> = expanded.split_whitespace().collect();
        let [minute, hour, day_of_month, month, day_of_week] = parts.as_slice() else {
            return Err(CronParseError::InvalidFieldCount(parts.len()));
        };

        let mut day_of_week = CronField::new("day-of-week", 0, 7)
            .with_names(WEEKDAY_NAMES, 0)
            .parse(day_of_week)?;
        if day_of_week.values.remove(&7) {
            day_of_week.values.insert(0);
        }

        Ok(Self {
            expr: trimmed.to_string(),
            minute: CronField::new("minute", 0, 59).parse(minute)?,
            hour: CronField::new("hour", 0, 23).parse(hour)?,
            day_of_month: CronField::new("day-of-month", 1, 31).parse(day_of_month)?,
            month: CronField::new("month", 1, 12)
                .with_names(MONTH_NAMES, 1)
                .parse(month)?,
            day_of_week,
        })
    }

    /// The expression as written.
    pub fn as_str(&self) -> &str {
        &self.expr
    }

    /// Day matching follows cron: when both day fields are restricted,
    /// either one matching is enough.
    fn day_matches(&self, date: NaiveDate) -> bool {
        let dom = self.day_of_month.matches(date.day());
        let dow = self
            .day_of_week
            .matches(date.weekday().num_days_from_sunday());
        if self.day_of_month.wildcard || self.day_of_week.wildcard {
            dom && dow
        } else {
            dom || dow
        }
    }

    /// Check if a datetime matches this cron expression.
    pub fn matches(&self, dt: &DateTime<Utc>) -> bool {
        self.minute.matches(dt.minute())
            && self.hour.matches(dt.hour())
            && self.month.matches(dt.month())
            && self.day_matches(dt.date_naive())
    }

    /// Whether some calendar date can ever match, e.g. `0 0 30 2 *` never does.
    pub fn is_satisfiable(&self) -> bool {
        if !self.day_of_month.wildcard && !self.day_of_week.wildcard {
            return true;
        }
        let Some(first_day) = self.day_of_month.first() else {
            return false;
        };
        self.month
            .values
            .iter()
            .any(|m| first_day <= max_days_in_month(*m))
    }

    /// First fire time strictly after `after`, at minute granularity.
    pub fn next_after(&self, after: &DateTime<Utc>) -> Option<DateTime<Utc>> {
        let truncated = after.naive_utc().with_second(0)?.with_nanosecond(0)?;
        let mut current = truncated + Duration::minutes(1);
        let limit = current + Duration::days(SEARCH_HORIZON_DAYS);

        while current <= limit {
            if !self.month.matches(current.month()) {
                current = start_of_next_month(current)?;
                continue;
            }
            if !self.day_matches(current.date()) {
                current = current.date().succ_opt()?.and_hms_opt(0, 0, 0)?;
                continue;
            }
            if !self.hour.matches(current.hour()) {
                current = next_hour(current)?;
                continue;
            }
            if !self.minute.matches(current.minute()) {
                current = match self.minute.next(current.minute()) {
                    Some(minute) => current.with_minute(minute)?,
                    None => next_hour(current)?,
                };
                continue;
            }
            return Some(current.and_utc());
        }

        None
    }

    /// Last fire time at or before `at`, at minute granularity.
    pub fn prev_at_or_before(&self, at: &DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut current = at.naive_utc().with_second(0)?.with_nanosecond(0)?;
        let limit = current - Duration::days(SEARCH_HORIZON_DAYS);

        while current >= limit {
            if !self.month.matches(current.month()) {
                current = end_of_previous_month(current)?;
                continue;
            }
            if !self.day_matches(current.date()) {
                current = current.date().pred_opt()?.and_hms_opt(23, 59, 0)?;
                continue;
            }
            if !self.hour.matches(current.hour()) {
                current = end_of_previous_hour(current)?;
                continue;
            }
            if !self.minute.matches(current.minute()) {
                current = match self.minute.prev(current.minute()) {
                    Some(minute) => current.with_minute(minute)?,
                    None => end_of_previous_hour(current)?,
                };
                continue;
            }
            return Some(current.and_utc());
        }

        None
    }
}

impl FromStr for CronExpr {
    type Err = CronParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CronExpr::parse(s)
    }
}

impl fmt::Display for CronExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expr)
    }
}

fn expand_shorthand(expr: &str) -> Result<&'static str, CronParseError> {
    match expr.to_ascii_lowercase().as_str() {
        "@yearly" | "@annually" => Ok("0 0 1 1 *"),
        "@monthly" => Ok("0 0 1 * *"),
        "@weekly" => Ok("0 0 * * 0"),
        "@daily" | "@midnight" => Ok("0 0 * * *"),
        "@hourly" => Ok("0 * * * *"),
        _ => Err(CronParseError::UnknownShorthand(expr.to_string())),
    }
}

fn max_days_in_month(month: u32) -> u32 {
    match month {
        2 => 29,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

fn start_of_next_month(dt: NaiveDateTime) -> Option<NaiveDateTime> {
    let (year, month) = if dt.month() == 12 {
        (dt.year() + 1, 1)
    } else {
        (dt.year(), dt.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)
}

fn next_hour(dt: NaiveDateTime) -> Option<NaiveDateTime> {
    Some(dt.date().and_hms_opt(dt.hour(), 0, 0)? + Duration::hours(1))
}

fn end_of_previous_month(dt: NaiveDateTime) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(dt.year(), dt.month(), 1)?
        .pred_opt()?
        .and_hms_opt(23, 59, 0)
}

fn end_of_previous_hour(dt: NaiveDateTime) -> Option<NaiveDateTime> {
    Some(dt.date().and_hms_opt(dt.hour(), 0, 0)? - Duration::minutes(1))
}
