// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron schedules for jobs.
//!
//! Jobs use standard 5-field cron (`min hour dom month dow`, Sunday = 0) or a
//! descriptor such as `@daily`. Six-field expressions with leading seconds are
//! accepted as-is.

use chrono::{DateTime, Duration, Utc};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("schedule interval is required")]
    Empty,
    #[error("cron {expr:?} must have 5 fields (min..dow) or 6 fields (sec..dow)")]
    FieldCount { expr: String },
    #[error("invalid cron {expr:?}: {reason}")]
    Invalid { expr: String, reason: String },
}

const DOW_NAMES: [&str; 8] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT", "SUN"];

/// A parsed, validated cron schedule.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    expr: String,
    inner: cron::Schedule,
}

impl CronSchedule {
    pub fn parse(expr: &str) -> Result<Self, ScheduleError> {
        let trimmed = expr.trim();
        if trimmed.is_empty() {
            return Err(ScheduleError::Empty);
        }
        let normalized = normalize(trimmed)?;
        let inner = cron::Schedule::from_str(&normalized).map_err(|e| ScheduleError::Invalid {
            expr: trimmed.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { expr: trimmed.to_string(), inner })
    }

    pub fn expr(&self) -> &str {
        &self.expr
    }

    /// First instant strictly after `t`.
    pub fn next_after(&self, t: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.inner.after(&t).next()
    }

    /// Whether `t` is one of the schedule's instants.
    pub fn matches(&self, t: DateTime<Utc>) -> bool {
        self.next_after(t - Duration::seconds(1)) == Some(t)
    }

    /// Every instant in the closed range `[start, end]`, in order.
    pub fn instants_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        if end < start {
            return Vec::new();
        }
        self.inner.after(&(start - Duration::seconds(1))).take_while(|t| *t <= end).collect()
    }
}

impl PartialEq for CronSchedule {
    fn eq(&self, other: &Self) -> bool {
        self.expr == other.expr
    }
}

fn normalize(expr: &str) -> Result<String, ScheduleError> {
    if let Some(descriptor) = expr.strip_prefix('@') {
        let six = match descriptor {
            "yearly" | "annually" => "0 0 0 1 1 *",
            "monthly" => "0 0 0 1 * *",
            "weekly" => "0 0 0 * * SUN",
            "daily" | "midnight" => "0 0 0 * * *",
            "hourly" => "0 0 * * * *",
            _ => {
                return Err(ScheduleError::Invalid {
                    expr: expr.to_string(),
                    reason: format!("unknown descriptor @{descriptor}"),
                })
            }
        };
        return Ok(six.to_string());
    }

    let fields: Vec<&str> = expr.split_whitespace().collect();
    match fields.len() {
        5 => {
            let dow = dow_to_names(fields[4]);
            Ok(format!("0 {} {} {} {} {}", fields[0], fields[1], fields[2], fields[3], dow))
        }
        6 => Ok(expr.to_string()),
        _ => Err(ScheduleError::FieldCount { expr: expr.to_string() }),
    }
}

/// Rewrite numeric day-of-week tokens (`0`-`7`, Sunday = 0 or 7) as names,
/// since the underlying parser numbers days from 1.
fn dow_to_names(field: &str) -> String {
    field.split(',').map(dow_element).collect::<Vec<_>>().join(",")
}

/// One list element: `n`, `a-b`, either with an optional `/step`.
///
/// A range ending in 7 would read backwards as a range of names
/// (`FRI-SUN`), so it becomes `FRI-SAT` plus `SUN` when the step reaches it.
fn dow_element(element: &str) -> String {
    let (range, step) = match element.split_once('/') {
        Some((range, step)) => (range, Some(step)),
        None => (element, None),
    };
    let suffix = step.map(|s| format!("/{s}")).unwrap_or_default();
    let name = |raw: &str| match raw.parse::<usize>() {
        Ok(n) if n < DOW_NAMES.len() => DOW_NAMES[n].to_string(),
        _ => raw.to_string(),
    };

    let Some((lo, hi)) = range.split_once('-') else {
        return format!("{}{suffix}", name(range));
    };
    match (lo.parse::<usize>(), hi.parse::<usize>()) {
        (Ok(7), Ok(7)) => "SUN".to_string(),
        (Ok(0), Ok(7)) => format!("SUN-SAT{suffix}"),
        (Ok(lo @ 1..=6), Ok(7)) => {
            let stride = step.and_then(|s| s.parse::<usize>().ok()).filter(|n| *n > 0).unwrap_or(1);
            let mut out = if lo == 6 { "SAT".to_string() } else { format!("{}-SAT{suffix}", DOW_NAMES[lo]) };
            if (7 - lo) % stride == 0 {
                out.push_str(",SUN");
            }
            out
        }
        _ => format!("{}-{}{suffix}", name(lo), name(hi)),
    }
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
