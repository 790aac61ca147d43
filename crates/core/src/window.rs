// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Data windows: which half-open interval `[start, end)` of input data a
//! scheduled run processes.
//!
//! Two algorithms are computed from the same [`WindowSpec`]:
//!
//! - [`Window`] (v2): calendar-correct months, truncation to hour, day,
//!   ISO week (Monday) or month.
//! - [`LegacyWindow`] (v1): fixed-length durations where a month is 30 days,
//!   weekly truncation to the following Sunday and a month-end rule for
//!   monthly windows.

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::span::{Span, SpanError};

/// User-authored window configuration, stored verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpec {
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub offset: String,
    #[serde(default)]
    pub truncate_to: String,
}

impl WindowSpec {
    pub fn new(size: &str, offset: &str, truncate_to: &str) -> Self {
        Self { size: size.to_string(), offset: offset.to_string(), truncate_to: truncate_to.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("invalid window size: {0}")]
    Size(SpanError),
    #[error("invalid window offset: {0}")]
    Offset(SpanError),
    #[error("window size must be positive, got {0:?}")]
    NonPositiveSize(String),
    #[error("invalid truncate_to {0:?}, expected one of h, d, w, M")]
    TruncateTo(String),
    #[error("window falls outside the supported date range")]
    OutOfRange,
}

/// Which window algorithm is authoritative for a caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowVersion {
    V1,
    #[default]
    V2,
}

crate::simple_display! {
    WindowVersion {
        V1 => "v1",
        V2 => "v2",
    }
}

impl FromStr for WindowVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "v1" => Ok(WindowVersion::V1),
            "2" | "v2" => Ok(WindowVersion::V2),
            other => Err(format!("unknown window version {other:?}")),
        }
    }
}

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Truncate {
    None,
    Hour,
    Day,
    Week,
    Month,
}

/// Compiled v2 window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    size: Span,
    offset: Span,
    truncate: Truncate,
}

impl Window {
    pub fn parse(spec: &WindowSpec) -> Result<Self, WindowError> {
        let size = Span::parse(&spec.size).map_err(WindowError::Size)?;
        if size.is_negative() || size.is_zero() {
            return Err(WindowError::NonPositiveSize(spec.size.clone()));
        }
        let offset = if spec.offset.trim().is_empty() {
            Span::ZERO
        } else {
            Span::parse(&spec.offset).map_err(WindowError::Offset)?
        };
        let truncate = match spec.truncate_to.trim() {
            "" => Truncate::None,
            "h" => Truncate::Hour,
            "d" => Truncate::Day,
            "w" => Truncate::Week,
            "M" => Truncate::Month,
            other => return Err(WindowError::TruncateTo(other.to_string())),
        };
        Ok(Self { size, offset, truncate })
    }

    pub fn interval(&self, schedule_time: DateTime<Utc>) -> Result<Interval, WindowError> {
        let truncated = match self.truncate {
            Truncate::None => schedule_time,
            Truncate::Hour => truncate_hour(schedule_time),
            Truncate::Day => truncate_day(schedule_time),
            Truncate::Week => truncate_monday(schedule_time),
            Truncate::Month => first_of_month(schedule_time),
        };
        let end = truncated
            .checked_add_signed(self.offset.fixed())
            .and_then(|t| add_months(t, self.offset.months))
            .ok_or(WindowError::OutOfRange)?;
        let start = end
            .checked_sub_signed(self.size.fixed())
            .and_then(|t| add_months(t, -self.size.months))
            .ok_or(WindowError::OutOfRange)?;
        Ok(Interval { start, end })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LegacyTruncate {
    Hour,
    Day,
    Week,
    Month,
}

/// Compiled v1 window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegacyWindow {
    size: Duration,
    offset: Duration,
    truncate: LegacyTruncate,
}

impl LegacyWindow {
    pub fn parse(spec: &WindowSpec) -> Result<Self, WindowError> {
        let truncate = match spec.truncate_to.trim() {
            "" | "d" => LegacyTruncate::Day,
            "h" => LegacyTruncate::Hour,
            "w" => LegacyTruncate::Week,
            "m" | "M" => LegacyTruncate::Month,
            other => return Err(WindowError::TruncateTo(other.to_string())),
        };
        let size = if spec.size.trim().is_empty() {
            Duration::hours(24)
        } else {
            legacy_duration(&spec.size).map_err(WindowError::Size)?
        };
        if size <= Duration::zero() {
            return Err(WindowError::NonPositiveSize(spec.size.clone()));
        }
        let offset = if spec.offset.trim().is_empty() {
            Duration::zero()
        } else {
            legacy_duration(&spec.offset).map_err(WindowError::Offset)?
        };
        Ok(Self { size, offset, truncate })
    }

    /// Size in nanoseconds, the encoding older deployments persisted.
    pub fn size_nanos(&self) -> i64 {
        self.size.num_nanoseconds().unwrap_or(i64::MAX)
    }

    pub fn offset_nanos(&self) -> i64 {
        self.offset.num_nanoseconds().unwrap_or(i64::MAX)
    }

    pub fn interval(&self, schedule_time: DateTime<Utc>) -> Result<Interval, WindowError> {
        if self.truncate == LegacyTruncate::Month {
            return self.monthly_interval(schedule_time);
        }
        let floating_end = match self.truncate {
            LegacyTruncate::Hour => truncate_hour(schedule_time),
            LegacyTruncate::Week => {
                let to_sunday = 7 - u64::from(schedule_time.weekday().num_days_from_sunday());
                let sunday = schedule_time.checked_add_days(Days::new(to_sunday)).ok_or(WindowError::OutOfRange)?;
                truncate_day(sunday)
            }
            _ => truncate_day(schedule_time),
        };
        let end = floating_end.checked_add_signed(self.offset).ok_or(WindowError::OutOfRange)?;
        let start = end.checked_sub_signed(self.size).ok_or(WindowError::OutOfRange)?;
        Ok(Interval { start, end })
    }

    fn monthly_interval(&self, schedule_time: DateTime<Utc>) -> Result<Interval, WindowError> {
        const MONTH_SECS: i64 = 30 * 24 * 3600;
        let whole_months = |d: Duration| i32::try_from(d.num_seconds() / MONTH_SECS).map_err(|_| WindowError::OutOfRange);
        let shifted = add_months(first_of_month(schedule_time), whole_months(self.offset)?);
        let end = shifted
            .and_then(|t| add_months(t, 1))
            .and_then(|t| t.checked_sub_days(Days::new(1)))
            .map(truncate_day)
            .ok_or(WindowError::OutOfRange)?;
        let mut start = first_of_month(end);
        let size_months = whole_months(self.size)? - 1;
        if size_months > 0 {
            start = add_months(start, -size_months).ok_or(WindowError::OutOfRange)?;
        }
        Ok(Interval { start, end })
    }
}

/// Legacy parse: the first `<int>M` term counts as 30-day months, the rest is
/// a plain duration.
fn legacy_duration(input: &str) -> Result<Duration, SpanError> {
    let s = input.trim();
    let Some(m_pos) = s.find('M') else {
        return Span::parse(s).map(|span| span.fixed());
    };
    let digits_start = s[..m_pos].rfind(|c: char| !c.is_ascii_digit()).map(|i| i + 1).unwrap_or(0);
    if digits_start == m_pos {
        return Err(SpanError::Invalid { input: input.to_string(), reason: "month term without a number".into() });
    }
    let (term_start, negative) = match s[..digits_start].chars().last() {
        Some('-') => (digits_start - 1, true),
        Some('+') => (digits_start - 1, false),
        _ => (digits_start, false),
    };
    let months: i64 = s[digits_start..m_pos].parse().map_err(|_| SpanError::Invalid {
        input: input.to_string(),
        reason: "number out of range".into(),
    })?;
    let out_of_range = || SpanError::Invalid { input: input.to_string(), reason: "number out of range".into() };
    let mut total = months.checked_mul(30).and_then(Duration::try_days).ok_or_else(out_of_range)?;
    if negative {
        total = -total;
    }
    let rest = format!("{}{}", &s[..term_start], &s[m_pos + 1..]);
    let rest = rest.trim();
    if !rest.is_empty() {
        total = total.checked_add(&Span::parse(rest)?.fixed()).ok_or_else(out_of_range)?;
    }
    Ok(total)
}

/// Validate a window spec. The v2 grammar is the stricter of the two, and
/// both algorithms must yield an interval for schedule times in years 1
/// through 9999.
pub fn validate(spec: &WindowSpec) -> Result<(), WindowError> {
    let window = Window::parse(spec)?;
    let legacy = LegacyWindow::parse(spec)?;
    let bounds = [(1, 1, 1), (9999, 12, 31)]
        .into_iter()
        .filter_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d))
        .map(at_midnight);
    for schedule_time in bounds {
        window.interval(schedule_time)?;
        legacy.interval(schedule_time)?;
    }
    Ok(())
}

/// Compute `[start, end)` for one schedule time using the chosen algorithm.
pub fn compute(
    spec: &WindowSpec,
    version: WindowVersion,
    schedule_time: DateTime<Utc>,
) -> Result<Interval, WindowError> {
    match version {
        WindowVersion::V2 => Window::parse(spec)?.interval(schedule_time),
        WindowVersion::V1 => LegacyWindow::parse(spec)?.interval(schedule_time),
    }
}

fn at_midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn truncate_hour(t: DateTime<Utc>) -> DateTime<Utc> {
    t.date_naive()
        .and_hms_opt(t.hour(), 0, 0)
        .map(|dt| dt.and_utc())
        .unwrap_or(t)
}

fn truncate_day(t: DateTime<Utc>) -> DateTime<Utc> {
    at_midnight(t.date_naive())
}

fn truncate_monday(t: DateTime<Utc>) -> DateTime<Utc> {
    let back = u64::from(t.weekday().num_days_from_monday());
    t.date_naive().checked_sub_days(Days::new(back)).map(at_midnight).unwrap_or(t)
}

fn first_of_month(t: DateTime<Utc>) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(t.year(), t.month(), 1).map(at_midnight).unwrap_or(t)
}

/// Add calendar months, normalising day overflow into the following month
/// (Jan 31 + 1 month = Mar 3, or Mar 2 in a leap year). `None` when the
/// result leaves the representable date range.
pub fn add_months(t: DateTime<Utc>, months: i32) -> Option<DateTime<Utc>> {
    if months == 0 {
        return Some(t);
    }
    let total = i64::from(t.year()) * 12 + i64::from(t.month0()) + i64::from(months);
    let year = i32::try_from(total.div_euclid(12)).ok()?;
    let month0 = u32::try_from(total.rem_euclid(12)).ok()?;
    NaiveDate::from_ymd_opt(year, month0 + 1, 1)?
        .checked_add_days(Days::new(u64::from(t.day() - 1)))
        .map(|date| date.and_time(t.time()).and_utc())
}

#[cfg(test)]
#[path = "window_tests.rs"]
mod tests;
