// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signed calendar spans such as `1M`, `-24h` or `1M12h`.
//!
//! Grammar: optional sign, then one or more `<int><unit>` terms where unit is
//! `M` (calendar month), `h`, `m` or `s`. A bare `0` is the zero span. The sign
//! applies to every term.

use std::fmt;
use thiserror::Error;

const SECS_PER_HOUR: i64 = 3600;
const SECS_PER_DAY: i64 = 24 * SECS_PER_HOUR;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpanError {
    #[error("empty duration")]
    Empty,
    #[error("invalid duration {input:?}: {reason}")]
    Invalid { input: String, reason: String },
    #[error("duration {0:?} may not contain calendar months")]
    MonthsNotAllowed(String),
}

impl SpanError {
    fn invalid(input: &str, reason: impl Into<String>) -> Self {
        SpanError::Invalid { input: input.to_string(), reason: reason.into() }
    }
}

/// A calendar-aware duration: whole months plus a fixed number of seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub months: i32,
    pub seconds: i64,
}

impl Span {
    pub const ZERO: Span = Span { months: 0, seconds: 0 };

    pub fn parse(input: &str) -> Result<Span, SpanError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(SpanError::Empty);
        }

        let (negative, body) = match s.as_bytes()[0] {
            b'-' => (true, &s[1..]),
            b'+' => (false, &s[1..]),
            _ => (false, s),
        };
        if body == "0" {
            return Ok(Span::ZERO);
        }
        if body.is_empty() {
            return Err(SpanError::invalid(input, "missing value"));
        }

        let mut months: i64 = 0;
        let mut seconds: i64 = 0;
        let mut digits = String::new();
        for ch in body.chars() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                continue;
            }
            if digits.is_empty() {
                return Err(SpanError::invalid(input, format!("unit '{ch}' without a number")));
            }
            let n: i64 = digits
                .parse()
                .map_err(|_| SpanError::invalid(input, "number out of range"))?;
            digits.clear();
            let overflow = || SpanError::invalid(input, "number out of range");
            match ch {
                'M' => months = months.checked_add(n).ok_or_else(overflow)?,
                'h' | 'm' | 's' => {
                    let unit = match ch {
                        'h' => SECS_PER_HOUR,
                        'm' => 60,
                        _ => 1,
                    };
                    let secs = n.checked_mul(unit).ok_or_else(overflow)?;
                    seconds = seconds.checked_add(secs).ok_or_else(overflow)?;
                }
                other => return Err(SpanError::invalid(input, format!("unknown unit '{other}'"))),
            }
        }
        if !digits.is_empty() {
            return Err(SpanError::invalid(input, "missing unit"));
        }

        let months = i32::try_from(months).map_err(|_| SpanError::invalid(input, "too many months"))?;
        if chrono::Duration::try_seconds(seconds).is_none() {
            return Err(SpanError::invalid(input, "number out of range"));
        }
        let span = Span { months, seconds };
        Ok(if negative { span.negate() } else { span })
    }

    pub fn negate(self) -> Span {
        Span { months: -self.months, seconds: -self.seconds }
    }

    pub fn is_zero(&self) -> bool {
        self.months == 0 && self.seconds == 0
    }

    pub fn is_negative(&self) -> bool {
        self.months < 0 || self.seconds < 0
    }

    /// The fixed-length part of the span. Saturates at the `Duration`
    /// bounds, which no parsed span reaches.
    pub fn fixed(&self) -> chrono::Duration {
        saturating_seconds(self.seconds)
    }

    /// Fixed-length approximation where a month counts as 30 days.
    pub fn as_thirty_day_duration(&self) -> chrono::Duration {
        saturating_seconds((i64::from(self.months) * 30 * SECS_PER_DAY).saturating_add(self.seconds))
    }
}

fn saturating_seconds(seconds: i64) -> chrono::Duration {
    chrono::Duration::try_seconds(seconds).unwrap_or(if seconds < 0 {
        chrono::Duration::MIN
    } else {
        chrono::Duration::MAX
    })
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("0");
        }
        let span = if self.is_negative() {
            f.write_str("-")?;
            self.negate()
        } else {
            *self
        };
        if span.months != 0 {
            write!(f, "{}M", span.months)?;
        }
        let (h, rem) = (span.seconds / SECS_PER_HOUR, span.seconds % SECS_PER_HOUR);
        let (m, s) = (rem / 60, rem % 60);
        if h != 0 {
            write!(f, "{h}h")?;
        }
        if m != 0 {
            write!(f, "{m}m")?;
        }
        if s != 0 {
            write!(f, "{s}s")?;
        }
        Ok(())
    }
}

/// Parse a fixed duration such as an SLA (`2h`, `90m`). Months are rejected.
pub fn parse_duration(input: &str) -> Result<chrono::Duration, SpanError> {
    let span = Span::parse(input)?;
    if span.months != 0 {
        return Err(SpanError::MonthsNotAllowed(input.to_string()));
    }
    Ok(span.fixed())
}

#[cfg(test)]
#[path = "span_tests.rs"]
mod tests;
