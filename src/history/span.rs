use std::fmt;
use std::str::FromStr;

use chrono::{Duration, Months, NaiveDateTime};

use crate::error::{AppError, Result};

const MINUTE_TOKEN: &str = "min";

/// Bar sizes the gateway's history endpoint accepts.
pub const SUPPORTED_BAR_SIZES: &[&str] = &[
    "1min", "2min", "3min", "5min", "10min", "15min", "30min", "1h", "2h", "3h", "4h", "8h",
    "1d", "1w", "1m",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpanUnit {
    Years,
    Months,
    Weeks,
    Days,
    Hours,
    Minutes,
}

impl SpanUnit {
    pub fn token(self) -> &'static str {
        match self {
            SpanUnit::Years => "y",
            SpanUnit::Months => "m",
            SpanUnit::Weeks => "w",
            SpanUnit::Days => "d",
            SpanUnit::Hours => "h",
            SpanUnit::Minutes => MINUTE_TOKEN,
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "y" => Some(SpanUnit::Years),
            "m" => Some(SpanUnit::Months),
            "w" => Some(SpanUnit::Weeks),
            "d" => Some(SpanUnit::Days),
            "h" => Some(SpanUnit::Hours),
            MINUTE_TOKEN => Some(SpanUnit::Minutes),
            _ => None,
        }
    }
}

/// Requested total duration, always measured forward from an anchor timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanSpec {
    pub magnitude: u32,
    pub unit: SpanUnit,
}

impl SpanSpec {
    pub fn new(magnitude: u32, unit: SpanUnit) -> Self {
        Self { magnitude, unit }
    }

    /// Absolute end of the span. Years, months, weeks and days move along the
    /// calendar (month arithmetic clamps to the last day of the target month);
    /// hours and minutes are fixed durations.
    pub fn end_from(&self, anchor: NaiveDateTime) -> Result<NaiveDateTime> {
        let magnitude = self.magnitude;
        let end = match self.unit {
            SpanUnit::Years => magnitude
                .checked_mul(12)
                .and_then(|months| anchor.checked_add_months(Months::new(months))),
            SpanUnit::Months => anchor.checked_add_months(Months::new(magnitude)),
            SpanUnit::Weeks => anchor.checked_add_signed(Duration::weeks(i64::from(magnitude))),
            SpanUnit::Days => anchor.checked_add_signed(Duration::days(i64::from(magnitude))),
            SpanUnit::Hours => anchor.checked_add_signed(Duration::hours(i64::from(magnitude))),
            SpanUnit::Minutes => {
                anchor.checked_add_signed(Duration::minutes(i64::from(magnitude)))
            }
        };

        end.ok_or_else(|| {
            AppError::invalid_format(format!("span {self} from {anchor} is out of range"))
        })
    }
}

impl fmt::Display for SpanSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.magnitude, self.unit.token())
    }
}

impl FromStr for SpanSpec {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self> {
        let (magnitude, token) = split_token(value, "span")?;
        let unit = SpanUnit::from_token(token).ok_or_else(|| {
            AppError::invalid_format(format!("unrecognized span unit in `{value}`"))
        })?;
        Ok(SpanSpec::new(magnitude, unit))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BarUnit {
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
}

impl BarUnit {
    pub fn token(self) -> &'static str {
        match self {
            BarUnit::Minutes => MINUTE_TOKEN,
            BarUnit::Hours => "h",
            BarUnit::Days => "d",
            BarUnit::Weeks => "w",
            BarUnit::Months => "m",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            MINUTE_TOKEN => Some(BarUnit::Minutes),
            "h" => Some(BarUnit::Hours),
            "d" => Some(BarUnit::Days),
            "w" => Some(BarUnit::Weeks),
            "m" => Some(BarUnit::Months),
            _ => None,
        }
    }
}

/// Duration covered by a single bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BarSize {
    pub magnitude: u32,
    pub unit: BarUnit,
}

impl BarSize {
    pub fn new(magnitude: u32, unit: BarUnit) -> Self {
        Self { magnitude, unit }
    }

    /// Length of one bar starting at `anchor`. Month bars take the exact number
    /// of days between `anchor` and the same instant one calendar month later.
    pub fn duration_at(&self, anchor: NaiveDateTime) -> Result<Duration> {
        let magnitude = i64::from(self.magnitude);
        match self.unit {
            BarUnit::Minutes => Ok(Duration::minutes(magnitude)),
            BarUnit::Hours => Ok(Duration::hours(magnitude)),
            BarUnit::Days => Ok(Duration::days(magnitude)),
            BarUnit::Weeks => Ok(Duration::weeks(magnitude)),
            BarUnit::Months => {
                let next = anchor
                    .checked_add_months(Months::new(self.magnitude))
                    .ok_or_else(|| {
                        AppError::invalid_format(format!(
                            "bar size {self} from {anchor} is out of range"
                        ))
                    })?;
                Ok(next - anchor)
            }
        }
    }

    pub fn is_gateway_supported(&self) -> bool {
        let token = self.to_string();
        SUPPORTED_BAR_SIZES.contains(&token.as_str())
    }
}

impl fmt::Display for BarSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.magnitude, self.unit.token())
    }
}

impl FromStr for BarSize {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self> {
        let (magnitude, token) = split_token(value, "bar size")?;
        let unit = BarUnit::from_token(token).ok_or_else(|| {
            AppError::invalid_format(format!("unrecognized bar size unit in `{value}`"))
        })?;
        Ok(BarSize::new(magnitude, unit))
    }
}

// `min` has to win over the single-letter `m` suffix.
fn split_token<'a>(value: &'a str, what: &str) -> Result<(u32, &'a str)> {
    let trimmed = value.trim();
    let split_at = if trimmed.ends_with(MINUTE_TOKEN) {
        trimmed.len() - MINUTE_TOKEN.len()
    } else {
        trimmed
            .char_indices()
            .last()
            .map(|(idx, _)| idx)
            .ok_or_else(|| AppError::invalid_format(format!("empty {what}")))?
    };

    let (digits, token) = trimmed.split_at(split_at);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::invalid_format(format!(
            "{what} `{value}` has a non-numeric magnitude"
        )));
    }
    let magnitude: u32 = digits.parse().map_err(|_| {
        AppError::invalid_format(format!("{what} `{value}` has a non-numeric magnitude"))
    })?;

    if magnitude == 0 {
        return Err(AppError::invalid_format(format!(
            "{what} `{value}` must have a positive magnitude"
        )));
    }

    Ok((magnitude, token))
}
