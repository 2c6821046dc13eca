use std::fmt;

use chrono::{Duration, NaiveDateTime};

use crate::error::{AppError, Result};

use super::span::{BarSize, SpanSpec, SpanUnit};

/// Upper bound the gateway enforces on bars returned by one history request.
pub const MAX_BARS_PER_REQUEST: i64 = 1000;

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 3_600;
const SECONDS_PER_DAY: i64 = 86_400;

/// One bounded sub-request of a larger history retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub start: NaiveDateTime,
    pub span: SpanSpec,
    pub bars: i64,
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {} ({} bars)",
            self.span,
            self.start.format("%Y%m%d-%H:%M:%S"),
            self.bars
        )
    }
}

/// Oldest-first sequence of contiguous windows covering one requested span.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WindowPlan {
    windows: Vec<Window>,
}

impl WindowPlan {
    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    pub fn iter(&self) -> impl Iterator<Item = &Window> {
        self.windows.iter()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn total_bars(&self) -> i64 {
        self.windows.iter().map(|window| window.bars).sum()
    }
}

impl IntoIterator for WindowPlan {
    type Item = Window;
    type IntoIter = std::vec::IntoIter<Window>;

    fn into_iter(self) -> Self::IntoIter {
        self.windows.into_iter()
    }
}

/// Split `span`, measured forward from `anchor`, into windows of at most
/// [`MAX_BARS_PER_REQUEST`] bars of size `bar`.
pub fn partition(span: SpanSpec, bar: BarSize, anchor: NaiveDateTime) -> Result<WindowPlan> {
    let end = span.end_from(anchor)?;
    let bar_seconds = bar.duration_at(anchor)?.num_seconds();
    if bar_seconds <= 0 {
        return Err(AppError::invalid_format(format!(
            "bar size {bar} resolves to an empty duration"
        )));
    }

    let total_seconds = (end - anchor).num_seconds();
    let mut remaining = ceil_div(total_seconds, bar_seconds).max(1);

    if remaining <= MAX_BARS_PER_REQUEST {
        return Ok(WindowPlan {
            windows: vec![Window {
                start: anchor,
                span,
                bars: remaining,
            }],
        });
    }

    let full_window_seconds = MAX_BARS_PER_REQUEST * bar_seconds;
    let full_window_span = format_period(Duration::seconds(full_window_seconds));

    let mut windows = Vec::new();
    let mut cursor = anchor;

    while remaining > MAX_BARS_PER_REQUEST {
        windows.push(Window {
            start: cursor,
            span: full_window_span,
            bars: MAX_BARS_PER_REQUEST,
        });
        cursor = cursor
            .checked_add_signed(Duration::seconds(full_window_seconds))
            .ok_or_else(|| {
                AppError::invalid_format(format!("window cursor overflowed past {cursor}"))
            })?;
        remaining -= MAX_BARS_PER_REQUEST;
    }

    windows.push(Window {
        start: cursor,
        span: format_period(Duration::seconds(remaining * bar_seconds)),
        bars: remaining,
    });

    Ok(WindowPlan { windows })
}

/// String-typed entry point used by the client and CLI.
pub fn partition_str(span: &str, bar: &str, anchor: NaiveDateTime) -> Result<WindowPlan> {
    partition(span.parse()?, bar.parse()?, anchor)
}

/// Express a duration as the coarsest whole unit: days, then hours, then
/// minutes. Anything shorter than a minute becomes `1min`.
pub fn format_period(duration: Duration) -> SpanSpec {
    let seconds = duration.num_seconds();
    if seconds >= SECONDS_PER_DAY && seconds % SECONDS_PER_DAY == 0 {
        return SpanSpec::new(clamp_u32(seconds / SECONDS_PER_DAY), SpanUnit::Days);
    }
    if seconds >= SECONDS_PER_HOUR && seconds % SECONDS_PER_HOUR == 0 {
        return SpanSpec::new(clamp_u32(seconds / SECONDS_PER_HOUR), SpanUnit::Hours);
    }
    let minutes = seconds / SECONDS_PER_MINUTE;
    if minutes > 0 {
        return SpanSpec::new(clamp_u32(minutes), SpanUnit::Minutes);
    }
    SpanSpec::new(1, SpanUnit::Minutes)
}

fn ceil_div(numerator: i64, denominator: i64) -> i64 {
    if numerator <= 0 {
        return 0;
    }
    (numerator + denominator - 1) / denominator
}

fn clamp_u32(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
