//! Conversion from millisecond durations to the store's interval vocabulary.
//!
//! Machbase expresses bucket widths as `<magnitude> <unit>` pairs (`10 sec`,
//! `1 hour`). Conversions always round up to the next whole unit so a bucket is
//! never narrower than the requested resolution.

use std::fmt;

const MS_PER_SEC: u64 = 1_000;
const MS_PER_MIN: u64 = 60 * MS_PER_SEC;
const MS_PER_HOUR: u64 = 60 * MS_PER_MIN;
const MS_PER_DAY: u64 = 24 * MS_PER_HOUR;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntervalUnit {
    Msec,
    Sec,
    Min,
    Hour,
    Day,
}

impl IntervalUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntervalUnit::Msec => "msec",
            IntervalUnit::Sec => "sec",
            IntervalUnit::Min => "min",
            IntervalUnit::Hour => "hour",
            IntervalUnit::Day => "day",
        }
    }

    /// Width of one unit in milliseconds.
    pub fn millis(&self) -> u64 {
        match self {
            IntervalUnit::Msec => 1,
            IntervalUnit::Sec => MS_PER_SEC,
            IntervalUnit::Min => MS_PER_MIN,
            IntervalUnit::Hour => MS_PER_HOUR,
            IntervalUnit::Day => MS_PER_DAY,
        }
    }
}

impl fmt::Display for IntervalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bucket width in the store's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    pub magnitude: u64,
    pub unit: IntervalUnit,
}

impl Interval {
    pub fn new(magnitude: u64, unit: IntervalUnit) -> Self {
        Self { magnitude, unit }
    }

    /// Map a resolution in milliseconds to the coarsest unit below the next
    /// threshold, rounding the magnitude up.
    pub fn from_millis(ms: u64) -> Self {
        if ms < MS_PER_SEC {
            return Self::new(ms, IntervalUnit::Msec);
        }
        let unit = if ms < MS_PER_MIN {
            IntervalUnit::Sec
        } else if ms < MS_PER_HOUR {
            IntervalUnit::Min
        } else if ms < MS_PER_DAY {
            IntervalUnit::Hour
        } else {
            IntervalUnit::Day
        };
        Self::new(ms.div_ceil(unit.millis()), unit)
    }

    pub fn width_millis(&self) -> u64 {
        self.magnitude.saturating_mul(self.unit.millis())
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.magnitude, self.unit)
    }
}

/// Result of parsing a compact interval token such as `5m`.
///
/// `unit` is `None` when the token used a unit the store has no bucket for
/// (`w`, `y`); callers treat that as unsupported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedInterval {
    pub magnitude: u64,
    pub unit: Option<IntervalUnit>,
}

impl ParsedInterval {
    pub fn interval(&self) -> Option<Interval> {
        self.unit.map(|unit| Interval::new(self.magnitude, unit))
    }
}

/// Parse a `<number><unit>` token (`500ms`, `10s`, `5m`, `2h`, `1d`).
///
/// A millisecond token is reported as whole `msec` buckets of one second,
/// i.e. `ceil(n / 1000)`.
pub fn parse_interval_str(input: &str) -> Option<ParsedInterval> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    // `ms` must be checked before `m` or `500ms` would read as minutes.
    let (digits, suffix) = match input.strip_suffix("ms") {
        Some(digits) => (digits, "ms"),
        None => {
            let split = input.len() - input.chars().last()?.len_utf8();
            input.split_at(split)
        }
    };
    let value: u64 = digits.trim().parse().ok()?;

    let parsed = match suffix {
        "ms" => ParsedInterval {
            magnitude: value.div_ceil(MS_PER_SEC),
            unit: Some(IntervalUnit::Msec),
        },
        "s" => ParsedInterval {
            magnitude: value,
            unit: Some(IntervalUnit::Sec),
        },
        "m" => ParsedInterval {
            magnitude: value,
            unit: Some(IntervalUnit::Min),
        },
        "h" => ParsedInterval {
            magnitude: value,
            unit: Some(IntervalUnit::Hour),
        },
        "d" => ParsedInterval {
            magnitude: value,
            unit: Some(IntervalUnit::Day),
        },
        "w" | "y" => {
            tracing::warn!(interval = %input, "interval unit has no store equivalent");
            ParsedInterval {
                magnitude: value,
                unit: None,
            }
        }
        _ => return None,
    };
    Some(parsed)
}
