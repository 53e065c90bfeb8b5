//! `xsd:duration` parsing and the per-dialect unit formatting of window
//! ranges and steps.

use std::time::Duration;

use winnow::combinator::{opt, preceded};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{literal, take_while};

const NANOS_PER_SECOND: u128 = 1_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DurationError {
    #[error("'{0}' is not a valid xsd:duration")]
    Invalid(String),
    #[error("'{0}' has year or month components and no fixed length")]
    Indeterminate(String),
    #[error("'{0}' is a negative duration")]
    Negative(String),
}

/// The components of an `xsd:duration` lexical form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct XsdDuration {
    pub negative: bool,
    pub years: u64,
    pub months: u64,
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
    pub nanos: u32,
}

impl XsdDuration {
    pub fn is_day_time(&self) -> bool {
        self.years == 0 && self.months == 0
    }

    /// Converts a non-negative day-time duration into a [`Duration`].
    pub fn to_std(&self, lexical: &str) -> Result<Duration, DurationError> {
        if !self.is_day_time() {
            return Err(DurationError::Indeterminate(lexical.to_string()));
        }
        if self.negative {
            return Err(DurationError::Negative(lexical.to_string()));
        }
        let secs = self
            .days
            .checked_mul(86_400)
            .and_then(|s| s.checked_add(self.hours.checked_mul(3_600)?))
            .and_then(|s| s.checked_add(self.minutes.checked_mul(60)?))
            .and_then(|s| s.checked_add(self.seconds))
            .ok_or_else(|| DurationError::Invalid(lexical.to_string()))?;
        Ok(Duration::new(secs, self.nanos))
    }
}

fn digits<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)
}

fn number(input: &mut &str) -> ModalResult<u64> {
    let text = digits.parse_next(input)?;
    text.parse::<u64>()
        .map_err(|_| ErrMode::Cut(ContextError::new()))
}

/// `<digits><unit>`, backtracking when the unit designator does not follow.
fn component<'a>(unit: &'static str) -> impl FnMut(&mut &'a str) -> ModalResult<u64> {
    move |input: &mut &'a str| {
        let value = number.parse_next(input)?;
        literal(unit).parse_next(input)?;
        Ok(value)
    }
}

fn seconds(input: &mut &str) -> ModalResult<(u64, u32)> {
    let whole = number.parse_next(input)?;
    let fraction = opt(preceded(literal("."), digits)).parse_next(input)?;
    literal("S").parse_next(input)?;
    let nanos = match fraction {
        None => 0,
        Some(f) if f.len() > 9 => return Err(ErrMode::Cut(ContextError::new())),
        Some(f) => {
            let padded = format!("{f:0<9}");
            padded
                .parse::<u32>()
                .map_err(|_| ErrMode::Cut(ContextError::new()))?
        }
    };
    Ok((whole, nanos))
}

type TimePart = (Option<u64>, Option<u64>, Option<(u64, u32)>);

fn time_part(input: &mut &str) -> ModalResult<TimePart> {
    let hours = opt(component("H")).parse_next(input)?;
    let minutes = opt(component("M")).parse_next(input)?;
    let secs = opt(seconds).parse_next(input)?;
    if hours.is_none() && minutes.is_none() && secs.is_none() {
        return Err(ErrMode::Backtrack(ContextError::new()));
    }
    Ok((hours, minutes, secs))
}

fn xsd_duration(input: &mut &str) -> ModalResult<XsdDuration> {
    let negative = opt(literal("-")).parse_next(input)?.is_some();
    literal("P").parse_next(input)?;
    let years = opt(component("Y")).parse_next(input)?;
    let months = opt(component("M")).parse_next(input)?;
    let days = opt(component("D")).parse_next(input)?;
    let time = opt(preceded(literal("T"), time_part)).parse_next(input)?;

    if years.is_none() && months.is_none() && days.is_none() && time.is_none() {
        return Err(ErrMode::Backtrack(ContextError::new()));
    }
    let (hours, minutes, secs) = time.unwrap_or((None, None, None));
    let (seconds, nanos) = secs.unwrap_or((0, 0));
    Ok(XsdDuration {
        negative,
        years: years.unwrap_or(0),
        months: months.unwrap_or(0),
        days: days.unwrap_or(0),
        hours: hours.unwrap_or(0),
        minutes: minutes.unwrap_or(0),
        seconds,
        nanos,
    })
}

/// Parses any `xsd:duration` lexical form.
pub fn parse_xsd_duration(text: &str) -> Result<XsdDuration, DurationError> {
    xsd_duration
        .parse(text.trim())
        .map_err(|_| DurationError::Invalid(text.to_string()))
}

/// Parses a day-time duration usable as a window range or step.
pub fn parse_duration(text: &str) -> Result<Duration, DurationError> {
    parse_xsd_duration(text)?.to_std(text)
}

pub fn is_valid_duration(text: &str) -> bool {
    parse_xsd_duration(text).is_ok()
}

/// Canonical lexical form, e.g. `PT1H30M` or `P1DT0.5S`.
pub fn to_lexical(duration: Duration) -> String {
    let mut secs = duration.as_secs();
    let nanos = duration.subsec_nanos();
    let days = secs / 86_400;
    secs %= 86_400;
    let hours = secs / 3_600;
    secs %= 3_600;
    let minutes = secs / 60;
    secs %= 60;

    let mut out = String::from("P");
    if days > 0 {
        out.push_str(&format!("{days}D"));
    }
    if hours == 0 && minutes == 0 && secs == 0 && nanos == 0 {
        if days == 0 {
            out.push_str("T0S");
        }
        return out;
    }
    out.push('T');
    if hours > 0 {
        out.push_str(&format!("{hours}H"));
    }
    if minutes > 0 {
        out.push_str(&format!("{minutes}M"));
    }
    if secs > 0 || nanos > 0 {
        if nanos > 0 {
            let fraction = format!("{nanos:09}");
            out.push_str(&format!("{secs}.{}S", fraction.trim_end_matches('0')));
        } else {
            out.push_str(&format!("{secs}S"));
        }
    }
    out
}

/// A unit of a dialect's time grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeUnit {
    pub nanos: u128,
    pub symbol: &'static str,
}

impl TimeUnit {
    pub const fn new(nanos: u128, symbol: &'static str) -> Self {
        Self { nanos, symbol }
    }
}

/// Formats `duration` with the largest unit (of `units`, ordered smallest
/// first) that divides it exactly. Returns `None` when no unit does.
pub fn format_with_units(duration: Duration, units: &[TimeUnit], separator: &str) -> Option<String> {
    let total = duration.as_nanos();
    if total == 0 {
        let unit = units
            .iter()
            .find(|u| u.nanos == NANOS_PER_SECOND)
            .or_else(|| units.first())?;
        return Some(format!("0{separator}{}", unit.symbol));
    }
    units
        .iter()
        .rev()
        .find(|u| total % u.nanos == 0)
        .map(|u| format!("{}{separator}{}", total / u.nanos, u.symbol))
}
