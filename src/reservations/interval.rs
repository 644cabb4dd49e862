use thiserror::Error;
use time::{
    format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime,
    PrimitiveDateTime,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("End date must be after start date.")]
pub struct InvalidRange;

/// Half-open time range `[start, end)` with `end > start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    start: OffsetDateTime,
    end: OffsetDateTime,
}

impl Interval {
    pub fn new(start: OffsetDateTime, end: OffsetDateTime) -> Result<Self, InvalidRange> {
        if end <= start {
            return Err(InvalidRange);
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> OffsetDateTime {
        self.start
    }

    pub fn end(&self) -> OffsetDateTime {
        self.end
    }

    /// Strict intersection test. Touching boundaries do not overlap.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && self.end > other.start
    }
}

/// Parses RFC 3339, or a naive `YYYY-MM-DD[T ]HH:MM[:SS]` taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<OffsetDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(ts) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(ts);
    }

    let naive = [
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]"),
    ];
    naive
        .iter()
        .find_map(|fmt| PrimitiveDateTime::parse(value, *fmt).ok())
        .map(PrimitiveDateTime::assume_utc)
}
