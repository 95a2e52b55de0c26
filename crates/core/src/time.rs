//! Query windows and human-readable timestamps.
//!
//! Callers speak microseconds since the Unix epoch; the accounting engine
//! stamps its records in nanoseconds.

use chrono::{DateTime, FixedOffset, Offset, Utc};

use crate::error::{DomainError, DomainResult};

const NANOS_PER_MICRO: u64 = 1_000;

/// Current wall clock in microseconds since the epoch.
pub fn now_micros() -> u64 {
    u64::try_from(Utc::now().timestamp_micros()).unwrap_or(0)
}

/// Inclusive `[from, to]` window in microseconds.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TimeWindow {
    from_micros: u64,
    to_micros: u64,
}

impl TimeWindow {
    /// Resolve a caller-supplied window.
    ///
    /// `0` means "unset" for both bounds: `from` falls back to the epoch and
    /// `to` falls back to `now_micros`. Defaults are applied before the range
    /// is checked.
    pub fn resolve(from_micros: u64, to_micros: u64, now_micros: u64) -> DomainResult<Self> {
        let to_micros = if to_micros == 0 { now_micros } else { to_micros };
        if from_micros > to_micros {
            return Err(DomainError::InvalidTimeRange {
                from: from_micros,
                to: to_micros,
            });
        }
        Ok(Self {
            from_micros,
            to_micros,
        })
    }

    pub fn from_micros(&self) -> u64 {
        self.from_micros
    }

    pub fn to_micros(&self) -> u64 {
        self.to_micros
    }

    /// Lower bound in engine timestamp units.
    pub fn engine_min(&self) -> u64 {
        self.from_micros.saturating_mul(NANOS_PER_MICRO)
    }

    /// Upper bound in engine timestamp units, covering the whole last microsecond.
    pub fn engine_max(&self) -> u64 {
        self.to_micros
            .saturating_mul(NANOS_PER_MICRO)
            .saturating_add(NANOS_PER_MICRO - 1)
    }
}

/// Formats timestamps as `YYYY-MM-DD HH:MM` in a fixed display offset.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DisplayClock {
    offset: FixedOffset,
}

impl DisplayClock {
    /// America/Bogota (UTC−05:00, no daylight saving).
    pub const DEFAULT_OFFSET_MINUTES: i32 = -300;

    pub fn from_offset_minutes(minutes: i32) -> DomainResult<Self> {
        let offset = minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| DomainError::validation(format!("utc offset out of range: {minutes} minutes")))?;
        Ok(Self { offset })
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn format_micros(&self, micros: u64) -> String {
        let secs = i64::try_from(micros / 1_000_000).unwrap_or(i64::MAX);
        // Always < 1e9, fits u32.
        let nanos = ((micros % 1_000_000) * NANOS_PER_MICRO) as u32;
        match DateTime::<Utc>::from_timestamp(secs, nanos) {
            Some(at) => self.format(at),
            None => String::new(),
        }
    }

    pub fn format(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.offset).format("%Y-%m-%d %H:%M").to_string()
    }

    pub fn format_now(&self) -> String {
        self.format(Utc::now())
    }
}

impl Default for DisplayClock {
    fn default() -> Self {
        Self {
            offset: FixedOffset::west_opt(300 * 60).unwrap_or_else(|| Utc.fix()),
        }
    }
}
