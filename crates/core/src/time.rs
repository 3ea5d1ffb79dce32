// Copyright 2026 Query Bridge Contributors
// SPDX-License-Identifier: Apache-2.0

//! Nanosecond-resolution timestamps and durations.
//!
//! Mirrors the time semantics of the upstream metric bus: an absolute
//! instant (`Timestamp`) and a signed interval (`Duration`), both carried
//! internally as nanosecond counts so that interval arithmetic in the
//! function registry (§4.B) never loses precision to floating point.

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An absolute instant, nanosecond resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Construct from a raw nanosecond count since the Unix epoch.
    pub const fn from_ns(ns: i64) -> Self {
        Self(ns)
    }

    /// Construct from integer POSIX milliseconds.
    pub fn from_posix_ms(ms: i64) -> Self {
        Self(ms * 1_000_000)
    }

    /// Raw nanosecond count since the Unix epoch.
    pub const fn ns(&self) -> i64 {
        self.0
    }

    /// Truncating conversion to integer POSIX milliseconds.
    pub fn posix_ms(&self) -> i64 {
        self.0.div_euclid(1_000_000)
    }

    /// Parse an ISO-8601 UTC timestamp (`YYYY-MM-DDTHH:MM:SS.ffffffZ`).
    pub fn parse_iso8601(s: &str) -> Result<Self> {
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| Error::malformed(format!("invalid timestamp '{s}': {e}")))?
            .with_timezone(&Utc);
        Ok(Self::from_datetime(dt))
    }

    /// Construct from a [`chrono::DateTime<Utc>`].
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        let ns = dt.timestamp() * 1_000_000_000 + i64::from(dt.timestamp_subsec_nanos());
        Self(ns)
    }

    /// Convert to a [`chrono::DateTime<Utc>`].
    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(
            self.0.div_euclid(1_000_000_000),
            u32::try_from(self.0.rem_euclid(1_000_000_000)).unwrap_or(0),
        )
        .unwrap_or_default()
    }

    /// Render as an ISO-8601 UTC string with microsecond precision.
    pub fn to_iso8601(&self) -> String {
        self.to_datetime().to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_iso8601())
    }
}

impl Sub for Timestamp {
    type Output = Duration;
    fn sub(self, rhs: Self) -> Duration {
        Duration(self.0 - rhs.0)
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;
    fn add(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0 + rhs.0)
    }
}

impl Sub<Duration> for Timestamp {
    type Output = Timestamp;
    fn sub(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0 - rhs.0)
    }
}

/// A signed nanosecond interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Duration(i64);

impl Duration {
    /// The zero-length duration.
    pub const ZERO: Duration = Duration(0);

    /// Construct from a raw nanosecond count.
    pub const fn from_ns(ns: i64) -> Self {
        Self(ns)
    }

    /// Construct from a whole number of milliseconds.
    pub const fn from_millis(ms: i64) -> Self {
        Self(ms * 1_000_000)
    }

    /// Construct from a whole number of seconds.
    pub const fn from_secs(s: i64) -> Self {
        Self(s * 1_000_000_000)
    }

    /// Raw nanosecond count.
    pub const fn ns(&self) -> i64 {
        self.0
    }

    /// Duration in fractional seconds.
    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1e9
    }

    /// Ratio of this duration to `other`, as used by the moving-average
    /// partial-interval scale factor (spec §4.B): `self.ns / other.ns`.
    ///
    /// Returns `0.0` when `other` is zero to avoid a division panic; the
    /// caller (the moving-average window) never invokes this with a zero
    /// divisor for a non-empty interval since interval durations are
    /// strictly positive for `k >= 1`.
    pub fn ratio(&self, other: Duration) -> f64 {
        if other.0 == 0 {
            0.0
        } else {
            self.0 as f64 / other.0 as f64
        }
    }

    /// Parse a human duration string such as `"30s"` or `"5m"`.
    ///
    /// Supported units: `ns`, `us`, `ms`, `s`, `m`, `h`, `d`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let split_at = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| Error::malformed(format!("invalid duration '{s}'")))?;
        let (value, unit) = s.split_at(split_at);
        let value: i64 = value
            .parse()
            .map_err(|_| Error::malformed(format!("invalid duration '{s}'")))?;
        let ns_per_unit: i64 = match unit {
            "ns" => 1,
            "us" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60 * 1_000_000_000,
            "h" => 3_600 * 1_000_000_000,
            "d" => 86_400 * 1_000_000_000,
            other => return Err(Error::malformed(format!("unknown duration unit '{other}'"))),
        };
        Ok(Self(value * ns_per_unit))
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.0)
    }
}

impl Add for Duration {
    type Output = Duration;
    fn add(self, rhs: Self) -> Duration {
        Duration(self.0 + rhs.0)
    }
}

impl Sub for Duration {
    type Output = Duration;
    fn sub(self, rhs: Self) -> Duration {
        Duration(self.0 - rhs.0)
    }
}

impl Neg for Duration {
    type Output = Duration;
    fn neg(self) -> Duration {
        Duration(-self.0)
    }
}

impl Mul<f64> for Duration {
    type Output = Duration;
    fn mul(self, rhs: f64) -> Duration {
        Duration((self.0 as f64 * rhs).round() as i64)
    }
}

impl Div<i64> for Duration {
    type Output = Duration;
    fn div(self, rhs: i64) -> Duration {
        Duration(self.0 / rhs)
    }
}
