use std::fmt;

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::CoreError;

/// Wall-clock instant with nanosecond precision.
///
/// Doubles as the optimistic-concurrency token on a buyer record, so it is
/// persisted as integer nanoseconds and rendered as RFC 3339 with all nine
/// fractional digits. Equality is exact.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    pub fn from_nanos(nanos: i64) -> Self {
        Self(Utc.timestamp_nanos(nanos))
    }

    pub fn as_nanos(&self) -> Result<i64, CoreError> {
        self.0
            .timestamp_nanos_opt()
            .ok_or_else(|| CoreError::TimestampOutOfRange(self.to_rfc3339()))
    }

    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Nanos, true)
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| Self(dt.with_timezone(&Utc)))
            .map_err(|e| CoreError::InvalidData(format!("invalid timestamp {s:?}: {e}")))
    }

    /// The smallest representable instant strictly after `self`.
    pub fn successor(&self) -> Self {
        Self(self.0 + chrono::Duration::nanoseconds(1))
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.to_rfc3339())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s: String = Deserialize::deserialize(deserializer)?;
        Timestamp::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Issues strictly increasing timestamps.
///
/// Wall-clock readings that fail to move forward (coarse clocks, NTP steps)
/// are bumped one nanosecond past the last issued value.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last: Option<Timestamp>,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { last: None }
    }

    pub fn tick(&mut self) -> Timestamp {
        let now = Timestamp::now();
        let next = match self.last {
            Some(last) if now <= last => last.successor(),
            _ => now,
        };
        self.last = Some(next);
        next
    }

    /// Tick, but never return a value at or before `floor`.
    pub fn tick_after(&mut self, floor: Timestamp) -> Timestamp {
        let next = self.tick();
        if next > floor {
            return next;
        }
        let bumped = floor.successor();
        self.last = Some(bumped);
        bumped
    }

    pub fn last(&self) -> Option<Timestamp> {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_strictly_increase() {
        let mut clock = MonotonicClock::new();
        let mut prev = clock.tick();
        for _ in 0..1000 {
            let next = clock.tick();
            assert!(next > prev, "{next:?} should be > {prev:?}");
            prev = next;
        }
    }

    #[test]
    fn tick_after_future_floor() {
        let mut clock = MonotonicClock::new();
        let floor = Timestamp::from_datetime(Utc::now() + chrono::Duration::hours(1));
        let next = clock.tick_after(floor);
        assert!(next > floor);
        assert!(clock.tick() > next);
    }

    #[test]
    fn rfc3339_keeps_nanoseconds() {
        let ts = Timestamp::from_nanos(1_700_000_000_123_456_789);
        let text = ts.to_rfc3339();
        assert!(text.ends_with(".123456789Z"), "{text}");
        assert_eq!(Timestamp::parse(&text).unwrap(), ts);
        assert_eq!(ts.as_nanos().unwrap(), 1_700_000_000_123_456_789);
    }

    #[test]
    fn sub_millisecond_difference_is_inequality() {
        let a = Timestamp::from_nanos(1_700_000_000_000_000_000);
        let b = Timestamp::from_nanos(1_700_000_000_000_000_001);
        assert_ne!(a, b);
        assert_eq!(a.successor(), b);
    }

    #[test]
    fn serde_uses_rfc3339_string() {
        let ts = Timestamp::from_nanos(5);
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, "\"1970-01-01T00:00:00.000000005Z\"");
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
    }
}
