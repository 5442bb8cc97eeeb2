use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, DISCORD_EPOCH_MS};

/// A 64-bit Discord identifier.
///
/// The high 42 bits encode the creation time in milliseconds since
/// [`DISCORD_EPOCH_MS`], which makes identifier order equal to creation order
/// and lets a wall-clock instant stand in as a pagination cursor. The value is
/// kept as a full `u64` throughout; it must never be widened into a float.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Snowflake(u64);

impl Snowflake {
    /// Creates a new identifier from its raw value.
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the identifier's raw value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Creates the identifier that a resource created at the given instant
    /// would sort next to.
    #[must_use]
    pub fn from_date(instant: DateTime<Utc>) -> Self {
        let offset = instant.timestamp_millis().saturating_sub(DISCORD_EPOCH_MS).max(0);
        #[allow(clippy::cast_sign_loss)]
        let offset = offset as u64;

        Self(offset << 22)
    }

    /// Returns the instant encoded in the identifier's high 42 bits.
    #[must_use]
    pub fn timestamp(self) -> DateTime<Utc> {
        #[allow(clippy::cast_possible_wrap)]
        let offset = (self.0 >> 22) as i64;

        Utc.timestamp_millis_opt(offset + DISCORD_EPOCH_MS)
            .single()
            .unwrap_or_default()
    }

    /// Parses an identifier from a decimal string or an ISO-8601 date.
    ///
    /// Dates are interpreted as UTC and converted through [`Self::from_date`],
    /// so they can bound a message range the same way a real identifier does.
    ///
    /// # Errors
    ///
    /// This function will return an error if the value is neither a decimal
    /// identifier nor a recognisable date.
    pub fn parse(value: &str) -> crate::Result<Self> {
        if let Ok(raw) = value.parse::<u64>() {
            return Ok(Self(raw));
        }

        if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
            return Ok(Self::from_date(instant.with_timezone(&Utc)));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
            return Ok(Self::from_date(naive.and_utc()));
        }
        if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
            return Ok(Self::from_date(date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc()));
        }

        Err(Error::InvalidCursor(value.to_owned()))
    }
}

impl Display for Snowflake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Snowflake {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl From<u64> for Snowflake {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl Serialize for Snowflake {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Snowflake {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SnowflakeVisitor;

        impl Visitor<'_> for SnowflakeVisitor {
            type Value = Snowflake;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a decimal string or integer identifier")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
                Ok(Snowflake(value))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
                value.parse().map(Snowflake).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(SnowflakeVisitor)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Datelike;

    use super::*;

    #[test]
    fn decimal_round_trips() {
        let id = Snowflake::parse("175928847299117063").unwrap();

        assert_eq!(id.to_string(), "175928847299117063");
    }

    #[test]
    fn timestamp_matches_known_id() {
        let id = Snowflake::parse("175928847299117063").unwrap();
        let instant = id.timestamp();

        assert_eq!(instant.year(), 2016);
        assert_eq!(instant.month(), 4);
    }

    #[test]
    fn date_round_trips_within_a_second() {
        let instant = Utc.with_ymd_and_hms(2020, 6, 15, 12, 30, 45).unwrap();
        let id = Snowflake::from_date(instant);

        assert!((id.timestamp() - instant).num_milliseconds().abs() <= 1_000);
    }

    #[test]
    fn iso_date_parses_as_cursor() {
        let id = Snowflake::parse("2016-04-30").unwrap();

        assert_eq!(id.timestamp().year(), 2016);
        assert_eq!(id.timestamp().month(), 4);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(Snowflake::parse("not-an-id").is_err());
    }

    #[test]
    fn order_follows_time() {
        let early = Snowflake::from_date(Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap());
        let late = Snowflake::from_date(Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap());

        assert!(early < late);
    }
}
