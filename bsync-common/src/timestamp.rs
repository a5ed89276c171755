//! Millisecond-precision UTC timestamps in the server's wire format.
//!
//! The server emits and accepts ISO-8601 timestamps with an explicit offset,
//! e.g. `2024-01-01T00:00:00.000+00:00`. Parsing accepts any RFC 3339
//! fractional precision; formatting always produces exactly three fractional
//! digits so the text form has a fixed length.

use chrono::{DateTime, Utc};

pub type Timestamp = DateTime<Utc>;

/// `2024-01-01T00:00:00.000+00:00`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%:z";

/// Text length of a formatted [`Timestamp`].
pub const TIMESTAMP_LENGTH: usize = 29;

/// The "zero" timestamp carried by locally fabricated records.
#[must_use]
pub fn zero() -> Timestamp {
    Timestamp::default()
}

#[must_use]
pub fn format_timestamp(ts: Timestamp) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(text: &str) -> Result<Timestamp, chrono::ParseError> {
    DateTime::parse_from_rfc3339(text).map(|ts| ts.with_timezone(&Utc))
}

/// Serde adapter for `Timestamp` fields in wire models.
pub mod serde_format {
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::{format_timestamp, parse_timestamp, Timestamp};

    pub fn serialize<S: Serializer>(ts: &Timestamp, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_timestamp(*ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse_timestamp(&text).map_err(de::Error::custom)
    }
}

/// Serde adapter for `Option<Timestamp>` fields in wire models.
pub mod serde_format_opt {
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::{format_timestamp, parse_timestamp, Timestamp};

    pub fn serialize<S: Serializer>(
        ts: &Option<Timestamp>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match ts {
            Some(ts) => serializer.serialize_some(&format_timestamp(*ts)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Timestamp>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(text) => parse_timestamp(&text).map(Some).map_err(de::Error::custom),
            None => Ok(None),
        }
    }
}
