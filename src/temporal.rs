// ⏰ Temporal helpers - every timestamp in the ledger is UTC
//
// Older state files carry naive ISO timestamps ("2024-05-01T12:34:56.123456",
// no offset). They are read as UTC. New files always get RFC 3339 with `Z`.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};

// ============================================================================
// PARSE / FORMAT
// ============================================================================

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// Parse a timestamp, accepting RFC 3339 or naive ISO 8601 (assumed UTC)
pub fn parse_utc(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    NAIVE_FORMATS.iter().find_map(|fmt| {
        NaiveDateTime::parse_from_str(raw, fmt)
            .ok()
            .map(|naive| Utc.from_utc_datetime(&naive))
    })
}

/// Canonical on-disk form
pub fn format_utc(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Human form used on the status page: `31-12-2024 23:59:59 UTC`
pub fn display_utc(dt: &DateTime<Utc>) -> String {
    dt.format("%d-%m-%Y %H:%M:%S UTC").to_string()
}

// ============================================================================
// SERDE ADAPTERS
// ============================================================================

/// `#[serde(with = "crate::temporal::lenient")]` for `DateTime<Utc>`
pub mod lenient {
    use super::{format_utc, parse_utc};
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_utc(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_utc(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp: {raw:?}")))
    }
}

/// Same as [`lenient`] for optional fields; `null` and missing both read as `None`
pub mod lenient_option {
    use super::{format_utc, parse_utc};
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        dt: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match dt {
            Some(dt) => serializer.serialize_str(&format_utc(dt)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => parse_utc(&raw)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {raw:?}"))),
            None => Ok(None),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
