//! `DateTime<Utc>` as fractional seconds since the Unix epoch.
//!
//! Used with `#[serde(with = "epoch_seconds")]`. Deserialization accepts both
//! integer and fractional JSON numbers; serialization always writes a float
//! with microsecond precision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serializer, de};

pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(to_secs(value))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let secs = f64::deserialize(deserializer)?;
    from_secs(secs).ok_or_else(|| de::Error::custom(format!("timestamp out of range: {secs}")))
}

#[must_use]
pub fn to_secs(value: &DateTime<Utc>) -> f64 {
    value.timestamp() as f64 + f64::from(value.timestamp_subsec_micros()) / 1_000_000.0
}

#[must_use]
pub fn from_secs(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1_000_000_000.0).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
}

/// `Option<DateTime<Utc>>` variant for partial updates.
pub mod option {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(at) => serializer.serialize_some(&super::to_secs(at)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        Option::<f64>::deserialize(deserializer)?
            .map(|secs| {
                super::from_secs(secs)
                    .ok_or_else(|| de::Error::custom(format!("timestamp out of range: {secs}")))
            })
            .transpose()
    }
}
