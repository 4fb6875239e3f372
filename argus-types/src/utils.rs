//! Various utilities, mostly timestamp serialization.

use std::time::{Duration, SystemTime};

/// Converts a `SystemTime` object into a float timestamp.
pub fn datetime_to_timestamp(st: &SystemTime) -> f64 {
    match st.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(duration) => duration.as_secs_f64(),
        Err(_) => 0.0,
    }
}

/// Converts a float timestamp back into a `SystemTime`.
pub fn timestamp_to_datetime(ts: f64) -> Option<SystemTime> {
    if !ts.is_finite() || ts < 0.0 {
        return None;
    }
    SystemTime::UNIX_EPOCH.checked_add(Duration::from_secs_f64(ts))
}

/// Serde support for timestamps as float seconds since the unix epoch.
pub mod ts_seconds_float {
    use std::fmt;

    use serde::{de, ser};

    use super::*;

    /// Deserializes a float or integer timestamp.
    pub fn deserialize<'de, D>(d: D) -> Result<SystemTime, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        d.deserialize_any(SecondsTimestampVisitor)
    }

    /// Serializes a timestamp as float (or integer) seconds.
    pub fn serialize<S>(st: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        match st.duration_since(SystemTime::UNIX_EPOCH) {
            Ok(duration) => {
                if duration.subsec_nanos() == 0 {
                    serializer.serialize_u64(duration.as_secs())
                } else {
                    serializer.serialize_f64(duration.as_secs_f64())
                }
            }
            Err(_) => Err(ser::Error::custom(format!(
                "invalid `SystemTime` instance: {:?}",
                st
            ))),
        }
    }

    pub(super) struct SecondsTimestampVisitor;

    impl<'de> de::Visitor<'de> for SecondsTimestampVisitor {
        type Value = SystemTime;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            write!(formatter, "a unix timestamp")
        }

        fn visit_f64<E>(self, value: f64) -> Result<SystemTime, E>
        where
            E: de::Error,
        {
            match timestamp_to_datetime(value) {
                Some(st) => Ok(st),
                None => Err(E::custom(format!("invalid timestamp: {}", value))),
            }
        }

        fn visit_i64<E>(self, value: i64) -> Result<SystemTime, E>
        where
            E: de::Error,
        {
            if value < 0 {
                return Err(E::custom(format!("invalid timestamp: {}", value)));
            }
            self.visit_u64(value as u64)
        }

        fn visit_u64<E>(self, value: u64) -> Result<SystemTime, E>
        where
            E: de::Error,
        {
            match SystemTime::UNIX_EPOCH.checked_add(Duration::from_secs(value)) {
                Some(st) => Ok(st),
                None => Err(E::custom(format!("invalid timestamp: {}", value))),
            }
        }
    }

    /// The same serialization for `Option<SystemTime>` fields.
    pub mod option {
        use super::*;

        /// Deserializes an optional timestamp.
        pub fn deserialize<'de, D>(d: D) -> Result<Option<SystemTime>, D::Error>
        where
            D: de::Deserializer<'de>,
        {
            let opt: Option<serde_json::Value> = de::Deserialize::deserialize(d)?;
            match opt {
                None => Ok(None),
                Some(value) => {
                    let ts = value
                        .as_f64()
                        .and_then(timestamp_to_datetime)
                        .ok_or_else(|| de::Error::custom("invalid timestamp"))?;
                    Ok(Some(ts))
                }
            }
        }

        /// Serializes an optional timestamp.
        pub fn serialize<S>(st: &Option<SystemTime>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: ser::Serializer,
        {
            match st {
                Some(st) => super::serialize(st, serializer),
                None => serializer.serialize_none(),
            }
        }
    }
}
