//! Serde adapters for config values.

/// Durations as human-readable strings ("10s", "500ms", "1m 30s").
///
/// Use with `#[serde(with = "crate::utils::serde_helpers::duration")]`.
pub mod duration {
    use serde::de::Error as DeError;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(d: &Duration, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_str(&humantime::format_duration(*d).to_string())
    }

    pub fn deserialize<'de, D>(d: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(d)?;
        humantime::parse_duration(s.trim()).map_err(D::Error::custom)
    }
}
