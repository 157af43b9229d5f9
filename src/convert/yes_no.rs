//! Serde adapter for the daemon's `"yes"`/`"no"` boolean rendering.
//!
//! Apply with `#[serde(with = "crate::convert::yes_no")]` on boolean record
//! fields. Deserialization also tolerates `true`/`false` and bare JSON
//! booleans, since the daemon and existing client code are not consistent.

use serde::de::{self, Deserializer, Unexpected};
use serde::{Deserialize, Serializer};

/// Serialize a bool as `"yes"` or `"no"`.
pub fn serialize<S>(value: &bool, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(if *value { "yes" } else { "no" })
}

/// Deserialize `"yes"`/`"no"` (or `"true"`/`"false"`, or a bare boolean).
pub fn deserialize<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Text(String),
        Bool(bool),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(flag) => Ok(flag),
        Flag::Text(text) => match text.as_str() {
            "yes" | "true" | "1" => Ok(true),
            "no" | "false" | "0" | "" => Ok(false),
            other => Err(de::Error::invalid_value(
                Unexpected::Str(other),
                &"\"yes\" or \"no\"",
            )),
        },
    }
}

/// `skip_serializing_if` helper for optional flags that default to `no`.
pub fn is_no(value: &bool) -> bool {
    !*value
}
