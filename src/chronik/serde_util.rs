//! The indexer has shipped integers both as JSON numbers and as decimal
//! strings over its lifetime. These helpers accept either.

use serde::de::{self, Deserializer};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum NumOrString {
    Num(u64),
    Signed(i64),
    Str(String),
}

pub fn u64_from_any<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumOrString::deserialize(deserializer)? {
        NumOrString::Num(n) => Ok(n),
        NumOrString::Signed(n) => u64::try_from(n).map_err(de::Error::custom),
        NumOrString::Str(s) => s.trim().parse().map_err(de::Error::custom),
    }
}

pub fn i64_from_any<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumOrString::deserialize(deserializer)? {
        NumOrString::Num(n) => i64::try_from(n).map_err(de::Error::custom),
        NumOrString::Signed(n) => Ok(n),
        NumOrString::Str(s) => s.trim().parse().map_err(de::Error::custom),
    }
}

/// Token amounts can exceed 53 bits, so they are kept as decimal strings.
pub fn amount_string_from_any<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match NumOrString::deserialize(deserializer)? {
        NumOrString::Num(n) => Ok(n.to_string()),
        NumOrString::Signed(n) => Ok(n.to_string()),
        NumOrString::Str(s) => {
            if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
                return Err(de::Error::custom(format!("invalid token amount '{}'", s)));
            }
            Ok(s)
        }
    }
}
