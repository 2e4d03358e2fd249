// ABOUTME: Custom serde deserializers for config values.
// ABOUTME: Handles signals given as names or numbers, and positive worker counts.

use serde::Deserialize;

use crate::types::Signal;

#[derive(Deserialize)]
#[serde(untagged)]
enum SignalEntry {
    Number(i64),
    Name(String),
}

/// Accept `SIGTERM`, `term`, or `15`.
pub fn deserialize_signal<'de, D>(deserializer: D) -> Result<Signal, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = match SignalEntry::deserialize(deserializer)? {
        SignalEntry::Number(n) => n.to_string(),
        SignalEntry::Name(s) => s,
    };
    raw.parse().map_err(serde::de::Error::custom)
}

pub fn deserialize_parallelism<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let n = usize::deserialize(deserializer)?;
    if n == 0 {
        return Err(serde::de::Error::custom("parallelism must be at least 1"));
    }
    Ok(n)
}
