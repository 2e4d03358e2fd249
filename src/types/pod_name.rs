// ABOUTME: Validated pod name type.
// ABOUTME: Names start alphanumeric and continue with alphanumerics, '_', '.' or '-'.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

const MAX_LEN: usize = 63;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PodNameError {
    #[error("pod name cannot be empty")]
    Empty,

    #[error("pod name exceeds maximum length of 63 characters")]
    TooLong,

    #[error("pod name must start with a letter or digit, found '{0}'")]
    InvalidStart(char),

    #[error("invalid character in pod name: '{0}'")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PodName(String);

impl PodName {
    pub fn new(value: &str) -> Result<Self, PodNameError> {
        let mut chars = value.chars();

        let first = chars.next().ok_or(PodNameError::Empty)?;

        if value.len() > MAX_LEN {
            return Err(PodNameError::TooLong);
        }

        if !first.is_ascii_alphanumeric() {
            return Err(PodNameError::InvalidStart(first));
        }

        for c in chars {
            if !c.is_ascii_alphanumeric() && !matches!(c, '_' | '.' | '-') {
                return Err(PodNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PodName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for PodName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PodName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        PodName::new(&s).map_err(serde::de::Error::custom)
    }
}
