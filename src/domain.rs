use std::error::Error;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

pub mod field;
pub mod inventory;
pub mod project;
pub mod task;
pub mod user;

/// A cached record that lives in one backend table.
pub trait Entity: Serialize + DeserializeOwned + Clone {
    const TABLE: &'static str;
    const ID_PREFIX: &'static str;

    fn id(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseValueError {
    pub field: &'static str,
    pub value: String,
    pub expected: &'static str,
}

impl ParseValueError {
    pub fn new(field: &'static str, value: &str, expected: &'static str) -> Self {
        Self {
            field,
            value: value.to_string(),
            expected,
        }
    }
}

impl fmt::Display for ParseValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid {} '{}': expected one of {}",
            self.field, self.value, self.expected
        )
    }
}

impl Error for ParseValueError {}

pub(crate) fn normalize_token(raw: &str) -> String {
    raw.trim().to_ascii_lowercase().replace('-', "_")
}
