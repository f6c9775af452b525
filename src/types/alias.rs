// ABOUTME: Validated display name for a newly provisioned disk.
// ABOUTME: Rejects empty, oversized, and control-character aliases before any remote call.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

const MAX_ALIAS_LEN: usize = 255;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiskAliasError {
    #[error("disk alias cannot be empty")]
    Empty,

    #[error("disk alias exceeds maximum length of {MAX_ALIAS_LEN} characters")]
    TooLong,

    #[error("disk alias cannot start or end with whitespace")]
    SurroundingWhitespace,

    #[error("invalid control character in disk alias: {0:?}")]
    ControlChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DiskAlias(String);

impl DiskAlias {
    pub fn new(value: &str) -> Result<Self, DiskAliasError> {
        if value.is_empty() {
            return Err(DiskAliasError::Empty);
        }

        if value.chars().count() > MAX_ALIAS_LEN {
            return Err(DiskAliasError::TooLong);
        }

        if value.trim() != value {
            return Err(DiskAliasError::SurroundingWhitespace);
        }

        if let Some(c) = value.chars().find(|c| c.is_control()) {
            return Err(DiskAliasError::ControlChar(c));
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DiskAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for DiskAlias {
    type Err = DiskAliasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
