// ABOUTME: Correlation identifiers echoed to the management API for tracing.
// ABOUTME: Derived deterministically from the disk alias so logs line up across retries.

use super::DiskAlias;
use std::fmt;

/// Opaque tracing token attached to mutating API calls.
///
/// Has no effect on control flow; the remote side only records it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Build the correlation ID used for every call of one image upload.
    ///
    /// Characters outside `[A-Za-z0-9_-]` become `_` so the token survives
    /// query strings and remote log formats unchanged.
    pub fn for_upload(alias: &DiskAlias) -> Self {
        let sanitized: String = alias
            .as_str()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        Self(format!("image_transfer_{sanitized}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
