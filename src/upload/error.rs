// ABOUTME: Error types for image upload sessions.
// ABOUTME: One variant per failure cause; poll reasons are wrapped rather than dropped.

use crate::image::ImageError;

/// Terminal cause of a failed upload.
///
/// Cloneable so every observer of a progress handle can hold its own copy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    /// The image header could not be read.
    #[error("malformed image: {0}")]
    MalformedInput(String),

    /// Disk creation was refused or failed.
    #[error("disk provisioning failed: {0}")]
    Provisioning(String),

    /// The image transfer session could not be opened.
    #[error("failed to set up image transfer: {0}")]
    TransferSetup(String),

    /// The image transfer could not be finalized.
    #[error("failed to finalize image transfer: {0}")]
    Finalize(String),

    /// Every candidate endpoint failed its probe.
    #[error("no reachable transfer endpoint (last error: {last_error})")]
    NoReachableEndpoint { last_error: String },

    /// The transfer session listed no endpoint at all.
    #[error("the management API offered no transfer endpoint")]
    NoTransferEndpoint,

    /// Streaming the image bytes failed.
    #[error("image upload failed: {0}")]
    UploadTransport(String),

    /// Cancelled or timed out at a poll or read boundary.
    #[error("deadline exceeded while waiting for {waiting_for}{}", last_status(.last_reason))]
    DeadlineExceeded {
        waiting_for: String,
        last_reason: Option<String>,
    },

    /// The disk vanished while the upload was waiting on it.
    #[error("disk disappeared during upload: {0}")]
    StaleDiskState(String),

    /// The background task stopped without recording an outcome.
    #[error("upload aborted: {0}")]
    Aborted(String),
}

fn last_status(reason: &Option<String>) -> String {
    reason
        .as_ref()
        .map(|r| format!(" (last status: {r})"))
        .unwrap_or_default()
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadErrorKind {
    MalformedInput,
    Provisioning,
    TransferSetup,
    Finalize,
    NoReachableEndpoint,
    NoTransferEndpoint,
    UploadTransport,
    DeadlineExceeded,
    StaleDiskState,
    Aborted,
}

impl UploadError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> UploadErrorKind {
        match self {
            UploadError::MalformedInput(_) => UploadErrorKind::MalformedInput,
            UploadError::Provisioning(_) => UploadErrorKind::Provisioning,
            UploadError::TransferSetup(_) => UploadErrorKind::TransferSetup,
            UploadError::Finalize(_) => UploadErrorKind::Finalize,
            UploadError::NoReachableEndpoint { .. } => UploadErrorKind::NoReachableEndpoint,
            UploadError::NoTransferEndpoint => UploadErrorKind::NoTransferEndpoint,
            UploadError::UploadTransport(_) => UploadErrorKind::UploadTransport,
            UploadError::DeadlineExceeded { .. } => UploadErrorKind::DeadlineExceeded,
            UploadError::StaleDiskState(_) => UploadErrorKind::StaleDiskState,
            UploadError::Aborted(_) => UploadErrorKind::Aborted,
        }
    }

    pub(crate) fn deadline(waiting_for: &str, last_reason: Option<String>) -> Self {
        UploadError::DeadlineExceeded {
            waiting_for: waiting_for.to_string(),
            last_reason,
        }
    }
}

impl From<ImageError> for UploadError {
    fn from(err: ImageError) -> Self {
        UploadError::MalformedInput(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_display_includes_last_reason() {
        let err = UploadError::deadline("disk to become ready", Some("disk d1 is locked".into()));
        assert_eq!(
            err.to_string(),
            "deadline exceeded while waiting for disk to become ready (last status: disk d1 is locked)"
        );
    }

    #[test]
    fn deadline_display_without_reason() {
        let err = UploadError::deadline("image upload", None);
        assert_eq!(err.to_string(), "deadline exceeded while waiting for image upload");
    }

    #[test]
    fn truncated_header_is_malformed_input() {
        let err: UploadError = ImageError::Truncated { read: 3 }.into();
        assert_eq!(err.kind(), UploadErrorKind::MalformedInput);
    }
}
