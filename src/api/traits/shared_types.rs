// ABOUTME: Value types shared between the disk and transfer traits.
// ABOUTME: Disk specs and snapshots, disk readiness, transfer descriptors and phases.

use crate::image::ImageFormat;
use crate::types::{DiskAlias, DiskId, StorageDomainId, TransferId};
use hyper::Uri;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::pin::Pin;
use tokio::io::AsyncRead;

/// Byte stream handed to `TransferOps::send_image`.
pub type ImageStream = Pin<Box<dyn AsyncRead + Send + 'static>>;

/// What to provision.
#[derive(Debug, Clone)]
pub struct DiskSpec {
    pub alias: DiskAlias,
    pub format: ImageFormat,
    pub sizes: DiskSizes,
    pub storage_domain: StorageDomainId,
    pub sparse: bool,
}

/// Provisioned vs. initial size of a new disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskSizes {
    /// Size visible to the guest.
    pub provisioned: u64,
    /// Bytes that will actually be written.
    pub initial: u64,
}

/// Disk as reported by the management API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Disk {
    pub id: DiskId,
    pub alias: String,
    pub format: ImageFormat,
    pub provisioned_size: u64,
    pub initial_size: Option<u64>,
    pub sparse: bool,
    pub storage_domain: Option<StorageDomainId>,
    pub status: String,
}

/// Readiness of a disk. Every remote status other than "ok" is `NotReady`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiskStatus {
    Ready(Disk),
    NotReady { reason: String },
}

impl DiskStatus {
    pub fn not_ready(reason: impl Into<String>) -> Self {
        DiskStatus::NotReady {
            reason: reason.into(),
        }
    }
}

/// An open image transfer session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferDescriptor {
    pub id: TransferId,
    /// In order of preference: direct transfer URL, then proxy URL.
    pub candidate_endpoints: Vec<Uri>,
    pub phase: TransferPhase,
}

/// Lifecycle phase of an image transfer as reported by the remote side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferPhase {
    Initializing,
    Transferring,
    Resuming,
    PausedSystem,
    PausedUser,
    Cancelled,
    CancelledSystem,
    CancelledUser,
    FinalizingSuccess,
    FinalizingFailure,
    FinalizingCleanup,
    FinishedSuccess,
    FinishedFailure,
    FinishedCleanup,
    #[serde(other)]
    Unknown,
}

impl TransferPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferPhase::Initializing => "initializing",
            TransferPhase::Transferring => "transferring",
            TransferPhase::Resuming => "resuming",
            TransferPhase::PausedSystem => "paused_system",
            TransferPhase::PausedUser => "paused_user",
            TransferPhase::Cancelled => "cancelled",
            TransferPhase::CancelledSystem => "cancelled_system",
            TransferPhase::CancelledUser => "cancelled_user",
            TransferPhase::FinalizingSuccess => "finalizing_success",
            TransferPhase::FinalizingFailure => "finalizing_failure",
            TransferPhase::FinalizingCleanup => "finalizing_cleanup",
            TransferPhase::FinishedSuccess => "finished_success",
            TransferPhase::FinishedFailure => "finished_failure",
            TransferPhase::FinishedCleanup => "finished_cleanup",
            TransferPhase::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TransferPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_parses_remote_spelling() {
        let phase: TransferPhase = serde_json::from_str("\"paused_system\"").unwrap();
        assert_eq!(phase, TransferPhase::PausedSystem);
        assert_eq!(phase.to_string(), "paused_system");
    }

    #[test]
    fn unknown_phase_spelling_maps_to_unknown() {
        let phase: TransferPhase = serde_json::from_str("\"warping\"").unwrap();
        assert_eq!(phase, TransferPhase::Unknown);
    }
}
