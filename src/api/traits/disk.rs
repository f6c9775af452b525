// ABOUTME: Disk provisioning operations against the management API.
// ABOUTME: Create, poll, and remove disks; the caller owns retry cadence.

use super::shared_types::{DiskSpec, DiskStatus};
use crate::types::{CorrelationId, DiskId};
use async_trait::async_trait;

/// Disk lifecycle operations.
#[async_trait]
pub trait DiskOps: Send + Sync {
    /// Ask the remote side to create a disk. Returns once the disk has an ID,
    /// which is usually before it is usable.
    async fn create_disk(
        &self,
        spec: &DiskSpec,
        correlation: &CorrelationId,
    ) -> Result<DiskId, DiskError>;

    /// Single, non-blocking status poll.
    async fn poll_disk_status(&self, id: &DiskId) -> Result<DiskStatus, DiskError>;

    /// Remove a disk.
    async fn remove_disk(&self, id: &DiskId) -> Result<(), DiskError>;
}

/// Errors from disk operations.
#[derive(Debug, thiserror::Error)]
pub enum DiskError {
    #[error("disk not found: {0}")]
    NotFound(String),

    #[error("disk request rejected: {0}")]
    Rejected(String),

    #[error("management API error: {0}")]
    Api(String),

    /// The disk exists but reports something this client cannot handle.
    #[error("unsupported disk: {0}")]
    Unsupported(String),
}
