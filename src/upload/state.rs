// ABOUTME: Upload state marker types for the type state pattern.
// ABOUTME: Each state carries the remote handles that exist at that point, nothing more.

use std::fmt;

use serde::Serialize;

use crate::api::{Disk, TransferDescriptor};
use crate::types::DiskId;

/// Phase of an upload as seen by observers of the progress handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadPhase {
    Init,
    FormatDetected,
    DiskCreated,
    DiskReady,
    TransferOpened,
    TransferReady,
    Uploaded,
    Finalized,
    /// Disk ready again after finalization.
    Consolidated,
    Completed,
    Failed,
}

impl UploadPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadPhase::Completed | UploadPhase::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UploadPhase::Init => "init",
            UploadPhase::FormatDetected => "format_detected",
            UploadPhase::DiskCreated => "disk_created",
            UploadPhase::DiskReady => "disk_ready",
            UploadPhase::TransferOpened => "transfer_opened",
            UploadPhase::TransferReady => "transfer_ready",
            UploadPhase::Uploaded => "uploaded",
            UploadPhase::Finalized => "finalized",
            UploadPhase::Consolidated => "consolidated",
            UploadPhase::Completed => "completed",
            UploadPhase::Failed => "failed",
        }
    }
}

impl fmt::Display for UploadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Links a state marker to the phase it publishes.
pub trait Phase {
    const PHASE: UploadPhase;
}

/// States in which a disk exists and must be removed on failure.
pub trait HoldsDisk: Phase {
    fn disk_id(&self) -> &DiskId;
}

/// Header classified, nothing remote exists yet.
/// Available actions: `create_disk()`
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatDetected;

/// Disk requested; the remote side may still be preparing it.
/// Available actions: `wait_until_ready()`, `rollback()`
#[derive(Debug, Clone)]
pub struct DiskCreated {
    pub(crate) disk: DiskId,
}

/// Disk usable.
/// Available actions: `open_transfer()`, `rollback()`
#[derive(Debug, Clone)]
pub struct DiskReady {
    pub(crate) disk: DiskId,
}

/// Transfer session opened.
/// Available actions: `wait_for_transfer()`, `rollback()`
#[derive(Debug, Clone)]
pub struct TransferOpened {
    pub(crate) disk: DiskId,
    pub(crate) transfer: TransferDescriptor,
}

/// Transfer session accepting bytes.
/// Available actions: `send_image()`, `rollback()`
#[derive(Debug, Clone)]
pub struct TransferReady {
    pub(crate) disk: DiskId,
    pub(crate) transfer: TransferDescriptor,
}

/// All bytes streamed.
/// Available actions: `finalize()`, `rollback()`
#[derive(Debug, Clone)]
pub struct Uploaded {
    pub(crate) disk: DiskId,
    pub(crate) transfer: TransferDescriptor,
}

/// Transfer finalized; the remote side is consolidating the image.
/// Available actions: `wait_until_consolidated()`, `rollback()`
#[derive(Debug, Clone)]
pub struct Finalized {
    pub(crate) disk: DiskId,
}

/// Disk ready after finalization.
/// Available actions: `complete()`, `rollback()`
#[derive(Debug, Clone)]
pub struct Consolidated {
    pub(crate) disk: Disk,
}

/// Upload done.
/// Available actions: `into_disk()`
#[derive(Debug, Clone)]
pub struct Completed {
    pub(crate) disk: Disk,
}

impl Phase for FormatDetected {
    const PHASE: UploadPhase = UploadPhase::FormatDetected;
}

impl Phase for DiskCreated {
    const PHASE: UploadPhase = UploadPhase::DiskCreated;
}

impl Phase for DiskReady {
    const PHASE: UploadPhase = UploadPhase::DiskReady;
}

impl Phase for TransferOpened {
    const PHASE: UploadPhase = UploadPhase::TransferOpened;
}

impl Phase for TransferReady {
    const PHASE: UploadPhase = UploadPhase::TransferReady;
}

impl Phase for Uploaded {
    const PHASE: UploadPhase = UploadPhase::Uploaded;
}

impl Phase for Finalized {
    const PHASE: UploadPhase = UploadPhase::Finalized;
}

impl Phase for Consolidated {
    const PHASE: UploadPhase = UploadPhase::Consolidated;
}

impl Phase for Completed {
    const PHASE: UploadPhase = UploadPhase::Completed;
}

impl HoldsDisk for DiskCreated {
    fn disk_id(&self) -> &DiskId {
        &self.disk
    }
}

impl HoldsDisk for DiskReady {
    fn disk_id(&self) -> &DiskId {
        &self.disk
    }
}

impl HoldsDisk for TransferOpened {
    fn disk_id(&self) -> &DiskId {
        &self.disk
    }
}

impl HoldsDisk for TransferReady {
    fn disk_id(&self) -> &DiskId {
        &self.disk
    }
}

impl HoldsDisk for Uploaded {
    fn disk_id(&self) -> &DiskId {
        &self.disk
    }
}

impl HoldsDisk for Finalized {
    fn disk_id(&self) -> &DiskId {
        &self.disk
    }
}

impl HoldsDisk for Consolidated {
    fn disk_id(&self) -> &DiskId {
        &self.disk.id
    }
}
