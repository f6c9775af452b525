// ABOUTME: State transition methods for image upload orchestration.
// ABOUTME: Each method consumes self and returns the next state, or itself plus the cause for rollback.

use hyper::Uri;
use tokio::io::AsyncRead;

use super::error::UploadError;
use super::poll::{Attempt, poll_until};
use super::session::Upload;
use super::state::{
    Completed, Consolidated, DiskCreated, DiskReady, Finalized, FormatDetected, HoldsDisk,
    TransferOpened, TransferReady, Uploaded,
};
use super::stream::stream_image;
use crate::api::{
    Disk, DiskError, DiskOps, DiskSizes, DiskSpec, DiskStatus, TransferError, TransferOps,
    TransferPhase,
};
use crate::diagnostics::Warning;
use crate::types::DiskId;

/// Result type for transitions that may need rollback on failure.
pub type TransitionResult<T, S> = Result<Upload<T>, (Upload<S>, UploadError)>;

// =============================================================================
// Internal Helpers
// =============================================================================

impl<S> Upload<S> {
    /// Poll the disk until the remote side reports it usable.
    async fn poll_disk_ready<D: DiskOps + ?Sized>(
        &self,
        disks: &D,
        disk: &DiskId,
        waiting_for: &str,
    ) -> Result<Disk, UploadError> {
        poll_until(self.poll_interval, &self.cancel, waiting_for, || async move {
            match disks.poll_disk_status(disk).await {
                Ok(DiskStatus::Ready(disk)) => Ok(Attempt::Ready(disk)),
                Ok(DiskStatus::NotReady { reason }) => Ok(Attempt::Pending(reason)),
                Err(DiskError::NotFound(msg)) => Err(UploadError::StaleDiskState(msg)),
                Err(DiskError::Unsupported(msg)) => Err(UploadError::Provisioning(msg)),
                Err(e) => Ok(Attempt::Pending(e.to_string())),
            }
        })
        .await
    }
}

impl<S: HoldsDisk> Upload<S> {
    /// Remove the disk this upload created.
    ///
    /// Called once per failed upload. The outcome is returned for logging only;
    /// it never replaces the cause of the failure.
    pub async fn rollback<D: DiskOps + ?Sized>(self, disks: &D) -> Result<DiskId, DiskError> {
        let disk = self.state.disk_id().clone();
        tracing::info!(alias = %self.alias, %disk, phase = %S::PHASE, "rolling back disk");

        match disks.remove_disk(&disk).await {
            Ok(()) => Ok(disk),
            Err(e) => {
                self.tracker.warn(Warning::rollback_failed(format!(
                    "failed to remove disk {disk}: {e}"
                )));
                Err(e)
            }
        }
    }
}

// =============================================================================
// FormatDetected -> DiskCreated
// =============================================================================

impl Upload<FormatDetected> {
    /// Ask the management API for a new disk sized for this image.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::Provisioning`. No disk exists yet, so there is
    /// nothing to roll back.
    #[must_use = "upload state must be used"]
    pub async fn create_disk<D: DiskOps + ?Sized>(
        self,
        disks: &D,
    ) -> Result<Upload<DiskCreated>, UploadError> {
        let spec = DiskSpec {
            alias: self.alias.clone(),
            format: self.detection.format,
            sizes: DiskSizes {
                provisioned: self.detection.virtual_size,
                initial: self.detection.declared_size,
            },
            storage_domain: self.storage_domain.clone(),
            sparse: self.sparse,
        };

        let disk = disks
            .create_disk(&spec, &self.correlation)
            .await
            .map_err(|e| UploadError::Provisioning(e.to_string()))?;

        tracing::info!(alias = %self.alias, %disk, format = %spec.format, "disk created");
        Ok(self.transition(DiskCreated { disk }))
    }
}

// =============================================================================
// DiskCreated -> DiskReady
// =============================================================================

impl Upload<DiskCreated> {
    /// Wait for the new disk to become usable.
    ///
    /// # Errors
    ///
    /// Returns `(self, error)` on failure to allow rollback.
    #[must_use = "upload state must be used"]
    pub async fn wait_until_ready<D: DiskOps + ?Sized>(
        self,
        disks: &D,
    ) -> TransitionResult<DiskReady, DiskCreated> {
        let disk = self.state.disk.clone();
        match self.poll_disk_ready(disks, &disk, "disk to become ready").await {
            Ok(_) => Ok(self.transition(DiskReady { disk })),
            Err(e) => Err((self, e)),
        }
    }
}

// =============================================================================
// DiskReady -> TransferOpened
// =============================================================================

impl Upload<DiskReady> {
    /// Open an image transfer session for the disk.
    ///
    /// # Errors
    ///
    /// Returns `(self, UploadError::TransferSetup)` to allow rollback.
    #[must_use = "upload state must be used"]
    pub async fn open_transfer<T: TransferOps + ?Sized>(
        self,
        transfers: &T,
    ) -> TransitionResult<TransferOpened, DiskReady> {
        match transfers
            .open_transfer(&self.state.disk, &self.correlation)
            .await
        {
            Ok(transfer) => {
                tracing::debug!(transfer = %transfer.id, phase = %transfer.phase, "transfer opened");
                let disk = self.state.disk.clone();
                Ok(self.transition(TransferOpened { disk, transfer }))
            }
            Err(e) => Err((self, UploadError::TransferSetup(e.to_string()))),
        }
    }
}

// =============================================================================
// TransferOpened -> TransferReady
// =============================================================================

impl Upload<TransferOpened> {
    /// Wait until the transfer session reports `transferring`.
    ///
    /// Other phases are expected on the way and only remembered as the reason
    /// for a possible timeout.
    ///
    /// # Errors
    ///
    /// Returns `(self, error)` on cancellation or if the session vanished.
    #[must_use = "upload state must be used"]
    pub async fn wait_for_transfer<T: TransferOps + ?Sized>(
        self,
        transfers: &T,
    ) -> TransitionResult<TransferReady, TransferOpened> {
        let id = self.state.transfer.id.clone();
        let result = poll_until(
            self.poll_interval,
            &self.cancel,
            "transfer to start",
            || {
                let id = &id;
                async move {
                    match transfers.poll_transfer_phase(id).await {
                        Ok(TransferPhase::Transferring) => Ok(Attempt::Ready(())),
                        Ok(phase) => Ok(Attempt::Pending(format!("transfer {id} is {phase}"))),
                        Err(TransferError::NotFound(msg)) => Err(UploadError::TransferSetup(msg)),
                        Err(e) => Ok(Attempt::Pending(e.to_string())),
                    }
                }
            },
        )
        .await;

        match result {
            Ok(()) => {
                let TransferOpened { disk, transfer } = self.state.clone();
                Ok(self.transition(TransferReady { disk, transfer }))
            }
            Err(e) => Err((self, e)),
        }
    }
}

// =============================================================================
// TransferReady -> Uploaded
// =============================================================================

impl Upload<TransferReady> {
    /// Resolve a reachable endpoint and stream the image to it.
    ///
    /// `source` must yield the whole image, header included.
    ///
    /// # Errors
    ///
    /// Returns `(self, error)` to allow rollback.
    #[must_use = "upload state must be used"]
    pub async fn send_image<T, R>(
        self,
        transfers: &T,
        source: R,
    ) -> TransitionResult<Uploaded, TransferReady>
    where
        T: TransferOps + ?Sized,
        R: AsyncRead + Send + Unpin + 'static,
    {
        let endpoint = match self.resolve_endpoint(transfers).await {
            Ok(endpoint) => endpoint,
            Err(e) => return Err((self, e)),
        };

        let length = self.detection.declared_size;
        tracing::info!(alias = %self.alias, %endpoint, length, "streaming image");

        if let Err(e) = stream_image(
            transfers,
            &endpoint,
            source,
            length,
            self.tracker.byte_counter(),
            &self.cancel,
        )
        .await
        {
            return Err((self, e));
        }

        let TransferReady { disk, transfer } = self.state.clone();
        Ok(self.transition(Uploaded { disk, transfer }))
    }

    async fn resolve_endpoint<T: TransferOps + ?Sized>(
        &self,
        transfers: &T,
    ) -> Result<Uri, UploadError> {
        let descriptor = &self.state.transfer;
        let endpoint = transfers
            .resolve_endpoint(descriptor)
            .await
            .map_err(|e| match e {
                TransferError::NoEndpoint => UploadError::NoTransferEndpoint,
                TransferError::Unreachable(last_error) => {
                    UploadError::NoReachableEndpoint { last_error }
                }
                other => UploadError::TransferSetup(other.to_string()),
            })?;

        if descriptor.candidate_endpoints.first() != Some(&endpoint) {
            self.tracker.warn(Warning::endpoint_fallback(format!(
                "preferred transfer endpoint unreachable, using {endpoint}"
            )));
        }
        Ok(endpoint)
    }
}

// =============================================================================
// Uploaded -> Finalized
// =============================================================================

impl Upload<Uploaded> {
    /// Tell the management API the upload is complete.
    ///
    /// # Errors
    ///
    /// Returns `(self, UploadError::Finalize)` to allow rollback.
    #[must_use = "upload state must be used"]
    pub async fn finalize<T: TransferOps + ?Sized>(
        self,
        transfers: &T,
    ) -> TransitionResult<Finalized, Uploaded> {
        match transfers
            .finalize_transfer(&self.state.transfer.id, &self.correlation)
            .await
        {
            Ok(()) => {
                let disk = self.state.disk.clone();
                Ok(self.transition(Finalized { disk }))
            }
            Err(e) => Err((self, UploadError::Finalize(e.to_string()))),
        }
    }
}

// =============================================================================
// Finalized -> Consolidated
// =============================================================================

impl Upload<Finalized> {
    /// Wait for the disk to settle after finalization.
    ///
    /// # Errors
    ///
    /// Returns `(self, error)` on failure to allow rollback.
    #[must_use = "upload state must be used"]
    pub async fn wait_until_consolidated<D: DiskOps + ?Sized>(
        self,
        disks: &D,
    ) -> TransitionResult<Consolidated, Finalized> {
        let disk = self.state.disk.clone();
        match self
            .poll_disk_ready(disks, &disk, "disk to settle after finalization")
            .await
        {
            Ok(disk) => Ok(self.transition(Consolidated { disk })),
            Err(e) => Err((self, e)),
        }
    }
}

// =============================================================================
// Consolidated -> Completed - Terminal State
// =============================================================================

impl Upload<Consolidated> {
    pub fn complete(self) -> Upload<Completed> {
        let disk = self.state.disk.clone();
        self.transition(Completed { disk })
    }
}

impl Upload<Completed> {
    /// The uploaded disk as last reported by the management API.
    pub fn disk(&self) -> &Disk {
        &self.state.disk
    }

    pub fn into_disk(self) -> Disk {
        self.state.disk
    }
}
