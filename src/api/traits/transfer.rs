// ABOUTME: Image transfer operations against the management API.
// ABOUTME: Open, poll, probe endpoints, stream the image, and finalize a transfer session.

use super::shared_types::{ImageStream, TransferDescriptor, TransferPhase};
use crate::types::{CorrelationId, DiskId, TransferId};
use async_trait::async_trait;
use hyper::Uri;
use nonempty::NonEmpty;

/// Image transfer session operations.
#[async_trait]
pub trait TransferOps: Send + Sync {
    /// Open an upload session for a disk.
    async fn open_transfer(
        &self,
        disk: &DiskId,
        correlation: &CorrelationId,
    ) -> Result<TransferDescriptor, TransferError>;

    /// Single, non-blocking phase poll.
    async fn poll_transfer_phase(&self, id: &TransferId) -> Result<TransferPhase, TransferError>;

    /// Zero-body connectivity check against a transfer endpoint.
    async fn probe_endpoint(&self, endpoint: &Uri) -> Result<(), TransferError>;

    /// Stream `length` bytes of image data to a transfer endpoint.
    async fn send_image(
        &self,
        endpoint: &Uri,
        image: ImageStream,
        length: u64,
    ) -> Result<(), TransferError>;

    /// Tell the remote side all bytes were sent.
    async fn finalize_transfer(
        &self,
        id: &TransferId,
        correlation: &CorrelationId,
    ) -> Result<(), TransferError>;

    /// Pick the first candidate endpoint that answers a probe.
    ///
    /// Candidates are tried in the order the descriptor lists them, and each
    /// probe targets the candidate under consideration.
    ///
    /// # Errors
    ///
    /// `TransferError::NoEndpoint` if the descriptor lists no candidates,
    /// `TransferError::Unreachable` carrying the last probe error if none answers.
    async fn resolve_endpoint(&self, descriptor: &TransferDescriptor) -> Result<Uri, TransferError> {
        let candidates = NonEmpty::from_slice(&descriptor.candidate_endpoints)
            .ok_or(TransferError::NoEndpoint)?;

        let mut last_error = String::new();
        for endpoint in candidates.iter() {
            match self.probe_endpoint(endpoint).await {
                Ok(()) => {
                    tracing::debug!(%endpoint, transfer = %descriptor.id, "transfer endpoint reachable");
                    return Ok(endpoint.clone());
                }
                Err(e) => {
                    tracing::debug!(%endpoint, error = %e, "transfer endpoint probe failed");
                    last_error = e.to_string();
                }
            }
        }

        Err(TransferError::Unreachable(last_error))
    }
}

/// Errors from transfer operations.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("image transfer not found: {0}")]
    NotFound(String),

    #[error("image transfer rejected: {0}")]
    Rejected(String),

    #[error("no transfer endpoint offered by the management API")]
    NoEndpoint,

    #[error("no reachable transfer endpoint (last error: {0})")]
    Unreachable(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("management API error: {0}")]
    Api(String),
}
