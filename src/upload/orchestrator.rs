// ABOUTME: Entry points that run an upload in the background.
// ABOUTME: Detection runs on the caller's task; everything after it runs in a spawned task.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::error::UploadError;
use super::progress::{self, UploadProgress};
use super::session::Upload;
use super::state::{FormatDetected, HoldsDisk, Phase};
use crate::api::{Disk, DiskOps, TransferOps};
use crate::image::{DetectedImage, detect};
use crate::types::{DiskAlias, StorageDomainId};

/// Default interval between readiness polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// What to upload and where.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub alias: DiskAlias,
    pub storage_domain: StorageDomainId,
    pub sparse: bool,
    /// Exact number of bytes the source will yield.
    pub declared_size: u64,
}

/// Timing knobs for an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadOptions {
    pub poll_interval: Duration,
    /// Overall deadline, measured from the moment the upload is started.
    pub timeout: Option<Duration>,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
        }
    }
}

/// Detect the image format and start the upload in the background.
///
/// Returns as soon as the background task is spawned. Cancelling `cancel` (or
/// reaching `options.timeout`) stops the upload at the next poll or read
/// boundary and removes any disk it created.
///
/// Must be called within a tokio runtime.
///
/// # Errors
///
/// Returns `UploadError::MalformedInput` if the image header cannot be read.
/// Every later failure is reported through the returned handle.
pub async fn start_upload<D, T, R>(
    disks: Arc<D>,
    transfers: Arc<T>,
    request: UploadRequest,
    source: R,
    options: UploadOptions,
    cancel: &CancellationToken,
) -> Result<UploadProgress, UploadError>
where
    D: DiskOps + ?Sized + 'static,
    T: TransferOps + ?Sized + 'static,
    R: AsyncRead + Send + Unpin + 'static,
{
    let DetectedImage { detection, reader } = detect(source, request.declared_size).await?;

    let (progress, tracker, completer) = progress::channel(request.declared_size);
    let cancel = cancel.child_token();
    if let Some(timeout) = options.timeout {
        watch_deadline(timeout, cancel.clone());
    }

    let span = tracing::info_span!("upload", alias = %request.alias);
    let upload = Upload::new(
        request.alias,
        request.storage_domain,
        request.sparse,
        detection,
        options.poll_interval,
        cancel.clone(),
        tracker,
    );

    tokio::spawn(
        async move {
            let outcome = drive(upload, disks.as_ref(), transfers.as_ref(), reader).await;
            // Also stops the deadline watcher.
            cancel.cancel();

            match &outcome {
                Ok(disk) => tracing::info!(disk = %disk.id, "upload completed"),
                Err(e) => tracing::warn!(error = %e, "upload failed"),
            }
            completer.finish(outcome);
        }
        .instrument(span),
    );

    Ok(progress)
}

/// Start an upload and wait for it to finish.
///
/// # Errors
///
/// Returns the terminal error of the upload.
pub async fn upload_image<D, T, R>(
    disks: Arc<D>,
    transfers: Arc<T>,
    request: UploadRequest,
    source: R,
    options: UploadOptions,
    cancel: &CancellationToken,
) -> Result<Disk, UploadError>
where
    D: DiskOps + ?Sized + 'static,
    T: TransferOps + ?Sized + 'static,
    R: AsyncRead + Send + Unpin + 'static,
{
    start_upload(disks, transfers, request, source, options, cancel)
        .await?
        .wait()
        .await
}

fn watch_deadline(timeout: Duration, cancel: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(timeout) => {
                tracing::debug!(?timeout, "upload deadline reached");
                cancel.cancel();
            }
        }
    });
}

/// Unwrap a transition or roll back and return its cause.
macro_rules! or_rollback {
    ($step:expr, $disks:expr) => {
        match $step {
            Ok(next) => next,
            Err((failed, cause)) => return Err(roll_back(failed, $disks, cause).await),
        }
    };
}

async fn drive<D, T, R>(
    upload: Upload<FormatDetected>,
    disks: &D,
    transfers: &T,
    source: R,
) -> Result<Disk, UploadError>
where
    D: DiskOps + ?Sized,
    T: TransferOps + ?Sized,
    R: AsyncRead + Send + Unpin + 'static,
{
    // Nothing exists remotely until this succeeds.
    let upload = upload.create_disk(disks).await?;

    let upload = or_rollback!(upload.wait_until_ready(disks).await, disks);
    let upload = or_rollback!(upload.open_transfer(transfers).await, disks);
    let upload = or_rollback!(upload.wait_for_transfer(transfers).await, disks);
    let upload = or_rollback!(upload.send_image(transfers, source).await, disks);
    let upload = or_rollback!(upload.finalize(transfers).await, disks);
    let upload = or_rollback!(upload.wait_until_consolidated(disks).await, disks);

    Ok(upload.complete().into_disk())
}

async fn roll_back<S, D>(failed: Upload<S>, disks: &D, cause: UploadError) -> UploadError
where
    S: HoldsDisk,
    D: DiskOps + ?Sized,
{
    tracing::info!(phase = %S::PHASE, error = %cause, "upload failed, removing disk");
    if let Ok(disk) = failed.rollback(disks).await {
        tracing::debug!(%disk, "disk removed");
    }
    cause
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_poll_every_five_seconds_without_deadline() {
        let options = UploadOptions::default();
        assert_eq!(options.poll_interval, Duration::from_secs(5));
        assert_eq!(options.timeout, None);
    }
}
