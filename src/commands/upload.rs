// ABOUTME: Upload command implementation.
// ABOUTME: Starts a background upload, reports progress, and cancels it on Ctrl-C.

use crate::cli::UploadArgs;
use diskpush::config::Config;
use diskpush::error::{Error, Result};
use diskpush::output::{Output, format_bytes};
use diskpush::types::StorageDomainId;
use diskpush::upload::{UploadProgress, UploadRequest, start_upload};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const REPORT_INTERVAL: Duration = Duration::from_secs(2);

/// Upload one image file as a new disk.
pub async fn upload(config: Config, args: UploadArgs, output: &mut Output) -> Result<()> {
    let storage_domain = args
        .storage_domain
        .as_deref()
        .map(StorageDomainId::new)
        .or_else(|| config.upload.storage_domain.clone())
        .ok_or_else(|| {
            Error::InvalidConfig(
                "no storage domain: set upload.storage_domain or pass --storage-domain"
                    .to_string(),
            )
        })?;

    let mut options = config.upload.options();
    if let Some(timeout) = args.timeout {
        options.timeout = Some(timeout);
    }

    let client = Arc::new(config.api.client()?);

    let file = tokio::fs::File::open(&args.file).await?;
    let declared_size = file.metadata().await?.len();
    let request = UploadRequest {
        alias: args.alias.clone(),
        storage_domain,
        sparse: args.sparse().unwrap_or(config.upload.sparse),
        declared_size,
    };

    output.start_timer();
    output.progress(&format!(
        "Uploading {} ({}) as {}",
        args.file.display(),
        format_bytes(declared_size),
        request.alias
    ));

    let cancel = CancellationToken::new();
    let progress = start_upload(
        Arc::clone(&client),
        client,
        request,
        file,
        options,
        &cancel,
    )
    .await?;

    report_until_done(&progress, &cancel, output, tokio::signal::ctrl_c()).await;

    let result = progress.wait().await;
    for warning in progress.warnings() {
        output.warning(&warning.message);
    }

    let disk = result?;
    output.success_with(
        &format!("Uploaded disk {} ({})", disk.id, disk.alias),
        Some(&disk),
    );
    Ok(())
}

/// Print progress periodically; the first interrupt cancels the upload.
async fn report_until_done(
    progress: &UploadProgress,
    cancel: &CancellationToken,
    output: &Output,
    interrupt: impl Future<Output = io::Result<()>>,
) {
    let mut ticker = tokio::time::interval(REPORT_INTERVAL);
    tokio::pin!(interrupt);
    let mut listening = true;

    loop {
        tokio::select! {
            _ = progress.done() => break,
            _ = ticker.tick() => {
                output.upload_progress(
                    progress.phase(),
                    progress.uploaded_bytes(),
                    progress.total_bytes(),
                );
            }
            signal = &mut interrupt, if listening => {
                listening = false;
                match signal {
                    Ok(()) => {
                        output.warning("interrupted, cancelling upload and removing the disk");
                        cancel.cancel();
                    }
                    Err(e) => tracing::debug!(error = %e, "cannot listen for Ctrl-C"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use diskpush::api::{
        DiskError, DiskOps, DiskSpec, DiskStatus, ImageStream, TransferDescriptor, TransferError,
        TransferOps, TransferPhase,
    };
    use diskpush::output::OutputMode;
    use diskpush::types::{CorrelationId, DiskAlias, DiskId, TransferId};
    use diskpush::upload::{UploadError, UploadOptions};
    use hyper::Uri;

    /// A disk that never leaves the locked state.
    struct LockedDisk;

    #[async_trait]
    impl DiskOps for LockedDisk {
        async fn create_disk(
            &self,
            _spec: &DiskSpec,
            _correlation: &CorrelationId,
        ) -> std::result::Result<DiskId, DiskError> {
            Ok(DiskId::new("d-1"))
        }

        async fn poll_disk_status(&self, id: &DiskId) -> std::result::Result<DiskStatus, DiskError> {
            Ok(DiskStatus::not_ready(format!("disk {id} is locked")))
        }

        async fn remove_disk(&self, _id: &DiskId) -> std::result::Result<(), DiskError> {
            Ok(())
        }
    }

    #[async_trait]
    impl TransferOps for LockedDisk {
        async fn open_transfer(
            &self,
            _disk: &DiskId,
            _correlation: &CorrelationId,
        ) -> std::result::Result<TransferDescriptor, TransferError> {
            Err(TransferError::Rejected("disk is locked".to_string()))
        }

        async fn poll_transfer_phase(
            &self,
            _id: &TransferId,
        ) -> std::result::Result<TransferPhase, TransferError> {
            Ok(TransferPhase::Initializing)
        }

        async fn probe_endpoint(&self, _endpoint: &Uri) -> std::result::Result<(), TransferError> {
            Ok(())
        }

        async fn send_image(
            &self,
            _endpoint: &Uri,
            _image: ImageStream,
            _length: u64,
        ) -> std::result::Result<(), TransferError> {
            Ok(())
        }

        async fn finalize_transfer(
            &self,
            _id: &TransferId,
            _correlation: &CorrelationId,
        ) -> std::result::Result<(), TransferError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_cancels_the_upload() {
        let ports = Arc::new(LockedDisk);
        let cancel = CancellationToken::new();
        let progress = start_upload(
            Arc::clone(&ports),
            ports,
            UploadRequest {
                alias: DiskAlias::new("root").unwrap(),
                storage_domain: StorageDomainId::new("sd-1"),
                sparse: true,
                declared_size: 512,
            },
            std::io::Cursor::new(vec![0u8; 512]),
            UploadOptions::default(),
            &cancel,
        )
        .await
        .unwrap();
        let output = Output::new(OutputMode::Quiet);

        report_until_done(&progress, &cancel, &output, std::future::ready(Ok(()))).await;

        assert!(cancel.is_cancelled());
        match progress.wait().await.unwrap_err() {
            UploadError::DeadlineExceeded { waiting_for, .. } => {
                assert_eq!(waiting_for, "disk to become ready");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_interrupt_listener_does_not_cancel() {
        let ports = Arc::new(LockedDisk);
        let cancel = CancellationToken::new();
        let options = UploadOptions {
            timeout: Some(Duration::from_secs(30)),
            ..UploadOptions::default()
        };
        let progress = start_upload(
            Arc::clone(&ports),
            ports,
            UploadRequest {
                alias: DiskAlias::new("root").unwrap(),
                storage_domain: StorageDomainId::new("sd-1"),
                sparse: true,
                declared_size: 512,
            },
            std::io::Cursor::new(vec![0u8; 512]),
            options,
            &cancel,
        )
        .await
        .unwrap();
        let output = Output::new(OutputMode::Quiet);
        let broken = std::future::ready(Err(io::Error::other("no signal handler")));

        report_until_done(&progress, &cancel, &output, broken).await;

        // Only the timeout ended the upload.
        assert!(!cancel.is_cancelled());
        assert!(progress.is_done());
    }
}
