// ABOUTME: Byte-counting, cancellable reader and the bulk image transfer.
// ABOUTME: Every read checks the cancellation token before touching the source.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use hyper::Uri;
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};
use tokio_util::sync::CancellationToken;

use super::error::UploadError;
use crate::api::TransferOps;

/// Returned as the source of the I/O error when a read is refused.
#[derive(Debug, thiserror::Error)]
#[error("upload cancelled before the next read")]
pub struct ReadCancelled;

/// Wraps the image source, counting bytes and refusing reads after cancellation.
///
/// A read already in flight is not interrupted; only the next call is refused.
pub struct ProgressReader<R> {
    inner: R,
    counter: Arc<AtomicU64>,
    cancel: CancellationToken,
}

impl<R> ProgressReader<R> {
    pub fn new(inner: R, counter: Arc<AtomicU64>, cancel: CancellationToken) -> Self {
        Self {
            inner,
            counter,
            cancel,
        }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for ProgressReader<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.cancel.is_cancelled() {
            return Poll::Ready(Err(io::Error::new(io::ErrorKind::TimedOut, ReadCancelled)));
        }

        let before = buf.filled().len();
        let result = Pin::new(&mut self.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = result {
            let read = (buf.filled().len() - before) as u64;
            if read > 0 {
                self.counter.fetch_add(read, Ordering::Release);
            }
        }
        result
    }
}

/// Stream exactly `length` bytes of `source` to `endpoint`.
///
/// The source is cut off at `length`, so the counter can never pass it.
pub(crate) async fn stream_image<T, R>(
    transfers: &T,
    endpoint: &Uri,
    source: R,
    length: u64,
    counter: Arc<AtomicU64>,
    cancel: &CancellationToken,
) -> Result<(), UploadError>
where
    T: TransferOps + ?Sized,
    R: AsyncRead + Send + Unpin + 'static,
{
    let reader = ProgressReader::new(source.take(length), Arc::clone(&counter), cancel.clone());

    match transfers.send_image(endpoint, Box::pin(reader), length).await {
        Ok(()) => {}
        Err(_) if cancel.is_cancelled() => {
            return Err(UploadError::deadline("image upload", None));
        }
        Err(e) => return Err(UploadError::UploadTransport(e.to_string())),
    }

    let sent = counter.load(Ordering::Acquire);
    if sent < length {
        return Err(UploadError::UploadTransport(format!(
            "image source ended after {sent} of {length} bytes"
        )));
    }
    Ok(())
}
