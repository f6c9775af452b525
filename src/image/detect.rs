// ABOUTME: Image container format detection from the first bytes of a stream.
// ABOUTME: Reads a fixed header window and hands back a reader that replays it.

use serde::Serialize;
use std::fmt;
use std::io::Cursor;
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt, Chain};

/// Leading bytes of a copy-on-write (qcow) image.
pub const COW_MAGIC: [u8; 4] = *b"QFI\xfb";

/// Byte offset of the big-endian 64-bit virtual size in a COW header.
pub const VIRTUAL_SIZE_OFFSET: usize = 24;

/// Number of header bytes inspected. Covers the magic and the size field.
pub const HEADER_WINDOW: usize = VIRTUAL_SIZE_OFFSET + 8;

/// Container format of an image, as the management API names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Raw,
    Cow,
}

impl ImageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Raw => "raw",
            ImageFormat::Cow => "cow",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of classifying an image header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Detection {
    pub format: ImageFormat,
    /// Size the guest will see. Taken from the header for COW images.
    pub virtual_size: u64,
    /// Number of bytes that will be streamed.
    pub declared_size: u64,
}

/// Errors from reading an image header.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image header truncated: got {read} of {HEADER_WINDOW} bytes")]
    Truncated { read: usize },

    #[error("failed to read image header: {0}")]
    Io(#[from] std::io::Error),
}

/// A reader that yields the already-inspected header before the rest of the source.
pub type Replayed<R> = Chain<Cursor<Vec<u8>>, R>;

/// A classified image together with its full, unconsumed byte stream.
pub struct DetectedImage<R> {
    pub detection: Detection,
    pub reader: Replayed<R>,
}

impl<R> fmt::Debug for DetectedImage<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectedImage")
            .field("detection", &self.detection)
            .finish_non_exhaustive()
    }
}

/// Classify a header window.
///
/// Pure function of its inputs, so classifying the same bytes twice always
/// agrees.
pub fn classify_header(header: &[u8; HEADER_WINDOW], declared_size: u64) -> Detection {
    if header[..COW_MAGIC.len()] == COW_MAGIC {
        let mut size = [0u8; 8];
        size.copy_from_slice(&header[VIRTUAL_SIZE_OFFSET..VIRTUAL_SIZE_OFFSET + 8]);
        Detection {
            format: ImageFormat::Cow,
            virtual_size: u64::from_be_bytes(size),
            declared_size,
        }
    } else {
        Detection {
            format: ImageFormat::Raw,
            virtual_size: declared_size,
            declared_size,
        }
    }
}

/// Read the header window from `reader` and classify it.
///
/// # Errors
///
/// Returns `ImageError::Truncated` if the stream ends inside the header window.
pub async fn detect<R: AsyncRead + Unpin>(
    mut reader: R,
    declared_size: u64,
) -> Result<DetectedImage<R>, ImageError> {
    let mut header = [0u8; HEADER_WINDOW];
    let mut filled = 0;

    // Short reads are legal, keep going until the window is full or EOF.
    while filled < HEADER_WINDOW {
        let n = reader.read(&mut header[filled..]).await?;
        if n == 0 {
            return Err(ImageError::Truncated { read: filled });
        }
        filled += n;
    }

    let detection = classify_header(&header, declared_size);
    tracing::debug!(
        format = %detection.format,
        virtual_size = detection.virtual_size,
        declared_size,
        "classified image header"
    );

    Ok(DetectedImage {
        detection,
        reader: Cursor::new(header.to_vec()).chain(reader),
    })
}

/// Open a file and detect its format, using the file length as declared size.
pub async fn detect_file(path: &Path) -> Result<DetectedImage<tokio::fs::File>, ImageError> {
    let file = tokio::fs::File::open(path).await?;
    let declared_size = file.metadata().await?.len();
    detect(file, declared_size).await
}
