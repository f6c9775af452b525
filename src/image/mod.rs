// ABOUTME: Disk image container handling.
// ABOUTME: Exports format detection over a replayable header window.

mod detect;

pub use detect::{
    COW_MAGIC, DetectedImage, Detection, HEADER_WINDOW, ImageError, ImageFormat, Replayed,
    VIRTUAL_SIZE_OFFSET, classify_header, detect, detect_file,
};
