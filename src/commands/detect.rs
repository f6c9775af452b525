// ABOUTME: Detect command implementation.
// ABOUTME: Reports the container format and sizes of a local image file.

use diskpush::error::Result;
use diskpush::image::detect_file;
use diskpush::output::{Output, format_bytes};
use std::path::Path;

pub async fn detect(file: &Path, output: &Output) -> Result<()> {
    let image = detect_file(file).await?;
    let detection = image.detection;

    output.success_with(
        &format!(
            "{}: {} image, virtual size {}, file size {}",
            file.display(),
            detection.format,
            format_bytes(detection.virtual_size),
            format_bytes(detection.declared_size)
        ),
        Some(&detection),
    );
    Ok(())
}
