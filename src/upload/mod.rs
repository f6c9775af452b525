// ABOUTME: Disk image upload orchestration using the type state pattern.
// ABOUTME: Exports the state markers, the progress handle, and the start/await entry points.

mod error;
mod orchestrator;
mod poll;
mod progress;
mod session;
mod state;
mod stream;
mod transitions;

pub use error::{UploadError, UploadErrorKind};
pub use orchestrator::{
    DEFAULT_POLL_INTERVAL, UploadOptions, UploadRequest, start_upload, upload_image,
};
pub use progress::UploadProgress;
pub use session::Upload;
pub use state::{
    Completed, Consolidated, DiskCreated, DiskReady, Finalized, FormatDetected, HoldsDisk,
    Phase, TransferOpened, TransferReady, UploadPhase, Uploaded,
};
pub use stream::ProgressReader;
pub use transitions::TransitionResult;
