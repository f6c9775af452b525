// ABOUTME: Progress handle shared between the background upload task and its observers.
// ABOUTME: Terminal fields are written under a lock before the one-shot completion signal fires.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::watch;

use super::error::UploadError;
use super::state::UploadPhase;
use crate::api::Disk;
use crate::diagnostics::{Diagnostics, Warning};

struct Shared {
    total_bytes: u64,
    uploaded_bytes: Arc<AtomicU64>,
    state: Mutex<State>,
    done: watch::Sender<bool>,
}

struct State {
    phase: UploadPhase,
    error: Option<UploadError>,
    disk: Option<Disk>,
    diagnostics: Diagnostics,
}

/// Caller-side view of a running upload.
///
/// All reads are non-blocking except `done()` and `wait()`. Clones observe the
/// same upload.
#[derive(Clone)]
pub struct UploadProgress {
    shared: Arc<Shared>,
}

impl UploadProgress {
    /// Bytes handed to the transport so far. Never decreases.
    pub fn uploaded_bytes(&self) -> u64 {
        self.shared.uploaded_bytes.load(Ordering::Acquire)
    }

    /// Declared size of the image.
    pub fn total_bytes(&self) -> u64 {
        self.shared.total_bytes
    }

    pub fn phase(&self) -> UploadPhase {
        self.shared.state.lock().phase
    }

    /// Terminal cause, once recorded.
    pub fn error(&self) -> Option<UploadError> {
        self.shared.state.lock().error.clone()
    }

    /// The uploaded disk. Only set after successful completion.
    pub fn resulting_disk(&self) -> Option<Disk> {
        self.shared.state.lock().disk.clone()
    }

    /// Non-fatal warnings collected during the upload.
    pub fn warnings(&self) -> Vec<Warning> {
        self.shared.state.lock().diagnostics.warnings().to_vec()
    }

    pub fn is_done(&self) -> bool {
        *self.shared.done.borrow()
    }

    /// Resolves once the upload has completed or failed.
    pub async fn done(&self) {
        let mut rx = self.shared.done.subscribe();
        // The sender lives in `shared`, which we hold, so this cannot fail.
        let _ = rx.wait_for(|done| *done).await;
    }

    /// Wait for completion and return the disk or the terminal error.
    pub async fn wait(&self) -> Result<Disk, UploadError> {
        self.done().await;
        let state = self.shared.state.lock();
        match (&state.disk, &state.error) {
            (_, Some(err)) => Err(err.clone()),
            (Some(disk), None) => Ok(disk.clone()),
            (None, None) => Err(UploadError::Aborted(
                "completion signalled without an outcome".to_string(),
            )),
        }
    }
}

impl std::fmt::Debug for UploadProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadProgress")
            .field("uploaded_bytes", &self.uploaded_bytes())
            .field("total_bytes", &self.total_bytes())
            .field("phase", &self.phase())
            .field("done", &self.is_done())
            .finish()
    }
}

/// Writer handle used by the state machine while it runs.
#[derive(Clone)]
pub(crate) struct Tracker {
    shared: Arc<Shared>,
}

impl Tracker {
    pub(crate) fn set_phase(&self, phase: UploadPhase) {
        self.shared.state.lock().phase = phase;
    }

    /// Counter the streaming reader adds to.
    pub(crate) fn byte_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.shared.uploaded_bytes)
    }

    pub(crate) fn warn(&self, warning: Warning) {
        self.shared.state.lock().diagnostics.warn(warning);
    }
}

/// Fires the completion signal exactly once.
///
/// Dropping it unfinished (e.g. the task panicked) records `Aborted`.
pub(crate) struct Completer {
    shared: Arc<Shared>,
    finished: bool,
}

impl Completer {
    pub(crate) fn finish(mut self, outcome: Result<Disk, UploadError>) {
        self.record(outcome);
    }

    fn record(&mut self, outcome: Result<Disk, UploadError>) {
        {
            let mut state = self.shared.state.lock();
            match outcome {
                Ok(disk) => {
                    state.phase = UploadPhase::Completed;
                    state.disk = Some(disk);
                }
                Err(err) => {
                    state.phase = UploadPhase::Failed;
                    state.error = Some(err);
                }
            }
        }
        self.finished = true;
        self.shared.done.send_replace(true);
    }
}

impl Drop for Completer {
    fn drop(&mut self) {
        if !self.finished {
            self.record(Err(UploadError::Aborted(
                "upload task stopped before recording an outcome".to_string(),
            )));
        }
    }
}

/// Create the observer, writer and completion halves for one upload.
pub(crate) fn channel(total_bytes: u64) -> (UploadProgress, Tracker, Completer) {
    let (done, _) = watch::channel(false);
    let shared = Arc::new(Shared {
        total_bytes,
        uploaded_bytes: Arc::new(AtomicU64::new(0)),
        state: Mutex::new(State {
            phase: UploadPhase::Init,
            error: None,
            disk: None,
            diagnostics: Diagnostics::default(),
        }),
        done,
    });

    (
        UploadProgress {
            shared: Arc::clone(&shared),
        },
        Tracker {
            shared: Arc::clone(&shared),
        },
        Completer {
            shared,
            finished: false,
        },
    )
}
