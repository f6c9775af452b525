// ABOUTME: Generic upload struct parameterized by state marker.
// ABOUTME: Holds what every phase needs; state types hold the remote handles.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::progress::Tracker;
use super::state::{FormatDetected, Phase};
use crate::image::Detection;
use crate::types::{CorrelationId, DiskAlias, StorageDomainId};

/// An upload in progress, parameterized by its current state.
///
/// Each transition consumes the upload and returns it in the next state, so a
/// phase cannot be skipped or repeated. States from `DiskCreated` onward carry
/// the disk ID, which is what makes rollback possible.
pub struct Upload<S> {
    pub(crate) alias: DiskAlias,
    pub(crate) correlation: CorrelationId,
    pub(crate) detection: Detection,
    pub(crate) storage_domain: StorageDomainId,
    pub(crate) sparse: bool,
    pub(crate) poll_interval: Duration,
    pub(crate) cancel: CancellationToken,
    pub(crate) tracker: Tracker,
    pub(crate) state: S,
}

impl Upload<FormatDetected> {
    pub(crate) fn new(
        alias: DiskAlias,
        storage_domain: StorageDomainId,
        sparse: bool,
        detection: Detection,
        poll_interval: Duration,
        cancel: CancellationToken,
        tracker: Tracker,
    ) -> Self {
        tracker.set_phase(FormatDetected::PHASE);
        Upload {
            correlation: CorrelationId::for_upload(&alias),
            alias,
            detection,
            storage_domain,
            sparse,
            poll_interval,
            cancel,
            tracker,
            state: FormatDetected,
        }
    }
}

impl<S> Upload<S> {
    pub fn alias(&self) -> &DiskAlias {
        &self.alias
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation
    }

    pub fn detection(&self) -> &Detection {
        &self.detection
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    /// Move to the next state and publish its phase.
    pub(crate) fn transition<T: Phase>(self, state: T) -> Upload<T> {
        tracing::debug!(alias = %self.alias, phase = %T::PHASE, "upload phase");
        self.tracker.set_phase(T::PHASE);
        Upload {
            alias: self.alias,
            correlation: self.correlation,
            detection: self.detection,
            storage_domain: self.storage_domain,
            sparse: self.sparse,
            poll_interval: self.poll_interval,
            cancel: self.cancel,
            tracker: self.tracker,
            state,
        }
    }
}

impl<S> std::fmt::Debug for Upload<S>
where
    S: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Upload")
            .field("alias", &self.alias)
            .field("detection", &self.detection)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
