// ABOUTME: Scripted in-memory implementations of the disk and transfer ports.
// ABOUTME: Record every call so tests can assert on rollback and endpoint behaviour.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use diskpush::api::{
    Disk, DiskError, DiskOps, DiskSpec, DiskStatus, ImageStream, TransferDescriptor,
    TransferError, TransferOps, TransferPhase,
};
use diskpush::types::{CorrelationId, DiskId, TransferId};
use hyper::Uri;
use parking_lot::Mutex;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

pub const DISK_ID: &str = "disk-1";
pub const TRANSFER_ID: &str = "transfer-1";
pub const DIRECT_URL: &str = "http://host-1.example.com:54322/images/ticket-1";
pub const PROXY_URL: &str = "http://engine.example.com:54323/images/ticket-1";

/// One scripted reply to `poll_disk_status`.
#[derive(Debug, Clone)]
pub enum DiskPoll {
    Ready,
    NotReady(String),
    Fail(String),
    Unsupported(String),
    Gone,
}

impl DiskPoll {
    pub fn not_ready(reason: &str) -> Self {
        DiskPoll::NotReady(reason.to_string())
    }
}

/// Disk port fake. Polls answer `Ready` once the script runs out.
#[derive(Default)]
pub struct FakeDisks {
    create_error: Option<String>,
    remove_error: Option<String>,
    polls: Mutex<VecDeque<DiskPoll>>,
    cancel_on_poll: Option<(usize, CancellationToken)>,
    created: Mutex<Vec<(DiskSpec, CorrelationId)>>,
    removed: Mutex<Vec<DiskId>>,
    poll_count: AtomicUsize,
}

impl FakeDisks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_create(mut self, message: &str) -> Self {
        self.create_error = Some(message.to_string());
        self
    }

    pub fn failing_remove(mut self, message: &str) -> Self {
        self.remove_error = Some(message.to_string());
        self
    }

    pub fn with_polls(self, polls: impl IntoIterator<Item = DiskPoll>) -> Self {
        self.polls.lock().extend(polls);
        self
    }

    /// Cancel `token` right after answering the `n`th poll.
    pub fn cancel_on_poll(mut self, n: usize, token: CancellationToken) -> Self {
        self.cancel_on_poll = Some((n, token));
        self
    }

    pub fn created(&self) -> Vec<(DiskSpec, CorrelationId)> {
        self.created.lock().clone()
    }

    pub fn removed(&self) -> Vec<DiskId> {
        self.removed.lock().clone()
    }

    pub fn poll_count(&self) -> usize {
        self.poll_count.load(Ordering::SeqCst)
    }

    fn ready_disk(&self) -> Disk {
        let created = self.created.lock();
        let (spec, _) = created.last().expect("disk polled before it was created");
        Disk {
            id: DiskId::new(DISK_ID),
            alias: spec.alias.to_string(),
            format: spec.format,
            provisioned_size: spec.sizes.provisioned,
            initial_size: Some(spec.sizes.initial),
            sparse: spec.sparse,
            storage_domain: Some(spec.storage_domain.clone()),
            status: "ok".to_string(),
        }
    }
}

#[async_trait]
impl DiskOps for FakeDisks {
    async fn create_disk(
        &self,
        spec: &DiskSpec,
        correlation: &CorrelationId,
    ) -> Result<DiskId, DiskError> {
        if let Some(message) = &self.create_error {
            return Err(DiskError::Rejected(message.clone()));
        }
        self.created.lock().push((spec.clone(), correlation.clone()));
        Ok(DiskId::new(DISK_ID))
    }

    async fn poll_disk_status(&self, id: &DiskId) -> Result<DiskStatus, DiskError> {
        let n = self.poll_count.fetch_add(1, Ordering::SeqCst) + 1;
        let next = self.polls.lock().pop_front().unwrap_or(DiskPoll::Ready);

        let reply = match next {
            DiskPoll::Ready => Ok(DiskStatus::Ready(self.ready_disk())),
            DiskPoll::NotReady(reason) => Ok(DiskStatus::not_ready(reason)),
            DiskPoll::Fail(message) => Err(DiskError::Api(message)),
            DiskPoll::Unsupported(message) => Err(DiskError::Unsupported(message)),
            DiskPoll::Gone => Err(DiskError::NotFound(id.to_string())),
        };

        if let Some((at, token)) = &self.cancel_on_poll
            && *at == n
        {
            token.cancel();
        }
        reply
    }

    async fn remove_disk(&self, id: &DiskId) -> Result<(), DiskError> {
        self.removed.lock().push(id.clone());
        match &self.remove_error {
            Some(message) => Err(DiskError::Api(message.clone())),
            None => Ok(()),
        }
    }
}

/// One scripted reply to `poll_transfer_phase`.
#[derive(Debug, Clone)]
pub enum PhasePoll {
    Phase(TransferPhase),
    Fail(String),
    Gone,
}

/// Transfer port fake. Phase polls answer `Transferring` once the script runs out.
pub struct FakeTransfers {
    endpoints: Vec<Uri>,
    unreachable: Vec<Uri>,
    open_error: Option<String>,
    send_error: Option<String>,
    finalize_error: Option<String>,
    phases: Mutex<VecDeque<PhasePoll>>,
    cancel_after_bytes: Option<(usize, CancellationToken)>,
    phase_polls: AtomicUsize,
    probed: Mutex<Vec<Uri>>,
    received: Mutex<Option<(Uri, u64, Vec<u8>)>>,
    finalized: AtomicUsize,
}

impl Default for FakeTransfers {
    fn default() -> Self {
        Self {
            endpoints: vec![Uri::from_static(DIRECT_URL), Uri::from_static(PROXY_URL)],
            unreachable: Vec::new(),
            open_error: None,
            send_error: None,
            finalize_error: None,
            phases: Mutex::new(VecDeque::new()),
            cancel_after_bytes: None,
            phase_polls: AtomicUsize::new(0),
            probed: Mutex::new(Vec::new()),
            received: Mutex::new(None),
            finalized: AtomicUsize::new(0),
        }
    }
}

impl FakeTransfers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_endpoints(mut self, endpoints: &[&'static str]) -> Self {
        self.endpoints = endpoints.iter().map(|e| Uri::from_static(e)).collect();
        self
    }

    pub fn unreachable(mut self, endpoint: &'static str) -> Self {
        self.unreachable.push(Uri::from_static(endpoint));
        self
    }

    pub fn failing_open(mut self, message: &str) -> Self {
        self.open_error = Some(message.to_string());
        self
    }

    pub fn failing_send(mut self, message: &str) -> Self {
        self.send_error = Some(message.to_string());
        self
    }

    pub fn failing_finalize(mut self, message: &str) -> Self {
        self.finalize_error = Some(message.to_string());
        self
    }

    pub fn with_phases(self, phases: impl IntoIterator<Item = TransferPhase>) -> Self {
        self.with_phase_polls(phases.into_iter().map(PhasePoll::Phase))
    }

    pub fn with_phase_polls(self, polls: impl IntoIterator<Item = PhasePoll>) -> Self {
        self.phases.lock().extend(polls);
        self
    }

    /// Cancel `token` once `bytes` bytes have been received, then keep reading.
    pub fn cancel_after_bytes(mut self, bytes: usize, token: CancellationToken) -> Self {
        self.cancel_after_bytes = Some((bytes, token));
        self
    }

    pub fn phase_polls(&self) -> usize {
        self.phase_polls.load(Ordering::SeqCst)
    }

    pub fn probed(&self) -> Vec<Uri> {
        self.probed.lock().clone()
    }

    /// Endpoint, declared length and bytes of the completed `send_image` call.
    pub fn received(&self) -> Option<(Uri, u64, Vec<u8>)> {
        self.received.lock().clone()
    }

    pub fn finalized(&self) -> usize {
        self.finalized.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransferOps for FakeTransfers {
    async fn open_transfer(
        &self,
        _disk: &DiskId,
        _correlation: &CorrelationId,
    ) -> Result<TransferDescriptor, TransferError> {
        if let Some(message) = &self.open_error {
            return Err(TransferError::Rejected(message.clone()));
        }
        Ok(TransferDescriptor {
            id: TransferId::new(TRANSFER_ID),
            candidate_endpoints: self.endpoints.clone(),
            phase: TransferPhase::Initializing,
        })
    }

    async fn poll_transfer_phase(&self, id: &TransferId) -> Result<TransferPhase, TransferError> {
        self.phase_polls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .phases
            .lock()
            .pop_front()
            .unwrap_or(PhasePoll::Phase(TransferPhase::Transferring));

        match next {
            PhasePoll::Phase(phase) => Ok(phase),
            PhasePoll::Fail(message) => Err(TransferError::Api(message)),
            PhasePoll::Gone => Err(TransferError::NotFound(id.to_string())),
        }
    }

    async fn probe_endpoint(&self, endpoint: &Uri) -> Result<(), TransferError> {
        self.probed.lock().push(endpoint.clone());
        if self.unreachable.contains(endpoint) {
            return Err(TransferError::Transport(format!(
                "connection refused: {endpoint}"
            )));
        }
        Ok(())
    }

    async fn send_image(
        &self,
        endpoint: &Uri,
        mut image: ImageStream,
        length: u64,
    ) -> Result<(), TransferError> {
        if let Some(message) = &self.send_error {
            return Err(TransferError::Transport(message.clone()));
        }

        let mut received = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = image
                .read(&mut chunk)
                .await
                .map_err(|e| TransferError::Transport(e.to_string()))?;
            if n == 0 {
                break;
            }
            received.extend_from_slice(&chunk[..n]);

            if let Some((at, token)) = &self.cancel_after_bytes
                && received.len() >= *at
            {
                token.cancel();
            }
        }

        *self.received.lock() = Some((endpoint.clone(), length, received));
        Ok(())
    }

    async fn finalize_transfer(
        &self,
        _id: &TransferId,
        _correlation: &CorrelationId,
    ) -> Result<(), TransferError> {
        self.finalized.fetch_add(1, Ordering::SeqCst);
        match &self.finalize_error {
            Some(message) => Err(TransferError::Api(message.clone())),
            None => Ok(()),
        }
    }
}
