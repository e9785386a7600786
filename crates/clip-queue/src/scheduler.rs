//! The scheduler.
//!
//! Single-writer discipline: the pending list and running set live behind
//! one mutex, and only the dispatch routine (entered from `enqueue`,
//! `cancel`, and job completion) mutates them. Each dispatched job runs in
//! its own tokio task with exclusive ownership of its surface, encoder and
//! clock; the only cross-job state is the queue itself.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use clip_core::{
    ClipResult, JobId, JobStatus, Priority, QualityPreset, QueueState, RenderArtifact, RenderJob,
    RenderProgress, Script, Theme,
};
use clip_encode::{MediaCapabilityProvider, NativeProvider};
use clip_record::{CancelFlag, Clock, SystemClock, VirtualClock};

use crate::memory::{slots_for, MemoryProbe, SystemMemoryProbe};
use crate::worker;

/// Builds the per-job animation clock.
pub type ClockFactory = Arc<dyn Fn() -> Box<dyn Clock> + Send + Sync>;

/// What a caller submits: the script/theme/quality triple plus a priority.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub script: Script,
    pub theme: Theme,
    pub quality: QualityPreset,
    pub priority: Priority,
}

/// Event stream delivered to the job's subscriber.
#[derive(Debug)]
pub enum JobEvent {
    /// Emitted repeatedly while running; percents are non-decreasing.
    Progress(RenderProgress),
    /// Terminal: the artifact, delivered exactly once.
    Completed(RenderArtifact),
    /// Terminal: the job failed; siblings are unaffected.
    Failed { error: String, retryable: bool },
    /// Terminal: the job was cancelled. Distinct from failure.
    Cancelled,
}

impl JobEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobEvent::Progress(_))
    }
}

/// Final resolution of one job.
#[derive(Debug)]
pub enum JobOutcome {
    Completed(RenderArtifact),
    Failed { error: String, retryable: bool },
    Cancelled,
}

/// Per-job subscription, returned by `enqueue`. Dropping it detaches the
/// subscriber; the job itself keeps running.
pub struct JobHandle {
    id: JobId,
    events: mpsc::UnboundedReceiver<JobEvent>,
}

impl JobHandle {
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Next event, or `None` once the stream has ended.
    pub async fn next_event(&mut self) -> Option<JobEvent> {
        self.events.recv().await
    }

    /// Drain events until the terminal one and return the job's outcome.
    pub async fn wait(mut self) -> JobOutcome {
        while let Some(event) = self.events.recv().await {
            match event {
                JobEvent::Progress(_) => continue,
                JobEvent::Completed(artifact) => return JobOutcome::Completed(artifact),
                JobEvent::Failed { error, retryable } => {
                    return JobOutcome::Failed { error, retryable }
                }
                JobEvent::Cancelled => return JobOutcome::Cancelled,
            }
        }
        JobOutcome::Failed {
            error: "event stream closed before a terminal event".into(),
            retryable: false,
        }
    }
}

/// Scheduler construction parameters.
pub struct SchedulerConfig {
    /// Hard cap override. `None` derives the cap from the memory probe.
    pub max_concurrency: Option<usize>,
    pub provider: Arc<dyn MediaCapabilityProvider>,
    pub probe: Arc<dyn MemoryProbe>,
    pub clock_factory: ClockFactory,
    /// Font file loaded into each worker's renderer.
    pub font_path: Option<PathBuf>,
}

impl SchedulerConfig {
    pub fn new(provider: Arc<dyn MediaCapabilityProvider>) -> Self {
        Self {
            max_concurrency: None,
            provider,
            probe: Arc::new(SystemMemoryProbe),
            clock_factory: Arc::new(|| Box::new(SystemClock::new()) as Box<dyn Clock>),
            font_path: None,
        }
    }

    /// Deterministic clocks for tests: virtual time, no sleeping.
    pub fn with_virtual_time(mut self) -> Self {
        self.clock_factory = Arc::new(|| Box::new(VirtualClock::new()) as Box<dyn Clock>);
        self
    }

    pub fn with_probe(mut self, probe: Arc<dyn MemoryProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = Some(max.max(1));
        self
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new(Arc::new(NativeProvider))
    }
}

struct PendingJob {
    job: RenderJob,
    seq: u64,
    events: mpsc::UnboundedSender<JobEvent>,
}

struct RunningJob {
    cancel: CancelFlag,
}

#[derive(Default)]
pub(crate) struct QueueCore {
    pending: Vec<PendingJob>,
    running: HashMap<JobId, RunningJob>,
    finished: HashMap<JobId, JobStatus>,
}

pub(crate) struct Shared {
    pub(crate) state: Mutex<QueueCore>,
    pub(crate) max_concurrency: AtomicUsize,
    pub(crate) provider: Arc<dyn MediaCapabilityProvider>,
    pub(crate) clock_factory: ClockFactory,
    pub(crate) font_path: Option<PathBuf>,
    fixed_cap: Option<usize>,
    probe: Arc<dyn MemoryProbe>,
    seq: AtomicU64,
}

/// The job queue. Cheap to clone by wrapping in `Arc` at the call site;
/// internally everything already is shared.
pub struct Scheduler {
    shared: Arc<Shared>,
}

impl Scheduler {
    /// Build a scheduler. Must be called within a tokio runtime; workers are
    /// spawned onto it.
    pub fn new(config: SchedulerConfig) -> Self {
        let cap = match config.max_concurrency {
            Some(n) => n,
            None => slots_for(config.probe.available_bytes()),
        };
        tracing::info!(max_concurrency = cap, "scheduler ready");
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueCore::default()),
                max_concurrency: AtomicUsize::new(cap),
                provider: config.provider,
                clock_factory: config.clock_factory,
                font_path: config.font_path,
                fixed_cap: config.max_concurrency,
                probe: config.probe,
                seq: AtomicU64::new(0),
            }),
        }
    }

    /// Submit a job. Never blocks: the job lands on the pending list, the
    /// list is re-sorted by (priority desc, arrival asc), and a dispatch
    /// attempt runs before this returns.
    pub fn enqueue(&self, request: JobRequest) -> ClipResult<JobHandle> {
        request.script.validate()?;
        let job = RenderJob::new(
            request.script,
            request.theme,
            request.quality,
            request.priority,
        );
        let id = job.id;
        let (tx, rx) = mpsc::unbounded_channel();
        let seq = self.shared.seq.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(job = %id, priority = ?job.priority, "enqueued");

        let mut core = self.shared.state.lock();
        core.pending.push(PendingJob {
            job,
            seq,
            events: tx,
        });
        core.pending
            .sort_by_key(|p| (Reverse(p.job.priority), p.job.enqueued_at, p.seq));
        dispatch_locked(&self.shared, &mut core);
        drop(core);

        Ok(JobHandle { id, events: rx })
    }

    /// Cancel a job.
    ///
    /// Pending: removed before it can ever start; `true`. Running: the
    /// worker is signalled and stops at its next cancel check; `true`. The
    /// signal is best effort — a worker already past its final check still
    /// terminates `Completed`. Terminal or unknown: `false`. Never blocks.
    pub fn cancel(&self, job_id: JobId) -> bool {
        let mut core = self.shared.state.lock();
        if let Some(pos) = core.pending.iter().position(|p| p.job.id == job_id) {
            let pending = core.pending.remove(pos);
            core.finished.insert(job_id, JobStatus::Cancelled);
            let _ = pending.events.send(JobEvent::Cancelled);
            tracing::debug!(job = %job_id, "cancelled while pending");
            return true;
        }
        if let Some(running) = core.running.get(&job_id) {
            running.cancel.cancel();
            tracing::debug!(job = %job_id, "cancellation signalled to worker");
            return true;
        }
        false
    }

    /// Current counters.
    pub fn status(&self) -> QueueState {
        let core = self.shared.state.lock();
        QueueState {
            queued_count: core.pending.len(),
            running_count: core.running.len(),
            max_concurrency: self.shared.max_concurrency.load(Ordering::SeqCst),
        }
    }

    /// Ids of currently running jobs.
    pub fn running_jobs(&self) -> Vec<JobId> {
        self.shared.state.lock().running.keys().copied().collect()
    }

    /// Terminal status of a job, if it has reached one.
    pub fn finished_status(&self, job_id: JobId) -> Option<JobStatus> {
        self.shared.state.lock().finished.get(&job_id).copied()
    }

    /// Re-derive the concurrency cap from the memory probe.
    ///
    /// Intended for observable lifecycle events (e.g. the process regaining
    /// the foreground), not for polling. A raised cap only affects future
    /// dispatches; a lowered one never preempts running jobs.
    pub fn refresh_concurrency(&self) -> usize {
        if let Some(cap) = self.shared.fixed_cap {
            return cap;
        }
        let cap = slots_for(self.shared.probe.available_bytes());
        let old = self.shared.max_concurrency.swap(cap, Ordering::SeqCst);
        if cap != old {
            tracing::info!(from = old, to = cap, "concurrency cap adjusted");
        }
        let mut core = self.shared.state.lock();
        dispatch_locked(&self.shared, &mut core);
        cap
    }
}

/// Pop sorted pending jobs into free slots. The caller holds the lock, so
/// no two dispatch attempts can double-claim a slot or a job.
pub(crate) fn dispatch_locked(shared: &Arc<Shared>, core: &mut QueueCore) {
    let cap = shared.max_concurrency.load(Ordering::SeqCst);
    while core.running.len() < cap && !core.pending.is_empty() {
        let mut pending = core.pending.remove(0);
        pending.job.status = JobStatus::Running;
        let cancel = CancelFlag::new();
        core.running.insert(
            pending.job.id,
            RunningJob {
                cancel: cancel.clone(),
            },
        );
        tracing::debug!(job = %pending.job.id, "dispatched");
        tokio::spawn(worker::run_job(
            shared.clone(),
            pending.job,
            pending.events,
            cancel,
        ));
    }
}

/// Record a terminal outcome, notify the subscriber, free the slot, and
/// immediately try to dispatch the next pending job.
pub(crate) fn complete(
    shared: &Arc<Shared>,
    job_id: JobId,
    outcome: Result<Option<RenderArtifact>, clip_core::ClipError>,
    events: mpsc::UnboundedSender<JobEvent>,
) {
    let (status, event) = match outcome {
        Ok(Some(artifact)) => (JobStatus::Completed, JobEvent::Completed(artifact)),
        Ok(None) => (JobStatus::Cancelled, JobEvent::Cancelled),
        Err(e) => {
            tracing::warn!(job = %job_id, error = %e, "job failed");
            (
                JobStatus::Failed,
                JobEvent::Failed {
                    error: e.to_string(),
                    retryable: e.is_retryable(),
                },
            )
        }
    };

    let mut core = shared.state.lock();
    core.running.remove(&job_id);
    core.finished.insert(job_id, status);
    // Sender drops with the running record afterwards, which auto-closes the
    // subscription stream after this final event.
    let _ = events.send(event);
    dispatch_locked(shared, &mut core);
}
