//! Scheduler integration tests.
//!
//! All jobs run on virtual clocks and the in-process APNG provider, so
//! nothing here sleeps real wall-clock time except short polling waits.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use clip_core::{ClipResult, JobStatus, Priority, QualityPreset, Script, Theme, ThemeCatalog};
use clip_encode::{EncoderFormat, EncoderStream, MediaCapabilityProvider, NativeProvider};
use clip_queue::{
    FixedMemoryProbe, JobEvent, JobOutcome, JobRequest, MemoryProbe, Scheduler, SchedulerConfig,
};
use clip_record::VirtualClock;

const GIB: u64 = 1 << 30;

fn theme() -> Theme {
    ThemeCatalog::builtin().theme("subway").unwrap().clone()
}

fn tiny_quality(id: &str) -> QualityPreset {
    QualityPreset {
        id: id.into(),
        width: 16,
        height: 32,
        target_bitrate: 100_000,
        frame_rate: 30.0,
    }
}

fn short_script() -> Script {
    Script::new("Hook", vec!["One".into(), "Two".into()], "CTA")
}

fn request(priority: Priority, quality_id: &str) -> JobRequest {
    JobRequest {
        script: short_script(),
        theme: theme(),
        quality: tiny_quality(quality_id),
        priority,
    }
}

fn test_config() -> SchedulerConfig {
    SchedulerConfig::new(Arc::new(NativeProvider)).with_virtual_time()
}

/// Wait (with timeout) until `cond` holds.
async fn wait_until(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(60), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Provider whose `open` blocks until the gate is released, recording the
/// order in which jobs reached it. Identifies jobs by their quality id.
struct GatedProvider {
    inner: NativeProvider,
    gate: Arc<(Mutex<bool>, Condvar)>,
    order: Arc<Mutex<Vec<String>>>,
}

impl GatedProvider {
    fn new() -> Self {
        Self {
            inner: NativeProvider,
            gate: Arc::new((Mutex::new(false), Condvar::new())),
            order: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn release(&self) {
        let (lock, cvar) = &*self.gate;
        *lock.lock().unwrap() = true;
        cvar.notify_all();
    }

    fn opened(&self) -> Vec<String> {
        self.order.lock().unwrap().clone()
    }
}

impl MediaCapabilityProvider for GatedProvider {
    fn supports(&self, format: &EncoderFormat) -> bool {
        self.inner.supports(format)
    }

    fn open(
        &self,
        format: &EncoderFormat,
        quality: &QualityPreset,
        frame_count: u64,
    ) -> ClipResult<Box<dyn EncoderStream>> {
        self.order.lock().unwrap().push(quality.id.clone());
        let (lock, cvar) = &*self.gate;
        let mut released = lock.lock().unwrap();
        while !*released {
            released = cvar.wait(released).unwrap();
        }
        drop(released);
        self.inner.open(format, quality, frame_count)
    }
}

/// Provider whose stream panics on the first frame; exercises the worker's
/// panic boundary.
struct PanickingProvider;

struct PanickingStream;

impl EncoderStream for PanickingStream {
    fn push_frame(&mut self, _frame: &clip_core::FrameBuffer) -> ClipResult<Vec<Vec<u8>>> {
        panic!("encoder blew up");
    }
    fn finish(self: Box<Self>) -> ClipResult<Vec<Vec<u8>>> {
        Ok(vec![])
    }
    fn abort(self: Box<Self>) {}
}

impl MediaCapabilityProvider for PanickingProvider {
    fn supports(&self, format: &EncoderFormat) -> bool {
        format.container == "apng"
    }
    fn open(
        &self,
        _format: &EncoderFormat,
        _quality: &QualityPreset,
        _frame_count: u64,
    ) -> ClipResult<Box<dyn EncoderStream>> {
        Ok(Box::new(PanickingStream))
    }
}

/// Probe whose reading can change between refreshes.
struct AdjustableProbe(AtomicU64);

impl MemoryProbe for AdjustableProbe {
    fn available_bytes(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn end_to_end_720p_scenario() {
    // 720p clock ticks are coarse (500ms virtual steps) to keep the pixel
    // work reasonable; the encoder still samples all 180 frames at 30fps.
    let config = SchedulerConfig {
        clock_factory: Arc::new(|| Box::new(VirtualClock::with_step_ms(500.0)) as Box<dyn clip_record::Clock>),
        ..test_config()
    }
    .with_max_concurrency(1);
    let scheduler = Scheduler::new(config);

    let catalog = ThemeCatalog::builtin();
    let handle = scheduler
        .enqueue(JobRequest {
            script: Script::new(
                "Stop scrolling",
                vec!["Tip one".into(), "Tip two".into()],
                "Save this",
            ),
            theme: catalog.theme("subway").unwrap().clone(),
            quality: catalog.quality("720p").unwrap().clone(),
            priority: Priority::Normal,
        })
        .unwrap();
    let job_id = handle.id();

    match handle.wait().await {
        JobOutcome::Completed(artifact) => {
            assert_eq!(artifact.width, 720);
            assert_eq!(artifact.height, 1280);
            assert!((artifact.duration_seconds - 6.0).abs() < 1e-9);
            assert_eq!(artifact.mime_type, "image/apng");
            assert_eq!(artifact.size_bytes, artifact.bytes.len() as u64);
            assert_eq!(&artifact.bytes[..4], &[0x89, b'P', b'N', b'G']);
        }
        other => panic!("expected completion, got {:?}", other),
    }
    assert_eq!(scheduler.finished_status(job_id), Some(JobStatus::Completed));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn progress_is_monotonic_and_ends_at_100() {
    let scheduler = Scheduler::new(test_config().with_max_concurrency(1));
    let mut handle = scheduler.enqueue(request(Priority::Normal, "q")).unwrap();

    let mut percents = Vec::new();
    let mut terminal_count = 0;
    while let Some(event) = handle.next_event().await {
        match event {
            JobEvent::Progress(p) => {
                assert!((0.0..=100.0).contains(&p.percent));
                percents.push(p.percent);
            }
            JobEvent::Completed(_) => terminal_count += 1,
            other => panic!("unexpected event {:?}", other),
        }
    }

    assert_eq!(terminal_count, 1, "exactly one terminal event");
    assert!(!percents.is_empty());
    for pair in percents.windows(2) {
        assert!(pair[1] >= pair[0], "progress went backwards: {:?}", pair);
    }
    assert_eq!(*percents.last().unwrap(), 100.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn priority_order_high_dispatches_first() {
    let provider = Arc::new(GatedProvider::new());
    let config = SchedulerConfig::new(provider.clone())
        .with_virtual_time()
        .with_max_concurrency(1);
    let scheduler = Scheduler::new(config);

    // Occupy the single slot, then enqueue [low, high, normal].
    let blocker = scheduler.enqueue(request(Priority::Normal, "blocker")).unwrap();
    wait_until(|| provider.opened().len() == 1).await;

    let low = scheduler.enqueue(request(Priority::Low, "low")).unwrap();
    let high = scheduler.enqueue(request(Priority::High, "high")).unwrap();
    let normal = scheduler.enqueue(request(Priority::Normal, "normal")).unwrap();
    assert_eq!(scheduler.status().queued_count, 3);
    assert_eq!(scheduler.status().running_count, 1);

    provider.release();
    for handle in [blocker, high, normal, low] {
        assert!(matches!(handle.wait().await, JobOutcome::Completed(_)));
    }

    // High priority first, then FIFO within the normal band, low last.
    assert_eq!(provider.opened(), vec!["blocker", "high", "normal", "low"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn running_count_never_exceeds_cap() {
    let scheduler = Scheduler::new(
        test_config().with_probe(Arc::new(FixedMemoryProbe(3 * GIB))),
    );
    assert_eq!(scheduler.status().max_concurrency, 2);

    let handles: Vec<_> = (0..6)
        .map(|i| {
            scheduler
                .enqueue(request(Priority::Normal, &format!("q{}", i)))
                .unwrap()
        })
        .collect();

    // Sample the invariant while draining the queue.
    let mut done = Vec::new();
    for handle in handles {
        let status = scheduler.status();
        assert!(
            status.running_count <= status.max_concurrency,
            "bound violated: {:?}",
            status
        );
        done.push(handle.wait().await);
    }
    for outcome in done {
        assert!(matches!(outcome, JobOutcome::Completed(_)));
    }
    let status = scheduler.status();
    assert_eq!(status.queued_count, 0);
    assert_eq!(status.running_count, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn two_gb_device_serializes_jobs() {
    let provider = Arc::new(GatedProvider::new());
    let config = SchedulerConfig::new(provider.clone())
        .with_virtual_time()
        .with_probe(Arc::new(FixedMemoryProbe(2 * GIB)));
    let scheduler = Scheduler::new(config);
    assert_eq!(scheduler.status().max_concurrency, 1);

    let handles: Vec<_> = (0..3)
        .map(|i| {
            scheduler
                .enqueue(request(Priority::Normal, &format!("q{}", i)))
                .unwrap()
        })
        .collect();

    // Exactly one running while the gate holds the first job.
    wait_until(|| provider.opened().len() == 1).await;
    let status = scheduler.status();
    assert_eq!(status.running_count, 1);
    assert_eq!(status.queued_count, 2);

    provider.release();
    for handle in handles {
        assert!(matches!(handle.wait().await, JobOutcome::Completed(_)));
    }
    assert_eq!(provider.opened().len(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancel_pending_never_dispatches() {
    let provider = Arc::new(GatedProvider::new());
    let config = SchedulerConfig::new(provider.clone())
        .with_virtual_time()
        .with_max_concurrency(1);
    let scheduler = Scheduler::new(config);

    let blocker = scheduler.enqueue(request(Priority::Normal, "blocker")).unwrap();
    wait_until(|| provider.opened().len() == 1).await;

    let victim = scheduler.enqueue(request(Priority::Normal, "victim")).unwrap();
    let victim_id = victim.id();

    assert!(scheduler.cancel(victim_id));
    assert!(matches!(victim.wait().await, JobOutcome::Cancelled));
    assert_eq!(
        scheduler.finished_status(victim_id),
        Some(JobStatus::Cancelled)
    );
    // Already terminal: second cancel returns false.
    assert!(!scheduler.cancel(victim_id));

    provider.release();
    assert!(matches!(blocker.wait().await, JobOutcome::Completed(_)));
    // The victim never reached the provider.
    assert_eq!(provider.opened(), vec!["blocker"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancel_running_releases_slot_and_spares_siblings() {
    let provider = Arc::new(GatedProvider::new());
    let config = SchedulerConfig::new(provider.clone())
        .with_virtual_time()
        .with_max_concurrency(2);
    let scheduler = Scheduler::new(config);

    let victim = scheduler.enqueue(request(Priority::Normal, "victim")).unwrap();
    let sibling = scheduler.enqueue(request(Priority::Normal, "sibling")).unwrap();
    let victim_id = victim.id();
    wait_until(|| provider.opened().len() == 2).await;

    // Signal while the worker is still inside the encoder gate; the flag is
    // observed on the next tick after open returns.
    assert!(scheduler.cancel(victim_id));
    provider.release();

    assert!(matches!(victim.wait().await, JobOutcome::Cancelled));
    assert!(matches!(sibling.wait().await, JobOutcome::Completed(_)));
    assert_eq!(
        scheduler.finished_status(victim_id),
        Some(JobStatus::Cancelled)
    );

    // Slot released: the queue drains to empty.
    wait_until(|| scheduler.status().running_count == 0).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancel_unknown_job_returns_false() {
    let scheduler = Scheduler::new(test_config());
    assert!(!scheduler.cancel(clip_core::JobId::new()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn worker_panic_fails_only_its_own_job() {
    let scheduler = Scheduler::new(
        SchedulerConfig::new(Arc::new(PanickingProvider))
            .with_virtual_time()
            .with_max_concurrency(2),
    );
    let doomed = scheduler.enqueue(request(Priority::Normal, "doomed")).unwrap();

    match doomed.wait().await {
        JobOutcome::Failed { error, .. } => assert!(error.contains("panicked")),
        other => panic!("expected failure, got {:?}", other),
    }

    // The slot was released despite the panic.
    let status = scheduler.status();
    assert_eq!(status.running_count, 0);
    assert_eq!(status.queued_count, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failed_job_does_not_poison_siblings() {
    // One scheduler, one bad job (oversized surface), one good job.
    let scheduler = Scheduler::new(test_config().with_max_concurrency(2));

    let mut bad = request(Priority::Normal, "bad");
    bad.quality.width = 100_000;
    let bad_handle = scheduler.enqueue(bad).unwrap();
    let good_handle = scheduler.enqueue(request(Priority::Normal, "good")).unwrap();

    match bad_handle.wait().await {
        JobOutcome::Failed { retryable, .. } => assert!(!retryable),
        other => panic!("expected capability failure, got {:?}", other),
    }
    assert!(matches!(good_handle.wait().await, JobOutcome::Completed(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn refresh_concurrency_tracks_probe() {
    let probe = Arc::new(AdjustableProbe(AtomicU64::new(2 * GIB)));
    let scheduler = Scheduler::new(test_config().with_probe(probe.clone()));
    assert_eq!(scheduler.status().max_concurrency, 1);

    probe.0.store(16 * GIB, Ordering::SeqCst);
    assert_eq!(scheduler.refresh_concurrency(), 4);
    assert_eq!(scheduler.status().max_concurrency, 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn explicit_cap_ignores_probe_refresh() {
    let probe = Arc::new(AdjustableProbe(AtomicU64::new(16 * GIB)));
    let scheduler = Scheduler::new(
        test_config()
            .with_probe(probe.clone())
            .with_max_concurrency(1),
    );
    assert_eq!(scheduler.status().max_concurrency, 1);
    assert_eq!(scheduler.refresh_concurrency(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn enqueue_rejects_empty_script() {
    let scheduler = Scheduler::new(test_config());
    let result = scheduler.enqueue(JobRequest {
        script: Script::new("hook", vec![], "cta"),
        theme: theme(),
        quality: tiny_quality("q"),
        priority: Priority::Normal,
    });
    assert!(result.is_err());
    assert_eq!(scheduler.status().queued_count, 0);
}
