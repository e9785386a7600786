//! The per-job worker.
//!
//! Runs the render/record/encode pipeline on a blocking thread with a
//! panic guard at the boundary: a crashing renderer or encoder fails its
//! own job and nothing else.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tokio::sync::mpsc;

use clip_core::{ClipError, ClipResult, RenderArtifact, RenderJob};
use clip_record::{CancelFlag, RecordingController, RecordingOutcome};
use clip_render::FrameRenderer;

use crate::scheduler::{self, JobEvent, Shared};

pub(crate) async fn run_job(
    shared: Arc<Shared>,
    job: RenderJob,
    events: mpsc::UnboundedSender<JobEvent>,
    cancel: CancelFlag,
) {
    let job_id = job.id;
    let provider = shared.provider.clone();
    let clock = (shared.clock_factory)();
    let font_path = shared.font_path.clone();
    let progress_tx = events.clone();

    let joined = tokio::task::spawn_blocking(move || {
        catch_unwind(AssertUnwindSafe(|| {
            execute(job, provider, clock, font_path, cancel, progress_tx)
        }))
    })
    .await;

    let outcome: ClipResult<Option<RenderArtifact>> = match joined {
        Ok(Ok(result)) => result,
        Ok(Err(panic)) => Err(ClipError::Render(format!(
            "worker panicked: {}",
            panic_message(&panic)
        ))),
        Err(join_err) => Err(ClipError::Render(format!(
            "worker task failed: {}",
            join_err
        ))),
    };

    scheduler::complete(&shared, job_id, outcome, events);
}

/// The pipeline itself: initialize a surface, negotiate an encoder, record.
/// `Ok(None)` means the job was cancelled mid-flight.
fn execute(
    job: RenderJob,
    provider: Arc<dyn clip_encode::MediaCapabilityProvider>,
    clock: Box<dyn clip_record::Clock>,
    font_path: Option<std::path::PathBuf>,
    cancel: CancelFlag,
    progress_tx: mpsc::UnboundedSender<JobEvent>,
) -> ClipResult<Option<RenderArtifact>> {
    let mut renderer = FrameRenderer::new();
    if let Some(path) = &font_path {
        renderer.load_font(path)?;
    }

    let mut controller = RecordingController::new(renderer, clock);
    controller.initialize(&job.quality)?;

    let mut on_progress = |progress| {
        // A detached subscriber is fine; rendering carries on.
        let _ = progress_tx.send(JobEvent::Progress(progress));
    };

    match controller.record(
        job.id,
        &job.script,
        &job.theme,
        &job.quality,
        provider.as_ref(),
        &cancel,
        &mut on_progress,
    )? {
        RecordingOutcome::Finished(artifact) => Ok(Some(artifact)),
        RecordingOutcome::Cancelled => Ok(None),
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
