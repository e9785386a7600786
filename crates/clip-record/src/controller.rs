//! The recording state machine.
//!
//! `Idle → Initializing → Recording → Stopping → Stopped`, with exactly one
//! `Stopped` transition per recording. The tick loop derives the current
//! body frame from elapsed time, repaints the surface, and lets the encoder
//! sample it at the preset's fixed frame rate — the encoder's rate is
//! independent of how fast or slow the ticks arrive.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clip_core::{
    ClipError, ClipResult, Duration, FrameBuffer, JobId, QualityPreset, RenderArtifact,
    RenderProgress, Script, Theme,
};
use clip_encode::{MediaCapabilityProvider, StreamEncoder};
use clip_render::FrameRenderer;

use crate::clock::Clock;

/// How long each body frame stays on screen.
pub const FRAME_DWELL_MS: f64 = 3000.0;

/// Largest surface edge the controller will allocate.
const MAX_SURFACE_DIM: u32 = 8192;

/// Recording lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Initializing,
    Recording,
    Stopping,
    Stopped,
}

/// How a recording ended (errors are returned separately).
#[derive(Debug)]
pub enum RecordingOutcome {
    /// The script played out fully; here is the artifact.
    Finished(RenderArtifact),
    /// Cancellation was requested; all encoder output was discarded.
    Cancelled,
}

/// Cooperative cancellation signal, checked once per tick. Cancelling never
/// blocks; the loop acknowledges within one tick.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives one recording from start to a single terminal stop.
pub struct RecordingController {
    renderer: FrameRenderer,
    clock: Box<dyn Clock>,
    surface: Option<FrameBuffer>,
    state: RecorderState,
}

impl RecordingController {
    pub fn new(renderer: FrameRenderer, clock: Box<dyn Clock>) -> Self {
        Self {
            renderer,
            clock,
            surface: None,
            state: RecorderState::Idle,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    /// Allocate the rendering surface for `quality`.
    pub fn initialize(&mut self, quality: &QualityPreset) -> ClipResult<()> {
        if self.state != RecorderState::Idle {
            return Err(ClipError::InvalidArgument(format!(
                "cannot initialize from state {:?}",
                self.state
            )));
        }
        if quality.width == 0
            || quality.height == 0
            || quality.width > MAX_SURFACE_DIM
            || quality.height > MAX_SURFACE_DIM
        {
            return Err(ClipError::Capability(format!(
                "cannot provide a {}x{} drawing surface",
                quality.width, quality.height
            )));
        }
        self.surface = Some(FrameBuffer::new(quality.width, quality.height));
        self.state = RecorderState::Initializing;
        Ok(())
    }

    /// Run the recording loop to its single terminal stop.
    ///
    /// Returns `Finished` with the artifact, `Cancelled` if the flag was
    /// raised, or an error — in the last two cases every encoded chunk is
    /// discarded.
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        &mut self,
        job_id: JobId,
        script: &Script,
        theme: &Theme,
        quality: &QualityPreset,
        provider: &dyn MediaCapabilityProvider,
        cancel: &CancelFlag,
        on_progress: &mut dyn FnMut(RenderProgress),
    ) -> ClipResult<RecordingOutcome> {
        if self.state != RecorderState::Initializing {
            return Err(ClipError::InvalidArgument(format!(
                "cannot start recording from state {:?}",
                self.state
            )));
        }
        script.validate()?;

        let total_ms = FRAME_DWELL_MS * script.frames.len() as f64;
        let duration = Duration::from_millis(total_ms);
        let sample_count = duration.frame_count(quality.frame_rate);
        let sample_interval_ms = 1000.0 / quality.frame_rate;

        let mut encoder = match StreamEncoder::open(provider, quality, sample_count) {
            Ok(enc) => enc,
            Err(e) => {
                self.state = RecorderState::Stopped;
                return Err(e);
            }
        };

        self.state = RecorderState::Recording;
        tracing::debug!(job = %job_id, frames = script.frames.len(), total_ms, "recording started");

        let surface = self
            .surface
            .as_mut()
            .expect("surface allocated in initialize");
        let start_ms = self.clock.now().as_millis();
        let mut sampled: u64 = 0;
        let mut last_index = 0usize;

        loop {
            if cancel.is_cancelled() {
                self.state = RecorderState::Stopping;
                encoder.abort();
                self.state = RecorderState::Stopped;
                tracing::debug!(job = %job_id, "recording cancelled");
                return Ok(RecordingOutcome::Cancelled);
            }

            let elapsed = self.clock.now().as_millis() - start_ms;
            let frame_index = (elapsed / FRAME_DWELL_MS).floor() as usize;
            if frame_index >= script.frames.len() {
                break;
            }
            last_index = frame_index;

            if let Err(e) =
                self.renderer
                    .render_frame(surface, theme, quality, script, frame_index, elapsed)
            {
                encoder.abort();
                self.state = RecorderState::Stopped;
                return Err(e);
            }

            // The encoder samples at its own fixed rate regardless of tick
            // cadence; slow ticks produce duplicate samples, fast ticks none.
            while sampled < sample_count && sampled as f64 * sample_interval_ms <= elapsed {
                if let Err(e) = encoder.push_frame(surface) {
                    encoder.abort();
                    self.state = RecorderState::Stopped;
                    return Err(e);
                }
                sampled += 1;
            }

            on_progress(RenderProgress {
                job_id,
                percent: (100.0 * elapsed / total_ms).min(100.0),
                current_frame_index: frame_index,
            });

            self.clock.tick();
        }

        self.state = RecorderState::Stopping;

        // Top the stream up to its declared length with the final frame.
        if sampled < sample_count {
            let final_index = script.frames.len() - 1;
            if let Err(e) = self.renderer.render_frame(
                surface,
                theme,
                quality,
                script,
                final_index,
                total_ms,
            ) {
                encoder.abort();
                self.state = RecorderState::Stopped;
                return Err(e);
            }
            while sampled < sample_count {
                if let Err(e) = encoder.push_frame(surface) {
                    encoder.abort();
                    self.state = RecorderState::Stopped;
                    return Err(e);
                }
                sampled += 1;
            }
            last_index = final_index;
        }

        on_progress(RenderProgress {
            job_id,
            percent: 100.0,
            current_frame_index: last_index,
        });

        let artifact = match encoder.finish(job_id, duration) {
            Ok(a) => a,
            Err(e) => {
                self.state = RecorderState::Stopped;
                return Err(e);
            }
        };
        self.state = RecorderState::Stopped;
        tracing::debug!(job = %job_id, size = artifact.size_bytes, "recording finished");
        Ok(RecordingOutcome::Finished(artifact))
    }
}
