//! The streaming encoder owned by one recording.
//!
//! `open` negotiates a format, `push_frame` feeds sampled frames and banks
//! the chunks that fall out, `finish` concatenates everything into the
//! job's immutable artifact. On any failure the accumulated chunks are
//! discarded — a partial artifact is never delivered.

use chrono::Utc;

use clip_core::{
    ClipError, ClipResult, Duration, FrameBuffer, JobId, QualityPreset, RenderArtifact,
};

use crate::format::{EncoderFormat, FORMAT_PREFERENCE};
use crate::provider::{EncoderStream, MediaCapabilityProvider};

pub struct StreamEncoder {
    format: EncoderFormat,
    stream: Box<dyn EncoderStream>,
    chunks: Vec<Vec<u8>>,
    width: u32,
    height: u32,
    frames_expected: u64,
    frames_pushed: u64,
}

impl std::fmt::Debug for StreamEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamEncoder")
            .field("format", &self.format)
            .field("chunks", &self.chunks.len())
            .field("width", &self.width)
            .field("height", &self.height)
            .field("frames_expected", &self.frames_expected)
            .field("frames_pushed", &self.frames_pushed)
            .finish_non_exhaustive()
    }
}

impl StreamEncoder {
    /// Negotiate a format against the preference list and open a stream.
    ///
    /// The first format the provider supports wins; if it supports none,
    /// the job fails with `UnsupportedFormat` — fatal and non-retryable.
    pub fn open(
        provider: &dyn MediaCapabilityProvider,
        quality: &QualityPreset,
        frame_count: u64,
    ) -> ClipResult<Self> {
        let format = FORMAT_PREFERENCE
            .iter()
            .find(|f| provider.supports(f))
            .copied()
            .ok_or_else(|| {
                let tried: Vec<String> = FORMAT_PREFERENCE
                    .iter()
                    .map(|f| format!("{}/{}", f.container, f.codec))
                    .collect();
                ClipError::UnsupportedFormat(format!(
                    "provider supports none of [{}]",
                    tried.join(", ")
                ))
            })?;
        tracing::debug!(
            container = format.container,
            codec = format.codec,
            quality = %quality.id,
            "negotiated encoder format"
        );
        let stream = provider.open(&format, quality, frame_count)?;
        Ok(Self {
            format,
            stream,
            chunks: Vec::new(),
            width: quality.width,
            height: quality.height,
            frames_expected: frame_count,
            frames_pushed: 0,
        })
    }

    /// MIME type of the negotiated format.
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type
    }

    /// Exact number of frames the stream was opened for.
    pub fn frames_expected(&self) -> u64 {
        self.frames_expected
    }

    /// Frames pushed so far.
    pub fn frames_pushed(&self) -> u64 {
        self.frames_pushed
    }

    /// Feed one sampled frame; encoded chunks are appended in arrival order.
    pub fn push_frame(&mut self, frame: &FrameBuffer) -> ClipResult<()> {
        let new_chunks = self.stream.push_frame(frame)?;
        self.chunks.extend(new_chunks);
        self.frames_pushed += 1;
        Ok(())
    }

    /// Finalize and assemble the artifact. Consumes the encoder.
    pub fn finish(mut self, job_id: JobId, duration: Duration) -> ClipResult<RenderArtifact> {
        let tail = self.stream.finish()?;
        self.chunks.extend(tail);

        let total: usize = self.chunks.iter().map(Vec::len).sum();
        let mut bytes = Vec::with_capacity(total);
        for chunk in &self.chunks {
            bytes.extend_from_slice(chunk);
        }
        tracing::info!(
            job = %job_id,
            size = bytes.len(),
            mime = self.format.mime_type,
            duration = %duration,
            "assembled artifact"
        );
        Ok(RenderArtifact {
            job_id,
            size_bytes: bytes.len() as u64,
            bytes,
            mime_type: self.format.mime_type.to_string(),
            width: self.width,
            height: self.height,
            duration_seconds: duration.as_seconds(),
            created_at: Utc::now(),
        })
    }

    /// Discard the stream and every accumulated chunk.
    pub fn abort(self) {
        self.stream.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::NativeProvider;
    use clip_core::Color;
    use parking_lot::Mutex;

    fn tiny_quality() -> QualityPreset {
        QualityPreset {
            id: "tiny".into(),
            width: 8,
            height: 16,
            target_bitrate: 100_000,
            frame_rate: 30.0,
        }
    }

    /// Provider that records probe order and supports nothing.
    struct RefusingProvider {
        probed: Mutex<Vec<&'static str>>,
    }

    impl MediaCapabilityProvider for RefusingProvider {
        fn supports(&self, format: &EncoderFormat) -> bool {
            self.probed.lock().push(format.container);
            false
        }

        fn open(
            &self,
            _format: &EncoderFormat,
            _quality: &QualityPreset,
            _frame_count: u64,
        ) -> ClipResult<Box<dyn EncoderStream>> {
            unreachable!("open must not be called when nothing is supported")
        }
    }

    #[test]
    fn test_negotiation_probes_in_preference_order() {
        let provider = RefusingProvider {
            probed: Mutex::new(Vec::new()),
        };
        let err = StreamEncoder::open(&provider, &tiny_quality(), 3).unwrap_err();
        assert!(matches!(err, ClipError::UnsupportedFormat(_)));
        assert_eq!(*provider.probed.lock(), vec!["mp4", "webm", "apng"]);
    }

    #[test]
    fn test_negotiation_falls_back_to_native() {
        let encoder = StreamEncoder::open(&NativeProvider, &tiny_quality(), 3).unwrap();
        assert_eq!(encoder.mime_type(), "image/apng");
    }

    #[test]
    fn test_encode_roundtrip_artifact() {
        let q = tiny_quality();
        let mut encoder = StreamEncoder::open(&NativeProvider, &q, 4).unwrap();
        for _ in 0..4 {
            encoder
                .push_frame(&FrameBuffer::solid(8, 16, &Color::WHITE))
                .unwrap();
        }
        let job_id = JobId::new();
        let artifact = encoder
            .finish(job_id, Duration::from_seconds(6.0))
            .unwrap();

        assert_eq!(artifact.job_id, job_id);
        assert_eq!(artifact.mime_type, "image/apng");
        assert_eq!((artifact.width, artifact.height), (8, 16));
        assert_eq!(artifact.duration_seconds, 6.0);
        assert_eq!(artifact.size_bytes, artifact.bytes.len() as u64);
        assert_eq!(&artifact.bytes[..4], &[0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn test_finish_underfed_is_encode_error() {
        let encoder = StreamEncoder::open(&NativeProvider, &tiny_quality(), 5).unwrap();
        let err = encoder
            .finish(JobId::new(), Duration::from_seconds(1.0))
            .unwrap_err();
        assert!(matches!(err, ClipError::Encode(_)));
    }

    #[test]
    fn test_abort_discards_everything() {
        let mut encoder = StreamEncoder::open(&NativeProvider, &tiny_quality(), 2).unwrap();
        encoder
            .push_frame(&FrameBuffer::solid(8, 16, &Color::BLACK))
            .unwrap();
        encoder.abort();
    }
}
