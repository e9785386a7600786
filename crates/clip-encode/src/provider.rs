//! Media capability abstraction.
//!
//! Platform encoding capabilities sit behind [`MediaCapabilityProvider`]:
//! the pipeline only ever asks "do you support this format?" and "open me a
//! stream". [`NativeProvider`] is the in-process implementation — streaming
//! APNG through the `png` crate, supported everywhere with zero external
//! tools.

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;

use clip_core::{ClipError, ClipResult, FrameBuffer, QualityPreset};

use crate::format::EncoderFormat;

/// An open encoding stream for exactly one job. Frames go in, encoded
/// chunks come out in arrival order.
pub trait EncoderStream: Send {
    /// Encode one sampled frame. Returns the chunks that became available.
    fn push_frame(&mut self, frame: &FrameBuffer) -> ClipResult<Vec<Vec<u8>>>;

    /// Finalize the stream and return any remaining chunks.
    fn finish(self: Box<Self>) -> ClipResult<Vec<Vec<u8>>>;

    /// Tear the stream down without producing output.
    fn abort(self: Box<Self>);
}

/// Negotiable source of encoding streams.
pub trait MediaCapabilityProvider: Send + Sync {
    /// Whether this provider can open a stream for `format`.
    fn supports(&self, format: &EncoderFormat) -> bool;

    /// Open a stream. `frame_count` is the exact number of frames the
    /// caller will push (formats like APNG declare it up front).
    fn open(
        &self,
        format: &EncoderFormat,
        quality: &QualityPreset,
        frame_count: u64,
    ) -> ClipResult<Box<dyn EncoderStream>>;
}

/// In-process provider: animated PNG via the `png` crate.
pub struct NativeProvider;

impl MediaCapabilityProvider for NativeProvider {
    fn supports(&self, format: &EncoderFormat) -> bool {
        format.container == "apng"
    }

    fn open(
        &self,
        format: &EncoderFormat,
        quality: &QualityPreset,
        frame_count: u64,
    ) -> ClipResult<Box<dyn EncoderStream>> {
        if !self.supports(format) {
            return Err(ClipError::UnsupportedFormat(format!(
                "native provider cannot encode {}/{}",
                format.container, format.codec
            )));
        }
        if frame_count == 0 {
            return Err(ClipError::Encode("cannot open a zero-frame stream".into()));
        }
        NativeApngStream::open(quality, frame_count).map(|s| Box::new(s) as Box<dyn EncoderStream>)
    }
}

/// `Write` target the png writer streams into; drained from outside after
/// every frame so chunks flow out while encoding is still in progress.
#[derive(Clone)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(Vec::new())))
    }

    fn drain(&self) -> Option<Vec<u8>> {
        let mut buf = self.0.lock();
        if buf.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut *buf))
        }
    }
}

impl Write for SharedBuf {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

struct NativeApngStream {
    writer: png::Writer<SharedBuf>,
    buf: SharedBuf,
    width: u32,
    height: u32,
    declared: u64,
    written: u64,
}

impl NativeApngStream {
    fn open(quality: &QualityPreset, frame_count: u64) -> ClipResult<Self> {
        let buf = SharedBuf::new();
        let mut encoder = png::Encoder::new(buf.clone(), quality.width, quality.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        // Throughput over ratio: frames must keep up with the tick loop.
        encoder.set_compression(png::Compression::Fast);
        encoder
            .set_animated(frame_count as u32, 0)
            .map_err(|e| ClipError::Encode(format!("failed to set APNG animation: {}", e)))?;
        encoder
            .set_frame_delay(1, quality.frame_rate.round() as u16)
            .map_err(|e| ClipError::Encode(format!("failed to set APNG frame delay: {}", e)))?;
        let writer = encoder
            .write_header()
            .map_err(|e| ClipError::Encode(format!("failed to write APNG header: {}", e)))?;
        tracing::debug!(
            frames = frame_count,
            width = quality.width,
            height = quality.height,
            "opened native APNG stream"
        );
        Ok(Self {
            writer,
            buf,
            width: quality.width,
            height: quality.height,
            declared: frame_count,
            written: 0,
        })
    }
}

impl EncoderStream for NativeApngStream {
    fn push_frame(&mut self, frame: &FrameBuffer) -> ClipResult<Vec<Vec<u8>>> {
        if frame.width != self.width || frame.height != self.height {
            return Err(ClipError::Encode(format!(
                "frame is {}x{}, stream expects {}x{}",
                frame.width, frame.height, self.width, self.height
            )));
        }
        if self.written >= self.declared {
            return Err(ClipError::Encode(format!(
                "stream declared {} frames, got more",
                self.declared
            )));
        }
        self.writer
            .write_image_data(&frame.data)
            .map_err(|e| ClipError::Encode(format!("failed to write APNG frame: {}", e)))?;
        self.written += 1;
        Ok(self.buf.drain().into_iter().collect())
    }

    fn finish(self: Box<Self>) -> ClipResult<Vec<Vec<u8>>> {
        let this = *self;
        if this.written != this.declared {
            return Err(ClipError::Encode(format!(
                "stream declared {} frames but received {}",
                this.declared, this.written
            )));
        }
        this.writer
            .finish()
            .map_err(|e| ClipError::Encode(format!("failed to finalize APNG: {}", e)))?;
        Ok(this.buf.drain().into_iter().collect())
    }

    fn abort(self: Box<Self>) {
        // Dropping the writer abandons the stream; nothing to flush.
    }
}
