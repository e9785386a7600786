//! FFmpeg-backed capability provider.
//!
//! Pipes raw RGBA frames into an `ffmpeg` child process and reads the
//! encoded container bytes back from its stdout as they appear, so chunks
//! stream out mid-recording just like the native provider's.

use std::io::{Read, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::{Arc, OnceLock};
use std::thread::JoinHandle;

use parking_lot::Mutex;

use clip_core::{ClipError, ClipResult, FrameBuffer, QualityPreset};

use crate::format::EncoderFormat;
use crate::provider::{EncoderStream, MediaCapabilityProvider};

static FFMPEG_AVAILABLE: OnceLock<bool> = OnceLock::new();

/// Provider that shells out to FFmpeg for MP4/H.264 and WebM/VP9.
pub struct FfmpegProvider;

impl FfmpegProvider {
    /// Check (once per process) whether ffmpeg is on the PATH.
    pub fn is_available() -> bool {
        *FFMPEG_AVAILABLE.get_or_init(|| {
            Command::new("ffmpeg")
                .arg("-version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map(|s| s.success())
                .unwrap_or(false)
        })
    }

    fn codec_args(format: &EncoderFormat, quality: &QualityPreset) -> Option<Vec<String>> {
        let bitrate = format!("{}", quality.target_bitrate);
        match (format.container, format.codec) {
            ("mp4", "h264") => Some(vec![
                "-c:v".into(),
                "libx264".into(),
                "-pix_fmt".into(),
                "yuv420p".into(),
                "-b:v".into(),
                bitrate,
                // Fragmented output so the MP4 is valid when written to a pipe.
                "-movflags".into(),
                "frag_keyframe+empty_moov".into(),
                "-f".into(),
                "mp4".into(),
            ]),
            ("webm", "vp9") => Some(vec![
                "-c:v".into(),
                "libvpx-vp9".into(),
                "-pix_fmt".into(),
                "yuv420p".into(),
                "-b:v".into(),
                bitrate,
                "-f".into(),
                "webm".into(),
            ]),
            _ => None,
        }
    }
}

impl MediaCapabilityProvider for FfmpegProvider {
    fn supports(&self, format: &EncoderFormat) -> bool {
        Self::codec_args(format, &probe_quality()).is_some() && Self::is_available()
    }

    fn open(
        &self,
        format: &EncoderFormat,
        quality: &QualityPreset,
        _frame_count: u64,
    ) -> ClipResult<Box<dyn EncoderStream>> {
        let codec_args = Self::codec_args(format, quality).ok_or_else(|| {
            ClipError::UnsupportedFormat(format!(
                "ffmpeg provider cannot encode {}/{}",
                format.container, format.codec
            ))
        })?;
        if !Self::is_available() {
            return Err(ClipError::Capability("ffmpeg not found in PATH".into()));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.args([
            "-f",
            "rawvideo",
            "-pixel_format",
            "rgba",
            "-video_size",
            &format!("{}x{}", quality.width, quality.height),
            "-framerate",
            &format!("{}", quality.frame_rate),
            "-i",
            "-",
        ]);
        cmd.args(&codec_args);
        cmd.arg("pipe:1");

        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ClipError::Encode(format!("failed to start ffmpeg: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ClipError::Encode("failed to open ffmpeg stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ClipError::Encode("failed to open ffmpeg stdout".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ClipError::Encode("failed to open ffmpeg stderr".into()))?;

        let chunks: Arc<Mutex<Vec<Vec<u8>>>> = Arc::new(Mutex::new(Vec::new()));
        let chunks_in = chunks.clone();
        let stdout_thread = std::thread::spawn(move || {
            let mut reader = stdout;
            let mut buf = [0u8; 64 * 1024];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => chunks_in.lock().push(buf[..n].to_vec()),
                }
            }
        });
        let stderr_thread = std::thread::spawn(move || {
            let mut reader = stderr;
            let mut out = Vec::new();
            let _ = reader.read_to_end(&mut out);
            out
        });

        tracing::debug!(
            container = format.container,
            codec = format.codec,
            "opened ffmpeg stream"
        );

        Ok(Box::new(FfmpegStream {
            child,
            stdin: Some(stdin),
            chunks,
            stdout_thread: Some(stdout_thread),
            stderr_thread: Some(stderr_thread),
            width: quality.width,
            height: quality.height,
        }))
    }
}

/// Default provider chain: FFmpeg codecs when the tool is on the PATH,
/// falling through to the in-process APNG encoder otherwise.
pub struct PlatformProvider {
    ffmpeg: FfmpegProvider,
    native: crate::provider::NativeProvider,
}

impl PlatformProvider {
    pub fn new() -> Self {
        Self {
            ffmpeg: FfmpegProvider,
            native: crate::provider::NativeProvider,
        }
    }
}

impl Default for PlatformProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaCapabilityProvider for PlatformProvider {
    fn supports(&self, format: &EncoderFormat) -> bool {
        self.ffmpeg.supports(format) || self.native.supports(format)
    }

    fn open(
        &self,
        format: &EncoderFormat,
        quality: &QualityPreset,
        frame_count: u64,
    ) -> ClipResult<Box<dyn EncoderStream>> {
        if self.ffmpeg.supports(format) {
            self.ffmpeg.open(format, quality, frame_count)
        } else {
            self.native.open(format, quality, frame_count)
        }
    }
}

/// Quality stand-in for the capability probe; codec support does not depend
/// on dimensions.
fn probe_quality() -> QualityPreset {
    QualityPreset {
        id: "probe".into(),
        width: 2,
        height: 2,
        target_bitrate: 1,
        frame_rate: 30.0,
    }
}

struct FfmpegStream {
    child: Child,
    stdin: Option<ChildStdin>,
    chunks: Arc<Mutex<Vec<Vec<u8>>>>,
    stdout_thread: Option<JoinHandle<()>>,
    stderr_thread: Option<JoinHandle<Vec<u8>>>,
    width: u32,
    height: u32,
}

impl FfmpegStream {
    fn drain(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *self.chunks.lock())
    }

    fn stderr_text(&mut self) -> String {
        match self.stderr_thread.take() {
            Some(t) => String::from_utf8_lossy(&t.join().unwrap_or_default()).into_owned(),
            None => String::new(),
        }
    }
}

impl EncoderStream for FfmpegStream {
    fn push_frame(&mut self, frame: &FrameBuffer) -> ClipResult<Vec<Vec<u8>>> {
        if frame.width != self.width || frame.height != self.height {
            return Err(ClipError::Encode(format!(
                "frame is {}x{}, stream expects {}x{}",
                frame.width, frame.height, self.width, self.height
            )));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| ClipError::Encode("ffmpeg stream already closed".into()))?;
        if let Err(e) = stdin.write_all(&frame.data) {
            let stderr = self.stderr_text();
            return Err(ClipError::Encode(format!(
                "failed to write frame to ffmpeg: {}. FFmpeg stderr: {}",
                e, stderr
            )));
        }
        Ok(self.drain())
    }

    fn finish(mut self: Box<Self>) -> ClipResult<Vec<Vec<u8>>> {
        // Closing stdin signals end of input.
        drop(self.stdin.take());
        if let Some(t) = self.stdout_thread.take() {
            let _ = t.join();
        }
        let status = self
            .child
            .wait()
            .map_err(|e| ClipError::Encode(format!("ffmpeg process error: {}", e)))?;
        if !status.success() {
            let stderr = self.stderr_text();
            return Err(ClipError::Encode(format!(
                "ffmpeg failed with status {}: {}",
                status, stderr
            )));
        }
        Ok(self.drain())
    }

    fn abort(self: Box<Self>) {
        // Teardown happens in Drop.
    }
}

/// Kill and reap the child on every terminal path, including unwinds that
/// never reach `finish`/`abort`. Idempotent: after a successful `finish`
/// the status is already collected and `kill` is a no-op.
impl Drop for FfmpegStream {
    fn drop(&mut self) {
        drop(self.stdin.take());
        let _ = self.child.kill();
        let _ = self.child.wait();
        if let Some(t) = self.stdout_thread.take() {
            let _ = t.join();
        }
        if let Some(t) = self.stderr_thread.take() {
            let _ = t.join();
        }
    }
}
