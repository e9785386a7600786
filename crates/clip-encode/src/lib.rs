//! # clip-encode
//!
//! Encoding layer: negotiates the best supported (container, codec) pair
//! through a [`MediaCapabilityProvider`], accumulates encoded chunks as
//! frames stream in, and assembles the final immutable
//! [`clip_core::RenderArtifact`] when recording stops.

pub mod encoder;
pub mod ffmpeg;
pub mod format;
pub mod provider;

pub use encoder::StreamEncoder;
pub use ffmpeg::{FfmpegProvider, PlatformProvider};
pub use format::{EncoderFormat, FORMAT_PREFERENCE};
pub use provider::{EncoderStream, MediaCapabilityProvider, NativeProvider};
