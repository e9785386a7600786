//! # clip-core
//!
//! Core types and primitives for the clipforge render pipeline.
//! This crate contains the foundational types shared across all clipforge
//! crates: frame buffers, colors, durations, the script/theme/quality data
//! model, job lifecycle types, and error types.

pub mod catalog;
pub mod color;
pub mod config;
pub mod error;
pub mod frame;
pub mod hash;
pub mod job;
pub mod script;
pub mod time;

pub use catalog::{ParticleKind, QualityPreset, Theme, ThemeCatalog};
pub use color::Color;
pub use config::ForgeConfig;
pub use error::{ClipError, ClipResult};
pub use frame::{FrameBuffer, PixelFormat};
pub use job::{
    JobId, JobStatus, Priority, QueueState, RenderArtifact, RenderJob, RenderProgress,
};
pub use script::Script;
pub use time::{Duration, Timestamp};
