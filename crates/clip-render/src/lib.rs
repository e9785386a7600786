//! # clip-render
//!
//! The frame renderer: paints one frame of a short video onto a
//! [`clip_core::FrameBuffer`] as a pure function of (theme, quality, script,
//! frame index, elapsed time). No state survives between calls, so the same
//! inputs always produce pixel-identical output.

pub mod renderer;
pub mod text;
pub mod wrap;

pub use renderer::FrameRenderer;
pub use text::TextRenderer;
pub use wrap::wrap_words;
