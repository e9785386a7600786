//! # clip-record
//!
//! The recording controller: owns a rendering surface and an animation
//! clock, drives the frame renderer once per tick, and feeds sampled frames
//! to the stream encoder until the script runs out or the job is cancelled.

pub mod clock;
pub mod controller;

pub use clock::{Clock, SystemClock, VirtualClock};
pub use controller::{
    CancelFlag, RecorderState, RecordingController, RecordingOutcome, FRAME_DWELL_MS,
};
