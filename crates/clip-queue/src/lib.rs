//! # clip-queue
//!
//! The job queue and scheduler: accepts render jobs, keeps a
//! priority-ordered pending list, launches jobs into isolated workers up to
//! a concurrency cap derived from available memory, routes
//! progress/completion events to per-job subscribers, and supports
//! cancellation of both pending and running jobs.

pub mod memory;
pub mod scheduler;
pub mod sink;
mod worker;

pub use memory::{FixedMemoryProbe, MemoryProbe, SystemMemoryProbe};
pub use scheduler::{
    ClockFactory, JobEvent, JobHandle, JobOutcome, JobRequest, Scheduler, SchedulerConfig,
};
pub use sink::{ArtifactSink, FileSink};
