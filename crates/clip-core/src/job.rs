//! Render job lifecycle types.
//!
//! A job is one request to render and encode a single video from a
//! (script, theme, quality) triple. The scheduler owns the job exclusively
//! while it is queued or running; it transitions into a terminal state
//! exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{QualityPreset, Script, Theme};

/// Unique identifier of a render job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Dispatch priority. Higher priorities leave the pending list first;
/// within one band, arrival order wins.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

/// Job lifecycle state. `Completed`, `Failed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

/// One request to render and encode a single video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderJob {
    pub id: JobId,
    pub script: Script,
    pub theme: Theme,
    pub quality: QualityPreset,
    pub priority: Priority,
    pub enqueued_at: DateTime<Utc>,
    pub status: JobStatus,
}

impl RenderJob {
    pub fn new(script: Script, theme: Theme, quality: QualityPreset, priority: Priority) -> Self {
        Self {
            id: JobId::new(),
            script,
            theme,
            quality,
            priority,
            enqueued_at: Utc::now(),
            status: JobStatus::Queued,
        }
    }
}

/// Transient progress value emitted repeatedly while a job is running.
/// Not persisted anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderProgress {
    pub job_id: JobId,
    /// Completion percentage in [0, 100].
    pub percent: f64,
    /// Index of the body frame currently on screen.
    pub current_frame_index: usize,
}

/// The final encoded output of a completed job. Immutable; produced exactly
/// once per successful job, then handed to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderArtifact {
    pub job_id: JobId,
    /// Opaque encoded media bytes.
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub duration_seconds: f64,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

/// Scheduler-owned counters, read by status queries only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueState {
    pub queued_count: usize,
    pub running_count: usize,
    pub max_concurrency: usize,
}
