//! Artifact persistence seam.
//!
//! The persistent store is an external collaborator: the pipeline only
//! calls `save` after a job completes, never mid-render. [`FileSink`] is
//! the built-in implementation used by the CLI.

use std::path::{Path, PathBuf};

use clip_core::{ClipResult, RenderArtifact};

/// Consumer of finished artifacts.
pub trait ArtifactSink: Send + Sync {
    fn save(&self, artifact: &RenderArtifact) -> ClipResult<()>;
}

/// Writes each artifact into a directory, named by job id with an extension
/// derived from the mime type.
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Where a given artifact will be written.
    pub fn path_for(&self, artifact: &RenderArtifact) -> PathBuf {
        let ext = match artifact.mime_type.as_str() {
            "video/mp4" => "mp4",
            "video/webm" => "webm",
            "image/apng" => "png",
            _ => "bin",
        };
        self.dir.join(format!("clip_{}.{}", artifact.job_id, ext))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ArtifactSink for FileSink {
    fn save(&self, artifact: &RenderArtifact) -> ClipResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(artifact);
        std::fs::write(&path, &artifact.bytes)?;
        tracing::info!(
            path = %path.display(),
            size = artifact.size_bytes,
            "artifact saved"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use clip_core::JobId;

    fn artifact(mime: &str) -> RenderArtifact {
        RenderArtifact {
            job_id: JobId::new(),
            bytes: vec![1, 2, 3],
            mime_type: mime.to_string(),
            width: 8,
            height: 16,
            duration_seconds: 6.0,
            size_bytes: 3,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_extension_mapping() {
        let sink = FileSink::new("/tmp/out");
        let path = sink.path_for(&artifact("video/mp4"));
        assert_eq!(path.extension().unwrap(), "mp4");
        let path = sink.path_for(&artifact("image/apng"));
        assert_eq!(path.extension().unwrap(), "png");
        let path = sink.path_for(&artifact("application/x-unknown"));
        assert_eq!(path.extension().unwrap(), "bin");
    }

    #[test]
    fn test_save_writes_bytes() {
        let dir = std::env::temp_dir().join("clipforge_sink_test");
        let sink = FileSink::new(&dir);
        let a = artifact("image/apng");
        sink.save(&a).unwrap();
        let written = std::fs::read(sink.path_for(&a)).unwrap();
        assert_eq!(written, a.bytes);
        let _ = std::fs::remove_file(sink.path_for(&a));
    }
}
