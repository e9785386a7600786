use serde::{Deserialize, Serialize};

use crate::{ClipError, ClipResult};

/// The text content of one short video: a hook pinned at the top, a sequence
/// of body frames shown one after another, and a call-to-action at the bottom.
///
/// Immutable once handed to a render job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    /// Attention line pinned near the top. Empty string skips the draw.
    pub hook: String,
    /// Ordered body frames; each stays on screen for the dwell time.
    pub frames: Vec<String>,
    /// Call-to-action pinned near the bottom. Empty string skips the draw.
    pub cta: String,
}

impl Script {
    pub fn new(
        hook: impl Into<String>,
        frames: Vec<String>,
        cta: impl Into<String>,
    ) -> Self {
        Self {
            hook: hook.into(),
            frames,
            cta: cta.into(),
        }
    }

    /// A script is renderable only if it has at least one body frame.
    pub fn validate(&self) -> ClipResult<()> {
        if self.frames.is_empty() {
            return Err(ClipError::InvalidArgument(
                "script has no body frames".into(),
            ));
        }
        Ok(())
    }

    /// Clamp a frame index to the last valid body frame.
    pub fn clamp_frame_index(&self, index: usize) -> usize {
        index.min(self.frames.len().saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_requires_frames() {
        let empty = Script::new("h", vec![], "c");
        assert!(empty.validate().is_err());

        let ok = Script::new("h", vec!["one".into()], "c");
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_clamp_frame_index() {
        let s = Script::new("h", vec!["a".into(), "b".into()], "c");
        assert_eq!(s.clamp_frame_index(0), 0);
        assert_eq!(s.clamp_frame_index(1), 1);
        assert_eq!(s.clamp_frame_index(99), 1);
    }

    #[test]
    fn test_roundtrip_json() {
        let s = Script::new("Stop scrolling", vec!["Tip one".into()], "Save this");
        let json = serde_json::to_string(&s).unwrap();
        let back: Script = serde_json::from_str(&json).unwrap();
        assert_eq!(s, back);
    }
}
