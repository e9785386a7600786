//! Core error types for the clipforge pipeline.

/// A specialized Result type for clipforge operations.
pub type ClipResult<T> = Result<T, ClipError>;

/// Top-level error type encompassing all clipforge subsystems.
///
/// Cancellation is deliberately absent: a cancelled job is a distinct
/// terminal outcome, not an error.
#[derive(Debug, thiserror::Error)]
pub enum ClipError {
    /// The platform cannot provide a drawing surface or encoder at all.
    /// Fatal for the job; not retryable without a different quality/format.
    #[error("capability error: {0}")]
    Capability(String),

    /// No supported (container, codec) pair was found during negotiation.
    #[error("no supported media format: {0}")]
    UnsupportedFormat(String),

    /// A failure while painting a frame. Fatal for that job only.
    #[error("render error: {0}")]
    Render(String),

    /// Chunk accumulation or finalize failure. Fatal for that job only;
    /// partial output is discarded.
    #[error("encode error: {0}")]
    Encode(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClipError {
    /// True if re-submitting the same job could ever succeed.
    ///
    /// Capability and format negotiation failures require a different
    /// quality or format choice, so retrying as-is is pointless.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            ClipError::Capability(_) | ClipError::UnsupportedFormat(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ClipError::Render("glyph raster failed".into());
        assert_eq!(err.to_string(), "render error: glyph raster failed");
    }

    #[test]
    fn test_retryability() {
        assert!(!ClipError::Capability("no surface".into()).is_retryable());
        assert!(!ClipError::UnsupportedFormat("none of 3".into()).is_retryable());
        assert!(ClipError::Encode("pipe closed".into()).is_retryable());
        assert!(ClipError::Render("oops".into()).is_retryable());
    }
}
