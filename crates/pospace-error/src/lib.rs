use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for plot checkpoint/restore operations.
///
/// Structured variants for every failure the subsystem can report, so
/// callers can distinguish a parameter mismatch from an I/O failure
/// programmatically rather than by message text.
#[derive(Error, Debug)]
pub enum PlotError {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File cannot be opened for reading or writing.
    #[error("unable to open file: '{path}'")]
    CannotOpen { path: PathBuf },

    /// An expected checkpoint or backup-bucket artifact is absent.
    #[error("checkpoint artifact not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// A run parameter differs between the resuming and persisted
    /// snapshots. Reports the first differing field only.
    #[error("{field} mismatch between phases")]
    ParameterMismatch { field: &'static str },

    /// The persisted memory-buffer size exceeds the caller-supplied
    /// capacity.
    #[error("restored memory size {recorded} exceeds capacity {capacity}")]
    CapacityMismatch { recorded: u64, capacity: u64 },

    /// Short read (fewer bytes than expected) from a checkpoint file.
    #[error("short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },
}

impl PlotError {
    /// Create a parameter-mismatch error for `field`.
    pub const fn mismatch(field: &'static str) -> Self {
        Self::ParameterMismatch { field }
    }

    /// Create a cannot-open error.
    pub fn cannot_open(path: impl Into<PathBuf>) -> Self {
        Self::CannotOpen { path: path.into() }
    }

    /// Create a file-not-found error.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Whether this error is a snapshot parameter mismatch.
    #[must_use]
    pub const fn is_parameter_mismatch(&self) -> bool {
        matches!(self, Self::ParameterMismatch { .. })
    }

    /// The mismatched field name, if this is a parameter mismatch.
    #[must_use]
    pub const fn mismatched_field(&self) -> Option<&'static str> {
        match self {
            Self::ParameterMismatch { field } => Some(field),
            _ => None,
        }
    }

    /// Whether the failure indicates a missing on-disk artifact (as
    /// opposed to an artifact that exists but cannot be used).
    #[must_use]
    pub const fn is_missing_artifact(&self) -> bool {
        matches!(self, Self::FileNotFound { .. })
    }
}

/// Result type alias using `PlotError`.
pub type Result<T> = std::result::Result<T, PlotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_mismatch() {
        let err = PlotError::mismatch("num_buckets");
        assert_eq!(err.to_string(), "num_buckets mismatch between phases");
    }

    #[test]
    fn error_display_capacity() {
        let err = PlotError::CapacityMismatch {
            recorded: 4096,
            capacity: 1024,
        };
        assert_eq!(
            err.to_string(),
            "restored memory size 4096 exceeds capacity 1024"
        );
    }

    #[test]
    fn error_display_not_found() {
        let err = PlotError::not_found("/tmp/plot/summary.phase1.backup");
        assert_eq!(
            err.to_string(),
            "checkpoint artifact not found: '/tmp/plot/summary.phase1.backup'"
        );
    }

    #[test]
    fn mismatch_introspection() {
        let err = PlotError::mismatch("k");
        assert!(err.is_parameter_mismatch());
        assert_eq!(err.mismatched_field(), Some("k"));

        let err = PlotError::not_found("x");
        assert!(!err.is_parameter_mismatch());
        assert_eq!(err.mismatched_field(), None);
        assert!(err.is_missing_artifact());
    }

    #[test]
    fn io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: PlotError = io_err.into();
        assert!(matches!(err, PlotError::Io(_)));
        assert!(!err.is_missing_artifact());
    }
}
