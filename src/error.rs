//! Error types for townmatch.
//!
//! All errors are strongly typed using thiserror. Sub-errors for the
//! directory, overrides and configuration fold into [`TownError`] so callers
//! can pattern match on a single type.

use thiserror::Error;

use crate::verdict::BaseStatus;

/// Errors raised while loading or validating the reference directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Malformed directory payload: {message}")]
    Malformed {
        message: String,
    },

    #[error("Ambiguous alias '{key}' has {count} distinct option(s), expected at least 2")]
    InvalidAmbiguousGroup {
        key: String,
        count: usize,
    },

    #[error("Failed to read directory '{path}': {message}")]
    Io {
        path: String,
        message: String,
    },

    #[error("Failed to fingerprint directory: {message}")]
    Fingerprint {
        message: String,
    },
}

/// Errors raised by override transitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OverrideError {
    #[error("Row {index} not found ({rows} rows in the current run)")]
    RowNotFound {
        index: usize,
        rows: usize,
    },

    #[error("Row {index} has base status '{status}'; only ambiguous rows can be resolved")]
    NotAmbiguous {
        index: usize,
        status: BaseStatus,
    },

    #[error("No processing run is loaded")]
    NoActiveRun,
}

/// Errors raised while loading engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {message}")]
    Parse {
        message: String,
    },

    #[error("Configuration field '{field}' is out of range: {value}")]
    OutOfRange {
        field: &'static str,
        value: String,
    },

    #[error("Failed to read configuration '{path}': {message}")]
    Io {
        path: String,
        message: String,
    },
}

/// Top-level error type for townmatch.
#[derive(Debug, Error)]
pub enum TownError {
    #[error("Column '{column}' is not present in the header row")]
    InvalidColumn {
        column: String,
    },

    #[error("Batch processing failed: {reason}")]
    ProcessingFailed {
        reason: String,
    },

    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Override error: {0}")]
    Override(#[from] OverrideError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl TownError {
    /// Creates a processing failure.
    #[must_use]
    pub fn processing(reason: impl Into<String>) -> Self {
        Self::ProcessingFailed {
            reason: reason.into(),
        }
    }

    /// Returns true if this is a column selection error.
    #[must_use]
    pub const fn is_invalid_column(&self) -> bool {
        matches!(self, Self::InvalidColumn { .. })
    }

    /// Returns true if the batch worker failed.
    #[must_use]
    pub const fn is_processing_failed(&self) -> bool {
        matches!(self, Self::ProcessingFailed { .. })
    }

    /// Returns true if this error is retryable.
    ///
    /// Only worker failures are; the whole batch can be resubmitted.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ProcessingFailed { .. })
    }
}

/// Result type alias for townmatch operations.
pub type TownResult<T> = Result<T, TownError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_column_message() {
        let err = TownError::InvalidColumn {
            column: "Town".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("'Town'"));
        assert!(err.is_invalid_column());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_processing_failed_is_retryable() {
        let err = TownError::processing("worker disconnected");
        assert!(err.is_processing_failed());
        assert!(err.is_retryable());
        assert!(format!("{err}").contains("worker disconnected"));
    }

    #[test]
    fn test_directory_error_from() {
        let err: TownError = DirectoryError::InvalidAmbiguousGroup {
            key: "barre".to_string(),
            count: 1,
        }
        .into();
        assert!(matches!(err, TownError::Directory(_)));
        assert!(!err.is_retryable());
        let msg = format!("{err}");
        assert!(msg.contains("barre"));
        assert!(msg.contains("1 distinct"));
    }

    #[test]
    fn test_override_error_not_ambiguous() {
        let err = OverrideError::NotAmbiguous {
            index: 3,
            status: BaseStatus::Exact,
        };
        let msg = format!("{err}");
        assert!(msg.contains("Row 3"));
        assert!(msg.contains("'exact'"));
    }

    #[test]
    fn test_config_error_out_of_range() {
        let err: TownError = ConfigError::OutOfRange {
            field: "fuzzy_threshold",
            value: "1.5".to_string(),
        }
        .into();
        assert!(format!("{err}").contains("fuzzy_threshold"));
    }

    #[test]
    fn test_fingerprint_error() {
        let err: TownError = DirectoryError::Fingerprint {
            message: "key must be a string".to_string(),
        }
        .into();
        assert!(matches!(err, TownError::Directory(DirectoryError::Fingerprint { .. })));
        assert!(!err.is_retryable());
        assert!(format!("{err}").contains("fingerprint directory: key must be a string"));
    }
}
