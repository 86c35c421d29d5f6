use std::path::PathBuf;
use thiserror::Error;

/// Result type for mend operations
pub type MendResult<T> = Result<T, MendError>;

/// Errors that can occur while enumerating or applying patches.
///
/// The taxonomy follows the run lifecycle: configuration problems
/// (`InvalidPattern`, `InvalidPosition`, `ConfigError`) fail fast before any
/// file is touched; per-file problems (`FileNotFound`, `PermissionDenied`,
/// `EncodingError`) are reported and skip that file only; `EditorError` is
/// downgraded to a rejection by the decision loop. An operator quitting is
/// not an error at all, just a normal [`RunReport`](crate::query::RunReport)
/// outcome.
#[derive(Error, Debug)]
pub enum MendError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("Invalid position '{0}': expected path:line or a percentage")]
    InvalidPosition(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Invalid UTF-8 in file {path}: {source}")]
    EncodingError {
        path: PathBuf,
        source: std::string::FromUtf8Error,
    },
    #[error("Editor failed: {0}")]
    EditorError(String),
}

impl MendError {
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound(path.into())
    }

    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        Self::PermissionDenied(path.into())
    }

    pub fn invalid_pattern(pattern: impl Into<String>) -> Self {
        Self::InvalidPattern(pattern.into())
    }

    pub fn invalid_position(text: impl Into<String>) -> Self {
        Self::InvalidPosition(text.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn encoding_error(path: impl Into<PathBuf>, source: std::string::FromUtf8Error) -> Self {
        Self::EncodingError {
            path: path.into(),
            source,
        }
    }

    pub fn editor_error(msg: impl Into<String>) -> Self {
        Self::EditorError(msg.into())
    }

    /// Maps an IO error raised for a specific file to the per-file taxonomy.
    pub fn for_file(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::FileNotFound(path.into()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.into()),
            _ => Self::IoError(err),
        }
    }

    /// True for errors that skip a single file without ending the run.
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            Self::FileNotFound(_)
                | Self::PermissionDenied(_)
                | Self::IoError(_)
                | Self::EncodingError { .. }
        )
    }
}
