use thiserror::Error;

/// Unified error type for tag-release operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("Invalid version '{input}': {reason}")]
    InvalidVersion { input: String, reason: String },

    #[error("No prior release tag found and defaulting to 0.1.0 is disabled")]
    NoPriorVersion,

    #[error("Tag '{tag}' already exists at {existing} but the release targets {requested}")]
    TagConflict {
        tag: String,
        existing: String,
        requested: String,
    },

    #[error("Branch '{branch}' at {current} cannot be fast-forwarded to {target}")]
    NonLinearHistory {
        branch: String,
        current: String,
        target: String,
    },

    #[error("No reference to image '{image}' found in {path}")]
    ImageRefNotFound { image: String, path: String },

    #[error("Image reference '{image}' in {path} (line {line}) is invalid: {reason}")]
    InvalidImageRef {
        image: String,
        path: String,
        line: usize,
        reason: String,
    },

    #[error("Image '{image}' is referenced {count} times in {path} (lines {lines:?})")]
    AmbiguousImageRef {
        image: String,
        path: String,
        count: usize,
        lines: Vec<usize>,
    },

    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("Remote operation failed: {0}")]
    Remote(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in tag-release
pub type Result<T> = std::result::Result<T, ReleaseError>;

impl ReleaseError {
    /// Create an invalid version error with context
    pub fn invalid_version(input: impl Into<String>, reason: impl Into<String>) -> Self {
        ReleaseError::InvalidVersion {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        ReleaseError::Config(msg.into())
    }

    /// Create a remote error with context
    pub fn remote(msg: impl Into<String>) -> Self {
        ReleaseError::Remote(msg.into())
    }

    /// Stable error code reported to callers in the release result.
    ///
    /// Repository, filesystem and remote failures all collapse into
    /// `IOFailure`.
    pub fn code(&self) -> &'static str {
        match self {
            ReleaseError::InvalidVersion { .. } => "InvalidVersion",
            ReleaseError::NoPriorVersion => "NoPriorVersion",
            ReleaseError::TagConflict { .. } => "TagConflict",
            ReleaseError::NonLinearHistory { .. } => "NonLinearHistory",
            ReleaseError::ImageRefNotFound { .. } => "ImageRefNotFound",
            ReleaseError::AmbiguousImageRef { .. } => "AmbiguousImageRef",
            ReleaseError::InvalidImageRef { .. } => "InvalidImageRef",
            ReleaseError::Config(_) => "ConfigError",
            ReleaseError::Git(_) | ReleaseError::Remote(_) | ReleaseError::Io(_) => "IOFailure",
        }
    }
}
