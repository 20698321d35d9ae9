use std::path::PathBuf;
use thiserror::Error;

/// Fatal input and configuration errors.
///
/// These abort a run before any compliance decision is made. License
/// violations are never reported through this type.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("lock file not found: {}", path.display())]
    LockNotFound { path: PathBuf },

    #[error("failed to parse lock file {}: {reason}", path.display())]
    LockParse { path: PathBuf, reason: String },

    /// The lock file parsed but carries no `packages` map.
    #[error("lock file {} has no `packages` section (lockfileVersion 2 or later is required)", path.display())]
    MissingPackages { path: PathBuf },

    #[error("failed to read policy file {}: {reason}", path.display())]
    PolicyRead { path: PathBuf, reason: String },

    #[error("failed to parse policy file {}: {reason}", path.display())]
    PolicyParse { path: PathBuf, reason: String },

    #[error("unknown license category '{category}' (known: {known})")]
    InvalidCategory { category: String, known: String },

    #[error("unknown dependency type '{0}'")]
    InvalidDependencyType(String),

    #[error("settings.dependency_types must not be empty")]
    EmptyDependencyTypes,

    #[error("invalid timestamp '{value}' in {field}")]
    InvalidTimestamp { field: String, value: String },

    #[error("{field} must not be empty")]
    EmptyField { field: String },
}

pub type GateResult<T> = std::result::Result<T, GateError>;
