//! Crate-wide error type for the registry engine

use thiserror::Error;

pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Debug, Error)]
pub enum RegistryError {
    // --- Parsing ---
    #[error("Invalid specification document: {0}")]
    InvalidDocument(String),

    #[error("Unable to detect specification format for '{filename}'")]
    UnknownFormat { filename: String },

    #[error("Unsupported specification version: {0}")]
    UnsupportedVersion(String),

    // --- Registry store preconditions ---
    #[error("Service '{0}' already exists in the registry")]
    DuplicateService(String),

    #[error("Service '{0}' not found in the registry")]
    ServiceNotFound(String),

    #[error("Registry version '{0}' not found")]
    VersionNotFound(String),

    // Version snapshots are write-once; an explicit id may not be reused.
    #[error("Registry version '{0}' already exists")]
    DuplicateVersion(String),

    #[error("High-severity conflicts detected for '{service}': {details}")]
    ConflictRejected { service: String, details: String },

    #[error(
        "Split of '{service}' is not an exact partition (missing: {missing:?}, extra: {extra:?})"
    )]
    InvalidPartition {
        service: String,
        missing: Vec<String>,
        extra: Vec<String>,
    },

    #[error("Merge requires at least two existing services, got {0}")]
    InvalidMerge(usize),

    // Retryable: the latest pointer moved between load and save.
    #[error("Registry was modified concurrently (expected version {expected}, found {found})")]
    ConcurrentModification { expected: String, found: String },

    // --- Fatal I/O / serialization ---
    #[error("Registry I/O failed at '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl RegistryError {
    /// Whether the caller may safely retry the operation after reloading.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RegistryError::ConcurrentModification { .. })
    }

    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        RegistryError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
