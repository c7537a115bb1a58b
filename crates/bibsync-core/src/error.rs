//! Error types for bibsync-core

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for bibsync operations
pub type Result<T> = std::result::Result<T, BibsyncError>;

/// Main error type for bibsync operations
#[derive(Error, Debug)]
pub enum BibsyncError {
    /// Source extraction errors
    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    /// Cache persistence errors
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Blocking task failed to complete
    #[error("Task error: {0}")]
    Task(String),
}

/// Errors reading the reference store
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Source database does not exist
    #[error("Source not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Source exists but could not be read or is malformed
    #[error("Failed to read source: {0}")]
    Read(String),
}

/// Errors loading or persisting the snapshot cache.
///
/// The public cache API recovers from these locally; they surface only in
/// logs and in the internal helpers.
#[derive(Error, Debug)]
pub enum CacheError {
    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Snapshot written by an incompatible format version
    #[error("Snapshot version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: u32, actual: u32 },
}

/// Errors loading the configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error reading {}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(String),
}

impl From<rusqlite::Error> for ExtractError {
    fn from(err: rusqlite::Error) -> Self {
        ExtractError::Read(err.to_string())
    }
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl From<tokio::task::JoinError> for BibsyncError {
    fn from(err: tokio::task::JoinError) -> Self {
        BibsyncError::Task(err.to_string())
    }
}
