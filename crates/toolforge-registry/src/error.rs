//! Error types for toolforge-registry

use thiserror::Error;

/// Errors that can occur in the registry persistence layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// Tool not found
    #[error("Tool not found: {name}")]
    ToolNotFound { name: String },

    /// Tool version not found
    #[error("Version {version} not found for tool: {name}")]
    VersionNotFound { name: String, version: u32 },

    /// Version ordering violation (versions must strictly increase per tool)
    #[error("Version conflict for tool {name}: {version} is not greater than latest {latest}")]
    VersionConflict {
        name: String,
        version: u32,
        latest: u32,
    },

    /// Store file could not be parsed
    #[error("Registry store is corrupt: {0}")]
    Corrupt(String),

    /// Serialization error
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Underlying I/O error
    #[error("Registry I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
