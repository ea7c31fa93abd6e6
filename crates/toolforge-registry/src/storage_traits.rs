//! Storage trait definitions for the tool registry.
//!
//! `ToolRegistry` is the only interface the orchestrator consumes: version
//! allocation, version registration, and run recording. It is async and
//! backend-agnostic. An in-memory fake is provided for testing via the
//! `fakes` module.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Identifier of a registered tool version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionId(pub u64);

impl std::fmt::Display for VersionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Input for registering a new tool version at promotion time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewToolVersion {
    /// Sanitized tool name (kebab-case slug).
    pub name: String,

    /// Version number; must be strictly greater than the tool's latest.
    pub version: u32,

    /// Normalized manifest, stored as JSON.
    pub manifest: serde_json::Value,

    /// Entrypoint path relative to the runtime root.
    pub code_path: String,

    /// Score of the promoted candidate, if known.
    pub score: Option<i64>,
}

/// A single registered version of a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolVersionRecord {
    pub id: VersionId,
    pub version: u32,
    pub manifest: serde_json::Value,
    pub code_path: String,
    pub score: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Full details for one tool: identity plus version history (newest first).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDetails {
    pub name: String,
    pub status: String,
    pub latest_version: u32,
    pub created_at: DateTime<Utc>,
    pub versions: Vec<ToolVersionRecord>,
}

/// Summary row for listing tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolListEntry {
    pub name: String,
    pub latest_version: u32,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_exit_code: Option<i32>,
}

/// One execution of a registered tool version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// Version the run executed.
    pub tool_version_id: VersionId,

    /// Program that was invoked.
    pub command: String,

    /// Arguments passed to the tool.
    pub args: Vec<String>,

    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub exit_code: i32,

    /// Captured output locations, when persisted.
    pub stdout_path: Option<String>,
    pub stderr_path: Option<String>,
}

/// Durable tool registry.
///
/// Guarantees:
/// - Version numbers are strictly increasing per tool name.
/// - `next_version` returns 1 for unknown names, `latest + 1` otherwise.
/// - `upsert_tool_version` creates the tool on first registration and marks
///   it active on every registration.
/// - Recorded runs are append-only.
#[async_trait]
pub trait ToolRegistry: Send + Sync {
    /// Next version number to assign for `name`.
    async fn next_version(&self, name: &str) -> StorageResult<u32>;

    /// Register a tool version, returning its unique id.
    ///
    /// Fails with `StorageError::VersionConflict` if `version` does not
    /// strictly exceed the tool's latest registered version.
    async fn upsert_tool_version(&self, input: NewToolVersion) -> StorageResult<VersionId>;

    /// Append a run record for a registered version.
    async fn record_run(&self, input: RunRecord) -> StorageResult<()>;

    /// Fetch full details for a tool, if registered.
    async fn get_tool(&self, name: &str) -> StorageResult<Option<ToolDetails>>;

    /// Fetch the latest registered version for a tool, if any.
    async fn latest_version(&self, name: &str) -> StorageResult<Option<ToolVersionRecord>>;

    /// List all registered tools, sorted by name.
    async fn list_tools(&self) -> StorageResult<Vec<ToolListEntry>>;
}
