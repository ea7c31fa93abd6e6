//! Filesystem-backed tool registry.
//!
//! The whole store lives in a single `registry.json` under the runtime root.
//! The orchestrator writes to the registry exactly once per job, from a
//! single controller task, so a coarse mutex around load/mutate/persist is
//! sufficient.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::storage_traits::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ToolEntry {
    name: String,
    status: String,
    latest_version: u32,
    created_at: chrono::DateTime<chrono::Utc>,
    versions: Vec<ToolVersionRecord>,
}

/// Serialized registry contents. Shared by the fs store and the in-memory
/// fake so both enforce identical version rules.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct RegistryState {
    #[serde(default)]
    next_version_id: u64,

    #[serde(default)]
    tools: BTreeMap<String, ToolEntry>,

    #[serde(default)]
    runs: Vec<RunRecord>,
}

impl RegistryState {
    pub(crate) fn next_version(&self, name: &str) -> u32 {
        self.tools
            .get(name)
            .map(|t| t.latest_version + 1)
            .unwrap_or(1)
    }

    pub(crate) fn upsert_tool_version(
        &mut self,
        input: NewToolVersion,
    ) -> StorageResult<VersionId> {
        let now = Utc::now();
        let entry = self.tools.entry(input.name.clone()).or_insert(ToolEntry {
            name: input.name.clone(),
            status: "active".to_string(),
            latest_version: 0,
            created_at: now,
            versions: Vec::new(),
        });

        if input.version <= entry.latest_version {
            return Err(StorageError::VersionConflict {
                name: input.name,
                version: input.version,
                latest: entry.latest_version,
            });
        }

        self.next_version_id += 1;
        let id = VersionId(self.next_version_id);
        entry.versions.insert(
            0,
            ToolVersionRecord {
                id,
                version: input.version,
                manifest: input.manifest,
                code_path: input.code_path,
                score: input.score,
                created_at: now,
            },
        );
        entry.latest_version = input.version;
        entry.status = "active".to_string();

        Ok(id)
    }

    pub(crate) fn record_run(&mut self, input: RunRecord) -> StorageResult<()> {
        let known = self
            .tools
            .values()
            .any(|t| t.versions.iter().any(|v| v.id == input.tool_version_id));
        if !known {
            return Err(StorageError::Corrupt(format!(
                "run references unknown version id {}",
                input.tool_version_id
            )));
        }
        self.runs.push(input);
        Ok(())
    }

    pub(crate) fn get_tool(&self, name: &str) -> Option<ToolDetails> {
        self.tools.get(name).map(|t| ToolDetails {
            name: t.name.clone(),
            status: t.status.clone(),
            latest_version: t.latest_version,
            created_at: t.created_at,
            versions: t.versions.clone(),
        })
    }

    pub(crate) fn latest_version(&self, name: &str) -> Option<ToolVersionRecord> {
        self.tools
            .get(name)
            .and_then(|t| t.versions.iter().find(|v| v.version == t.latest_version))
            .cloned()
    }

    pub(crate) fn list_tools(&self) -> Vec<ToolListEntry> {
        self.tools
            .values()
            .map(|t| {
                let last_run = self
                    .runs
                    .iter()
                    .filter(|r| t.versions.iter().any(|v| v.id == r.tool_version_id))
                    .max_by_key(|r| r.started_at);
                ToolListEntry {
                    name: t.name.clone(),
                    latest_version: t.latest_version,
                    status: t.status.clone(),
                    created_at: t.created_at,
                    last_run_at: last_run.map(|r| r.ended_at),
                    last_exit_code: last_run.map(|r| r.exit_code),
                }
            })
            .collect()
    }
}

/// Tool registry persisted as a single JSON file.
#[derive(Debug)]
pub struct FsToolRegistry {
    store_path: PathBuf,
    state: Mutex<RegistryState>,
}

impl FsToolRegistry {
    /// Open (or create) a registry at `store_path`.
    pub fn open(store_path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let store_path = store_path.into();
        if let Some(parent) = store_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let state = if store_path.exists() {
            let raw = std::fs::read_to_string(&store_path)?;
            serde_json::from_str(&raw).map_err(|e| StorageError::Corrupt(e.to_string()))?
        } else {
            RegistryState::default()
        };

        Ok(Self {
            store_path,
            state: Mutex::new(state),
        })
    }

    /// Location of the backing JSON file.
    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    fn persist(&self, state: &RegistryState) -> Result<(), StorageError> {
        let raw = serde_json::to_string_pretty(state)?;
        std::fs::write(&self.store_path, raw)?;
        Ok(())
    }
}

#[async_trait]
impl ToolRegistry for FsToolRegistry {
    async fn next_version(&self, name: &str) -> StorageResult<u32> {
        let state = self.state.lock().unwrap();
        Ok(state.next_version(name))
    }

    async fn upsert_tool_version(&self, input: NewToolVersion) -> StorageResult<VersionId> {
        let mut state = self.state.lock().unwrap();
        let id = state.upsert_tool_version(input)?;
        self.persist(&state)?;
        Ok(id)
    }

    async fn record_run(&self, input: RunRecord) -> StorageResult<()> {
        let mut state = self.state.lock().unwrap();
        state.record_run(input)?;
        self.persist(&state)?;
        Ok(())
    }

    async fn get_tool(&self, name: &str) -> StorageResult<Option<ToolDetails>> {
        let state = self.state.lock().unwrap();
        Ok(state.get_tool(name))
    }

    async fn latest_version(&self, name: &str) -> StorageResult<Option<ToolVersionRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state.latest_version(name))
    }

    async fn list_tools(&self) -> StorageResult<Vec<ToolListEntry>> {
        let state = self.state.lock().unwrap();
        Ok(state.list_tools())
    }
}
