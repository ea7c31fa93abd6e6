//! In-memory fake for the registry trait (testing only)
//!
//! `MemoryToolRegistry` satisfies the `ToolRegistry` contract without
//! touching disk, sharing the same state machine as the fs store so version
//! rules cannot drift between the two.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::fs_store::RegistryState;
use crate::storage_traits::*;

/// In-memory tool registry backed by the shared registry state.
#[derive(Debug, Default)]
pub struct MemoryToolRegistry {
    state: Mutex<RegistryState>,
}

impl MemoryToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ToolRegistry for MemoryToolRegistry {
    async fn next_version(&self, name: &str) -> StorageResult<u32> {
        let state = self.state.lock().unwrap();
        Ok(state.next_version(name))
    }

    async fn upsert_tool_version(&self, input: NewToolVersion) -> StorageResult<VersionId> {
        let mut state = self.state.lock().unwrap();
        state.upsert_tool_version(input)
    }

    async fn record_run(&self, input: RunRecord) -> StorageResult<()> {
        let mut state = self.state.lock().unwrap();
        state.record_run(input)
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
