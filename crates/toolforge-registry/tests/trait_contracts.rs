//! Trait contract tests for ToolRegistry.
//!
//! These tests verify the behavioral contract of the registry trait against
//! both the in-memory fake and the filesystem store. Any conforming
//! implementation must pass these.

use chrono::Utc;
use serde_json::json;
use toolforge_registry::fakes::MemoryToolRegistry;
use toolforge_registry::{
    FsToolRegistry, NewToolVersion, RunRecord, StorageError, ToolRegistry, VersionId,
};

fn sample_version(name: &str, version: u32) -> NewToolVersion {
    NewToolVersion {
        name: name.to_string(),
        version,
        manifest: json!({
            "name": name,
            "description": "Generated tool",
            "version": "1.0.0",
            "runtime": "python",
            "entrypoint": "tool.py",
            "examples": [],
            "arguments": []
        }),
        code_path: format!("tools/{name}/v{version}/tool.py"),
        score: Some(85),
    }
}

fn sample_run(id: VersionId, exit_code: i32) -> RunRecord {
    RunRecord {
        tool_version_id: id,
        command: "python3".to_string(),
        args: vec!["--input".to_string(), "data.csv".to_string()],
        started_at: Utc::now(),
        ended_at: Utc::now(),
        exit_code,
        stdout_path: None,
        stderr_path: None,
    }
}

async fn contract_next_version_starts_at_one(registry: &dyn ToolRegistry) {
    assert_eq!(registry.next_version("unseen-tool").await.unwrap(), 1);
}

async fn contract_versions_strictly_increase(registry: &dyn ToolRegistry) {
    registry
        .upsert_tool_version(sample_version("csv-cleaner", 1))
        .await
        .unwrap();
    assert_eq!(registry.next_version("csv-cleaner").await.unwrap(), 2);

    registry
        .upsert_tool_version(sample_version("csv-cleaner", 2))
        .await
        .unwrap();
    assert_eq!(registry.next_version("csv-cleaner").await.unwrap(), 3);

    let err = registry
        .upsert_tool_version(sample_version("csv-cleaner", 2))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::VersionConflict { .. }));
}

async fn contract_upsert_then_get(registry: &dyn ToolRegistry) {
    let id = registry
        .upsert_tool_version(sample_version("md-linter", 1))
        .await
        .unwrap();

    let details = registry.get_tool("md-linter").await.unwrap().unwrap();
    assert_eq!(details.latest_version, 1);
    assert_eq!(details.status, "active");
    assert_eq!(details.versions.len(), 1);
    assert_eq!(details.versions[0].id, id);

    let latest = registry.latest_version("md-linter").await.unwrap().unwrap();
    assert_eq!(latest.version, 1);
    assert_eq!(latest.code_path, "tools/md-linter/v1/tool.py");

    assert!(registry.get_tool("nope").await.unwrap().is_none());
    assert!(registry.latest_version("nope").await.unwrap().is_none());
}

async fn contract_runs_are_recorded(registry: &dyn ToolRegistry) {
    let id = registry
        .upsert_tool_version(sample_version("json-pretty", 1))
        .await
        .unwrap();

    registry.record_run(sample_run(id, 0)).await.unwrap();
    registry.record_run(sample_run(id, 3)).await.unwrap();

    let listed = registry.list_tools().await.unwrap();
    let row = listed.iter().find(|t| t.name == "json-pretty").unwrap();
    assert!(row.last_run_at.is_some());

    let err = registry
        .record_run(sample_run(VersionId(9999), 0))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Corrupt(_)));
}

async fn contract_list_is_sorted_by_name(registry: &dyn ToolRegistry) {
    registry
        .upsert_tool_version(sample_version("zeta", 1))
        .await
        .unwrap();
    registry
        .upsert_tool_version(sample_version("alpha", 1))
        .await
        .unwrap();

    let listed = registry.list_tools().await.unwrap();
    let names: Vec<_> = listed.iter().map(|t| t.name.as_str()).collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
}

async fn run_all_contracts(registry: &dyn ToolRegistry) {
    contract_next_version_starts_at_one(registry).await;
    contract_versions_strictly_increase(registry).await;
    contract_upsert_then_get(registry).await;
    contract_runs_are_recorded(registry).await;
    contract_list_is_sorted_by_name(registry).await;
}

#[tokio::test]
async fn memory_registry_satisfies_contract() {
    let registry = MemoryToolRegistry::new();
    run_all_contracts(&registry).await;
}

#[tokio::test]
async fn fs_registry_satisfies_contract() {
    let dir = tempfile::tempdir().unwrap();
    let registry = FsToolRegistry::open(dir.path().join("registry.json")).unwrap();
    run_all_contracts(&registry).await;
}
