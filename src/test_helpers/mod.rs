//! # Test Helpers
//!
//! In-memory doubles for exercising the pipeline roles without a live
//! cluster: [`FakeCluster`] implements the full [`ClusterClient`] surface
//! over a scriptable in-process state, and [`NoopClock`] makes the
//! no-timeout poll loops run instantly.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;

use crate::cluster::{
    ClusterClient, ClusterError, ClusterHealth, IndexStats, SnapshotInfo, SnapshotState,
    TaskHandle, TaskStatus,
};
use crate::orchestration::PollClock;

/// Clock that never sleeps, for driving poll loops in tests
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopClock;

#[async_trait]
impl PollClock for NoopClock {
    async fn sleep(&self, _duration: Duration) {}
}

/// Source-index fixture served by the fake engine's read APIs
#[derive(Debug, Clone)]
pub struct IndexFixture {
    pub mapping: serde_json::Value,
    pub settings: serde_json::Value,
    pub stats: IndexStats,
}

impl Default for IndexFixture {
    fn default() -> Self {
        Self {
            mapping: serde_json::json!({
                "doc": { "properties": { "message": { "type": "keyword" } } }
            }),
            settings: serde_json::json!({ "index": { "number_of_replicas": "1" } }),
            stats: IndexStats {
                store_size_bytes: 1024,
                doc_count: 10,
            },
        }
    }
}

#[derive(Debug, Clone)]
struct FakeTask {
    polls_remaining: u32,
}

#[derive(Debug, Default)]
struct FakeState {
    /// Repository contents, original archive entries plus created snapshots
    archive: Vec<SnapshotInfo>,
    /// Read-API fixtures keyed by index name
    fixtures: HashMap<String, IndexFixture>,
    /// Live indexes and the body they were created with (None for restored)
    live: HashMap<String, Option<serde_json::Value>>,
    /// Scripted health responses; empty means green
    health_script: VecDeque<ClusterHealth>,
    /// Pending async tasks
    tasks: HashMap<String, FakeTask>,
    next_task_id: u64,
    /// Observed calls, for assertions
    flushed: Vec<String>,
    deleted_indexes: Vec<String>,
    deleted_snapshots: Vec<String>,
    reindexes: Vec<(String, String, Option<String>)>,
}

/// Scriptable in-memory search engine double
#[derive(Clone, Default)]
pub struct FakeCluster {
    state: Arc<Mutex<FakeState>>,
    /// Polls a reindex task needs before reporting completed
    task_polls: u32,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState::default())),
            task_polls: 1,
        }
    }

    /// Require `polls` task polls before a reindex task completes
    pub fn with_task_polls(mut self, polls: u32) -> Self {
        self.task_polls = polls;
        self
    }

    /// Add an entry to the archive listing
    pub fn add_archive_snapshot(&self, name: &str, state: SnapshotState, indices: &[&str]) {
        self.state.lock().unwrap().archive.push(SnapshotInfo {
            snapshot: name.to_string(),
            state,
            indices: indices.iter().map(ToString::to_string).collect(),
        });
    }

    /// Register the read-API fixture for an index name
    pub fn add_fixture(&self, index: &str, fixture: IndexFixture) {
        self.state
            .lock()
            .unwrap()
            .fixtures
            .insert(index.to_string(), fixture);
    }

    /// Script the next health responses; once drained, health is green
    pub fn script_health(&self, sequence: &[ClusterHealth]) {
        self.state
            .lock()
            .unwrap()
            .health_script
            .extend(sequence.iter().copied());
    }

    pub fn has_index(&self, name: &str) -> bool {
        self.state.lock().unwrap().live.contains_key(name)
    }

    /// Body an index was created with, if it was created via `create_index`
    pub fn created_body(&self, name: &str) -> Option<serde_json::Value> {
        self.state.lock().unwrap().live.get(name).cloned().flatten()
    }

    pub fn flushed_indexes(&self) -> Vec<String> {
        self.state.lock().unwrap().flushed.clone()
    }

    pub fn deleted_indexes(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted_indexes.clone()
    }

    pub fn deleted_snapshots(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted_snapshots.clone()
    }

    /// Observed reindex submissions as `(source, target, script)`
    pub fn reindex_calls(&self) -> Vec<(String, String, Option<String>)> {
        self.state.lock().unwrap().reindexes.clone()
    }

    /// State of a snapshot in the repository, if present
    pub fn snapshot_in_repo(&self, name: &str) -> Option<SnapshotInfo> {
        self.state
            .lock()
            .unwrap()
            .archive
            .iter()
            .find(|s| s.snapshot == name)
            .cloned()
    }
}

#[async_trait]
impl ClusterClient for FakeCluster {
    async fn get_mapping(&self, index: &str) -> Result<serde_json::Value, ClusterError> {
        let state = self.state.lock().unwrap();
        state
            .fixtures
            .get(index)
            .map(|f| f.mapping.clone())
            .ok_or_else(|| ClusterError::status("get_mapping", 404, format!("no such index: {index}")))
    }

    async fn get_settings(&self, index: &str) -> Result<serde_json::Value, ClusterError> {
        let state = self.state.lock().unwrap();
        state
            .fixtures
            .get(index)
            .map(|f| f.settings.clone())
            .ok_or_else(|| ClusterError::status("get_settings", 404, format!("no such index: {index}")))
    }

    async fn get_stats(&self, index: &str) -> Result<IndexStats, ClusterError> {
        let state = self.state.lock().unwrap();
        state
            .fixtures
            .get(index)
            .map(|f| f.stats)
            .ok_or_else(|| ClusterError::status("get_stats", 404, format!("no such index: {index}")))
    }

    async fn create_index(
        &self,
        name: &str,
        body: &serde_json::Value,
    ) -> Result<(), ClusterError> {
        let mut state = self.state.lock().unwrap();
        if state.live.contains_key(name) {
            return Err(ClusterError::status(
                "create_index",
                400,
                format!("index already exists: {name}"),
            ));
        }
        state.live.insert(name.to_string(), Some(body.clone()));
        Ok(())
    }

    async fn delete_index(&self, name: &str) -> Result<(), ClusterError> {
        let mut state = self.state.lock().unwrap();
        state.live.remove(name);
        state.deleted_indexes.push(name.to_string());
        Ok(())
    }

    async fn flush(&self, index: &str) -> Result<(), ClusterError> {
        let mut state = self.state.lock().unwrap();
        if !state.live.contains_key(index) && !state.fixtures.contains_key(index) {
            return Err(ClusterError::status("flush", 404, format!("no such index: {index}")));
        }
        state.flushed.push(index.to_string());
        Ok(())
    }

    async fn health(&self) -> Result<ClusterHealth, ClusterError> {
        let mut state = self.state.lock().unwrap();
        Ok(state.health_script.pop_front().unwrap_or(ClusterHealth::Green))
    }

    async fn snapshot_create(
        &self,
        _repo: &str,
        name: &str,
        index: &str,
    ) -> Result<(), ClusterError> {
        let mut state = self.state.lock().unwrap();
        if state.archive.iter().any(|s| s.snapshot == name) {
            return Err(ClusterError::status(
                "snapshot_create",
                400,
                format!("snapshot already exists: {name}"),
            ));
        }
        state.archive.push(SnapshotInfo {
            snapshot: name.to_string(),
            state: SnapshotState::Success,
            indices: vec![index.to_string()],
        });
        Ok(())
    }

    async fn snapshot_delete(&self, _repo: &str, name: &str) -> Result<(), ClusterError> {
        let mut state = self.state.lock().unwrap();
        let before = state.archive.len();
        state.archive.retain(|s| s.snapshot != name);
        if state.archive.len() == before {
            return Err(ClusterError::status(
                "snapshot_delete",
                404,
                format!("no such snapshot: {name}"),
            ));
        }
        state.deleted_snapshots.push(name.to_string());
        Ok(())
    }

    async fn snapshot_status(&self, _repo: &str, name: &str) -> Result<SnapshotState, ClusterError> {
        let state = self.state.lock().unwrap();
        state
            .archive
            .iter()
            .find(|s| s.snapshot == name)
            .map(|s| s.state)
            .ok_or_else(|| {
                ClusterError::status("snapshot_status", 404, format!("no such snapshot: {name}"))
            })
    }

    async fn snapshot_restore(
        &self,
        _repo: &str,
        name: &str,
        rename_pattern: &str,
        rename_replacement: &str,
    ) -> Result<(), ClusterError> {
        let rename = Regex::new(rename_pattern)
            .map_err(|e| ClusterError::payload("snapshot_restore", e.to_string()))?;

        let mut state = self.state.lock().unwrap();
        let indices = state
            .archive
            .iter()
            .find(|s| s.snapshot == name)
            .map(|s| s.indices.clone())
            .ok_or_else(|| {
                ClusterError::status("snapshot_restore", 404, format!("no such snapshot: {name}"))
            })?;

        for index in indices {
            let restored = rename.replace(&index, rename_replacement).into_owned();
            if state.live.contains_key(&restored) {
                return Err(ClusterError::status(
                    "snapshot_restore",
                    400,
                    format!("index already exists: {restored}"),
                ));
            }
            // The restored copy serves reads from the original's fixture
            if let Some(fixture) = state.fixtures.get(&index).cloned() {
                state.fixtures.insert(restored.clone(), fixture);
            }
            state.live.insert(restored, None);
        }
        Ok(())
    }

    async fn list_snapshots(&self, _repo: &str) -> Result<Vec<SnapshotInfo>, ClusterError> {
        Ok(self.state.lock().unwrap().archive.clone())
    }

    async fn submit_reindex(
        &self,
        source: &str,
        target: &str,
        _batch_size: u32,
        script: Option<&str>,
    ) -> Result<TaskHandle, ClusterError> {
        let mut state = self.state.lock().unwrap();
        if !state.live.contains_key(target) {
            return Err(ClusterError::status(
                "submit_reindex",
                404,
                format!("no such target index: {target}"),
            ));
        }

        state.reindexes.push((
            source.to_string(),
            target.to_string(),
            script.map(ToString::to_string),
        ));

        state.next_task_id += 1;
        let task_id = format!("fake:{}", state.next_task_id);
        state.tasks.insert(
            task_id.clone(),
            FakeTask {
                polls_remaining: self.task_polls,
            },
        );
        Ok(TaskHandle(task_id))
    }

    async fn poll_task(&self, handle: &TaskHandle) -> Result<TaskStatus, ClusterError> {
        let mut state = self.state.lock().unwrap();
        let task = state.tasks.get_mut(&handle.0).ok_or_else(|| {
            ClusterError::status("poll_task", 404, format!("no such task: {}", handle.0))
        })?;

        if task.polls_remaining == 0 {
            Ok(TaskStatus { completed: true })
        } else {
            task.polls_remaining -= 1;
            Ok(TaskStatus { completed: false })
        }
    }
}
