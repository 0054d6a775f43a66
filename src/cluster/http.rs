//! # HTTP Cluster Client
//!
//! [`ClusterClient`] implementation over the engine's REST API using reqwest.
//! Request shapes follow the snapshot, restore, reindex, and task endpoints;
//! responses are decoded just far enough for the pipeline's decisions.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde_json::json;
use tracing::debug;

use super::errors::ClusterError;
use super::{ClusterClient, ClusterHealth, IndexStats, SnapshotInfo, SnapshotState, TaskHandle, TaskStatus};
use crate::config::ClusterConfig;

/// reqwest-backed administrative API client
#[derive(Debug, Clone)]
pub struct HttpClusterClient {
    http: reqwest::Client,
    endpoint: String,
    username: Option<String>,
    password: Option<String>,
}

impl HttpClusterClient {
    /// Create a client for the configured cluster endpoint
    pub fn new(config: &ClusterConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.endpoint, path);
        let mut request = self.http.request(method, &url);
        if let Some(username) = &self.username {
            request = request.basic_auth(username.clone(), self.password.clone());
        }
        request
    }

    /// Send a request and map non-2xx responses to `ClusterError::Status`
    async fn send(&self, op: &str, request: RequestBuilder) -> Result<Response, ClusterError> {
        let response = request
            .send()
            .await
            .map_err(|e| ClusterError::transport(op, e))?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ClusterError::status(op, status.as_u16(), body))
        }
    }

    async fn send_json(
        &self,
        op: &str,
        request: RequestBuilder,
    ) -> Result<serde_json::Value, ClusterError> {
        let response = self.send(op, request).await?;
        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| ClusterError::payload(op, e.to_string()))
    }
}

#[async_trait]
impl ClusterClient for HttpClusterClient {
    async fn get_mapping(&self, index: &str) -> Result<serde_json::Value, ClusterError> {
        let op = "get_mapping";
        let body = self
            .send_json(op, self.request(Method::GET, &format!("{index}/_mapping")))
            .await?;
        body.get(index)
            .and_then(|v| v.get("mappings"))
            .cloned()
            .ok_or_else(|| ClusterError::payload(op, format!("no mappings for index '{index}'")))
    }

    async fn get_settings(&self, index: &str) -> Result<serde_json::Value, ClusterError> {
        let op = "get_settings";
        let body = self
            .send_json(op, self.request(Method::GET, &format!("{index}/_settings")))
            .await?;
        body.get(index)
            .and_then(|v| v.get("settings"))
            .cloned()
            .ok_or_else(|| ClusterError::payload(op, format!("no settings for index '{index}'")))
    }

    async fn get_stats(&self, index: &str) -> Result<IndexStats, ClusterError> {
        let op = "get_stats";
        let body = self
            .send_json(
                op,
                self.request(Method::GET, &format!("{index}/_stats/store,docs")),
            )
            .await?;

        let total = &body["_all"]["total"];
        let store_size_bytes = total["store"]["size_in_bytes"].as_u64().ok_or_else(|| {
            ClusterError::payload(op, format!("missing store size for index '{index}'"))
        })?;
        let doc_count = total["docs"]["count"].as_u64().unwrap_or(0);

        Ok(IndexStats {
            store_size_bytes,
            doc_count,
        })
    }

    async fn create_index(
        &self,
        name: &str,
        body: &serde_json::Value,
    ) -> Result<(), ClusterError> {
        debug!("🆕 Creating index: {}", name);
        self.send("create_index", self.request(Method::PUT, name).json(body))
            .await?;
        Ok(())
    }

    async fn delete_index(&self, name: &str) -> Result<(), ClusterError> {
        debug!("🗑️ Deleting index: {}", name);
        let op = "delete_index";
        let request = self.request(Method::DELETE, name);
        let response = request
            .send()
            .await
            .map_err(|e| ClusterError::transport(op, e))?;

        let status = response.status();
        // Idempotent delete: an already-absent index is success
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ClusterError::status(op, status.as_u16(), body))
        }
    }

    async fn flush(&self, index: &str) -> Result<(), ClusterError> {
        self.send("flush", self.request(Method::POST, &format!("{index}/_flush")))
            .await?;
        Ok(())
    }

    async fn health(&self) -> Result<ClusterHealth, ClusterError> {
        let op = "health";
        let body = self
            .send_json(op, self.request(Method::GET, "_cluster/health"))
            .await?;
        serde_json::from_value(body["status"].clone())
            .map_err(|e| ClusterError::payload(op, e.to_string()))
    }

    async fn snapshot_create(
        &self,
        repo: &str,
        name: &str,
        index: &str,
    ) -> Result<(), ClusterError> {
        debug!("📦 Creating snapshot {} of index {}", name, index);
        let body = json!({
            "indices": index,
            "ignore_unavailable": true,
            "include_global_state": false,
        });
        self.send(
            "snapshot_create",
            self.request(Method::PUT, &format!("_snapshot/{repo}/{name}"))
                .json(&body),
        )
        .await?;
        Ok(())
    }

    async fn snapshot_delete(&self, repo: &str, name: &str) -> Result<(), ClusterError> {
        debug!("🗑️ Deleting snapshot: {}", name);
        self.send(
            "snapshot_delete",
            self.request(Method::DELETE, &format!("_snapshot/{repo}/{name}")),
        )
        .await?;
        Ok(())
    }

    async fn snapshot_status(&self, repo: &str, name: &str) -> Result<SnapshotState, ClusterError> {
        let op = "snapshot_status";
        let body = self
            .send_json(op, self.request(Method::GET, &format!("_snapshot/{repo}/{name}")))
            .await?;
        let state = body["snapshots"][0]["state"].clone();
        serde_json::from_value(state).map_err(|e| ClusterError::payload(op, e.to_string()))
    }

    async fn snapshot_restore(
        &self,
        repo: &str,
        name: &str,
        rename_pattern: &str,
        rename_replacement: &str,
    ) -> Result<(), ClusterError> {
        debug!("♻️ Restoring snapshot {} with rename to {}", name, rename_replacement);
        let body = json!({
            "rename_pattern": rename_pattern,
            "rename_replacement": rename_replacement,
            "include_global_state": false,
        });
        self.send(
            "snapshot_restore",
            self.request(Method::POST, &format!("_snapshot/{repo}/{name}/_restore"))
                .json(&body),
        )
        .await?;
        Ok(())
    }

    async fn list_snapshots(&self, repo: &str) -> Result<Vec<SnapshotInfo>, ClusterError> {
        let op = "list_snapshots";
        let body = self
            .send_json(op, self.request(Method::GET, &format!("_snapshot/{repo}/_all")))
            .await?;
        serde_json::from_value(body["snapshots"].clone())
            .map_err(|e| ClusterError::payload(op, e.to_string()))
    }

    async fn submit_reindex(
        &self,
        source: &str,
        target: &str,
        batch_size: u32,
        script: Option<&str>,
    ) -> Result<TaskHandle, ClusterError> {
        let op = "submit_reindex";
        let mut body = json!({
            "source": { "index": source, "size": batch_size },
            "dest": { "index": target },
        });
        if let Some(script) = script {
            body["script"] = json!({ "source": script });
        }

        let response = self
            .send_json(
                op,
                self.request(Method::POST, "_reindex?wait_for_completion=false")
                    .json(&body),
            )
            .await?;

        let task = response["task"]
            .as_str()
            .ok_or_else(|| ClusterError::payload(op, "missing task id in reindex response"))?;
        Ok(TaskHandle(task.to_string()))
    }

    async fn poll_task(&self, handle: &TaskHandle) -> Result<TaskStatus, ClusterError> {
        let op = "poll_task";
        let body = self
            .send_json(op, self.request(Method::GET, &format!("_tasks/{}", handle.0)))
            .await?;
        let completed = body["completed"]
            .as_bool()
            .ok_or_else(|| ClusterError::payload(op, "missing completed flag in task response"))?;
        Ok(TaskStatus { completed })
    }
}
