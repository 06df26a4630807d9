// ABOUTME: Trace storage - persists sealed traces so runs can be inspected
// ABOUTME: after the fact. In-memory and one-JSON-file-per-run backends.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::Trace;
use crate::error::TraceError;

/// Storage backend for finished traces.
#[async_trait]
pub trait TraceStore: Send + Sync {
    /// Save a trace, replacing any earlier trace with the same run id.
    async fn save(&self, trace: &Trace) -> Result<(), TraceError>;

    /// Load a trace. Returns None if no trace exists for the run.
    async fn load(&self, run_id: &str) -> Result<Option<Trace>, TraceError>;

    /// Delete a trace.
    async fn delete(&self, run_id: &str) -> Result<(), TraceError>;

    /// List stored run ids, sorted.
    async fn list(&self) -> Result<Vec<String>, TraceError>;
}

/// In-memory trace store.
#[derive(Default)]
pub struct MemoryTraceStore {
    traces: RwLock<HashMap<String, Trace>>,
}

impl MemoryTraceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new store wrapped in Arc for sharing.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl TraceStore for MemoryTraceStore {
    async fn save(&self, trace: &Trace) -> Result<(), TraceError> {
        self.traces
            .write()
            .await
            .insert(trace.run_id.clone(), trace.clone());
        Ok(())
    }

    async fn load(&self, run_id: &str) -> Result<Option<Trace>, TraceError> {
        Ok(self.traces.read().await.get(run_id).cloned())
    }

    async fn delete(&self, run_id: &str) -> Result<(), TraceError> {
        self.traces.write().await.remove(run_id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, TraceError> {
        let mut ids: Vec<String> = self.traces.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

/// Writes each trace as pretty JSON to `<dir>/<run_id>.json`.
#[derive(Debug, Clone)]
pub struct FileTraceStore {
    dir: PathBuf,
}

impl FileTraceStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, run_id: &str) -> PathBuf {
        let file: String = run_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", file))
    }
}

#[async_trait]
impl TraceStore for FileTraceStore {
    async fn save(&self, trace: &Trace) -> Result<(), TraceError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_string_pretty(trace)?;
        tokio::fs::write(self.path_for(&trace.run_id), json).await?;
        Ok(())
    }

    async fn load(&self, run_id: &str) -> Result<Option<Trace>, TraceError> {
        match tokio::fs::read_to_string(self.path_for(run_id)).await {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, run_id: &str) -> Result<(), TraceError> {
        match tokio::fs::remove_file(self.path_for(run_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<String>, TraceError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}
