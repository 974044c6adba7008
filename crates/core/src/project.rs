//! Per-project lifecycle metadata, persisted the same way the coordinator
//! persists its graph snapshots: one JSON document, loaded whole, mutated
//! in memory, written back atomically (write to `.tmp`, then rename).
//!
//! This is deliberately separate from [`codeindex_registry::ProjectRegistry`],
//! which only maps a path to a stable id. `ProjectStore` tracks the
//! lifecycle state (`status`, `lastIndexedAt`) layered on top of that id.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::Result;

const PROJECT_STORE_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Pending,
    Indexing,
    Completed,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub project_id: String,
    pub path: String,
    pub collection_name: String,
    pub space_name: String,
    pub created_at_unix_ms: u64,
    pub updated_at_unix_ms: u64,
    pub last_indexed_at_unix_ms: Option<u64>,
    pub status: ProjectStatus,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ProjectDocument {
    #[serde(default)]
    schema_version: u32,
    #[serde(default)]
    projects: HashMap<String, ProjectRecord>,
}

pub struct ProjectStore {
    path: PathBuf,
    doc: RwLock<ProjectDocument>,
}

impl ProjectStore {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let doc = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ProjectDocument {
                schema_version: PROJECT_STORE_SCHEMA_VERSION,
                projects: HashMap::new(),
            },
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            doc: RwLock::new(doc),
        })
    }

    async fn persist(&self, doc: &ProjectDocument) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(doc)?;
        let mut tmp_name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);
        tokio::fs::write(&tmp_path, &bytes).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }

    pub async fn get(&self, project_id: &str) -> Option<ProjectRecord> {
        self.doc.read().await.projects.get(project_id).cloned()
    }

    /// Creates the record on first sight (status `pending`), otherwise
    /// leaves the existing record untouched.
    pub async fn ensure(
        &self,
        project_id: &str,
        path: &str,
        collection_name: &str,
        space_name: &str,
        now_unix_ms: u64,
    ) -> Result<ProjectRecord> {
        let mut doc = self.doc.write().await;
        if let Some(existing) = doc.projects.get(project_id) {
            return Ok(existing.clone());
        }
        let record = ProjectRecord {
            project_id: project_id.to_string(),
            path: path.to_string(),
            collection_name: collection_name.to_string(),
            space_name: space_name.to_string(),
            created_at_unix_ms: now_unix_ms,
            updated_at_unix_ms: now_unix_ms,
            last_indexed_at_unix_ms: None,
            status: ProjectStatus::Pending,
            error_message: None,
        };
        doc.projects.insert(project_id.to_string(), record.clone());
        self.persist(&doc).await?;
        Ok(record)
    }

    pub async fn set_status(
        &self,
        project_id: &str,
        status: ProjectStatus,
        error_message: Option<String>,
        now_unix_ms: u64,
    ) -> Result<()> {
        let mut doc = self.doc.write().await;
        if let Some(record) = doc.projects.get_mut(project_id) {
            record.status = status;
            record.error_message = error_message;
            record.updated_at_unix_ms = now_unix_ms;
            if status == ProjectStatus::Completed {
                record.last_indexed_at_unix_ms = Some(now_unix_ms);
            }
        }
        self.persist(&doc).await
    }

    pub async fn remove(&self, project_id: &str) -> Result<()> {
        let mut doc = self.doc.write().await;
        doc.projects.remove(project_id);
        self.persist(&doc).await
    }
}
