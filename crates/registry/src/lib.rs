//! Maps project roots to stable project ids, persisted to a small
//! `project-mapping.json` key-value file the same way the teacher
//! persists its watermark and index-state documents: load whole, mutate
//! in memory, write back atomically (write to `.tmp`, then rename).

mod error;

pub use error::{RegistryError, Result};

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProjectEntry {
    project_id: String,
    canonical_root: String,
    registered_at_unix_ms: u64,
    last_touched_unix_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct MappingDocument {
    #[serde(default)]
    projects: HashMap<String, ProjectEntry>,
}

/// `collectionName = "project-" + projectId`; graph stores commonly
/// forbid hyphens in identifiers, hence the separate underscore form.
#[must_use]
pub fn collection_name(project_id: &str) -> String {
    format!("project-{project_id}")
}

#[must_use]
pub fn space_name(project_id: &str) -> String {
    format!("project_{project_id}")
}

pub struct ProjectRegistry {
    path: PathBuf,
    doc: RwLock<MappingDocument>,
}

impl ProjectRegistry {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let doc = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => MappingDocument::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            doc: RwLock::new(doc),
        })
    }

    async fn persist(&self, doc: &MappingDocument) -> Result<()> {
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

    fn canonicalize(path: &Path) -> Result<String> {
        let canonical = path
            .canonicalize()
            .map_err(|_| RegistryError::InvalidPath(path.display().to_string()))?;
        Ok(canonical.to_string_lossy().into_owned())
    }

    /// Registers `path`, returning its existing project id if already
    /// known, or minting and persisting a new one otherwise.
    pub async fn register(&self, path: &Path, now_unix_ms: u64) -> Result<String> {
        let canonical_root = Self::canonicalize(path)?;
        let project_id = codeindex_ids::project_id(&canonical_root);

        let mut doc = self.doc.write().await;
        doc.projects
            .entry(project_id.clone())
            .and_modify(|entry| entry.last_touched_unix_ms = now_unix_ms)
            .or_insert_with(|| ProjectEntry {
                project_id: project_id.clone(),
                canonical_root: canonical_root.clone(),
                registered_at_unix_ms: now_unix_ms,
                last_touched_unix_ms: now_unix_ms,
            });
        self.persist(&doc).await?;
        Ok(project_id)
    }

    pub async fn resolve(&self, path: &Path) -> Result<Option<String>> {
        let canonical_root = Self::canonicalize(path)?;
        let project_id = codeindex_ids::project_id(&canonical_root);
        let doc = self.doc.read().await;
        Ok(doc.projects.get(&project_id).map(|_| project_id))
    }

    pub async fn path(&self, project_id: &str) -> Option<PathBuf> {
        let doc = self.doc.read().await;
        doc.projects
            .get(project_id)
            .map(|entry| PathBuf::from(&entry.canonical_root))
    }

    pub async fn list(&self) -> Vec<String> {
        self.doc.read().await.projects.keys().cloned().collect()
    }

    pub async fn touch(&self, project_id: &str, now_unix_ms: u64) -> Result<()> {
        let mut doc = self.doc.write().await;
        let entry = doc
            .projects
            .get_mut(project_id)
            .ok_or_else(|| RegistryError::UnknownProject(project_id.to_string()))?;
        entry.last_touched_unix_ms = now_unix_ms;
        self.persist(&doc).await
    }

    pub async fn remove(&self, project_id: &str) -> Result<()> {
        let mut doc = self.doc.write().await;
        if doc.projects.remove(project_id).is_none() {
            return Err(RegistryError::UnknownProject(project_id.to_string()));
        }
        self.persist(&doc).await
    }

    pub async fn latest_updated(&self) -> Option<String> {
        let doc = self.doc.read().await;
        doc.projects
            .values()
            .max_by_key(|entry| entry.last_touched_unix_ms)
            .map(|entry| entry.project_id.clone())
    }
}
