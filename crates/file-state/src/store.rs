//! Schema-versioned, per-project JSON persistence for [`FileRecord`]s and
//! the project [`Watermark`], written atomically (write to `.tmp`, then
//! rename) the same way the teacher's coordinator persists its watermark
//! file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{FileStateError, Result};
use crate::types::FileRecord;
use crate::watermark::Watermark;

pub const CURRENT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectFileState {
    pub schema_version: u32,
    pub project_id: String,
    pub project_root: String,
    #[serde(default)]
    pub project_watermark: Option<Watermark>,
    #[serde(default)]
    pub built_at_unix_ms: Option<u64>,
    #[serde(default)]
    pub files: HashMap<String, FileRecord>,
}

impl ProjectFileState {
    fn new(project_id: String, project_root: String) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            project_id,
            project_root,
            project_watermark: None,
            built_at_unix_ms: None,
            files: HashMap::new(),
        }
    }
}

/// Applies ordered migrations keyed by `schema_version` to a raw JSON
/// document before it's deserialized into the current [`ProjectFileState`]
/// shape. There is only one schema version today; a future bump adds a
/// transform step here rather than a new parallel type.
fn migrate(mut value: serde_json::Value) -> Result<serde_json::Value> {
    let found = value
        .get("schema_version")
        .and_then(serde_json::Value::as_u64)
        .unwrap_or(0) as u32;

    if found > CURRENT_SCHEMA_VERSION {
        return Err(FileStateError::UnsupportedSchemaVersion {
            found,
            newest: CURRENT_SCHEMA_VERSION,
        });
    }

    if found == 0 {
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "schema_version".to_string(),
                serde_json::Value::from(CURRENT_SCHEMA_VERSION),
            );
        }
    }

    Ok(value)
}

/// Owns one project's on-disk file-state document. One store per project;
/// callers serialize writes through `&self` via the internal lock rather
/// than relying on external mutual exclusion.
pub struct FileStateStore {
    path: PathBuf,
    state: RwLock<ProjectFileState>,
}

impl FileStateStore {
    /// Opens (or creates) the file-state document at `path`.
    pub async fn open(path: impl Into<PathBuf>, project_id: &str, project_root: &str) -> Result<Self> {
        let path = path.into();
        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let raw: serde_json::Value = serde_json::from_slice(&bytes)
                    .map_err(|e| FileStateError::Corrupt(e.to_string()))?;
                let migrated = migrate(raw)?;
                serde_json::from_value(migrated).map_err(|e| FileStateError::Corrupt(e.to_string()))?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                ProjectFileState::new(project_id.to_string(), project_root.to_string())
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    async fn persist(&self, state: &ProjectFileState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(state)?;
        let tmp_path = tmp_path_for(&self.path);
        tokio::fs::write(&tmp_path, &bytes).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }

    pub async fn get(&self, relative_path: &str) -> Option<FileRecord> {
        self.state.read().await.files.get(relative_path).cloned()
    }

    pub async fn all(&self) -> HashMap<String, FileRecord> {
        self.state.read().await.files.clone()
    }

    pub async fn upsert(&self, record: FileRecord) -> Result<()> {
        let mut state = self.state.write().await;
        state.files.insert(record.relative_path.clone(), record);
        self.persist(&state).await
    }

    pub async fn remove(&self, relative_path: &str) -> Result<Option<FileRecord>> {
        let mut state = self.state.write().await;
        let removed = state.files.remove(relative_path);
        if removed.is_some() {
            self.persist(&state).await?;
        }
        Ok(removed)
    }

    /// Renames a record's key in place, keeping its content hash and other
    /// metadata — the rename-detection path never re-derives those fields.
    pub async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(mut record) = state.files.remove(from) {
            record.relative_path = to.to_string();
            state.files.insert(to.to_string(), record);
            self.persist(&state).await?;
        }
        Ok(())
    }

    pub async fn project_watermark(&self) -> Option<Watermark> {
        self.state.read().await.project_watermark.clone()
    }

    pub async fn set_project_watermark(&self, watermark: Watermark, built_at_unix_ms: u64) -> Result<()> {
        let mut state = self.state.write().await;
        state.project_watermark = Some(watermark);
        state.built_at_unix_ms = Some(built_at_unix_ms);
        self.persist(&state).await
    }

    pub async fn clear(&self) -> Result<()> {
        let mut state = self.state.write().await;
        state.files.clear();
        state.project_watermark = None;
        state.built_at_unix_ms = None;
        self.persist(&state).await
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileStatus;

    fn record(path: &str, hash: &str) -> FileRecord {
        FileRecord {
            relative_path: path.to_string(),
            content_hash: hash.to_string(),
            size: 100,
            last_modified_unix_ms: 1,
            last_indexed_unix_ms: 1,
            chunk_count: 3,
            language: "rust".to_string(),
            status: FileStatus::Indexed,
            error_message: None,
            indexing_version: 1,
        }
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::open(dir.path().join("state.json"), "proj_1", "/tmp/proj")
            .await
            .unwrap();

        store.upsert(record("a.rs", "h1")).await.unwrap();
        let got = store.get("a.rs").await.unwrap();
        assert_eq!(got.content_hash, "h1");
    }

    #[tokio::test]
    async fn reopen_restores_persisted_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        {
            let store = FileStateStore::open(&path, "proj_1", "/tmp/proj").await.unwrap();
            store.upsert(record("a.rs", "h1")).await.unwrap();
        }
        let reopened = FileStateStore::open(&path, "proj_1", "/tmp/proj").await.unwrap();
        assert_eq!(reopened.all().await.len(), 1);
    }

    #[tokio::test]
    async fn rename_preserves_hash_under_new_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::open(dir.path().join("state.json"), "proj_1", "/tmp/proj")
            .await
            .unwrap();
        store.upsert(record("a.py", "h1")).await.unwrap();

        store.rename("a.py", "src/a.py").await.unwrap();

        assert!(store.get("a.py").await.is_none());
        let moved = store.get("src/a.py").await.unwrap();
        assert_eq!(moved.content_hash, "h1");
    }

    #[tokio::test]
    async fn corrupt_document_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        tokio::fs::write(&path, b"not json").await.unwrap();

        let err = FileStateStore::open(&path, "proj_1", "/tmp/proj").await.unwrap_err();
        assert!(matches!(err, FileStateError::Corrupt(_)));
    }
}
