use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Pending,
    Indexed,
    Failed,
    Skipped,
}

/// Per (project, relativePath) persistent indexing metadata. `content_hash`
/// identifies file bytes independent of path, so a pure rename carries the
/// same hash forward under the new path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileRecord {
    pub relative_path: String,
    pub content_hash: String,
    pub size: u64,
    pub last_modified_unix_ms: u64,
    pub last_indexed_unix_ms: u64,
    pub chunk_count: usize,
    pub language: String,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub indexing_version: u32,
}
