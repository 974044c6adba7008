//! Diffs a fresh directory walk against the file-state store's FileRecord
//! set, classifying every path into added/modified/deleted/renamed/
//! unchanged, per the walk-then-diff algorithm.

use std::collections::HashMap;
use std::path::Path;

use codeindex_file_state::FileRecord;
use codeindex_ids::content_hash;
use codeindex_walker::{FileEntry, FileWalker, WalkerConfig};

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct PlannedFile {
    pub entry: FileEntry,
    pub content_hash: String,
}

/// A rename recognized by content-hash equality: `from` is the old
/// FileRecord path, `planned` carries the new path's fresh walk entry and
/// hash (the two hashes are equal by construction).
#[derive(Debug, Clone)]
pub struct RenamedFile {
    pub from: String,
    pub planned: PlannedFile,
}

#[derive(Debug, Clone, Default)]
pub struct IndexPlan {
    pub added: Vec<PlannedFile>,
    pub modified: Vec<PlannedFile>,
    pub deleted: Vec<String>,
    pub renamed: Vec<RenamedFile>,
    pub unchanged: usize,
}

impl IndexPlan {
    #[must_use]
    pub fn total_to_process(&self) -> usize {
        self.added.len() + self.modified.len() + self.renamed.len()
    }
}

pub struct IncrementalPlanner {
    root: std::path::PathBuf,
    walker_config: WalkerConfig,
}

impl IncrementalPlanner {
    #[must_use]
    pub fn new(root: impl Into<std::path::PathBuf>, walker_config: WalkerConfig) -> Self {
        Self {
            root: root.into(),
            walker_config,
        }
    }

    /// Builds a plan against `indexed`, the current FileRecord set for the
    /// project. Every added/modified entry carries its freshly computed
    /// content hash so the caller never re-reads the file to get it.
    pub async fn plan(&self, indexed: &HashMap<String, FileRecord>) -> Result<IndexPlan> {
        let walker = FileWalker::new(&self.root, self.walker_config.clone())?;
        let current = walker.walk()?;
        self.diff(current, indexed).await
    }

    /// Forces every current file to be treated as added, ignoring any
    /// existing FileRecord. Used for the `full` strategy.
    pub async fn plan_full(&self) -> Result<IndexPlan> {
        let walker = FileWalker::new(&self.root, self.walker_config.clone())?;
        let current = walker.walk()?;
        self.diff(current, &HashMap::new()).await
    }

    async fn diff(&self, current: Vec<FileEntry>, indexed: &HashMap<String, FileRecord>) -> Result<IndexPlan> {
        let current_paths: std::collections::HashSet<&str> =
            current.iter().map(|e| e.relative_path.as_str()).collect();

        let mut plan = IndexPlan::default();
        let mut added_hashes: HashMap<String, String> = HashMap::new();

        for entry in &current {
            let Some(record) = indexed.get(&entry.relative_path) else {
                let hash = self.hash_of(entry).await?;
                added_hashes.insert(entry.relative_path.clone(), hash.clone());
                plan.added.push(PlannedFile {
                    entry: entry.clone(),
                    content_hash: hash,
                });
                continue;
            };

            if entry.mtime_unix_ms == record.last_modified_unix_ms && entry.size_bytes == record.size {
                plan.unchanged += 1;
                continue;
            }

            let hash = self.hash_of(entry).await?;
            if hash == record.content_hash {
                plan.unchanged += 1;
            } else {
                plan.modified.push(PlannedFile {
                    entry: entry.clone(),
                    content_hash: hash,
                });
            }
        }

        let deleted: Vec<&String> = indexed.keys().filter(|path| !current_paths.contains(path.as_str())).collect();

        let mut matched_added: std::collections::HashSet<String> = std::collections::HashSet::new();
        for deleted_path in &deleted {
            let Some(record) = indexed.get(deleted_path.as_str()) else { continue };
            if let Some((added_path, _)) = added_hashes
                .iter()
                .find(|(added_path, hash)| !matched_added.contains(*added_path) && **hash == record.content_hash)
            {
                let planned = plan
                    .added
                    .iter()
                    .find(|f| &f.entry.relative_path == added_path)
                    .cloned()
                    .expect("added_hashes and plan.added are built from the same current entries");
                plan.renamed.push(RenamedFile {
                    from: (*deleted_path).clone(),
                    planned,
                });
                matched_added.insert(added_path.clone());
            } else {
                plan.deleted.push((*deleted_path).clone());
            }
        }

        plan.added.retain(|f| !matched_added.contains(&f.entry.relative_path));

        Ok(plan)
    }

    async fn hash_of(&self, entry: &FileEntry) -> Result<String> {
        let bytes = tokio::fs::read(&entry.absolute_path).await?;
        Ok(content_hash(&bytes))
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeindex_file_state::FileStatus;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn record(path: &str, hash: &str, mtime: u64, size: u64) -> FileRecord {
        FileRecord {
            relative_path: path.to_string(),
            content_hash: hash.to_string(),
            size,
            last_modified_unix_ms: mtime,
            last_indexed_unix_ms: mtime,
            chunk_count: 1,
            language: "rust".to_string(),
            status: FileStatus::Indexed,
            error_message: None,
            indexing_version: 1,
        }
    }

    #[tokio::test]
    async fn fresh_project_yields_all_added() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.rs"), b"fn a() {}").unwrap();
        fs::write(dir.path().join("b.rs"), b"fn b() {}").unwrap();

        let planner = IncrementalPlanner::new(dir.path(), WalkerConfig::default());
        let plan = planner.plan(&HashMap::new()).await.unwrap();

        assert_eq!(plan.added.len(), 2);
        assert_eq!(plan.modified.len(), 0);
        assert_eq!(plan.unchanged, 0);
    }

    #[tokio::test]
    async fn unchanged_file_is_skipped_without_hashing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.rs");
        fs::write(&path, b"fn a() {}").unwrap();
        let meta = fs::metadata(&path).unwrap();
        let mtime = meta
            .modified()
            .unwrap()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;
        let hash = content_hash(b"fn a() {}");

        let mut indexed = HashMap::new();
        indexed.insert("a.rs".to_string(), record("a.rs", &hash, mtime, meta.len()));

        let planner = IncrementalPlanner::new(dir.path(), WalkerConfig::default());
        let plan = planner.plan(&indexed).await.unwrap();

        assert_eq!(plan.unchanged, 1);
        assert_eq!(plan.added.len(), 0);
        assert_eq!(plan.modified.len(), 0);
    }

    #[tokio::test]
    async fn modified_content_with_stale_mtime_is_still_detected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.rs");
        fs::write(&path, b"fn a() { changed() }").unwrap();
        let meta = fs::metadata(&path).unwrap();
        let mtime = meta
            .modified()
            .unwrap()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;

        let mut indexed = HashMap::new();
        // Deliberately mismatched size/mtime so the hash path is taken,
        // but hash differs from content on disk: a genuine modification.
        indexed.insert(
            "a.rs".to_string(),
            record("a.rs", "stale-hash", mtime.wrapping_sub(1), meta.len() + 1),
        );

        let planner = IncrementalPlanner::new(dir.path(), WalkerConfig::default());
        let plan = planner.plan(&indexed).await.unwrap();

        assert_eq!(plan.modified.len(), 1);
    }

    #[tokio::test]
    async fn rename_with_unchanged_content_is_detected() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/a.rs"), b"fn a() {}").unwrap();
        let hash = content_hash(b"fn a() {}");

        let mut indexed = HashMap::new();
        indexed.insert("a.rs".to_string(), record("a.rs", &hash, 0, 9));

        let planner = IncrementalPlanner::new(dir.path(), WalkerConfig::default());
        let plan = planner.plan(&indexed).await.unwrap();

        assert_eq!(plan.renamed.len(), 1);
        assert_eq!(plan.renamed[0].from, "a.rs");
        assert_eq!(plan.renamed[0].planned.entry.relative_path, "src/a.rs");
        assert!(plan.added.is_empty());
        assert!(plan.deleted.is_empty());
    }

    #[tokio::test]
    async fn deletion_without_a_matching_added_file_is_reported() {
        let dir = tempdir().unwrap();
        let mut indexed = HashMap::new();
        indexed.insert("gone.rs".to_string(), record("gone.rs", "abc", 0, 1));

        let planner = IncrementalPlanner::new(dir.path(), WalkerConfig::default());
        let plan = planner.plan(&indexed).await.unwrap();

        assert_eq!(plan.deleted, vec!["gone.rs".to_string()]);
        assert!(plan.renamed.is_empty());
    }
}
