//! Wires the change detector (`codeindex-watcher`) into the composition
//! root so projects stay current without a client calling `index` or
//! `incrementalUpdate` again. The detector's typed `ChangeEvent`s are used
//! only as a trigger here, not applied file-by-file: the incremental
//! planner already re-derives the same add/modify/delete/rename set from
//! FileRecord state on every run, so a second bespoke apply path would
//! just duplicate that diff. One real filesystem event therefore causes
//! one `incremental_update` call, which is cheap when nothing changed.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use codeindex_watcher::{ChangeContext, RecommendedWatcher};

/// Seeds the detector's rename-recognition hash cache from the project's
/// persisted FileRecord set at watch start (Design Note #6: the cache must
/// be seeded from the file-state store, since a deleted file can no longer
/// be read to learn its hash after the fact). The cache is a point-in-time
/// snapshot; it drifts as the watch session progresses, which only affects
/// the precision of the emitted `ChangeEvent` kind, not correctness of the
/// triggered `incremental_update`.
pub(crate) struct FileStateChangeContext {
    root: PathBuf,
    known: RwLock<HashMap<String, String>>,
}

impl FileStateChangeContext {
    pub(crate) fn new(root: PathBuf, known: HashMap<String, String>) -> Self {
        Self { root, known: RwLock::new(known) }
    }
}

impl ChangeContext for FileStateChangeContext {
    fn known_hash(&self, relative_path: &str) -> Option<String> {
        self.known.read().expect("hash cache poisoned").get(relative_path).cloned()
    }

    fn read_current(&self, relative_path: &str) -> Option<(String, u64)> {
        let bytes = std::fs::read(self.root.join(relative_path)).ok()?;
        let hash = codeindex_ids::content_hash(&bytes);
        let len = bytes.len() as u64;
        Some((hash, len))
    }
}

/// Keeps a project's `notify` watcher and its consumer task alive.
/// Dropping it stops delivery and aborts the consumer, the same lifetime
/// contract `codeindex_watcher::start` documents for its `RecommendedWatcher`.
pub(crate) struct WatchGuard {
    _watcher: RecommendedWatcher,
    task: tokio::task::JoinHandle<()>,
}

impl WatchGuard {
    pub(crate) fn new(watcher: RecommendedWatcher, task: tokio::task::JoinHandle<()>) -> Self {
        Self { _watcher: watcher, task }
    }
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        self.task.abort();
    }
}
