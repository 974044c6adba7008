//! The composition root: owns the registry, per-project lifecycle and
//! file-state records, the embedded vector/graph stores, and the memory
//! guard, constructing a fresh [`Coordinator`] per `index`/
//! `incremental_update` call. Exposes exactly four entry points, per the
//! "dynamic dependency-injection container to a systems design" rewrite —
//! no runtime service locator, just explicit construction in one place.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use codeindex_coordinator::{
    progress_channel, Coordinator, GraphStore, IndexingStrategy, JobResult, JsonGraphStore,
};
use codeindex_embedder::EmbeddingProvider;
use codeindex_file_state::{FileStateStore, FileStatus};
use codeindex_memguard::{MemoryGuard, ProcSelfStatusSampler};
use codeindex_registry::ProjectRegistry;
use codeindex_vector_store::{JsonVectorStore, VectorStore};
use tokio::sync::Mutex;

use crate::config::CoreConfig;
use crate::error::{CoreError, Result};
use crate::project::{ProjectRecord, ProjectStatus, ProjectStore};
use crate::watch::{FileStateChangeContext, WatchGuard};

fn now_unix_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

/// A project's lifecycle record plus a live summary of its FileRecord set,
/// the answer to the `status` entry point.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub project: ProjectRecord,
    pub file_count: usize,
    pub indexed_count: usize,
    pub failed_count: usize,
}

pub struct Core {
    data_dir: PathBuf,
    config: CoreConfig,
    registry: ProjectRegistry,
    projects: ProjectStore,
    vector_store: Arc<JsonVectorStore>,
    graph_store: Arc<JsonGraphStore>,
    memguard: Arc<MemoryGuard>,
    embedder: Arc<dyn EmbeddingProvider>,
    in_progress: Mutex<HashMap<String, Arc<AtomicBool>>>,
    watches: Mutex<HashMap<String, WatchGuard>>,
    _memguard_cancel: tokio::sync::watch::Sender<bool>,
}

impl Core {
    /// Opens (creating if absent) the on-disk state under `config.data_dir`
    /// and resumes filesystem watching for every already-registered
    /// project, satisfying "applies incremental updates safely across
    /// restarts". Returns an `Arc` because watch tasks hold a clone of it.
    pub async fn open(config: CoreConfig, embedder: Arc<dyn EmbeddingProvider>) -> Result<Arc<Self>> {
        let data_dir = config.data_dir.clone();
        tokio::fs::create_dir_all(&data_dir).await?;

        let registry = ProjectRegistry::open(data_dir.join("registry.json")).await?;
        let projects = ProjectStore::open(data_dir.join("projects.json")).await?;
        let vector_store = Arc::new(JsonVectorStore::open(data_dir.join("vectors")).await?);
        let graph_store = Arc::new(JsonGraphStore::open(data_dir.join("graph")).await?);
        let memguard = Arc::new(MemoryGuard::new(config.indexing.memory.clone()));
        let (memguard_cancel_tx, memguard_cancel_rx) = tokio::sync::watch::channel(false);
        tokio::spawn(memguard.clone().spawn(Arc::new(ProcSelfStatusSampler), memguard_cancel_rx));

        let core = Arc::new(Self {
            data_dir,
            config,
            registry,
            projects,
            vector_store,
            graph_store,
            memguard,
            embedder,
            in_progress: Mutex::new(HashMap::new()),
            watches: Mutex::new(HashMap::new()),
            _memguard_cancel: memguard_cancel_tx,
        });

        core.resume_watches().await;
        Ok(core)
    }

    async fn resume_watches(self: &Arc<Self>) {
        for project_id in self.registry.list().await {
            let Some(path) = self.registry.path(&project_id).await else { continue };
            if let Err(e) = self.ensure_watching(&project_id, &path).await {
                log::warn!("failed to resume filesystem watch for project {project_id}: {e}");
            }
        }
    }

    /// Starts a debounced filesystem watch for `project_id` at `path` if
    /// one isn't already running; idempotent. Each delivered (coalesced)
    /// change batch triggers one `incremental_update` call rather than
    /// applying the individual `ChangeEvent`s, since the incremental
    /// planner already re-derives the same diff from FileRecord state.
    async fn ensure_watching(self: &Arc<Self>, project_id: &str, path: &Path) -> Result<()> {
        let mut watches = self.watches.lock().await;
        if watches.contains_key(project_id) {
            return Ok(());
        }

        let project_path = path.display().to_string();
        let file_state = FileStateStore::open(self.file_state_path(project_id), project_id, &project_path).await?;
        let known = file_state
            .all()
            .await
            .into_iter()
            .map(|(relative_path, record)| (relative_path, record.content_hash))
            .collect();
        let ctx: Arc<dyn codeindex_watcher::ChangeContext + Send + Sync> =
            Arc::new(FileStateChangeContext::new(path.to_path_buf(), known));
        let ignore = Arc::new(codeindex_ignore::IgnoreResolver::new(path, &self.config.indexing.walker.extra_ignore_globs)?);

        let (watcher, mut events) =
            codeindex_watcher::start(path, ignore, ctx, self.config.indexing.watcher.clone())?;

        let this = Arc::clone(self);
        let project_id_owned = project_id.to_string();
        let path_owned = path.to_path_buf();
        let task = tokio::spawn(async move {
            while events.recv().await.is_some() {
                match this.incremental_update(&path_owned, false).await {
                    Ok(_) | Err(CoreError::AlreadyInProgress(_)) => {}
                    Err(e) => log::warn!("watch-triggered update failed for project {project_id_owned}: {e}"),
                }
            }
        });

        watches.insert(project_id.to_string(), WatchGuard::new(watcher, task));
        Ok(())
    }

    fn file_state_path(&self, project_id: &str) -> PathBuf {
        self.data_dir.join("projects").join(project_id).join("files.json")
    }

    /// Registers (or flips the cancel flag of, under `force_cancel`) the
    /// job about to run for `project_id`, upholding "at most one active
    /// index job per projectId" (spec §4.7). Returns once no job is
    /// recorded for this project, having inserted `cancel` in its place.
    async fn register_job(&self, project_id: &str, cancel: Arc<AtomicBool>, force_cancel: bool) -> Result<()> {
        loop {
            let mut guard = self.in_progress.lock().await;
            if let Some(existing) = guard.get(project_id).cloned() {
                if !force_cancel {
                    return Err(CoreError::AlreadyInProgress(project_id.to_string()));
                }
                existing.store(true, Ordering::SeqCst);
                drop(guard);
                tokio::time::sleep(Duration::from_millis(25)).await;
                continue;
            }
            guard.insert(project_id.to_string(), cancel);
            return Ok(());
        }
    }

    async fn unregister_job(&self, project_id: &str) {
        self.in_progress.lock().await.remove(project_id);
    }

    async fn run_job(self: &Arc<Self>, path: &Path, strategy: IndexingStrategy, force_cancel: bool) -> Result<JobResult> {
        let now = now_unix_ms();
        let project_id = self.registry.register(path, now).await?;
        let collection_name = codeindex_registry::collection_name(&project_id);
        let space_name = codeindex_registry::space_name(&project_id);
        let project_path = path.display().to_string();
        self.projects.ensure(&project_id, &project_path, &collection_name, &space_name, now).await?;

        let file_state = Arc::new(
            FileStateStore::open(self.file_state_path(&project_id), &project_id, &project_path).await?,
        );
        let (progress_tx, _rx) = progress_channel();
        let mut job_config = self.config.indexing.clone();
        job_config.strategy = strategy;

        let coordinator = Coordinator::new(
            project_id.clone(),
            path.to_path_buf(),
            collection_name,
            space_name,
            job_config,
            self.embedder.clone(),
            self.vector_store.clone(),
            self.graph_store.clone(),
            file_state,
            self.memguard.clone(),
            progress_tx,
        );

        self.register_job(&project_id, coordinator.cancel_handle(), force_cancel).await?;
        self.projects.set_status(&project_id, ProjectStatus::Indexing, None, now_unix_ms()).await?;

        let result = coordinator.run().await;
        self.unregister_job(&project_id).await;

        match &result {
            Ok(_) => {
                self.projects.set_status(&project_id, ProjectStatus::Completed, None, now_unix_ms()).await?;
                if let Err(e) = self.ensure_watching(&project_id, path).await {
                    log::warn!("failed to start filesystem watch for project {project_id}: {e}");
                }
            }
            Err(e) => {
                self.projects.set_status(&project_id, ProjectStatus::Error, Some(e.to_string()), now_unix_ms()).await?;
            }
        }

        Ok(result?)
    }

    /// Full index of `path`, walking every file regardless of prior
    /// FileRecords. `force_cancel` requests cancellation of an
    /// already-running job for the same project before starting this one;
    /// without it a concurrent call fails with `AlreadyInProgress`. On
    /// success, begins watching `path` for subsequent changes.
    pub async fn index(self: &Arc<Self>, path: &Path, force_cancel: bool) -> Result<JobResult> {
        self.run_job(path, IndexingStrategy::Full, force_cancel).await
    }

    /// Incremental (smart) update of `path`: walks and diffs against the
    /// existing FileRecord set, processing only added/modified/renamed
    /// files.
    pub async fn incremental_update(self: &Arc<Self>, path: &Path, force_cancel: bool) -> Result<JobResult> {
        self.run_job(path, IndexingStrategy::Smart, force_cancel).await
    }

    /// Removes a project's vector collection, graph space, file-state
    /// document, lifecycle record, and registry entry. Refuses while a
    /// job is in progress for that project. Stops its filesystem watch
    /// first, so no watch-triggered update races the deletion.
    pub async fn delete(&self, project_id: &str) -> Result<()> {
        if self.in_progress.lock().await.contains_key(project_id) {
            return Err(CoreError::AlreadyInProgress(project_id.to_string()));
        }

        self.watches.lock().await.remove(project_id);

        let collection_name = codeindex_registry::collection_name(project_id);
        let space_name = codeindex_registry::space_name(project_id);

        if self.vector_store.collection_exists(&collection_name).await.unwrap_or(false) {
            self.vector_store.delete_collection(&collection_name).await?;
        }
        self.graph_store.delete_space(&space_name).await?;

        let project_dir = self.data_dir.join("projects").join(project_id);
        if tokio::fs::try_exists(&project_dir).await.unwrap_or(false) {
            tokio::fs::remove_dir_all(&project_dir).await?;
        }

        self.projects.remove(project_id).await?;
        self.registry.remove(project_id).await?;
        Ok(())
    }

    /// Current lifecycle status plus a live FileRecord summary for
    /// `project_id`.
    pub async fn status(&self, project_id: &str) -> Result<StatusReport> {
        let project = self
            .projects
            .get(project_id)
            .await
            .ok_or_else(|| CoreError::UnknownProject(project_id.to_string()))?;

        let file_state = FileStateStore::open(self.file_state_path(project_id), project_id, &project.path).await?;
        let records = file_state.all().await;
        let indexed_count = records.values().filter(|r| r.status == FileStatus::Indexed).count();
        let failed_count = records.values().filter(|r| r.status == FileStatus::Failed).count();

        Ok(StatusReport {
            file_count: records.len(),
            indexed_count,
            failed_count,
            project,
        })
    }
}
