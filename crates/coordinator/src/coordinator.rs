//! The per-project index job state machine: ensures store schema, walks
//! the incremental plan, and drives the two-store commit for each file
//! under a bounded worker pool, generalizing the teacher's
//! `process_files_parallel` batching into a pipeline that also serves the
//! graph and file-state stores.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use codeindex_chunker::{ChunkMetadata, Chunker, CodeChunk, Language};
use codeindex_embedder::EmbeddingProvider;
use codeindex_file_state::{FileRecord, FileStateStore, FileStatus};
use codeindex_ids::chunk_id as derive_chunk_id;
use codeindex_memguard::{MemoryGuard, PressureLevel};
use codeindex_normalizer::{normalize, resolve, Entity};
use codeindex_vector_store::{Distance, PayloadFilter, VectorPoint, VectorStore};
use tokio::sync::{broadcast, Semaphore};

use crate::config::{IndexingConfig, IndexingStrategy};
use crate::error::{CoordinatorError, ErrorKind, Result};
use crate::planner::{IncrementalPlanner, PlannedFile};
use crate::progress::{JobOutcome, ProjectProgress};
use crate::stores::GraphStore;

/// Summary returned once a job finishes, enough for a caller to decide
/// whether the run behaved idempotently (testable property: unchanged
/// files cause zero upserts).
#[derive(Debug, Clone, Default)]
pub struct JobResult {
    pub indexed: usize,
    pub unchanged: usize,
    pub deleted: usize,
    pub renamed: usize,
    pub failed: Vec<(String, String)>,
}

pub struct Coordinator {
    project_id: String,
    project_root: PathBuf,
    collection_name: String,
    space_name: String,
    config: IndexingConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    graph_store: Arc<dyn GraphStore>,
    file_state: Arc<FileStateStore>,
    memguard: Arc<MemoryGuard>,
    progress: broadcast::Sender<ProjectProgress>,
    cancel: Arc<AtomicBool>,
}

impl Coordinator {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        project_id: String,
        project_root: PathBuf,
        collection_name: String,
        space_name: String,
        config: IndexingConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
        graph_store: Arc<dyn GraphStore>,
        file_state: Arc<FileStateStore>,
        memguard: Arc<MemoryGuard>,
        progress: broadcast::Sender<ProjectProgress>,
    ) -> Self {
        Self {
            project_id,
            project_root,
            collection_name,
            space_name,
            config,
            embedder,
            vector_store,
            graph_store,
            file_state,
            memguard,
            progress,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A cooperative cancellation handle; callers may clone it out and
    /// flip it from elsewhere while a job is running.
    #[must_use]
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    pub async fn run(&self) -> Result<JobResult> {
        self.ensure_collection().await?;
        self.graph_store.create_space(&self.space_name).await?;

        let indexed = self.file_state.all().await;
        let planner = IncrementalPlanner::new(&self.project_root, self.config.walker.clone());
        let plan = match self.config.strategy {
            IndexingStrategy::Full => planner.plan_full().await?,
            IndexingStrategy::Incremental => planner.plan(&indexed).await?,
            IndexingStrategy::Smart if indexed.is_empty() => planner.plan_full().await?,
            IndexingStrategy::Smart => planner.plan(&indexed).await?,
        };

        let total = plan.total_to_process() + plan.deleted.len();
        let mut done = 0usize;
        let mut result = JobResult {
            unchanged: plan.unchanged,
            ..JobResult::default()
        };

        for path in &plan.deleted {
            self.delete_file(path).await?;
            self.file_state.remove(path).await?;
            result.deleted += 1;
            done += 1;
            self.publish(done, total, Some(path.clone()));
        }

        // Renamed files keep their content hash by construction, but the
        // path is embedded in every chunk/entity id, so they are
        // reprocessed under the new path rather than patched in place.
        // Recomputing embeddings here is the documented open optimization
        // left undone: simpler and still deterministic, at the cost of
        // embedding calls a path-only rewrite could have avoided.
        let mut renamed_paths: std::collections::HashSet<String> = std::collections::HashSet::new();
        for renamed in &plan.renamed {
            self.delete_file(&renamed.from).await?;
            self.file_state.remove(&renamed.from).await?;
            renamed_paths.insert(renamed.planned.entry.relative_path.clone());
        }
        let mut to_process: Vec<PlannedFile> = plan.added;
        to_process.extend(plan.modified);
        to_process.extend(plan.renamed.into_iter().map(|r| r.planned));

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));

        let mut join_set = tokio::task::JoinSet::new();
        let mut batch_size = self.config.batch_size;

        for planned in to_process {
            if self.cancel.load(Ordering::Relaxed) {
                break;
            }

            batch_size = self.adjust_for_pressure(batch_size).await?;
            if batch_size == 0 {
                break;
            }

            let permit = semaphore.clone().acquire_owned().await.map_err(|e| CoordinatorError::Other(e.to_string()))?;
            let path = planned.entry.relative_path.clone();
            let this = self.clone_for_task();
            let chunker = Chunker::new(this.config.chunker.clone());
            let effective_batch = batch_size;

            join_set.spawn(async move {
                let _permit = permit;
                let outcome = this.process_file(&chunker, &planned, effective_batch).await;
                (path, outcome)
            });
        }

        while let Some(joined) = join_set.join_next().await {
            let (path, outcome) = joined.map_err(|e| CoordinatorError::Other(e.to_string()))?;
            done += 1;
            match outcome {
                Ok(()) if renamed_paths.contains(&path) => result.renamed += 1,
                Ok(()) => result.indexed += 1,
                Err(e) => result.failed.push((path.clone(), e.to_string())),
            }
            self.publish(done, total, Some(path));
        }

        let outcome = if !result.failed.is_empty() && result.indexed == 0 && result.deleted == 0 && result.renamed == 0 {
            JobOutcome::Failed {
                error: format!("{} file(s) failed", result.failed.len()),
            }
        } else if self.cancel.load(Ordering::Relaxed) {
            JobOutcome::Cancelled
        } else {
            JobOutcome::Completed
        };
        let _ = self.progress.send(ProjectProgress::finished(&self.project_id, done, total, outcome));

        Ok(result)
    }

    fn publish(&self, done: usize, total: usize, current_path: Option<String>) {
        let _ = self.progress.send(ProjectProgress::step(&self.project_id, done, total, current_path));
    }

    async fn ensure_collection(&self) -> Result<()> {
        let dimensions = self.embedder.dimensions();
        if self.vector_store.collection_exists(&self.collection_name).await? {
            if let Some(existing) = self.vector_store.collection_dimensions(&self.collection_name).await? {
                if existing != dimensions {
                    return Err(CoordinatorError::DimensionMismatch {
                        expected: existing,
                        got: dimensions,
                    });
                }
            }
            return Ok(());
        }
        self.vector_store
            .create_collection(&self.collection_name, dimensions, Distance::Cosine)
            .await?;
        Ok(())
    }

    async fn delete_file(&self, relative_path: &str) -> Result<()> {
        let filter = PayloadFilter::new().eq("relativePath", relative_path.to_string());
        self.vector_store.delete_by_filter(&self.collection_name, &filter).await?;
        self.graph_store.delete_by_source_path(&self.space_name, relative_path).await?;
        Ok(())
    }

    /// Polls the memory guard between batches: `warning` halves the
    /// current batch size, `critical` pauses dispatch until pressure
    /// recedes, `emergency` does the same and additionally drops this
    /// process's cached embedder/store state via `Arc::strong_count`-free
    /// data there is none to drop beyond what the stores already persist
    /// incrementally, so the signal is logged for an operator to act on.
    async fn adjust_for_pressure(&self, current_batch_size: usize) -> Result<usize> {
        loop {
            match self.memguard.current() {
                PressureLevel::Normal => return Ok(self.config.batch_size),
                PressureLevel::Warning => return Ok((current_batch_size / 2).max(1)),
                PressureLevel::Critical => {
                    if self.cancel.load(Ordering::Relaxed) {
                        return Ok(0);
                    }
                    tokio::time::sleep(Duration::from_millis(200)).await;
                }
                PressureLevel::Emergency => {
                    log::warn!("memory pressure at emergency level; pausing dispatch for project {}", self.project_id);
                    if self.cancel.load(Ordering::Relaxed) {
                        return Ok(0);
                    }
                    tokio::time::sleep(Duration::from_millis(200)).await;
                }
            }
        }
    }

    async fn process_file(&self, chunker: &Chunker, planned: &PlannedFile, batch_size: usize) -> Result<()> {
        self.delete_file(&planned.entry.relative_path).await?;

        let bytes = tokio::fs::read(&planned.entry.absolute_path).await?;
        let content = String::from_utf8_lossy(&bytes).into_owned();
        let chunks = chunker.chunk_str(&content, Some(&planned.entry.relative_path))?;

        if chunks.is_empty() {
            self.file_state
                .upsert(FileRecord {
                    relative_path: planned.entry.relative_path.clone(),
                    content_hash: planned.content_hash.clone(),
                    size: planned.entry.size_bytes,
                    last_modified_unix_ms: planned.entry.mtime_unix_ms,
                    last_indexed_unix_ms: now_unix_ms(),
                    chunk_count: 0,
                    language: planned.entry.language.as_str().to_string(),
                    status: FileStatus::Indexed,
                    error_message: None,
                    indexing_version: 1,
                })
                .await?;
            return Ok(());
        }

        let ids: Vec<String> = chunks
            .iter()
            .map(|c| derive_chunk_id(&self.project_id, &c.file_path, c.start_line, c.end_line, &planned.content_hash))
            .collect();

        let (entities, unresolved) = self.extract_entities(&chunks, &ids, planned.entry.language)?;

        let existing_entities = self.graph_store.all_entities(&self.space_name).await?;
        let mut entity_pool: Vec<Entity> = existing_entities;
        entity_pool.extend(entities.iter().cloned());
        let resolved_relationships = resolve(&entity_pool, &unresolved);

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embed_with_retry(&texts, batch_size).await?;

        let points: Vec<VectorPoint> = chunks
            .iter()
            .zip(ids.iter())
            .zip(vectors.into_iter())
            .map(|((chunk, id), vector)| VectorPoint {
                id: id.clone(),
                vector,
                payload: chunk_payload(&self.project_id, chunk, &planned.content_hash),
            })
            .collect();

        self.vector_store.upsert_points(&self.collection_name, points).await?;
        self.graph_store.upsert_vertices(&self.space_name, entities).await?;
        self.graph_store.upsert_edges(&self.space_name, resolved_relationships).await?;

        self.file_state
            .upsert(FileRecord {
                relative_path: planned.entry.relative_path.clone(),
                content_hash: planned.content_hash.clone(),
                size: planned.entry.size_bytes,
                last_modified_unix_ms: planned.entry.mtime_unix_ms,
                last_indexed_unix_ms: now_unix_ms(),
                chunk_count: chunks.len(),
                language: planned.entry.language.as_str().to_string(),
                status: FileStatus::Indexed,
                error_message: None,
                indexing_version: 1,
            })
            .await?;

        Ok(())
    }

    fn extract_entities(
        &self,
        chunks: &[CodeChunk],
        chunk_ids: &[String],
        language: Language,
    ) -> Result<(Vec<Entity>, Vec<codeindex_normalizer::UnresolvedRelationship>)> {
        let mut entities = Vec::new();
        let mut unresolved = Vec::new();
        for (chunk, id) in chunks.iter().zip(chunk_ids.iter()) {
            let (entity, rels) = normalize(chunk, id, language)?;
            if let Some(entity) = entity {
                entities.push(entity);
            }
            unresolved.extend(rels);
        }
        Ok((entities, unresolved))
    }

    async fn embed_with_retry(&self, texts: &[String], batch_size: usize) -> Result<Vec<Vec<f32>>> {
        let mut all = Vec::with_capacity(texts.len());
        for batch in texts.chunks(batch_size.max(1)) {
            if self.cancel.load(Ordering::Relaxed) {
                return Err(CoordinatorError::Other("job cancelled during embedding".to_string()));
            }
            let vectors = self.with_retry(|| async { self.embedder.embed_documents(batch).await.map_err(CoordinatorError::from) }).await?;
            all.extend(vectors);
        }
        Ok(all)
    }

    /// Exponential backoff with jitter, retrying only transient failures;
    /// validation errors propagate immediately since the job cannot make
    /// progress regardless of how many times it retries.
    async fn with_retry<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if e.kind() == ErrorKind::Transient && attempt < self.config.retry_attempts => {
                    attempt += 1;
                    let backoff = self.config.retry_delay * 2u32.pow(attempt.saturating_sub(1));
                    tokio::time::sleep(backoff + Duration::from_millis(jitter_ms())).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn clone_for_task(&self) -> Self {
        Self {
            project_id: self.project_id.clone(),
            project_root: self.project_root.clone(),
            collection_name: self.collection_name.clone(),
            space_name: self.space_name.clone(),
            config: self.config.clone(),
            embedder: self.embedder.clone(),
            vector_store: self.vector_store.clone(),
            graph_store: self.graph_store.clone(),
            file_state: self.file_state.clone(),
            memguard: self.memguard.clone(),
            progress: self.progress.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

fn chunk_payload(project_id: &str, chunk: &CodeChunk, content_hash: &str) -> serde_json::Value {
    let metadata: &ChunkMetadata = &chunk.metadata;
    serde_json::json!({
        "projectId": project_id,
        "relativePath": chunk.file_path,
        "startLine": chunk.start_line,
        "endLine": chunk.end_line,
        "chunkType": metadata.chunk_type.map(|t| t.as_str()),
        "language": metadata.language,
        "contentHash": content_hash,
        "content": chunk.content,
    })
}

/// Cheap jitter source (0-49ms) to desynchronize retrying workers without
/// pulling in a dedicated RNG dependency for a single backoff call site.
fn jitter_ms() -> u64 {
    u64::from(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0),
    ) % 50
}

fn now_unix_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
