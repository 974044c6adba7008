//! In-process vector store contract plus a JSON-backed reference
//! implementation. Real deployments can swap in a client for an external
//! vector database behind the same trait; [`JsonVectorStore`] keeps the
//! rest of the pipeline testable without one.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{Result, VectorStoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Distance {
    Cosine,
}

impl Default for Distance {
    fn default() -> Self {
        Self::Cosine
    }
}

/// A single embedded point: an id, its vector, and an opaque payload used
/// for filtering and for returning context alongside search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: serde_json::Value,
}

/// Equality filter over payload fields, ANDed together. Sufficient for the
/// project/chunk-kind scoping this crate needs; not a general query
/// language.
#[derive(Debug, Clone, Default)]
pub struct PayloadFilter {
    must_equal: HashMap<String, serde_json::Value>,
}

impl PayloadFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn eq(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.must_equal.insert(key.into(), value.into());
        self
    }

    fn matches(&self, payload: &serde_json::Value) -> bool {
        self.must_equal
            .iter()
            .all(|(k, v)| payload.get(k).map(|found| found == v).unwrap_or(false))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPoint {
    pub id: String,
    pub score: f32,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CollectionMeta {
    dimensions: usize,
    distance: Distance,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CollectionSnapshot {
    meta: Option<CollectionMeta>,
    points: Vec<VectorPoint>,
}

/// Storage contract the indexing pipeline drives. Implementations own
/// collection lifecycle, upserts, deletes, and nearest-neighbour search.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn create_collection(&self, name: &str, dimensions: usize, distance: Distance) -> Result<()>;

    async fn collection_exists(&self, name: &str) -> Result<bool>;

    /// Dimensions the collection was created with, or `None` if it has no
    /// recorded metadata yet (possible for collections loaded from a
    /// snapshot written before any points existed).
    async fn collection_dimensions(&self, name: &str) -> Result<Option<usize>>;

    async fn delete_collection(&self, name: &str) -> Result<()>;

    async fn upsert_points(&self, collection: &str, points: Vec<VectorPoint>) -> Result<()>;

    async fn delete_by_filter(&self, collection: &str, filter: &PayloadFilter) -> Result<usize>;

    async fn search(
        &self,
        collection: &str,
        query_vector: &[f32],
        top_k: usize,
        filter: Option<&PayloadFilter>,
    ) -> Result<Vec<ScoredPoint>>;

    async fn count_by_filter(&self, collection: &str, filter: Option<&PayloadFilter>) -> Result<usize>;
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Embedded reference store: one JSON snapshot file per collection,
/// written atomically (write to `.tmp`, then rename) the same way the
/// coordinator persists its watermark file. Search is brute-force cosine
/// similarity over the in-memory copy; fine for the corpus sizes this
/// engine targets, and it keeps the contract free of any particular
/// vector database's quirks.
pub struct JsonVectorStore {
    root: PathBuf,
    collections: RwLock<HashMap<String, CollectionSnapshot>>,
}

impl JsonVectorStore {
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        let mut collections = HashMap::new();
        let mut entries = tokio::fs::read_dir(&root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let bytes = tokio::fs::read(&path).await?;
            let snapshot: CollectionSnapshot = serde_json::from_slice(&bytes)?;
            collections.insert(stem.to_string(), snapshot);
        }
        Ok(Self {
            root,
            collections: RwLock::new(collections),
        })
    }

    fn collection_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.json"))
    }

    async fn persist(&self, name: &str, snapshot: &CollectionSnapshot) -> Result<()> {
        write_atomic(&self.collection_path(name), snapshot).await
    }
}

async fn write_atomic(path: &Path, value: &CollectionSnapshot) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, &bytes).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}

#[async_trait]
impl VectorStore for JsonVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize, distance: Distance) -> Result<()> {
        let mut collections = self.collections.write().await;
        if collections.contains_key(name) {
            return Err(VectorStoreError::CollectionExists(name.to_string()));
        }
        let snapshot = CollectionSnapshot {
            meta: Some(CollectionMeta { dimensions, distance }),
            points: Vec::new(),
        };
        self.persist(name, &snapshot).await?;
        collections.insert(name.to_string(), snapshot);
        Ok(())
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.collections.read().await.contains_key(name))
    }

    async fn collection_dimensions(&self, name: &str) -> Result<Option<usize>> {
        let collections = self.collections.read().await;
        let snapshot = collections
            .get(name)
            .ok_or_else(|| VectorStoreError::CollectionNotFound(name.to_string()))?;
        Ok(snapshot.meta.as_ref().map(|m| m.dimensions))
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        if collections.remove(name).is_none() {
            return Err(VectorStoreError::CollectionNotFound(name.to_string()));
        }
        let path = self.collection_path(name);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tokio::fs::remove_file(&path).await?;
        }
        Ok(())
    }

    async fn upsert_points(&self, collection: &str, points: Vec<VectorPoint>) -> Result<()> {
        let mut collections = self.collections.write().await;
        let snapshot = collections
            .get_mut(collection)
            .ok_or_else(|| VectorStoreError::CollectionNotFound(collection.to_string()))?;

        if let Some(meta) = &snapshot.meta {
            for point in &points {
                if point.vector.len() != meta.dimensions {
                    return Err(VectorStoreError::DimensionMismatch {
                        expected: meta.dimensions,
                        got: point.vector.len(),
                    });
                }
            }
        }

        for point in points {
            if let Some(existing) = snapshot.points.iter_mut().find(|p| p.id == point.id) {
                *existing = point;
            } else {
                snapshot.points.push(point);
            }
        }

        self.persist(collection, snapshot).await
    }

    async fn delete_by_filter(&self, collection: &str, filter: &PayloadFilter) -> Result<usize> {
        let mut collections = self.collections.write().await;
        let snapshot = collections
            .get_mut(collection)
            .ok_or_else(|| VectorStoreError::CollectionNotFound(collection.to_string()))?;

        let before = snapshot.points.len();
        snapshot.points.retain(|p| !filter.matches(&p.payload));
        let removed = before - snapshot.points.len();
        if removed > 0 {
            self.persist(collection, snapshot).await?;
        }
        Ok(removed)
    }

    async fn search(
        &self,
        collection: &str,
        query_vector: &[f32],
        top_k: usize,
        filter: Option<&PayloadFilter>,
    ) -> Result<Vec<ScoredPoint>> {
        let collections = self.collections.read().await;
        let snapshot = collections
            .get(collection)
            .ok_or_else(|| VectorStoreError::CollectionNotFound(collection.to_string()))?;

        let mut scored: Vec<ScoredPoint> = snapshot
            .points
            .iter()
            .filter(|p| filter.map(|f| f.matches(&p.payload)).unwrap_or(true))
            .map(|p| ScoredPoint {
                id: p.id.clone(),
                score: cosine_similarity(query_vector, &p.vector),
                payload: p.payload.clone(),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn count_by_filter(&self, collection: &str, filter: Option<&PayloadFilter>) -> Result<usize> {
        let collections = self.collections.read().await;
        let snapshot = collections
            .get(collection)
            .ok_or_else(|| VectorStoreError::CollectionNotFound(collection.to_string()))?;
        Ok(snapshot
            .points
            .iter()
            .filter(|p| filter.map(|f| f.matches(&p.payload)).unwrap_or(true))
            .count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(id: &str, vector: Vec<f32>, kind: &str) -> VectorPoint {
        VectorPoint {
            id: id.to_string(),
            vector,
            payload: serde_json::json!({ "kind": kind }),
        }
    }

    #[tokio::test]
    async fn upsert_then_search_ranks_by_similarity() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonVectorStore::open(dir.path()).await.unwrap();
        store.create_collection("chunks", 3, Distance::Cosine).await.unwrap();

        store
            .upsert_points(
                "chunks",
                vec![
                    point("a", vec![1.0, 0.0, 0.0], "fn"),
                    point("b", vec![0.0, 1.0, 0.0], "fn"),
                ],
            )
            .await
            .unwrap();

        let results = store
            .search("chunks", &[0.9, 0.1, 0.0], 2, None)
            .await
            .unwrap();
        assert_eq!(results[0].id, "a");
    }

    #[tokio::test]
    async fn dimension_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonVectorStore::open(dir.path()).await.unwrap();
        store.create_collection("chunks", 3, Distance::Cosine).await.unwrap();

        let err = store
            .upsert_points("chunks", vec![point("a", vec![1.0, 0.0], "fn")])
            .await
            .unwrap_err();
        assert!(matches!(err, VectorStoreError::DimensionMismatch { .. }));
    }

    #[tokio::test]
    async fn delete_by_filter_removes_matching_points_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonVectorStore::open(dir.path()).await.unwrap();
        store.create_collection("chunks", 2, Distance::Cosine).await.unwrap();
        store
            .upsert_points(
                "chunks",
                vec![point("a", vec![1.0, 0.0], "fn"), point("b", vec![0.0, 1.0], "struct")],
            )
            .await
            .unwrap();

        let removed = store
            .delete_by_filter("chunks", &PayloadFilter::new().eq("kind", "fn"))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.count_by_filter("chunks", None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn reopening_store_restores_persisted_collections() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = JsonVectorStore::open(dir.path()).await.unwrap();
            store.create_collection("chunks", 2, Distance::Cosine).await.unwrap();
            store
                .upsert_points("chunks", vec![point("a", vec![1.0, 0.0], "fn")])
                .await
                .unwrap();
        }

        let reopened = JsonVectorStore::open(dir.path()).await.unwrap();
        assert!(reopened.collection_exists("chunks").await.unwrap());
        assert_eq!(reopened.count_by_filter("chunks", None).await.unwrap(), 1);
    }
}
