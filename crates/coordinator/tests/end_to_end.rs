//! End-to-end exercises of the two-store commit pipeline against the
//! embedded reference implementations, covering a fresh full index, a
//! no-op re-index, and a single-file incremental update.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use codeindex_coordinator::{progress_channel, Coordinator, IndexingConfig, IndexingStrategy, JsonGraphStore};
use codeindex_embedder::HashEmbedder;
use codeindex_file_state::FileStateStore;
use codeindex_memguard::{MemoryGuard, MemoryGuardConfig};
use codeindex_vector_store::{JsonVectorStore, PayloadFilter, VectorStore};
use tempfile::tempdir;

async fn new_coordinator(
    project_root: &Path,
    data_dir: &Path,
    strategy: IndexingStrategy,
) -> (Coordinator, Arc<JsonVectorStore>, Arc<JsonGraphStore>, Arc<FileStateStore>) {
    let project_id = "proj_test".to_string();
    let collection_name = "project-proj_test".to_string();
    let space_name = "project_proj_test".to_string();

    let vector_store = Arc::new(JsonVectorStore::open(data_dir.join("vectors")).await.unwrap());
    let graph_store = Arc::new(JsonGraphStore::open(data_dir.join("graph")).await.unwrap());
    let file_state = Arc::new(
        FileStateStore::open(data_dir.join("files.json"), &project_id, &project_root.display().to_string())
            .await
            .unwrap(),
    );
    let memguard = Arc::new(MemoryGuard::new(MemoryGuardConfig::default()));
    let (progress_tx, _rx) = progress_channel();

    let mut config = IndexingConfig::default();
    config.strategy = strategy;

    let coordinator = Coordinator::new(
        project_id,
        project_root.to_path_buf(),
        collection_name,
        space_name,
        config,
        Arc::new(HashEmbedder::new(16)),
        vector_store.clone(),
        graph_store.clone(),
        file_state.clone(),
        memguard,
        progress_tx,
    );

    (coordinator, vector_store, graph_store, file_state)
}

#[tokio::test]
async fn full_index_of_fresh_project_ignores_node_modules() {
    let project = tempdir().unwrap();
    fs::write(project.path().join("a.py"), "def a():\n    return 1\n".repeat(20)).unwrap();
    fs::write(project.path().join("b.js"), "function b() {\n  return 2;\n}\n".repeat(10)).unwrap();
    fs::write(project.path().join(".gitignore"), "node_modules/\n").unwrap();
    fs::create_dir_all(project.path().join("node_modules")).unwrap();
    fs::write(project.path().join("node_modules/x.js"), "console.log('ignored')").unwrap();

    let data = tempdir().unwrap();
    let (coordinator, _vs, _gs, file_state) = new_coordinator(project.path(), data.path(), IndexingStrategy::Full).await;

    let result = coordinator.run().await.unwrap();

    assert_eq!(result.indexed, 2);
    assert_eq!(result.failed.len(), 0);

    let records = file_state.all().await;
    assert_eq!(records.len(), 2);
    assert!(records.contains_key("a.py"));
    assert!(records.contains_key("b.js"));
    assert!(!records.contains_key("node_modules/x.js"));
}

#[tokio::test]
async fn reindex_with_no_changes_produces_zero_upserts() {
    let project = tempdir().unwrap();
    fs::write(project.path().join("a.py"), "def a():\n    return 1\n".repeat(20)).unwrap();

    let data = tempdir().unwrap();
    let (coordinator, vector_store, _gs, file_state) =
        new_coordinator(project.path(), data.path(), IndexingStrategy::Smart).await;

    let first = coordinator.run().await.unwrap();
    assert_eq!(first.indexed, 1);

    let before_count = vector_store
        .count_by_filter("project-proj_test", None)
        .await
        .unwrap();

    let second = coordinator.run().await.unwrap();
    assert_eq!(second.indexed, 0);
    assert_eq!(second.unchanged, 1);

    let after_count = vector_store
        .count_by_filter("project-proj_test", None)
        .await
        .unwrap();
    assert_eq!(before_count, after_count);

    let records = file_state.all().await;
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn modifying_one_file_reindexes_only_that_file() {
    let project = tempdir().unwrap();
    fs::write(project.path().join("a.py"), "def a():\n    return 1\n".repeat(20)).unwrap();
    fs::write(project.path().join("b.js"), "function b() {\n  return 2;\n}\n".repeat(10)).unwrap();

    let data = tempdir().unwrap();
    let (coordinator, vector_store, _gs, file_state) =
        new_coordinator(project.path(), data.path(), IndexingStrategy::Smart).await;
    coordinator.run().await.unwrap();

    let b_record_before = file_state.get("b.js").await.unwrap();

    fs::write(
        project.path().join("a.py"),
        "def a():\n    return 1\n".repeat(20) + "def extra():\n    return 2\n".repeat(5).as_str(),
    )
    .unwrap();

    let second = coordinator.run().await.unwrap();
    assert_eq!(second.indexed, 1);
    assert_eq!(second.unchanged, 1);

    let b_record_after = file_state.get("b.js").await.unwrap();
    assert_eq!(b_record_before.content_hash, b_record_after.content_hash);

    let a_points = vector_store
        .count_by_filter("project-proj_test", Some(&PayloadFilter::new().eq("relativePath", "a.py")))
        .await
        .unwrap();
    assert!(a_points > 0);
}

#[tokio::test]
async fn renaming_a_file_moves_its_records_to_the_new_path() {
    let project = tempdir().unwrap();
    fs::write(project.path().join("a.py"), "def a():\n    return 1\n".repeat(20)).unwrap();

    let data = tempdir().unwrap();
    let (coordinator, vector_store, _gs, file_state) =
        new_coordinator(project.path(), data.path(), IndexingStrategy::Smart).await;
    coordinator.run().await.unwrap();

    fs::create_dir_all(project.path().join("src")).unwrap();
    fs::rename(project.path().join("a.py"), project.path().join("src/a.py")).unwrap();

    let second = coordinator.run().await.unwrap();
    assert_eq!(second.renamed, 1);

    assert!(file_state.get("a.py").await.is_none());
    assert!(file_state.get("src/a.py").await.is_some());

    let old_points = vector_store
        .count_by_filter("project-proj_test", Some(&PayloadFilter::new().eq("relativePath", "a.py")))
        .await
        .unwrap();
    assert_eq!(old_points, 0);

    let new_points = vector_store
        .count_by_filter("project-proj_test", Some(&PayloadFilter::new().eq("relativePath", "src/a.py")))
        .await
        .unwrap();
    assert!(new_points > 0);
}
