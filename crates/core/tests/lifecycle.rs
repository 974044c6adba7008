//! Exercises the composition root's four public entry points end to end
//! against the embedded reference stores, in the same style as the
//! coordinator crate's own integration tests.

use std::fs;
use std::sync::Arc;

use codeindex_core::{Core, CoreConfig, CoreError, ProjectStatus};
use codeindex_embedder::HashEmbedder;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

async fn new_core(data_dir: &std::path::Path) -> Arc<Core> {
    let config = CoreConfig {
        data_dir: data_dir.to_path_buf(),
        ..CoreConfig::default()
    };
    Core::open(config, Arc::new(HashEmbedder::new(16))).await.unwrap()
}

#[tokio::test]
async fn index_then_status_reports_completed_with_file_counts() {
    let project = tempdir().unwrap();
    fs::write(project.path().join("a.py"), "def a():\n    return 1\n".repeat(20)).unwrap();
    fs::write(project.path().join("b.js"), "function b() {\n  return 2;\n}\n".repeat(10)).unwrap();

    let data = tempdir().unwrap();
    let core = new_core(data.path()).await;

    let result = core.index(project.path(), false).await.unwrap();
    assert_eq!(result.indexed, 2);

    let project_id = codeindex_ids::project_id(&project.path().canonicalize().unwrap().to_string_lossy());
    let status = core.status(&project_id).await.unwrap();
    assert_eq!(status.project.status, ProjectStatus::Completed);
    assert_eq!(status.file_count, 2);
    assert_eq!(status.indexed_count, 2);
    assert_eq!(status.failed_count, 0);
}

#[tokio::test]
async fn incremental_update_after_index_is_a_noop_on_unchanged_project() {
    let project = tempdir().unwrap();
    fs::write(project.path().join("a.py"), "def a():\n    return 1\n".repeat(20)).unwrap();

    let data = tempdir().unwrap();
    let core = new_core(data.path()).await;

    core.index(project.path(), false).await.unwrap();
    let second = core.incremental_update(project.path(), false).await.unwrap();

    assert_eq!(second.indexed, 0);
    assert_eq!(second.unchanged, 1);
}

#[tokio::test]
async fn concurrent_index_without_force_cancel_is_rejected() {
    let project = tempdir().unwrap();
    for i in 0..40 {
        fs::write(project.path().join(format!("f{i}.py")), "def f():\n    return 1\n".repeat(30)).unwrap();
    }

    let data = tempdir().unwrap();
    let core = new_core(data.path()).await;

    let project_path = project.path().to_path_buf();
    let core_clone = core.clone();
    let first = tokio::spawn(async move { core_clone.index(&project_path, false).await });

    // Give the first job a chance to register itself before the second
    // call races it; both still run on the same executor so this is a
    // best-effort ordering, not a hard guarantee.
    tokio::task::yield_now().await;

    let second = core.index(project.path(), false).await;
    let _ = first.await.unwrap();

    // With such a small fixture the first job may finish before the
    // second call runs; only assert the rejection when it actually raced.
    if let Err(err) = second {
        assert!(matches!(err, CoreError::AlreadyInProgress(_)));
    }
}

#[tokio::test]
async fn delete_removes_store_state_for_a_project() {
    let project = tempdir().unwrap();
    fs::write(project.path().join("a.py"), "def a():\n    return 1\n".repeat(20)).unwrap();

    let data = tempdir().unwrap();
    let core = new_core(data.path()).await;
    core.index(project.path(), false).await.unwrap();

    let project_id = codeindex_ids::project_id(&project.path().canonicalize().unwrap().to_string_lossy());
    core.delete(&project_id).await.unwrap();

    let err = core.status(&project_id).await.unwrap_err();
    assert!(matches!(err, CoreError::UnknownProject(_)));
}
