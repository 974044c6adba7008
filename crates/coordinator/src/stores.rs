//! Graph storage contract plus a reference implementation that wraps
//! [`codeindex_graph::CodeGraph`] (the teacher's `petgraph`-based
//! representation) behind a schema-versioned JSON snapshot per space,
//! mirroring how [`codeindex_vector_store::JsonVectorStore`] wraps its
//! own in-memory collections.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use codeindex_graph::{CodeGraph, GraphEdge, GraphNode, RelationshipType, Symbol, SymbolType};
use codeindex_normalizer::{Entity, EntityKind, Relationship, RelationshipCategory};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{CoordinatorError, Result};

pub const GRAPH_SNAPSHOT_SCHEMA_VERSION: u32 = 1;

fn entity_kind_to_symbol_type(kind: EntityKind) -> SymbolType {
    match kind {
        EntityKind::Function => SymbolType::Function,
        EntityKind::Method => SymbolType::Method,
        EntityKind::Struct => SymbolType::Struct,
        EntityKind::Class => SymbolType::Class,
        EntityKind::Enum => SymbolType::Enum,
        EntityKind::Interface | EntityKind::Trait => SymbolType::Interface,
        EntityKind::Field | EntityKind::Variable => SymbolType::Variable,
        EntityKind::Constant => SymbolType::Constant,
        EntityKind::Module | EntityKind::Import => SymbolType::Module,
    }
}

fn category_to_relationship_type(category: RelationshipCategory) -> RelationshipType {
    match category {
        RelationshipCategory::Calls => RelationshipType::Calls,
        RelationshipCategory::Imports => RelationshipType::Imports,
        RelationshipCategory::Extends | RelationshipCategory::Implements => RelationshipType::Extends,
        RelationshipCategory::Contains => RelationshipType::Contains,
        RelationshipCategory::References | RelationshipCategory::DataFlow => RelationshipType::Uses,
    }
}

/// Storage contract the coordinator drives for entities and their
/// relationships, one space per project.
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn create_space(&self, name: &str) -> Result<()>;

    async fn space_exists(&self, name: &str) -> Result<bool>;

    async fn upsert_vertices(&self, name: &str, entities: Vec<Entity>) -> Result<()>;

    async fn upsert_edges(&self, name: &str, relationships: Vec<Relationship>) -> Result<()>;

    /// Deletes every vertex whose `file_path` equals `relative_path`, and
    /// every edge that referenced one as an endpoint. Returns the number
    /// of vertices removed.
    async fn delete_by_source_path(&self, name: &str, relative_path: &str) -> Result<usize>;

    async fn vertex_count(&self, name: &str) -> Result<usize>;

    async fn edge_count(&self, name: &str) -> Result<usize>;

    /// Every vertex currently in the space, used as the candidate pool
    /// when resolving a newly-extracted file's unresolved relationships
    /// against symbols declared elsewhere in the project.
    async fn all_entities(&self, name: &str) -> Result<Vec<Entity>>;

    /// Drops an entire space and its on-disk snapshot, for project deletion.
    async fn delete_space(&self, name: &str) -> Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SpaceSnapshot {
    schema_version: u32,
    entities: HashMap<String, Entity>,
    relationships: HashMap<String, Relationship>,
}

impl Default for SpaceSnapshot {
    fn default() -> Self {
        Self {
            schema_version: GRAPH_SNAPSHOT_SCHEMA_VERSION,
            entities: HashMap::new(),
            relationships: HashMap::new(),
        }
    }
}

impl SpaceSnapshot {
    /// Rebuilds the queryable `petgraph` view from the persisted
    /// entity/relationship records. Dangling relationships (endpoint
    /// missing from `entities`) are dropped rather than panicking, since a
    /// crash between vertex and edge writes can leave exactly that state
    /// until the next two-store commit repairs it.
    fn to_code_graph(&self) -> CodeGraph {
        let mut graph = CodeGraph::new();
        let mut indices = HashMap::new();
        for entity in self.entities.values() {
            let symbol = Symbol {
                name: entity.name.clone(),
                qualified_name: entity.qualified_name.clone(),
                file_path: entity.file_path.clone(),
                start_line: entity.start_line,
                end_line: entity.end_line,
                symbol_type: entity_kind_to_symbol_type(entity.kind),
            };
            let node = GraphNode {
                symbol,
                chunk_id: entity.source_chunk_id.clone().unwrap_or_default(),
                chunk: None,
            };
            let idx = graph.add_node(node);
            indices.insert(entity.entity_id.clone(), idx);
        }
        for rel in self.relationships.values() {
            let (Some(&from), Some(&to)) = (indices.get(&rel.from_entity_id), indices.get(&rel.to_entity_id)) else {
                continue;
            };
            graph.add_edge(
                from,
                to,
                GraphEdge {
                    relationship: category_to_relationship_type(rel.category),
                    weight: 1.0,
                },
            );
        }
        graph
    }
}

/// Embedded reference store: one JSON snapshot file per space, written
/// atomically (write to `.tmp`, then rename). `CodeGraph` itself is never
/// persisted directly, since `petgraph::Graph` carries no serde
/// implementation here; the snapshot's entity/relationship records are the
/// source of truth and the graph is rebuilt from them on demand.
pub struct JsonGraphStore {
    root: PathBuf,
    spaces: RwLock<HashMap<String, SpaceSnapshot>>,
}

impl JsonGraphStore {
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        let mut spaces = HashMap::new();
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
            let snapshot: SpaceSnapshot = serde_json::from_slice(&bytes)?;
            spaces.insert(stem.to_string(), migrate(snapshot));
        }
        Ok(Self {
            root,
            spaces: RwLock::new(spaces),
        })
    }

    /// Materializes the current in-memory `petgraph` view of a space, for
    /// context-assembly callers that want graph traversal rather than the
    /// flat entity/relationship records.
    pub async fn code_graph(&self, name: &str) -> Result<CodeGraph> {
        let spaces = self.spaces.read().await;
        let snapshot = spaces
            .get(name)
            .ok_or_else(|| CoordinatorError::Other(format!("graph space not found: {name}")))?;
        Ok(snapshot.to_code_graph())
    }

    fn space_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.json"))
    }

    async fn persist(&self, name: &str, snapshot: &SpaceSnapshot) -> Result<()> {
        write_atomic(&self.space_path(name), snapshot).await
    }
}

fn migrate(snapshot: SpaceSnapshot) -> SpaceSnapshot {
    // No migrations defined past version 1 yet; the hook exists so a
    // future schema change has somewhere to live without touching callers.
    snapshot
}

async fn write_atomic(path: &Path, value: &SpaceSnapshot) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, &bytes).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}

#[async_trait]
impl GraphStore for JsonGraphStore {
    async fn create_space(&self, name: &str) -> Result<()> {
        let mut spaces = self.spaces.write().await;
        if spaces.contains_key(name) {
            return Ok(());
        }
        let snapshot = SpaceSnapshot::default();
        self.persist(name, &snapshot).await?;
        spaces.insert(name.to_string(), snapshot);
        Ok(())
    }

    async fn space_exists(&self, name: &str) -> Result<bool> {
        Ok(self.spaces.read().await.contains_key(name))
    }

    async fn upsert_vertices(&self, name: &str, entities: Vec<Entity>) -> Result<()> {
        let mut spaces = self.spaces.write().await;
        let snapshot = spaces
            .get_mut(name)
            .ok_or_else(|| CoordinatorError::Other(format!("graph space not found: {name}")))?;
        for entity in entities {
            snapshot.entities.insert(entity.entity_id.clone(), entity);
        }
        self.persist(name, snapshot).await
    }

    async fn upsert_edges(&self, name: &str, relationships: Vec<Relationship>) -> Result<()> {
        let mut spaces = self.spaces.write().await;
        let snapshot = spaces
            .get_mut(name)
            .ok_or_else(|| CoordinatorError::Other(format!("graph space not found: {name}")))?;
        for rel in relationships {
            if !snapshot.entities.contains_key(&rel.from_entity_id) || !snapshot.entities.contains_key(&rel.to_entity_id) {
                continue;
            }
            snapshot.relationships.insert(rel.rel_id.clone(), rel);
        }
        self.persist(name, snapshot).await
    }

    async fn delete_by_source_path(&self, name: &str, relative_path: &str) -> Result<usize> {
        let mut spaces = self.spaces.write().await;
        let snapshot = spaces
            .get_mut(name)
            .ok_or_else(|| CoordinatorError::Other(format!("graph space not found: {name}")))?;

        let removed_ids: Vec<String> = snapshot
            .entities
            .iter()
            .filter(|(_, e)| e.file_path == relative_path)
            .map(|(id, _)| id.clone())
            .collect();
        let removed = removed_ids.len();
        for id in &removed_ids {
            snapshot.entities.remove(id);
        }
        snapshot
            .relationships
            .retain(|_, rel| !removed_ids.contains(&rel.from_entity_id) && !removed_ids.contains(&rel.to_entity_id));

        if removed > 0 {
            self.persist(name, snapshot).await?;
        }
        Ok(removed)
    }

    async fn vertex_count(&self, name: &str) -> Result<usize> {
        let spaces = self.spaces.read().await;
        Ok(spaces.get(name).map(|s| s.entities.len()).unwrap_or(0))
    }

    async fn edge_count(&self, name: &str) -> Result<usize> {
        let spaces = self.spaces.read().await;
        Ok(spaces.get(name).map(|s| s.relationships.len()).unwrap_or(0))
    }

    async fn all_entities(&self, name: &str) -> Result<Vec<Entity>> {
        let spaces = self.spaces.read().await;
        Ok(spaces.get(name).map(|s| s.entities.values().cloned().collect()).unwrap_or_default())
    }

    async fn delete_space(&self, name: &str) -> Result<()> {
        let mut spaces = self.spaces.write().await;
        spaces.remove(name);
        let path = self.space_path(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
