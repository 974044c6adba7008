use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Function,
    Method,
    Struct,
    Class,
    Enum,
    Interface,
    Trait,
    Field,
    Variable,
    Constant,
    Module,
    Import,
}

impl EntityKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Struct => "struct",
            Self::Class => "class",
            Self::Enum => "enum",
            Self::Interface => "interface",
            Self::Trait => "trait",
            Self::Field => "field",
            Self::Variable => "variable",
            Self::Constant => "constant",
            Self::Module => "module",
            Self::Import => "import",
        }
    }
}

/// A semantic symbol derived from a chunk. `entity_id` is derived from
/// `(kind, qualified_name, file_path, start_line)`, so it is stable across
/// re-indexing as long as that tuple doesn't change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub entity_id: String,
    pub kind: EntityKind,
    pub name: String,
    pub qualified_name: Option<String>,
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub source_chunk_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationshipCategory {
    Calls,
    Imports,
    Extends,
    Implements,
    Contains,
    References,
    DataFlow,
}

impl RelationshipCategory {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Calls => "calls",
            Self::Imports => "imports",
            Self::Extends => "extends",
            Self::Implements => "implements",
            Self::Contains => "contains",
            Self::References => "references",
            Self::DataFlow => "data-flow",
        }
    }
}

/// A candidate relationship whose target is still a bare name (e.g. a
/// called function's identifier, or an imported path) rather than a
/// resolved entity id. [`crate::resolve`] turns these into real
/// [`Relationship`]s once the full entity set for a project is known.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnresolvedRelationship {
    pub from_entity_id: String,
    pub to_name: String,
    pub category: RelationshipCategory,
    pub rel_type: String,
    pub metadata: serde_json::Value,
}

/// A typed, directed edge between two entities that both exist in the
/// current entity set. Dangling edges are never constructed by
/// [`crate::resolve`]; callers that need to persist them to a graph store
/// configured to reject dangling edges can therefore write these directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub rel_id: String,
    pub from_entity_id: String,
    pub to_entity_id: String,
    pub category: RelationshipCategory,
    pub rel_type: String,
    pub metadata: serde_json::Value,
}
