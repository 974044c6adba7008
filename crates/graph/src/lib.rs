//! # Code Graph
//!
//! In-memory symbol/relationship graph backing the embedded default
//! `GraphStore` implementation (`codeindex-coordinator`'s `JsonGraphStore`
//! wraps [`CodeGraph`] behind a schema-versioned JSON snapshot per space).
//!
//! ```text
//! Entity[] + Relationship[] (codeindex-normalizer)
//!     │
//!     └──> CodeGraph (petgraph)
//!            ├─ Nodes: Symbols (functions, classes, methods, ...)
//!            └─ Edges: Relationships (calls, uses, extends, ...)
//! ```
//!
//! AST-driven extraction and query-time context assembly live upstream
//! (`codeindex-normalizer`) and are out of scope here; this crate only
//! keeps the graph data structure and its error type. Query/traversal
//! methods (path-finding, hotspot scoring, and the like) are not part of
//! this workspace's surface and are not carried here.

mod error;
mod types;

pub use error::{GraphError, Result};
pub use types::{CodeGraph, GraphEdge, GraphNode, RelationshipType, Symbol, SymbolType};
