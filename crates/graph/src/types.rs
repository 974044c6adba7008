use codeindex_chunker::CodeChunk;
use petgraph::graph::{Graph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolType {
    Function,
    Method,
    Struct,
    Class,
    Enum,
    Interface,
    Variable,
    Constant,
    Module,
}

/// The relationship an edge represents. Ranked in `assembler.rs` roughly
/// in this order when scoring relevance: a direct call outweighs a type
/// usage, which outweighs mere containment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipType {
    Calls,
    Uses,
    Contains,
    Extends,
    Imports,
    TestedBy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub qualified_name: Option<String>,
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub symbol_type: SymbolType,
}

#[derive(Debug, Clone)]
pub struct GraphNode {
    pub symbol: Symbol,
    pub chunk_id: String,
    pub chunk: Option<CodeChunk>,
}

#[derive(Debug, Clone, Copy)]
pub struct GraphEdge {
    pub relationship: RelationshipType,
    pub weight: f32,
}

/// In-memory code graph: nodes are symbols, edges are the relationships
/// extracted between them. Backs the embedded default implementation of
/// the persisted graph store capability as well as context assembly.
#[derive(Debug, Clone, Default)]
pub struct CodeGraph {
    pub(crate) graph: Graph<GraphNode, GraphEdge>,
    name_index: HashMap<String, NodeIndex>,
    chunk_index: HashMap<String, Vec<NodeIndex>>,
}

impl CodeGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: GraphNode) -> NodeIndex {
        let name = node.symbol.name.clone();
        let chunk_id = node.chunk_id.clone();
        let idx = self.graph.add_node(node);
        self.name_index.insert(name, idx);
        self.chunk_index.entry(chunk_id).or_default().push(idx);
        idx
    }

    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, edge: GraphEdge) {
        self.graph.add_edge(from, to, edge);
    }

    #[must_use]
    pub fn find_node(&self, symbol_name: &str) -> Option<NodeIndex> {
        self.name_index.get(symbol_name).copied()
    }

    #[must_use]
    pub fn find_nodes_by_chunk(&self, chunk_id: &str) -> Vec<NodeIndex> {
        self.chunk_index.get(chunk_id).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn get_node(&self, idx: NodeIndex) -> Option<&GraphNode> {
        self.graph.node_weight(idx)
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    #[must_use]
    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &GraphNode)> {
        self.graph.node_indices().map(|idx| (idx, &self.graph[idx]))
    }
}
