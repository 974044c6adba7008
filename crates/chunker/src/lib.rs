//! AST-aware code chunking.
//!
//! ```text
//! Source file -> language detection -> splitter (AST | bracket | line) ->
//!   post-processing (filter, rebalance, trim, context injection) -> CodeChunk[]
//! ```
//!
//! The splitter picks spans; post-processing never rewrites a chunk's raw
//! `content`, only annotates `ChunkMetadata` around it (symbol name, scope,
//! documentation, relevant imports).

mod ast_split;
mod chunk;
mod chunker;
mod config;
mod contextual_imports;
mod error;
mod language;
mod line_split;

pub use chunk::{ChunkMetadata, ChunkType, CodeChunk};
pub use chunker::Chunker;
pub use config::{ChunkerConfig, ChunkingStrategy, OverlapStrategy};
pub use error::{ChunkerError, Result};
pub use language::{Language, LanguageSizeLimits};
