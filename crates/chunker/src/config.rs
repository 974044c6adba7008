use crate::language::Language;

/// How the chunker splits a file into candidate spans before
/// post-processing joins, filters and annotates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChunkingStrategy {
    /// AST-aware splitting where the language supports it, falling back to
    /// bracket-balanced splitting, then line-count splitting.
    #[default]
    Auto,
    /// Force AST-aware splitting; fails closed to line-count if the
    /// language has no grammar.
    Ast,
    /// Split along balanced `{}`/`()`/`[]` nesting.
    BracketBalance,
    /// Fixed-size windows measured in estimated tokens.
    LineCount,
}

/// How adjacent chunks gain surrounding context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapStrategy {
    /// No injected context beyond the chunk's own content.
    #[default]
    None,
    /// Carry the last N lines of the previous chunk as leading context.
    Fixed(usize),
    /// Infer relevant imports and parent scope from the surrounding file
    /// and attach them as metadata (never mutating raw content).
    Contextual,
}

#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    pub strategy: ChunkingStrategy,
    pub overlap: OverlapStrategy,
    pub target_chunk_tokens: usize,
    pub max_chunk_tokens: usize,
    pub min_chunk_tokens: usize,
    pub include_imports: bool,
    pub include_parent_context: bool,
    pub include_documentation: bool,
    pub max_imports_per_chunk: usize,
    pub supported_languages: Vec<Language>,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            strategy: ChunkingStrategy::Auto,
            overlap: OverlapStrategy::Fixed(200),
            target_chunk_tokens: 400,
            max_chunk_tokens: 1200,
            min_chunk_tokens: 20,
            include_imports: true,
            include_parent_context: true,
            include_documentation: true,
            max_imports_per_chunk: 8,
            supported_languages: Vec::new(),
        }
    }
}

impl ChunkerConfig {
    /// True if this language should be chunked at all; an empty
    /// `supported_languages` list means "no restriction".
    #[must_use]
    pub fn accepts(&self, language: Language) -> bool {
        self.supported_languages.is_empty() || self.supported_languages.contains(&language)
    }
}
