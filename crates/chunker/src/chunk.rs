use serde::{Deserialize, Serialize};

/// Kind of syntactic unit a chunk was split along, when the splitter could
/// tell. Line- and bracket-based fallbacks leave this `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChunkType {
    Function,
    Method,
    Struct,
    Class,
    Enum,
    Trait,
    Interface,
    Impl,
    Module,
    Variable,
    Block,
}

impl ChunkType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Struct => "struct",
            Self::Class => "class",
            Self::Enum => "enum",
            Self::Trait => "trait",
            Self::Interface => "interface",
            Self::Impl => "impl",
            Self::Module => "module",
            Self::Variable => "variable",
            Self::Block => "block",
        }
    }
}

/// Metadata attached to a chunk by the post-processing pipeline. Fields
/// here describe context *about* the chunk; they never appear injected
/// into `CodeChunk::content` itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub language: Option<String>,
    pub chunk_type: Option<ChunkType>,
    pub symbol_name: Option<String>,
    pub qualified_name: Option<String>,
    pub parent_scope: Option<String>,
    pub documentation: Option<String>,
    pub context_imports: Vec<String>,
    pub tags: Vec<String>,
    pub bundle_tags: Vec<String>,
    pub related_paths: Vec<String>,
}

impl ChunkMetadata {
    #[must_use]
    pub fn language(mut self, value: impl Into<String>) -> Self {
        self.language = Some(value.into());
        self
    }

    #[must_use]
    pub fn chunk_type(mut self, value: ChunkType) -> Self {
        self.chunk_type = Some(value);
        self
    }

    #[must_use]
    pub fn symbol_name(mut self, value: impl Into<String>) -> Self {
        self.symbol_name = Some(value.into());
        self
    }

    #[must_use]
    pub fn qualified_name(mut self, value: impl Into<String>) -> Self {
        self.qualified_name = Some(value.into());
        self
    }

    #[must_use]
    pub fn parent_scope(mut self, value: impl Into<String>) -> Self {
        self.parent_scope = Some(value.into());
        self
    }

    #[must_use]
    pub fn documentation(mut self, value: impl Into<String>) -> Self {
        self.documentation = Some(value.into());
        self
    }

    #[must_use]
    pub fn context_imports(mut self, value: Vec<String>) -> Self {
        self.context_imports = value;
        self
    }

    #[must_use]
    pub fn tags(mut self, value: Vec<String>) -> Self {
        self.tags = value;
        self
    }
}

/// A contiguous span of source lines, plus whatever metadata the
/// post-processor was able to infer about it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeChunk {
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
    pub metadata: ChunkMetadata,
}

impl CodeChunk {
    pub fn new(
        file_path: impl Into<String>,
        start_line: usize,
        end_line: usize,
        content: impl Into<String>,
        metadata: ChunkMetadata,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            start_line,
            end_line,
            content: content.into(),
            metadata,
        }
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }
}
