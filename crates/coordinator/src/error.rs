use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Validation,
    NotFound,
    Permission,
    Pressure,
    Conflict,
}

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("project {0} already has an index job in progress")]
    AlreadyInProgress(String),

    #[error("path does not exist or is not a directory: {0}")]
    InvalidPath(String),

    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("vector store error: {0}")]
    VectorStore(#[from] codeindex_vector_store::VectorStoreError),

    #[error("graph error: {0}")]
    Graph(#[from] codeindex_graph::GraphError),

    #[error("file-state store error: {0}")]
    FileState(#[from] codeindex_file_state::FileStateError),

    #[error("embedder error: {0}")]
    Embedder(#[from] codeindex_embedder::EmbedderError),

    #[error("walker error: {0}")]
    Walker(#[from] codeindex_walker::WalkerError),

    #[error("chunker error: {0}")]
    Chunker(#[from] codeindex_chunker::ChunkerError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl CoordinatorError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyInProgress(_) => ErrorKind::Conflict,
            Self::InvalidPath(_) | Self::DimensionMismatch { .. } => ErrorKind::Validation,
            Self::VectorStore(_) | Self::Graph(_) | Self::FileState(_) => ErrorKind::Transient,
            Self::Embedder(_) => ErrorKind::Transient,
            Self::Walker(_) | Self::Chunker(_) => ErrorKind::NotFound,
            Self::Io(e) if e.kind() == std::io::ErrorKind::PermissionDenied => ErrorKind::Permission,
            Self::Io(_) => ErrorKind::Transient,
            Self::Other(_) => ErrorKind::Transient,
        }
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

pub type Result<T> = std::result::Result<T, CoordinatorError>;
