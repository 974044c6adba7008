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
pub enum CoreError {
    #[error("project {0} already has an indexing job in progress")]
    AlreadyInProgress(String),

    #[error("unknown project id: {0}")]
    UnknownProject(String),

    #[error("registry error: {0}")]
    Registry(#[from] codeindex_registry::RegistryError),

    #[error("file state error: {0}")]
    FileState(#[from] codeindex_file_state::FileStateError),

    #[error("indexing job error: {0}")]
    Coordinator(#[from] codeindex_coordinator::CoordinatorError),

    #[error("vector store error: {0}")]
    VectorStore(#[from] codeindex_vector_store::VectorStoreError),

    #[error("filesystem watcher error: {0}")]
    Watcher(#[from] codeindex_watcher::WatcherError),

    #[error("ignore pattern error: {0}")]
    Ignore(#[from] codeindex_ignore::IgnoreError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl CoreError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyInProgress(_) => ErrorKind::Conflict,
            Self::UnknownProject(_) => ErrorKind::NotFound,
            Self::Registry(_) | Self::Io(_) | Self::Serde(_) => ErrorKind::Transient,
            Self::FileState(_) | Self::VectorStore(_) => ErrorKind::Transient,
            Self::Watcher(_) | Self::Ignore(_) => ErrorKind::Transient,
            Self::Coordinator(e) => e.kind().into(),
        }
    }
}

impl From<codeindex_coordinator::ErrorKind> for ErrorKind {
    fn from(kind: codeindex_coordinator::ErrorKind) -> Self {
        match kind {
            codeindex_coordinator::ErrorKind::Transient => ErrorKind::Transient,
            codeindex_coordinator::ErrorKind::Validation => ErrorKind::Validation,
            codeindex_coordinator::ErrorKind::NotFound => ErrorKind::NotFound,
            codeindex_coordinator::ErrorKind::Permission => ErrorKind::Permission,
            codeindex_coordinator::ErrorKind::Pressure => ErrorKind::Pressure,
            codeindex_coordinator::ErrorKind::Conflict => ErrorKind::Conflict,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
