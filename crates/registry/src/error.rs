use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("project path does not exist or is not a directory: {0}")]
    InvalidPath(String),

    #[error("unknown project id: {0}")]
    UnknownProject(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RegistryError>;
