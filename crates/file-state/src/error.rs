use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileStateError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("file-state store is corrupt: {0}")]
    Corrupt(String),

    #[error("unsupported schema_version {found}, newest known is {newest}")]
    UnsupportedSchemaVersion { found: u32, newest: u32 },
}

pub type Result<T> = std::result::Result<T, FileStateError>;
