use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("failed to initialize filesystem watcher: {0}")]
    Init(String),

    #[error("failed to watch path {path}: {source}")]
    Watch { path: String, source: notify::Error },
}

pub type Result<T> = std::result::Result<T, WatcherError>;
