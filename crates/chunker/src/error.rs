use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChunkerError {
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("failed to parse source as {language}: {reason}")]
    ParseError { language: String, reason: String },

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl ChunkerError {
    #[must_use]
    pub fn unsupported_language(name: &str) -> Self {
        Self::UnsupportedLanguage(name.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ChunkerError>;
