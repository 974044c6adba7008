use thiserror::Error;

#[derive(Debug, Error)]
pub enum NormalizerError {
    #[error("unsupported language for normalization")]
    UnsupportedLanguage,

    #[error("failed to parse chunk content: {0}")]
    ParseError(String),
}

pub type Result<T> = std::result::Result<T, NormalizerError>;
