//! Embedding provider contract and a deterministic reference implementation.
//!
//! Real embedding backends (ONNX, a hosted API) implement
//! [`EmbeddingProvider`] outside this crate; [`HashEmbedder`] exists so the
//! rest of the pipeline — chunking, storage, search — can be exercised in
//! tests and in environments with no model available, while still
//! producing vectors that are deterministic and reasonably sensitive to
//! input content.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbedderError {
    #[error("cannot embed empty input")]
    EmptyInput,
    #[error("embedding backend returned {got} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("embedding backend error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, EmbedderError>;

/// A text-to-vector embedding backend. Implementations must be
/// deterministic for identical input: the same text always produces the
/// same vector, which is what lets the vector store dedupe and diff by
/// content hash rather than re-embedding unchanged chunks.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Stable identifier distinguishing this provider + model + version;
    /// used to namespace on-disk vector stores so switching models never
    /// mixes incompatible vectors together.
    fn model_id(&self) -> &str;

    fn dimensions(&self) -> usize;

    /// Batch size this backend processes most efficiently; callers are
    /// free to submit smaller batches but should avoid exceeding it.
    fn preferred_batch_size(&self) -> usize {
        32
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_documents(&[text.to_string()]).await?;
        vectors.pop().ok_or(EmbedderError::EmptyInput)
    }
}

/// Deterministic hash-based pseudo-embedder. Expands a SHA-256 digest of
/// the input text into `dimensions` floats via a counter-seeded hash
/// chain, then L2-normalizes. Not semantically meaningful, but stable and
/// content-sensitive enough to drive similarity search in tests.
pub struct HashEmbedder {
    model_id: String,
    dimensions: usize,
}

impl HashEmbedder {
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self {
            model_id: format!("hash-embedder-v1-{dimensions}d"),
            dimensions,
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut values = Vec::with_capacity(self.dimensions);
        let mut counter: u32 = 0;
        while values.len() < self.dimensions {
            let mut hasher = Sha256::new();
            hasher.update(text.as_bytes());
            hasher.update(counter.to_le_bytes());
            let digest = hasher.finalize();
            for chunk in digest.chunks_exact(4) {
                if values.len() >= self.dimensions {
                    break;
                }
                let bits = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                // Map to [-1.0, 1.0).
                let v = (bits as f64 / u32::MAX as f64) * 2.0 - 1.0;
                values.push(v as f32);
            }
            counter += 1;
        }

        let norm: f32 = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut values {
                *v /= norm;
            }
        }
        values
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Err(EmbedderError::EmptyInput);
        }
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}
