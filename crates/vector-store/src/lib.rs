mod error;
mod store;

pub use error::{Result, VectorStoreError};
pub use store::{Distance, JsonVectorStore, PayloadFilter, ScoredPoint, VectorPoint, VectorStore};
