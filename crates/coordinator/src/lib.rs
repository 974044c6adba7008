//! # Indexing Coordinator
//!
//! Per-project index job orchestration: walks an incremental plan, commits
//! each file's chunks to a vector store and a graph store, and keeps the
//! file-state store's FileRecord set in sync.
//!
//! ```text
//! project root
//!     │
//!     ├──> Incremental Planner (walk + diff vs FileRecord set)
//!     │      └─> added / modified / deleted / renamed
//!     │
//!     └──> Coordinator (bounded worker pool)
//!            ├─> chunk -> normalize -> embed
//!            ├─> two-store commit (vector store, graph store)
//!            └─> FileRecord update
//! ```

mod config;
mod coordinator;
mod error;
mod planner;
mod progress;
mod stores;

pub use config::{IndexingConfig, IndexingStrategy};
pub use coordinator::{Coordinator, JobResult};
pub use error::{CoordinatorError, ErrorKind, Result};
pub use planner::{IncrementalPlanner, IndexPlan, PlannedFile};
pub use progress::{progress_channel, JobOutcome, ProjectProgress, PROGRESS_CHANNEL_CAPACITY};
pub use stores::{GraphStore, JsonGraphStore, GRAPH_SNAPSHOT_SCHEMA_VERSION};
