mod error;
mod store;
mod types;
mod watermark;

pub use error::{FileStateError, Result};
pub use store::{FileStateStore, ProjectFileState, CURRENT_SCHEMA_VERSION};
pub use types::{FileRecord, FileStatus};
pub use watermark::{assess_staleness, StaleAssessment, StaleReason, Watermark};
