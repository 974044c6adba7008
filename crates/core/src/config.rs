use std::path::PathBuf;

use codeindex_coordinator::IndexingConfig;

/// Resolves the default data root the same way the teacher's daemon code
/// resolves a home-relative state directory (`$HOME` lookup with no
/// fallback to a platform-specific directories crate).
fn default_data_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".codeindex")
}

#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Root directory for the project registry, per-project lifecycle
    /// records, file-state documents, and the embedded vector/graph
    /// store snapshots. Overridable for tests and multi-tenant setups.
    pub data_dir: PathBuf,
    pub indexing: IndexingConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            indexing: IndexingConfig::default(),
        }
    }
}
