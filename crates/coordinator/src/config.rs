use std::time::Duration;

use codeindex_chunker::ChunkerConfig;
use codeindex_memguard::MemoryGuardConfig;
use codeindex_walker::WalkerConfig;
use codeindex_watcher::DetectorConfig;

/// Which files a job considers. `Smart` is the default: it behaves like
/// `Incremental` when a prior FileRecord set exists for the project and
/// falls back to `Full` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexingStrategy {
    Full,
    Incremental,
    #[default]
    Smart,
}

/// The coordinator's own knobs. File-processing, memory and watcher knobs
/// are delegated to the config types their owning crates already define,
/// rather than re-declared here under a second name.
#[derive(Debug, Clone)]
pub struct IndexingConfig {
    pub batch_size: usize,
    pub max_concurrency: usize,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    pub timeout: Duration,
    pub strategy: IndexingStrategy,
    pub walker: WalkerConfig,
    pub chunker: ChunkerConfig,
    pub memory: MemoryGuardConfig,
    pub watcher: DetectorConfig,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            max_concurrency: 3,
            retry_attempts: 3,
            retry_delay: Duration::from_millis(1000),
            timeout: Duration::from_millis(30_000),
            strategy: IndexingStrategy::default(),
            walker: WalkerConfig::default(),
            chunker: ChunkerConfig::default(),
            memory: MemoryGuardConfig::default(),
            watcher: DetectorConfig::default(),
        }
    }
}
