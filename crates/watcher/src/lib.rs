mod debounce;
mod detector;
mod error;
mod rename;
mod types;

pub use debounce::{DebounceState, RawKind};
pub use detector::{start, DetectorConfig};
pub use error::{Result, WatcherError};
pub use notify::RecommendedWatcher;
pub use rename::{ChangeContext, RenameTracker};
pub use types::{ChangeEvent, ChangeEventKind};
