use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeEventKind {
    Created,
    Modified,
    Deleted,
    Renamed,
}

/// A typed, debounced, hash-verified filesystem change ready for the
/// incremental planner to apply. A `Modified` event is only ever produced
/// when the current content hash differs from the previously recorded
/// one; a `Renamed` event is only produced when a pending delete and a
/// new path agree on content hash within the rename window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeEventKind,
    pub relative_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_relative_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    pub timestamp_unix_ms: u64,
}
