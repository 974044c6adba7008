//! Per-project progress broadcast, generalizing the teacher's
//! `broadcast::Sender<IndexUpdate>` into a single typed channel shared by
//! every observer rather than per-event-kind emitters.

use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Failed { error: String },
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct ProjectProgress {
    pub project_id: String,
    pub done: usize,
    pub total: usize,
    pub current_path: Option<String>,
    pub outcome: Option<JobOutcome>,
}

impl ProjectProgress {
    #[must_use]
    pub fn step(project_id: impl Into<String>, done: usize, total: usize, current_path: Option<String>) -> Self {
        Self {
            project_id: project_id.into(),
            done,
            total,
            current_path,
            outcome: None,
        }
    }

    #[must_use]
    pub fn finished(project_id: impl Into<String>, done: usize, total: usize, outcome: JobOutcome) -> Self {
        Self {
            project_id: project_id.into(),
            done,
            total,
            current_path: None,
            outcome: Some(outcome),
        }
    }
}

/// Capacity chosen so a slow observer can fall behind by a full project's
/// worth of per-file updates before `broadcast` starts dropping the
/// oldest; observers that care about every update should drain promptly.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 1024;

#[must_use]
pub fn progress_channel() -> (broadcast::Sender<ProjectProgress>, broadcast::Receiver<ProjectProgress>) {
    broadcast::channel(PROGRESS_CHANNEL_CAPACITY)
}
