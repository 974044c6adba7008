//! Debounce accumulation, ported from the teacher's `DebounceState`
//! (single aggregate deadline across a batch of raw events, escape-hatch
//! for a forced immediate run) and generalized with a per-path raw-kind
//! map so a burst of events against the same path coalesces into one
//! final raw kind before the batch is resolved into typed
//! [`crate::ChangeEvent`]s.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawKind {
    Created,
    Modified,
    Removed,
}

pub struct DebounceState {
    debounce: Duration,
    max_batch: Duration,
    dirty: bool,
    last_event: Option<Instant>,
    first_event: Option<Instant>,
    force_immediate: bool,
    pending: HashMap<PathBuf, RawKind>,
}

impl DebounceState {
    #[must_use]
    pub fn new(debounce: Duration, max_batch: Duration) -> Self {
        Self {
            debounce,
            max_batch,
            dirty: false,
            last_event: None,
            first_event: None,
            force_immediate: false,
            pending: HashMap::new(),
        }
    }

    pub fn record_event(&mut self, path: PathBuf, kind: RawKind, now: Instant) {
        self.pending.insert(path, kind);
        self.last_event = Some(now);
        self.first_event.get_or_insert(now);
        self.dirty = true;
    }

    pub fn force_run(&mut self, now: Instant) {
        self.force_immediate = true;
        self.first_event.get_or_insert(now);
        self.dirty = true;
    }

    #[must_use]
    pub fn should_run(&self) -> bool {
        self.dirty
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Earliest instant at which the current batch should flush, or
    /// `None` if nothing is pending. A forced run is immediate; otherwise
    /// it's the sooner of "quiet period elapsed" and "max batch wait
    /// elapsed since the first unflushed event".
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        if !self.dirty {
            return None;
        }
        if self.force_immediate {
            return self.last_event.or(self.first_event);
        }

        let debounce_deadline = self.last_event.map(|last| last + self.debounce);
        let forced_deadline = self.first_event.map(|first| first + self.max_batch);

        match (debounce_deadline, forced_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        }
    }

    /// Drains and returns the accumulated per-path raw kinds, resetting
    /// the batch state.
    pub fn drain(&mut self) -> HashMap<PathBuf, RawKind> {
        self.dirty = false;
        self.last_event = None;
        self.first_event = None;
        self.force_immediate = false;
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_an_event_sets_a_deadline() {
        let mut state = DebounceState::new(Duration::from_millis(100), Duration::from_secs(1));
        state.record_event(PathBuf::from("a.rs"), RawKind::Modified, Instant::now());
        assert!(state.should_run());
        assert!(state.next_deadline().is_some());
    }

    #[test]
    fn force_run_requests_an_immediate_deadline() {
        let mut state = DebounceState::new(Duration::from_secs(5), Duration::from_secs(10));
        let now = Instant::now();
        state.force_run(now);
        assert!(state.should_run());
        assert_eq!(state.next_deadline(), Some(now));
    }

    #[test]
    fn repeated_events_on_same_path_coalesce() {
        let mut state = DebounceState::new(Duration::from_millis(100), Duration::from_secs(1));
        let now = Instant::now();
        state.record_event(PathBuf::from("a.rs"), RawKind::Created, now);
        state.record_event(PathBuf::from("a.rs"), RawKind::Modified, now);
        assert_eq!(state.pending_count(), 1);
        let drained = state.drain();
        assert_eq!(drained.get(&PathBuf::from("a.rs")), Some(&RawKind::Modified));
    }

    #[test]
    fn drain_resets_dirty_flag() {
        let mut state = DebounceState::new(Duration::from_millis(100), Duration::from_secs(1));
        state.record_event(PathBuf::from("a.rs"), RawKind::Created, Instant::now());
        state.drain();
        assert!(!state.should_run());
        assert_eq!(state.next_deadline(), None);
    }
}
