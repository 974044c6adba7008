//! Resolves a debounced batch of per-path raw events into typed
//! [`ChangeEvent`]s, applying rename recognition: a `deleted` and a
//! `created`/`modified` that agree on content hash within `rename_window`
//! become a single `renamed` event, suppressing both originals.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::debounce::RawKind;
use crate::types::{ChangeEvent, ChangeEventKind};

/// What the resolver needs to know about the project's existing index
/// state; implemented by the file-state store in the full pipeline, and
/// by an in-memory fake in tests.
pub trait ChangeContext {
    /// Content hash already on record for this path, if the file-state
    /// store has a record for it.
    fn known_hash(&self, relative_path: &str) -> Option<String>;
    /// Current content hash and size, read fresh from disk. `None` if
    /// the path is unreadable (already gone again, permissions, etc).
    fn read_current(&self, relative_path: &str) -> Option<(String, u64)>;
}

struct PendingDelete {
    relative_path: String,
    hash: Option<String>,
    at: Instant,
}

/// Holds in-flight `deleted` events awaiting a possible rename match.
/// Stays a separate long-lived accumulator (not reset every batch)
/// because a rename's `created` half can legitimately arrive in the
/// batch *after* the `deleted` half.
pub struct RenameTracker {
    rename_window: Duration,
    pending_deletes: VecDeque<PendingDelete>,
}

impl RenameTracker {
    #[must_use]
    pub fn new(rename_window: Duration) -> Self {
        Self {
            rename_window,
            pending_deletes: VecDeque::new(),
        }
    }

    fn evict_expired(&mut self, now: Instant) {
        self.pending_deletes
            .retain(|d| now.duration_since(d.at) <= self.rename_window);
    }

    /// Takes and removes the first pending delete whose hash matches, if
    /// any — `None` means no rename match; the created/modified event
    /// that triggered this call should be emitted as-is.
    fn take_match(&mut self, hash: &str) -> Option<String> {
        let idx = self
            .pending_deletes
            .iter()
            .position(|d| d.hash.as_deref() == Some(hash))?;
        self.pending_deletes.remove(idx).map(|d| d.relative_path)
    }

    pub fn resolve_batch(
        &mut self,
        raw: std::collections::HashMap<PathBuf, RawKind>,
        ctx: &dyn ChangeContext,
        now: Instant,
        now_unix_ms: u64,
    ) -> Vec<ChangeEvent> {
        self.evict_expired(now);

        let mut events = Vec::new();
        let mut deletes = Vec::new();

        for (path, kind) in raw {
            let relative_path = path.to_string_lossy().into_owned();
            match kind {
                RawKind::Removed => {
                    let known = ctx.known_hash(&relative_path);
                    deletes.push((relative_path, known));
                }
                RawKind::Created | RawKind::Modified => {
                    let Some((current_hash, size)) = ctx.read_current(&relative_path) else {
                        continue;
                    };

                    if let Some(old_path) = self.take_match(&current_hash) {
                        events.push(ChangeEvent {
                            kind: ChangeEventKind::Renamed,
                            relative_path,
                            previous_hash: Some(current_hash.clone()),
                            current_hash: Some(current_hash),
                            old_relative_path: Some(old_path),
                            size: Some(size),
                            timestamp_unix_ms: now_unix_ms,
                        });
                        continue;
                    }

                    let known = ctx.known_hash(&relative_path);
                    match known {
                        None => events.push(ChangeEvent {
                            kind: ChangeEventKind::Created,
                            relative_path,
                            previous_hash: None,
                            current_hash: Some(current_hash),
                            old_relative_path: None,
                            size: Some(size),
                            timestamp_unix_ms: now_unix_ms,
                        }),
                        Some(prev) if prev != current_hash => events.push(ChangeEvent {
                            kind: ChangeEventKind::Modified,
                            relative_path,
                            previous_hash: Some(prev),
                            current_hash: Some(current_hash),
                            old_relative_path: None,
                            size: Some(size),
                            timestamp_unix_ms: now_unix_ms,
                        }),
                        Some(_) => {}
                    }
                }
            }
        }

        // Deletes are resolved last: a create/modify in this same batch
        // may already have consumed a delete from a *previous* batch, but
        // a delete/create pair arriving in the *same* batch still needs a
        // chance to match before falling back to a bare `deleted` event.
        for (relative_path, hash) in deletes {
            if let Some(hash) = &hash {
                if let Some(old_path) = self.take_match(hash) {
                    // Two deletes matched the same rename target; keep
                    // the earlier one as the rename source and still
                    // report this one as deleted.
                    events.push(ChangeEvent {
                        kind: ChangeEventKind::Deleted,
                        relative_path: old_path,
                        previous_hash: Some(hash.clone()),
                        current_hash: None,
                        old_relative_path: None,
                        size: None,
                        timestamp_unix_ms: now_unix_ms,
                    });
                }
            }
            self.pending_deletes.push_back(PendingDelete {
                relative_path: relative_path.clone(),
                hash,
                at: now,
            });
        }

        events
    }
}
