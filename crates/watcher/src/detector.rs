//! Drives [`DebounceState`] and [`RenameTracker`] from a real
//! `notify::RecommendedWatcher`, grounded directly in the teacher's
//! `create_fs_watcher`/`spawn_index_loop` pair: a blocking `notify`
//! callback forwards into an async `mpsc` channel, and a single
//! background task owns the debounce/rename state machine and emits
//! resolved [`ChangeEvent`]s on its own channel.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use codeindex_ignore::IgnoreResolver;
use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::debounce::{DebounceState, RawKind};
use crate::error::{Result, WatcherError};
use crate::rename::{ChangeContext, RenameTracker};
use crate::types::ChangeEvent;

#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub debounce: Duration,
    pub max_batch_wait: Duration,
    pub rename_window: Duration,
    pub notify_poll_interval: Duration,
    pub overflow_queue_size: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            max_batch_wait: Duration::from_secs(5),
            rename_window: Duration::from_secs(1),
            notify_poll_interval: Duration::from_millis(200),
            overflow_queue_size: 1024,
        }
    }
}

fn raw_kind_for(kind: &EventKind) -> Option<RawKind> {
    match kind {
        EventKind::Create(_) => Some(RawKind::Created),
        EventKind::Modify(_) => Some(RawKind::Modified),
        EventKind::Remove(_) => Some(RawKind::Removed),
        _ => None,
    }
}

fn current_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Starts a watcher over `root`, returning a receiver of resolved
/// [`ChangeEvent`]s. The returned `RecommendedWatcher` must be kept alive
/// for as long as events are wanted; dropping it stops delivery, the same
/// lifetime contract the teacher's `StreamingIndexer` holds via an
/// `Arc<Mutex<Option<RecommendedWatcher>>>`.
pub fn start(
    root: &Path,
    ignore: Arc<IgnoreResolver>,
    ctx: Arc<dyn ChangeContext + Send + Sync>,
    config: DetectorConfig,
) -> Result<(RecommendedWatcher, mpsc::Receiver<ChangeEvent>)> {
    let (raw_tx, raw_rx) = mpsc::channel::<notify::Result<Event>>(config.overflow_queue_size);
    let (event_tx, event_rx) = mpsc::channel::<ChangeEvent>(config.overflow_queue_size);

    let watcher = create_fs_watcher(root, raw_tx, config.notify_poll_interval)?;
    spawn_resolve_loop(root.to_path_buf(), ignore, ctx, config, raw_rx, event_tx);

    Ok((watcher, event_rx))
}

fn create_fs_watcher(
    root: &Path,
    sender: mpsc::Sender<notify::Result<Event>>,
    poll_interval: Duration,
) -> Result<RecommendedWatcher> {
    let mut watcher = RecommendedWatcher::new(
        move |res| {
            let _ = sender.blocking_send(res);
        },
        NotifyConfig::default().with_poll_interval(poll_interval),
    )
    .map_err(|e| WatcherError::Init(e.to_string()))?;

    watcher
        .watch(root, RecursiveMode::Recursive)
        .map_err(|e| WatcherError::Watch {
            path: root.display().to_string(),
            source: e,
        })?;

    Ok(watcher)
}

fn spawn_resolve_loop(
    root: PathBuf,
    ignore: Arc<IgnoreResolver>,
    ctx: Arc<dyn ChangeContext + Send + Sync>,
    config: DetectorConfig,
    mut raw_rx: mpsc::Receiver<notify::Result<Event>>,
    event_tx: mpsc::Sender<ChangeEvent>,
) {
    tokio::spawn(async move {
        let mut debounce = DebounceState::new(config.debounce, config.max_batch_wait);
        let mut rename_tracker = RenameTracker::new(config.rename_window);

        loop {
            let deadline = debounce.next_deadline();

            tokio::select! {
                maybe_event = raw_rx.recv() => {
                    match maybe_event {
                        Some(Ok(event)) => {
                            let now = std::time::Instant::now();
                            for path in &event.paths {
                                let Ok(relative) = path.strip_prefix(&root) else { continue };
                                let is_dir = path.is_dir();
                                if ignore.is_ignored(relative, is_dir) {
                                    continue;
                                }
                                if let Some(raw_kind) = raw_kind_for(&event.kind) {
                                    debounce.record_event(relative.to_path_buf(), raw_kind, now);
                                }
                            }
                        }
                        Some(Err(e)) => {
                            log::warn!("filesystem watcher error: {e}");
                        }
                        None => break,
                    }
                }
                () = sleep_until_or_forever(deadline) => {
                    let batch = debounce.drain();
                    if batch.is_empty() {
                        continue;
                    }
                    let now = std::time::Instant::now();
                    let events = rename_tracker.resolve_batch(batch, ctx.as_ref(), now, current_unix_ms());
                    for event in events {
                        if event_tx.send(event).await.is_err() {
                            return;
                        }
                    }
                }
            }
        }
    });
}

async fn sleep_until_or_forever(deadline: Option<std::time::Instant>) {
    match deadline {
        Some(instant) => tokio::time::sleep_until(tokio::time::Instant::from_std(instant)).await,
        None => std::future::pending::<()>().await,
    }
}
