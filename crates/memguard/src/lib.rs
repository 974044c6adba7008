//! Process memory pressure sampling with hysteresis, mirroring the
//! teacher's "sample -> derive level -> publish to subscribers" shape
//! (`IndexerHealth` broadcast over `tokio::sync::watch` in the coordinator's
//! streaming watcher) but applied to heap-usage ratio instead of I/O
//! health.

mod sampler;

pub use sampler::{MemorySample, MemorySampler, ProcSelfStatusSampler};

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PressureLevel {
    Normal,
    Warning,
    Critical,
    Emergency,
}

#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    pub warning: f64,
    pub critical: f64,
    pub emergency: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            warning: 0.90,
            critical: 0.94,
            emergency: 0.98,
        }
    }
}

impl Thresholds {
    fn level_for(&self, ratio: f64) -> PressureLevel {
        if ratio >= self.emergency {
            PressureLevel::Emergency
        } else if ratio >= self.critical {
            PressureLevel::Critical
        } else if ratio >= self.warning {
            PressureLevel::Warning
        } else {
            PressureLevel::Normal
        }
    }

    fn lower_threshold(&self, level: PressureLevel) -> f64 {
        match level {
            PressureLevel::Emergency => self.critical,
            PressureLevel::Critical => self.warning,
            PressureLevel::Warning => 0.0,
            PressureLevel::Normal => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MemoryGuardConfig {
    pub thresholds: Thresholds,
    pub check_interval: Duration,
    pub cleanup_cooldown: Duration,
}

impl Default for MemoryGuardConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            check_interval: Duration::from_secs(30),
            cleanup_cooldown: Duration::from_secs(5),
        }
    }
}

struct HysteresisState {
    current: PressureLevel,
    below_lower_streak: u32,
    last_transition_at: Option<Instant>,
}

/// Owns the pressure level computation. [`MemoryGuard::observe`] is pure
/// given `(ratio, now)`, so the hysteresis/cooldown rules are tested
/// without a real clock or a real memory sampler; [`MemoryGuard::spawn`]
/// drives it from a background task against wall-clock time and a real
/// sampler.
pub struct MemoryGuard {
    config: MemoryGuardConfig,
    state: std::sync::Mutex<HysteresisState>,
    tx: watch::Sender<PressureLevel>,
}

impl MemoryGuard {
    #[must_use]
    pub fn new(config: MemoryGuardConfig) -> Self {
        let (tx, _rx) = watch::channel(PressureLevel::Normal);
        Self {
            config,
            state: std::sync::Mutex::new(HysteresisState {
                current: PressureLevel::Normal,
                below_lower_streak: 0,
                last_transition_at: None,
            }),
            tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PressureLevel> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> PressureLevel {
        *self.tx.borrow()
    }

    /// Folds one sample into the hysteresis state machine, returning the
    /// (possibly unchanged) published level. A rise to a higher level is
    /// never delayed; only a drop requires two consecutive samples below
    /// the level's lower threshold, and at most one transition is
    /// published per `cleanup_cooldown` window regardless of direction.
    pub fn observe(&self, ratio: f64, now: Instant) -> PressureLevel {
        let raw = self.config.thresholds.level_for(ratio);
        let mut state = self.state.lock().expect("memguard state poisoned");

        let within_cooldown = state
            .last_transition_at
            .is_some_and(|t| now.duration_since(t) < self.config.cleanup_cooldown);

        if raw > state.current {
            state.below_lower_streak = 0;
            if !within_cooldown {
                state.current = raw;
                state.last_transition_at = Some(now);
            }
        } else if raw < state.current {
            if ratio < self.config.thresholds.lower_threshold(state.current) {
                state.below_lower_streak += 1;
            } else {
                state.below_lower_streak = 0;
            }
            if state.below_lower_streak >= 2 && !within_cooldown {
                state.current = raw;
                state.below_lower_streak = 0;
                state.last_transition_at = Some(now);
            }
        } else {
            state.below_lower_streak = 0;
        }

        let published = state.current;
        drop(state);
        let _ = self.tx.send_if_modified(|v| {
            if *v != published {
                *v = published;
                true
            } else {
                false
            }
        });
        published
    }

    /// Runs the sample loop until `cancel` resolves. Intended to be
    /// spawned as a long-lived background task by the coordinator.
    pub async fn spawn(self: Arc<Self>, sampler: Arc<dyn MemorySampler>, mut cancel: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.config.check_interval);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Some(sample) = sampler.sample() {
                        if sample.total_bytes > 0 {
                            let ratio = sample.used_bytes as f64 / sample.total_bytes as f64;
                            self.observe(ratio, Instant::now());
                        }
                    }
                }
                _ = cancel.changed() => {
                    if *cancel.borrow() {
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rises_immediately_to_higher_level() {
        let guard = MemoryGuard::new(MemoryGuardConfig::default());
        let t0 = Instant::now();
        assert_eq!(guard.observe(0.95, t0), PressureLevel::Critical);
    }

    #[test]
    fn drop_requires_two_consecutive_samples_below_lower_threshold() {
        let mut config = MemoryGuardConfig::default();
        config.cleanup_cooldown = Duration::from_secs(0);
        let guard = MemoryGuard::new(config);
        let t0 = Instant::now();

        guard.observe(0.95, t0); // critical
        assert_eq!(guard.current(), PressureLevel::Critical);

        // Single low sample: not enough to drop yet.
        let level = guard.observe(0.80, t0 + Duration::from_millis(1));
        assert_eq!(level, PressureLevel::Critical);

        // Second consecutive low sample: hysteresis requirement satisfied,
        // published level catches up to where the ratio actually is.
        let level = guard.observe(0.80, t0 + Duration::from_millis(2));
        assert_eq!(level, PressureLevel::Normal);
    }

    #[test]
    fn cooldown_suppresses_rapid_transitions() {
        let mut config = MemoryGuardConfig::default();
        config.cleanup_cooldown = Duration::from_secs(10);
        let guard = MemoryGuard::new(config);
        let t0 = Instant::now();

        guard.observe(0.95, t0); // critical, starts cooldown
        let level = guard.observe(0.99, t0 + Duration::from_millis(1)); // would be emergency
        assert_eq!(level, PressureLevel::Critical, "suppressed by cooldown");

        let level = guard.observe(0.99, t0 + Duration::from_secs(11));
        assert_eq!(level, PressureLevel::Emergency);
    }

    #[test]
    fn intermittent_low_sample_resets_the_drop_streak() {
        let mut config = MemoryGuardConfig::default();
        config.cleanup_cooldown = Duration::from_secs(0);
        let guard = MemoryGuard::new(config);
        let t0 = Instant::now();

        guard.observe(0.95, t0);
        guard.observe(0.80, t0 + Duration::from_millis(1));
        guard.observe(0.92, t0 + Duration::from_millis(2)); // still critical, resets streak
        let level = guard.observe(0.80, t0 + Duration::from_millis(3));
        assert_eq!(level, PressureLevel::Critical, "streak was reset by the intervening sample");
    }
}
