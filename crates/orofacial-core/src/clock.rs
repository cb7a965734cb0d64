//! Session timing with pause/resume.
//!
//! `SessionClock` is pull-based: elapsed time is computed from wall-clock
//! marks whenever it is asked for, so callers may poll it at any cadence.
//! Paused intervals are discounted exactly.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

/// Source of wall-clock time.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Used for deterministic replay of
/// recorded frame streams, and in tests.
#[derive(Debug)]
pub struct ManualTimeSource {
    millis: AtomicI64,
}

impl ManualTimeSource {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(start.timestamp_millis()),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        self.millis.store(at.timestamp_millis(), Ordering::SeqCst);
    }

    pub fn advance_ms(&self, ms: i64) {
        self.millis.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Default for ManualTimeSource {
    fn default() -> Self {
        Self::new(DateTime::<Utc>::default())
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
    }
}

pub fn system_time() -> Arc<dyn TimeSource> {
    Arc::new(SystemTimeSource)
}

/// Elapsed active time for one session.
pub struct SessionClock {
    time: Arc<dyn TimeSource>,
    start_time: Option<DateTime<Utc>>,
    paused_accumulated: Duration,
    pause_started_at: Option<DateTime<Utc>>,
}

impl SessionClock {
    pub fn new(time: Arc<dyn TimeSource>) -> Self {
        Self {
            time,
            start_time: None,
            paused_accumulated: Duration::zero(),
            pause_started_at: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.start_time.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.pause_started_at.is_some()
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    /// Start timing. Returns `false` if the clock is already running.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            warn!("SessionClock already running");
            return false;
        }
        self.start_time = Some(self.time.now());
        self.paused_accumulated = Duration::zero();
        self.pause_started_at = None;
        true
    }

    /// Returns `false` unless the clock is running and not already paused.
    pub fn pause(&mut self) -> bool {
        if !self.is_running() || self.is_paused() {
            warn!(
                running = self.is_running(),
                paused = self.is_paused(),
                "Cannot pause SessionClock"
            );
            return false;
        }
        self.pause_started_at = Some(self.time.now());
        true
    }

    /// Returns `false` unless the clock is paused.
    pub fn resume(&mut self) -> bool {
        let Some(paused_at) = self.pause_started_at.take() else {
            warn!("Cannot resume SessionClock: not paused");
            return false;
        };
        let pause = self.time.now() - paused_at;
        if pause > Duration::zero() {
            self.paused_accumulated += pause;
        }
        true
    }

    /// Active milliseconds since start. Frozen while paused, never negative.
    pub fn elapsed_ms(&self) -> u64 {
        let Some(start) = self.start_time else {
            return 0;
        };
        let now = self.time.now();
        let mut active = now - start - self.paused_accumulated;
        if let Some(paused_at) = self.pause_started_at {
            let current_pause = now - paused_at;
            if current_pause > Duration::zero() {
                active -= current_pause;
            }
        }
        active.num_milliseconds().max(0) as u64
    }

    /// Percentage of `target_secs` elapsed, capped at 100.
    pub fn progress(&self, target_secs: u32) -> f64 {
        if target_secs == 0 {
            return if self.is_running() { 100.0 } else { 0.0 };
        }
        let pct = self.elapsed_ms() as f64 / (f64::from(target_secs) * 1000.0) * 100.0;
        pct.min(100.0)
    }

    pub fn reset(&mut self) {
        self.start_time = None;
        self.paused_accumulated = Duration::zero();
        self.pause_started_at = None;
    }
}
