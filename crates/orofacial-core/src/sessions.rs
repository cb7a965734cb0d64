//! Session lifecycle and history.
//!
//! `SessionStore` owns the history (most recent first), enforces a single
//! in-progress session, records samples against the session clock and
//! finalizes sessions on stop. Persistence failures are logged and never
//! undo in-memory state.

use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::clock::{SessionClock, TimeSource};
use crate::metrics::FacialMetrics;
use crate::models::{
    DataPoint, Exercise, Session, SessionMetrics, SessionStats, SessionStatus,
};
use crate::store::{self, BlobStore, SESSIONS_KEY};

pub struct SessionStore {
    store: Arc<dyn BlobStore>,
    time: Arc<dyn TimeSource>,
    sessions: Vec<Session>,
    active: Option<Session>,
    clock: SessionClock,
}

impl SessionStore {
    /// Load history from `store`. Corrupt or missing data starts empty.
    pub fn open(store: Arc<dyn BlobStore>, time: Arc<dyn TimeSource>) -> Self {
        let sessions: Vec<Session> = store::load_collection(store.as_ref(), SESSIONS_KEY);
        info!(sessions = sessions.len(), "Session history loaded");
        Self {
            clock: SessionClock::new(time.clone()),
            store,
            time,
            sessions,
            active: None,
        }
    }

    // ─── Active session ──────────────────────────────────────────────────────

    /// Start a session from `exercise`. Returns `None` if one is already active.
    pub fn start_session(&mut self, exercise: &Exercise) -> Option<Session> {
        if let Some(active) = &self.active {
            warn!(active = %active.id, "Cannot start session: one is already in progress");
            return None;
        }
        self.clock.reset();
        self.clock.start();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            exercise_id: exercise.id.clone(),
            exercise_name: exercise.name.clone(),
            exercise_type: exercise.exercise_type,
            duration: exercise.duration,
            start_time: self.clock.start_time().unwrap_or_else(|| self.time.now()),
            end_time: None,
            data_points: vec![],
            metrics: SessionMetrics::default(),
            status: SessionStatus::InProgress,
            actual_duration: None,
        };
        info!(
            session = %session.id,
            exercise = %session.exercise_name,
            target_secs = session.duration,
            "Session started"
        );
        self.active = Some(session.clone());
        Some(session)
    }

    /// Append a sample if a session is active and not paused. Timestamps
    /// never decrease within a session, even if the wall clock steps back.
    pub fn record_sample(&mut self, metrics: &FacialMetrics) -> bool {
        if self.clock.is_paused() {
            return false;
        }
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        let elapsed = self.clock.elapsed_ms();
        let timestamp = match active.data_points.last() {
            Some(prev) if prev.timestamp > elapsed => {
                debug!(prev = prev.timestamp, elapsed, "Clock went backwards, holding timestamp");
                prev.timestamp
            }
            _ => elapsed,
        };
        active.data_points.push(DataPoint {
            timestamp,
            mouth_opening: metrics.mouth_opening,
            lateral_movement: metrics.lateral_movement,
            jaw_position: metrics.jaw_position,
        });
        true
    }

    pub fn pause(&mut self) -> bool {
        if self.active.is_none() {
            warn!("Cannot pause: no active session");
            return false;
        }
        let paused = self.clock.pause();
        if paused {
            debug!(elapsed_ms = self.clock.elapsed_ms(), "Session paused");
        }
        paused
    }

    pub fn resume(&mut self) -> bool {
        if self.active.is_none() {
            warn!("Cannot resume: no active session");
            return false;
        }
        let resumed = self.clock.resume();
        if resumed {
            debug!(elapsed_ms = self.clock.elapsed_ms(), "Session resumed");
        }
        resumed
    }

    /// Finalize the active session and prepend it to history.
    /// Returns `None` if no session is active.
    pub fn stop_session(&mut self) -> Option<Session> {
        let Some(mut session) = self.active.take() else {
            warn!("Cannot stop: no active session");
            return None;
        };
        let elapsed_ms = self.clock.elapsed_ms();
        let target_ms = u64::from(session.duration) * 1000;
        let completion = if target_ms == 0 {
            100
        } else {
            ((elapsed_ms as f64 / target_ms as f64) * 100.0).round().min(100.0) as u32
        };

        session.end_time = Some(self.time.now());
        session.actual_duration = Some((elapsed_ms as f64 / 1000.0).round() as u64);
        session.metrics = aggregate(&session.data_points, completion);
        session.status = SessionStatus::from_completion(completion);

        info!(
            session = %session.id,
            status = %session.status,
            completion,
            samples = session.data_points.len(),
            "Session stopped"
        );

        self.sessions.insert(0, session.clone());
        self.persist();
        self.clock.reset();
        Some(session)
    }

    /// Copy of the in-progress session, if any.
    pub fn active_session(&self) -> Option<Session> {
        self.active.clone()
    }

    pub fn active_session_id(&self) -> Option<&str> {
        self.active.as_ref().map(|s| s.id.as_str())
    }

    /// Samples recorded so far in the active session.
    pub fn sample_count(&self) -> usize {
        self.active.as_ref().map_or(0, |s| s.data_points.len())
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.clock.is_paused()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.clock.elapsed_ms()
    }

    /// Progress of the active session against its target duration.
    pub fn progress(&self) -> f64 {
        match &self.active {
            Some(active) => self.clock.progress(active.duration),
            None => 0.0,
        }
    }

    // ─── History queries ─────────────────────────────────────────────────────

    pub fn all_sessions(&self) -> Vec<Session> {
        self.sessions.clone()
    }

    pub fn recent_sessions(&self, limit: usize) -> Vec<Session> {
        self.sessions.iter().take(limit).cloned().collect()
    }

    pub fn sessions_by_exercise(&self, exercise_id: &str) -> Vec<Session> {
        self.sessions
            .iter()
            .filter(|s| s.exercise_id == exercise_id)
            .cloned()
            .collect()
    }

    pub fn session_by_id(&self, id: &str) -> Option<Session> {
        self.sessions.iter().find(|s| s.id == id).cloned()
    }

    /// Remove a session from history. Returns whether it was found.
    pub fn delete_session(&mut self, id: &str) -> bool {
        let Some(pos) = self.sessions.iter().position(|s| s.id == id) else {
            return false;
        };
        self.sessions.remove(pos);
        info!(session = %id, "Session deleted");
        self.persist();
        true
    }

    /// Remove every stored session.
    pub fn clear_history(&mut self) {
        self.sessions.clear();
        if let Err(e) = self.store.remove(SESSIONS_KEY) {
            error!("Failed to clear persisted sessions: {}", e);
        }
    }

    pub fn stats(&self) -> SessionStats {
        let total = self.sessions.len();
        let completed = self
            .sessions
            .iter()
            .filter(|s| s.status == SessionStatus::Completed)
            .count();
        let total_secs: u64 = self.sessions.iter().filter_map(|s| s.actual_duration).sum();
        SessionStats {
            total_sessions: total,
            completed_sessions: completed,
            avg_completion_rate: if total == 0 {
                0
            } else {
                (completed as f64 / total as f64 * 100.0).round() as u32
            },
            total_time_minutes: (total_secs as f64 / 60.0).round() as u64,
        }
    }

    fn persist(&self) {
        if let Err(e) = store::save_collection(self.store.as_ref(), SESSIONS_KEY, &self.sessions) {
            error!("Failed to persist sessions: {}", e);
        }
    }
}

fn aggregate(points: &[DataPoint], completion_percentage: u32) -> SessionMetrics {
    if points.is_empty() {
        return SessionMetrics {
            completion_percentage,
            ..Default::default()
        };
    }
    let n = points.len() as f64;
    let mouth_sum: f64 = points.iter().map(|p| p.mouth_opening).sum();
    let lateral_sum: f64 = points.iter().map(|p| p.lateral_movement).sum();
    SessionMetrics {
        avg_mouth_opening: (mouth_sum / n).round(),
        max_mouth_opening: points.iter().map(|p| p.mouth_opening).fold(0.0, f64::max),
        avg_lateral_movement: (lateral_sum / n).round(),
        max_lateral_movement: points.iter().map(|p| p.lateral_movement).fold(0.0, f64::max),
        completion_percentage,
    }
}
