//! Newline-delimited JSON frame streams, and deterministic replay.
//!
//! Each line is one message:
//!
//! ```text
//! {"type":"frame","t":0,"landmarks":[{"x":0.5,"y":0.5,"z":0.0}, ...]}
//! {"type":"pause","t":1200}
//! {"type":"resume","t":3400}
//! {"type":"stop","t":9000}
//! ```
//!
//! `t` is optional milliseconds relative to the start of the stream. Live
//! streams ignore it; replay uses it to position a manual clock.

use std::io::BufRead;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::{ManualTimeSource, TimeSource};
use crate::error::{OrofacialError, Result};
use crate::landmarks::Landmark;
use crate::metrics::MetricsEngine;
use crate::models::{Exercise, Session};
use crate::sessions::SessionStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FrameMessage {
    Frame {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        t: Option<i64>,
        landmarks: Vec<Landmark>,
    },
    Pause {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        t: Option<i64>,
    },
    Resume {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        t: Option<i64>,
    },
    Stop {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        t: Option<i64>,
    },
}

impl FrameMessage {
    pub fn offset_ms(&self) -> Option<i64> {
        match self {
            FrameMessage::Frame { t, .. }
            | FrameMessage::Pause { t }
            | FrameMessage::Resume { t }
            | FrameMessage::Stop { t } => *t,
        }
    }
}

/// Parse one line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<FrameMessage>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(line)?))
}

/// Read every message from `reader`. Malformed lines are logged with their
/// line number and skipped; I/O errors abort.
pub fn read_messages<R: BufRead>(reader: R) -> Result<Vec<FrameMessage>> {
    let mut messages = vec![];
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        match parse_line(&line) {
            Ok(Some(msg)) => messages.push(msg),
            Ok(None) => {}
            Err(e) => warn!(line = n + 1, "Skipping malformed frame message: {}", e),
        }
    }
    Ok(messages)
}

/// Result of replaying a recorded stream.
#[derive(Debug, Clone)]
pub struct ReplayOutcome {
    pub session: Session,
    pub frames: usize,
    pub samples: usize,
}

/// Drive `sessions` through a recorded stream for `exercise`.
///
/// The manual clock is positioned at `origin + t` before each message, so a
/// given recording always produces the same timestamps and status. A stream
/// that ends without `stop` is stopped at its last offset.
pub fn replay(
    messages: &[FrameMessage],
    exercise: &Exercise,
    sessions: &mut SessionStore,
    time: &Arc<ManualTimeSource>,
    engine: &MetricsEngine,
) -> Result<ReplayOutcome> {
    let origin: DateTime<Utc> = time.now();
    let position = |t: Option<i64>| {
        if let Some(t) = t {
            time.set(origin + Duration::milliseconds(t));
        }
    };

    position(Some(0));
    sessions
        .start_session(exercise)
        .ok_or_else(|| OrofacialError::Other("a session is already in progress".into()))?;

    let mut frames = 0;
    let mut samples = 0;
    for msg in messages {
        position(msg.offset_ms());
        match msg {
            FrameMessage::Frame { landmarks, .. } => {
                frames += 1;
                let metrics = engine.compute(landmarks);
                if sessions.record_sample(&metrics) {
                    samples += 1;
                }
            }
            FrameMessage::Pause { .. } => {
                sessions.pause();
            }
            FrameMessage::Resume { .. } => {
                sessions.resume();
            }
            FrameMessage::Stop { .. } => break,
        }
    }
    debug!(frames, samples, "Replay finished");

    let session = sessions
        .stop_session()
        .ok_or_else(|| OrofacialError::Other("replayed session vanished".into()))?;
    Ok(ReplayOutcome {
        session,
        frames,
        samples,
    })
}
