//! Data models for exercises, sessions and their persisted JSON shape.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::landmarks::Point2;

/// Allowed exercise duration, in seconds.
pub const MIN_EXERCISE_DURATION: u32 = 10;
pub const MAX_EXERCISE_DURATION: u32 = 600;

/// Kind of movement an exercise trains.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ExerciseType {
    MouthOpening,
    LateralMovement,
    Combined,
}

impl ExerciseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseType::MouthOpening => "mouth-opening",
            ExerciseType::LateralMovement => "lateral-movement",
            ExerciseType::Combined => "combined",
        }
    }
}

impl std::fmt::Display for ExerciseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExerciseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "mouth-opening" => Ok(ExerciseType::MouthOpening),
            "lateral-movement" => Ok(ExerciseType::LateralMovement),
            "combined" => Ok(ExerciseType::Combined),
            other => Err(format!("unknown exercise type '{other}'")),
        }
    }
}

/// An exercise template that sessions are started from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Target duration in seconds.
    pub duration: u32,
    #[serde(rename = "type")]
    pub exercise_type: ExerciseType,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Caller-supplied fields for creating or updating an exercise.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub duration: u32,
    /// A blank type string is treated as missing.
    #[serde(rename = "type", default, deserialize_with = "blank_as_none")]
    pub exercise_type: Option<ExerciseType>,
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<ExerciseType>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

impl ExerciseDraft {
    pub fn new(name: impl Into<String>, duration: u32, exercise_type: ExerciseType) -> Self {
        Self {
            name: name.into(),
            description: None,
            duration,
            exercise_type: Some(exercise_type),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl From<&Exercise> for ExerciseDraft {
    fn from(e: &Exercise) -> Self {
        Self {
            name: e.name.clone(),
            description: e.description.clone(),
            duration: e.duration,
            exercise_type: Some(e.exercise_type),
        }
    }
}

/// Outcome of exercise validation. All violated rules are collected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Validation {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

/// Status of a session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SessionStatus {
    InProgress,
    Completed,
    Partial,
    Incomplete,
}

impl SessionStatus {
    /// Classify a finished session by its completion percentage.
    pub fn from_completion(completion_percentage: u32) -> Self {
        if completion_percentage >= 90 {
            SessionStatus::Completed
        } else if completion_percentage >= 50 {
            SessionStatus::Partial
        } else {
            SessionStatus::Incomplete
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::InProgress => write!(f, "in-progress"),
            SessionStatus::Completed => write!(f, "completed"),
            SessionStatus::Partial => write!(f, "partial"),
            SessionStatus::Incomplete => write!(f, "incomplete"),
        }
    }
}

/// One recorded sample within a session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DataPoint {
    /// Active milliseconds since the session started.
    pub timestamp: u64,
    pub mouth_opening: f64,
    pub lateral_movement: f64,
    pub jaw_position: Point2,
}

/// Aggregates computed when a session stops.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetrics {
    pub avg_mouth_opening: f64,
    pub max_mouth_opening: f64,
    pub avg_lateral_movement: f64,
    pub max_lateral_movement: f64,
    pub completion_percentage: u32,
}

/// One timed practice attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub exercise_id: String,
    pub exercise_name: String,
    pub exercise_type: ExerciseType,
    /// Target duration in seconds, copied from the exercise at start.
    pub duration: u32,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub data_points: Vec<DataPoint>,
    #[serde(default)]
    pub metrics: SessionMetrics,
    pub status: SessionStatus,
    /// Active seconds, set when the session stops.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_duration: Option<u64>,
}

/// Aggregate statistics over the session history.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub total_sessions: usize,
    pub completed_sessions: usize,
    pub avg_completion_rate: u32,
    pub total_time_minutes: u64,
}

/// Document produced by a catalog export.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseExport {
    pub exercises: Vec<Exercise>,
    pub version: String,
    pub last_modified: DateTime<Utc>,
}
