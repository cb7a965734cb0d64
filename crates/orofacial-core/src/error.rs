//! Error types for orofacial-core.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrofacialError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Blob store error: {0}")]
    Store(String),

    #[error("Invalid exercise: {}", .0.join("; "))]
    InvalidExercise(Vec<String>),

    #[error("Exercise not found: {0}")]
    ExerciseNotFound(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Invalid import file: {0}")]
    InvalidImport(String),

    #[error("Import file contains no valid exercises")]
    EmptyImport,

    #[error("Recorder channel closed")]
    ChannelClosed,

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, OrofacialError>;
