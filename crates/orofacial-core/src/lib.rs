//! orofacial-core: facial metrics, session timing and practice history.
//!
//! Each detection frame's landmarks go through the `MetricsEngine`; while a
//! session is active and unpaused the `SessionStore` appends a sample stamped
//! with the session clock's active time. Stopping a session finalizes its
//! aggregates and prepends it to the persisted history.

pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod frames;
pub mod landmarks;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod recorder;
pub mod sessions;
pub mod storage;
pub mod store;

pub use catalog::{BundledFile, ExerciseCatalog, ExerciseSource, ImportMode, NoBundle};
pub use clock::{ManualTimeSource, SessionClock, SystemTimeSource, TimeSource};
pub use config::{LogConfig, TrackerConfig};
pub use error::OrofacialError;
pub use landmarks::{Landmark, Point2};
pub use metrics::{compute_metrics, Calibration, FacialMetrics, MetricsEngine};
pub use models::{
    DataPoint, Exercise, ExerciseDraft, ExerciseExport, ExerciseType, Session, SessionMetrics,
    SessionStats, SessionStatus, Validation,
};
pub use recorder::{Recorder, RecorderStatus};
pub use sessions::SessionStore;
pub use store::{BlobStore, FileStore, MemoryStore};
