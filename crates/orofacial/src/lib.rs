//! Orofacial exercise tracking.
//!
//! Turns face-mesh landmarks into facial metrics, times exercise sessions
//! with pause/resume, keeps a persisted history with statistics, and manages
//! a catalog of exercise templates.
//!
//! ```no_run
//! use std::sync::Arc;
//! use orofacial::{ExerciseCatalog, FileStore, NoBundle, SessionStore};
//! use orofacial::clock::system_time;
//!
//! let store = Arc::new(FileStore::open("orofacial-data")?);
//! let catalog = ExerciseCatalog::open(store.clone(), &NoBundle, system_time());
//! let mut sessions = SessionStore::open(store, system_time());
//! if let Some(exercise) = catalog.get("default-mouth-opening") {
//!     sessions.start_session(&exercise);
//! }
//! # Ok::<(), orofacial::OrofacialError>(())
//! ```

pub use orofacial_core::*;
pub use orofacial_server as server;
