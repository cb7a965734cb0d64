//! Integration tests for orofacial-core.

use std::sync::Arc;

use orofacial_core::landmarks::{index, FACE_MESH_POINTS_WITH_IRIS};
use orofacial_core::{
    ExerciseCatalog, FileStore, ImportMode, Landmark, ManualTimeSource, MetricsEngine, NoBundle,
    Recorder, SessionStatus, SessionStore, TimeSource,
};
use tempfile::TempDir;

fn open_wide_mesh() -> Vec<Landmark> {
    let mut mesh = vec![Landmark::new(0.5, 0.5, 0.0); FACE_MESH_POINTS_WITH_IRIS];
    mesh[index::UPPER_LIP_CENTER] = Landmark::new(0.5, 0.60, 0.0);
    mesh[index::LOWER_LIP_CENTER] = Landmark::new(0.5, 0.68, 0.0);
    mesh[index::NOSE_TIP] = Landmark::new(0.50, 0.55, 0.0);
    mesh[index::CHIN] = Landmark::new(0.53, 0.85, 0.0);
    mesh
}

#[test]
fn test_session_history_survives_restart() {
    let tmp = TempDir::new().unwrap();
    let time = Arc::new(ManualTimeSource::default());

    let session_id = {
        let blobs = Arc::new(FileStore::open(tmp.path()).unwrap());
        let catalog = ExerciseCatalog::open(blobs.clone(), &NoBundle, time.clone());
        let exercise = catalog.get("default-mouth-opening").unwrap();

        let mut sessions = SessionStore::open(blobs, time.clone());
        sessions.start_session(&exercise).unwrap();
        let engine = MetricsEngine::default();
        for _ in 0..30 {
            time.advance_ms(2_000);
            sessions.record_sample(&engine.compute(&open_wide_mesh()));
        }
        let done = sessions.stop_session().unwrap();
        assert_eq!(done.status, SessionStatus::Completed);
        assert_eq!(done.metrics.avg_mouth_opening, 40.0);
        assert_eq!(done.metrics.avg_lateral_movement, 15.0);
        done.id
    };

    let blobs = Arc::new(FileStore::open(tmp.path()).unwrap());
    let sessions = SessionStore::open(blobs.clone(), time.clone());
    let restored = sessions.session_by_id(&session_id).unwrap();
    assert_eq!(restored.data_points.len(), 30);
    assert_eq!(restored.actual_duration, Some(60));
    assert_eq!(sessions.stats().total_time_minutes, 1);

    let catalog = ExerciseCatalog::open(blobs, &NoBundle, time);
    assert_eq!(catalog.list().len(), 3);
}

#[test]
fn test_corrupt_store_files_start_empty() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("orofacial_sessions.json"), "[{\"id\":").unwrap();
    std::fs::write(tmp.path().join("orofacial_exercises.json"), "garbage").unwrap();

    let blobs = Arc::new(FileStore::open(tmp.path()).unwrap());
    let time = Arc::new(ManualTimeSource::default());
    let sessions = SessionStore::open(blobs.clone(), time.clone());
    assert!(sessions.all_sessions().is_empty());

    // An unreadable catalog is treated as empty, so defaults are seeded.
    let catalog = ExerciseCatalog::open(blobs, &NoBundle, time);
    assert_eq!(catalog.list().len(), 3);
}

#[test]
fn test_bundled_file_seeds_catalog() {
    let tmp = TempDir::new().unwrap();
    let bundle = tmp.path().join("exercises.json");
    std::fs::write(
        &bundle,
        r#"{"exercises":[{"id":"b1","name":"Bundled","duration":45,"type":"combined","createdAt":"2024-05-01T10:00:00Z"}]}"#,
    )
    .unwrap();

    let catalog = ExerciseCatalog::open(
        Arc::new(FileStore::open(tmp.path().join("data")).unwrap()),
        &orofacial_core::BundledFile::new(&bundle),
        Arc::new(ManualTimeSource::default()),
    );
    let list = catalog.list();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].name, "Bundled");
}

#[test]
fn test_replace_import_reproduces_exported_catalog() {
    let tmp = TempDir::new().unwrap();
    let time = Arc::new(ManualTimeSource::default());
    let source = ExerciseCatalog::open(
        Arc::new(FileStore::open(tmp.path().join("a")).unwrap()),
        &NoBundle,
        time.clone(),
    );
    let exported = source.export_json().unwrap();

    let mut target = ExerciseCatalog::open(
        Arc::new(FileStore::open(tmp.path().join("b")).unwrap()),
        &NoBundle,
        time.clone(),
    );
    target.reset_to_defaults();
    time.advance_ms(60_000);
    target.reset_to_defaults();
    assert_ne!(target.list(), source.list());

    target.import_json(&exported, ImportMode::Replace).unwrap();
    assert_eq!(target.list(), source.list());
}

#[test]
fn test_recorder_persists_to_file_store() {
    let tmp = TempDir::new().unwrap();
    let time = Arc::new(ManualTimeSource::default());
    let blobs = Arc::new(FileStore::open(tmp.path()).unwrap());
    let catalog = ExerciseCatalog::open(blobs.clone(), &NoBundle, time.clone());
    let exercise = catalog.get("default-lateral-movement").unwrap();

    let recorder =
        Recorder::new(SessionStore::open(blobs.clone(), time.clone()), MetricsEngine::default())
            .unwrap();
    recorder.start(exercise).unwrap().unwrap();
    for _ in 0..10 {
        recorder.submit_frame(open_wide_mesh());
    }
    time.advance_ms(45_000);
    let done = recorder.stop().unwrap().unwrap();
    assert_eq!(done.data_points.len(), 10);
    assert_eq!(done.status, SessionStatus::Partial);
    assert!(done.end_time.unwrap() > time.now() - chrono::Duration::seconds(1));
    drop(recorder);

    let reopened = SessionStore::open(blobs, time);
    assert_eq!(reopened.all_sessions().len(), 1);
}
