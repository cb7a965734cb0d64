//! Exercise catalog: CRUD over exercise templates, validation, defaults,
//! import and export.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::clock::TimeSource;
use crate::error::{OrofacialError, Result};
use crate::models::{
    Exercise, ExerciseDraft, ExerciseExport, ExerciseType, Validation, MAX_EXERCISE_DURATION,
    MIN_EXERCISE_DURATION,
};
use crate::store::{self, BlobStore, EXERCISES_KEY};

/// Version tag written into export documents.
pub const EXPORT_VERSION: &str = "1.0";

/// How an import combines with the existing catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Discard the current catalog and use the imported exercises.
    Replace,
    /// Append imported exercises whose ids are not already present.
    Merge,
}

/// Where bundled exercise definitions come from.
pub trait ExerciseSource: Send + Sync {
    fn load(&self) -> Result<Vec<Exercise>>;
}

/// No bundled definitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBundle;

impl ExerciseSource for NoBundle {
    fn load(&self) -> Result<Vec<Exercise>> {
        Ok(vec![])
    }
}

/// Bundled definitions read from a `{"exercises": [...]}` JSON file.
#[derive(Debug, Clone)]
pub struct BundledFile {
    path: PathBuf,
}

impl BundledFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[derive(Deserialize)]
struct ExercisesDocument<T> {
    exercises: Vec<T>,
}

impl ExerciseSource for BundledFile {
    fn load(&self) -> Result<Vec<Exercise>> {
        let content = fs::read_to_string(&self.path)?;
        let doc: ExercisesDocument<Exercise> = serde_json::from_str(&content)?;
        Ok(doc.exercises)
    }
}

/// Build a draft from loosely typed JSON. A field of the wrong type counts
/// as missing, so validation reports it instead of the parse failing.
pub fn draft_from_value(value: &Value) -> ExerciseDraft {
    ExerciseDraft {
        name: value
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        description: value
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string),
        duration: value
            .get("duration")
            .and_then(Value::as_i64)
            .map(|d| d.clamp(0, i64::from(u32::MAX)) as u32)
            .unwrap_or(0),
        exercise_type: value
            .get("type")
            .and_then(Value::as_str)
            .and_then(|t| t.parse().ok()),
    }
}

fn timestamp_field(value: &Value, field: &str) -> Option<DateTime<Utc>> {
    value
        .get(field)
        .and_then(|v| serde_json::from_value(v.clone()).ok())
}

/// Convert one import entry. Entries that would not pass validation are
/// dropped.
fn import_entry(value: &Value, now: DateTime<Utc>) -> Option<Exercise> {
    let draft = draft_from_value(value);
    if !validate(&draft).is_valid {
        return None;
    }
    Some(Exercise {
        id: value
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map_or_else(|| Uuid::new_v4().to_string(), str::to_string),
        name: draft.name,
        description: draft.description,
        duration: draft.duration,
        exercise_type: draft.exercise_type?,
        created_at: timestamp_field(value, "createdAt").unwrap_or(now),
        updated_at: timestamp_field(value, "updatedAt"),
    })
}

/// Check a draft against every rule, collecting all violations.
pub fn validate(draft: &ExerciseDraft) -> Validation {
    let mut errors = vec![];
    if draft.name.trim().is_empty() {
        errors.push("Exercise name is required".to_string());
    }
    if draft.duration < MIN_EXERCISE_DURATION {
        errors.push(format!(
            "Duration must be at least {MIN_EXERCISE_DURATION} seconds"
        ));
    } else if draft.duration > MAX_EXERCISE_DURATION {
        errors.push(format!(
            "Duration must be at most {MAX_EXERCISE_DURATION} seconds"
        ));
    }
    if draft.exercise_type.is_none() {
        errors.push("Exercise type is required".to_string());
    }
    Validation {
        is_valid: errors.is_empty(),
        errors,
    }
}

/// The three canonical exercises seeded when nothing else is available.
pub fn default_exercises(now: DateTime<Utc>) -> Vec<Exercise> {
    [
        (
            "default-mouth-opening",
            "Mouth Opening",
            "Open the mouth slowly as wide as is comfortable, then close.",
            60,
            ExerciseType::MouthOpening,
        ),
        (
            "default-lateral-movement",
            "Lateral Jaw Movement",
            "Slide the jaw gently from side to side.",
            90,
            ExerciseType::LateralMovement,
        ),
        (
            "default-combined",
            "Combined Exercise",
            "Alternate mouth opening with lateral jaw movement.",
            120,
            ExerciseType::Combined,
        ),
    ]
    .into_iter()
    .map(|(id, name, description, duration, exercise_type)| Exercise {
        id: id.to_string(),
        name: name.to_string(),
        description: Some(description.to_string()),
        duration,
        exercise_type,
        created_at: now,
        updated_at: None,
    })
    .collect()
}

pub struct ExerciseCatalog {
    store: Arc<dyn BlobStore>,
    time: Arc<dyn TimeSource>,
    exercises: Vec<Exercise>,
}

impl ExerciseCatalog {
    /// Load the catalog: persisted store first, then bundled definitions,
    /// then the canonical defaults.
    pub fn open(
        store: Arc<dyn BlobStore>,
        bundled: &dyn ExerciseSource,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        let mut catalog = Self {
            exercises: store::load_collection(store.as_ref(), EXERCISES_KEY),
            store,
            time,
        };
        if !catalog.exercises.is_empty() {
            info!(exercises = catalog.exercises.len(), "Exercise catalog loaded");
            return catalog;
        }

        let bundled = match bundled.load() {
            Ok(exercises) => {
                let total = exercises.len();
                let valid: Vec<Exercise> = exercises
                    .into_iter()
                    .filter(|e| validate(&ExerciseDraft::from(e)).is_valid)
                    .collect();
                if valid.len() < total {
                    warn!(dropped = total - valid.len(), "Skipped invalid bundled exercises");
                }
                valid
            }
            Err(e) => {
                warn!("Failed to load bundled exercises: {}", e);
                vec![]
            }
        };
        if bundled.is_empty() {
            info!("No usable bundled exercises, seeding defaults");
            catalog.exercises = default_exercises(catalog.time.now());
        } else {
            info!(exercises = bundled.len(), "Loaded bundled exercises");
            catalog.exercises = bundled;
        }
        catalog.persist();
        catalog
    }

    pub fn list(&self) -> Vec<Exercise> {
        self.exercises.clone()
    }

    pub fn get(&self, id: &str) -> Option<Exercise> {
        self.exercises.iter().find(|e| e.id == id).cloned()
    }

    pub fn validate(&self, draft: &ExerciseDraft) -> Validation {
        validate(draft)
    }

    pub fn create(&mut self, draft: ExerciseDraft) -> Result<Exercise> {
        let exercise_type = checked_type(&draft)?;
        let exercise = Exercise {
            id: Uuid::new_v4().to_string(),
            name: draft.name.trim().to_string(),
            description: draft.description,
            duration: draft.duration,
            exercise_type,
            created_at: self.time.now(),
            updated_at: None,
        };
        info!(exercise = %exercise.id, name = %exercise.name, "Exercise created");
        self.exercises.push(exercise.clone());
        self.persist();
        Ok(exercise)
    }

    /// Replace an exercise's editable fields, keeping its id and creation time.
    pub fn update(&mut self, id: &str, draft: ExerciseDraft) -> Result<Exercise> {
        let exercise_type = checked_type(&draft)?;
        let now = self.time.now();
        let exercise = self
            .exercises
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| OrofacialError::ExerciseNotFound(id.to_string()))?;
        exercise.name = draft.name.trim().to_string();
        exercise.description = draft.description;
        exercise.duration = draft.duration;
        exercise.exercise_type = exercise_type;
        exercise.updated_at = Some(now);
        let updated = exercise.clone();
        info!(exercise = %id, "Exercise updated");
        self.persist();
        Ok(updated)
    }

    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.exercises.len();
        self.exercises.retain(|e| e.id != id);
        if self.exercises.len() == before {
            return false;
        }
        info!(exercise = %id, "Exercise deleted");
        self.persist();
        true
    }

    pub fn reset_to_defaults(&mut self) {
        self.exercises = default_exercises(self.time.now());
        self.persist();
    }

    pub fn export(&self) -> ExerciseExport {
        ExerciseExport {
            exercises: self.exercises.clone(),
            version: EXPORT_VERSION.to_string(),
            last_modified: self.time.now(),
        }
    }

    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.export())?)
    }

    /// Import a `{"exercises": [...]}` document. Entries that are missing a
    /// field, mistyped, or fail validation are dropped on their own. Returns
    /// the number of exercises added.
    pub fn import_json(&mut self, content: &str, mode: ImportMode) -> Result<usize> {
        let doc: ExercisesDocument<Value> = serde_json::from_str(content)
            .map_err(|e| OrofacialError::InvalidImport(e.to_string()))?;
        let now = self.time.now();
        let total = doc.exercises.len();
        let imported: Vec<Exercise> = doc
            .exercises
            .iter()
            .filter_map(|entry| import_entry(entry, now))
            .collect();
        if imported.is_empty() {
            return Err(OrofacialError::EmptyImport);
        }
        if imported.len() < total {
            warn!(
                dropped = total - imported.len(),
                "Skipped invalid import entries"
            );
        }

        let added = match mode {
            ImportMode::Replace => {
                let count = imported.len();
                self.exercises = imported;
                count
            }
            ImportMode::Merge => {
                let mut seen: HashSet<String> =
                    self.exercises.iter().map(|e| e.id.clone()).collect();
                let mut count = 0;
                for exercise in imported {
                    if seen.insert(exercise.id.clone()) {
                        self.exercises.push(exercise);
                        count += 1;
                    }
                }
                count
            }
        };
        info!(added, ?mode, "Exercises imported");
        self.persist();
        Ok(added)
    }

    fn persist(&self) {
        if let Err(e) =
            store::save_collection(self.store.as_ref(), EXERCISES_KEY, &self.exercises)
        {
            error!("Failed to persist exercises: {}", e);
        }
    }
}

fn checked_type(draft: &ExerciseDraft) -> Result<ExerciseType> {
    let validation = validate(draft);
    match draft.exercise_type {
        Some(t) if validation.is_valid => Ok(t),
        _ => Err(OrofacialError::InvalidExercise(validation.errors)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualTimeSource;
    use crate::store::MemoryStore;

    fn open_empty() -> (Arc<MemoryStore>, ExerciseCatalog) {
        let blobs = Arc::new(MemoryStore::new());
        let catalog = ExerciseCatalog::open(
            blobs.clone(),
            &NoBundle,
            Arc::new(ManualTimeSource::default()),
        );
        (blobs, catalog)
    }

    struct FailingBundle;

    impl ExerciseSource for FailingBundle {
        fn load(&self) -> Result<Vec<Exercise>> {
            Err(OrofacialError::Other("offline".into()))
        }
    }

    struct FixedBundle(Vec<Exercise>);

    impl ExerciseSource for FixedBundle {
        fn load(&self) -> Result<Vec<Exercise>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_validate_collects_every_error() {
        let draft = ExerciseDraft {
            name: "".into(),
            description: None,
            duration: 5,
            exercise_type: None,
        };
        let v = validate(&draft);
        assert!(!v.is_valid);
        assert_eq!(v.errors.len(), 3);
        assert!(v.errors[0].contains("name"));
        assert!(v.errors[1].contains("at least"));
        assert!(v.errors[2].contains("type"));
    }

    #[test]
    fn test_validate_bounds() {
        let ok = ExerciseDraft::new("  Jaw  ", 10, ExerciseType::Combined);
        assert!(validate(&ok).is_valid);
        let long = ExerciseDraft::new("Jaw", 601, ExerciseType::Combined);
        assert_eq!(validate(&long).errors, vec!["Duration must be at most 600 seconds"]);
        let blank = ExerciseDraft::new("   ", 600, ExerciseType::Combined);
        assert!(!validate(&blank).is_valid);
    }

    #[test]
    fn test_seeds_three_defaults_when_nothing_available() {
        let (blobs, catalog) = open_empty();
        let list = catalog.list();
        assert_eq!(list.len(), 3);
        let shape: Vec<_> = list.iter().map(|e| (e.exercise_type, e.duration)).collect();
        assert_eq!(
            shape,
            vec![
                (ExerciseType::MouthOpening, 60),
                (ExerciseType::LateralMovement, 90),
                (ExerciseType::Combined, 120),
            ]
        );
        assert!(blobs.get(EXERCISES_KEY).unwrap().is_some());
    }

    #[test]
    fn test_failed_bundle_falls_back_to_defaults() {
        let catalog = ExerciseCatalog::open(
            Arc::new(MemoryStore::new()),
            &FailingBundle,
            Arc::new(ManualTimeSource::default()),
        );
        assert_eq!(catalog.list().len(), 3);
    }

    #[test]
    fn test_bundle_used_when_store_empty() {
        let bundle = FixedBundle(vec![default_exercises(Utc::now()).remove(1)]);
        let catalog = ExerciseCatalog::open(
            Arc::new(MemoryStore::new()),
            &bundle,
            Arc::new(ManualTimeSource::default()),
        );
        assert_eq!(catalog.list().len(), 1);
        assert_eq!(catalog.list()[0].id, "default-lateral-movement");
    }

    #[test]
    fn test_persisted_catalog_wins_over_bundle() {
        let (blobs, mut catalog) = open_empty();
        catalog
            .create(ExerciseDraft::new("Tongue push", 45, ExerciseType::Combined))
            .unwrap();
        let reopened = ExerciseCatalog::open(
            blobs,
            &FixedBundle(vec![]),
            Arc::new(ManualTimeSource::default()),
        );
        assert_eq!(reopened.list().len(), 4);
    }

    #[test]
    fn test_create_update_delete() {
        let time = Arc::new(ManualTimeSource::default());
        let mut catalog = ExerciseCatalog::open(Arc::new(MemoryStore::new()), &NoBundle, time.clone());

        let created = catalog
            .create(ExerciseDraft::new(" Wide open ", 30, ExerciseType::MouthOpening))
            .unwrap();
        assert_eq!(created.name, "Wide open");
        assert!(created.updated_at.is_none());

        time.advance_ms(5_000);
        let updated = catalog
            .update(
                &created.id,
                ExerciseDraft::new("Wider", 40, ExerciseType::Combined).with_description("x"),
            )
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.updated_at, Some(time.now()));
        assert_eq!(catalog.get(&created.id).unwrap().duration, 40);

        assert!(matches!(
            catalog.update("missing", ExerciseDraft::new("a", 20, ExerciseType::Combined)),
            Err(OrofacialError::ExerciseNotFound(_))
        ));
        assert!(catalog.delete(&created.id));
        assert!(!catalog.delete(&created.id));
    }

    #[test]
    fn test_invalid_create_is_rejected() {
        let (_b, mut catalog) = open_empty();
        let err = catalog.create(ExerciseDraft::default()).unwrap_err();
        match err {
            OrofacialError::InvalidExercise(errors) => assert_eq!(errors.len(), 3),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(catalog.list().len(), 3);
    }

    #[test]
    fn test_export_then_replace_import_roundtrips() {
        let (_b, mut catalog) = open_empty();
        catalog
            .create(ExerciseDraft::new("Custom", 200, ExerciseType::LateralMovement).with_description("d"))
            .unwrap();
        let before = catalog.list();
        let exported = catalog.export_json().unwrap();

        let (_b2, mut other) = open_empty();
        other.delete("default-combined");
        assert_eq!(other.import_json(&exported, ImportMode::Replace).unwrap(), 4);
        assert_eq!(other.list(), before);

        let doc: serde_json::Value = serde_json::from_str(&exported).unwrap();
        assert_eq!(doc["version"], "1.0");
        assert!(doc.get("lastModified").is_some());
    }

    #[test]
    fn test_merge_import_dedups_by_id() {
        let (_b, mut catalog) = open_empty();
        let content = serde_json::json!({
            "exercises": [
                {"id": "default-combined", "name": "Dup", "duration": 30, "type": "combined"},
                {"id": "new-one", "name": "Fresh", "duration": 30, "type": "mouth-opening"},
                {"name": "No id", "duration": 20, "type": "lateral-movement"},
                {"id": "broken", "duration": 30, "type": "combined"},
                {"id": "bad-type", "name": "Chew", "duration": 30, "type": "chewing"}
            ]
        })
        .to_string();
        assert_eq!(catalog.import_json(&content, ImportMode::Merge).unwrap(), 2);
        assert_eq!(catalog.list().len(), 5);
        assert_eq!(catalog.get("default-combined").unwrap().name, "Combined Exercise");
        assert!(catalog.get("new-one").is_some());
        assert!(catalog.get("broken").is_none());
    }

    #[test]
    fn test_import_errors_are_surfaced() {
        let (_b, mut catalog) = open_empty();
        assert!(matches!(
            catalog.import_json("not json", ImportMode::Merge),
            Err(OrofacialError::InvalidImport(_))
        ));
        let none_valid = r#"{"exercises":[{"name":"x"}]}"#;
        assert!(matches!(
            catalog.import_json(none_valid, ImportMode::Replace),
            Err(OrofacialError::EmptyImport)
        ));
        assert_eq!(catalog.list().len(), 3);
    }

    #[test]
    fn test_import_drops_entries_outside_duration_bounds() {
        let (_b, mut catalog) = open_empty();
        let content = serde_json::json!({
            "exercises": [
                {"id": "z", "name": "Zero", "duration": 0, "type": "combined"},
                {"id": "h", "name": "Huge", "duration": 5000, "type": "combined"},
                {"id": "ok", "name": "Fine", "duration": 600, "type": "combined"}
            ]
        })
        .to_string();
        assert_eq!(catalog.import_json(&content, ImportMode::Replace).unwrap(), 1);
        let shape: Vec<_> = catalog.list().iter().map(|e| (e.id.clone(), e.duration)).collect();
        assert_eq!(shape, vec![("ok".to_string(), 600)]);

        let all_bad = r#"{"exercises":[{"name":"Zero","duration":0,"type":"combined"}]}"#;
        assert!(matches!(
            catalog.import_json(all_bad, ImportMode::Replace),
            Err(OrofacialError::EmptyImport)
        ));
        assert_eq!(catalog.list().len(), 1);
    }

    #[test]
    fn test_mistyped_entry_does_not_sink_its_siblings() {
        let (_b, mut catalog) = open_empty();
        let content = serde_json::json!({
            "exercises": [
                {"id": "ok", "name": "Fine", "duration": 60, "type": "mouth-opening"},
                {"id": "str-duration", "name": "Text", "duration": "60", "type": "combined"},
                {"id": "num-name", "name": 123, "duration": 60, "type": "combined"},
                "not an object"
            ]
        })
        .to_string();
        assert_eq!(catalog.import_json(&content, ImportMode::Merge).unwrap(), 1);
        assert!(catalog.get("ok").is_some());
        assert!(catalog.get("str-duration").is_none());
        assert!(catalog.get("num-name").is_none());
    }

    #[test]
    fn test_invalid_bundled_exercises_are_skipped() {
        let mut too_short = default_exercises(Utc::now()).remove(0);
        too_short.duration = 0;
        let keep = default_exercises(Utc::now()).remove(2);
        let catalog = ExerciseCatalog::open(
            Arc::new(MemoryStore::new()),
            &FixedBundle(vec![too_short.clone(), keep.clone()]),
            Arc::new(ManualTimeSource::default()),
        );
        assert_eq!(catalog.list(), vec![keep]);

        let only_invalid = ExerciseCatalog::open(
            Arc::new(MemoryStore::new()),
            &FixedBundle(vec![too_short]),
            Arc::new(ManualTimeSource::default()),
        );
        let durations: Vec<_> = only_invalid.list().iter().map(|e| e.duration).collect();
        assert_eq!(durations, vec![60, 90, 120]);
    }

    #[test]
    fn test_draft_from_loosely_typed_json() {
        let draft = draft_from_value(&serde_json::json!({
            "name": "Chew",
            "duration": -5,
            "type": "chewing"
        }));
        assert_eq!(draft.duration, 0);
        assert_eq!(draft.exercise_type, None);
        let v = validate(&draft);
        assert_eq!(
            v.errors,
            vec!["Duration must be at least 10 seconds", "Exercise type is required"]
        );

        let draft = draft_from_value(&serde_json::json!({"name": 7, "duration": "60"}));
        assert_eq!(validate(&draft).errors.len(), 3);
    }
}
