use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::scoring::ScoringPolicy;
use crate::session::ExerciseCatalog;

/// Everything configurable about the engine that outlives a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineSettings {
    pub catalog: ExerciseCatalog,
    pub scoring: ScoringPolicy,
}

/// JSON-file backed settings. Updates are written through immediately.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<EngineSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(
                    "settings at {} are invalid ({err}); using defaults",
                    path.display()
                );
                EngineSettings::default()
            })
        } else {
            EngineSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn settings(&self) -> EngineSettings {
        self.read().clone()
    }

    pub fn catalog(&self) -> ExerciseCatalog {
        self.read().catalog.clone()
    }

    pub fn scoring_policy(&self) -> ScoringPolicy {
        self.read().scoring.clone()
    }

    /// Replaces the approved exercise set; unknown keys leave settings untouched.
    pub fn update_approved_exercises(&self, approved_ids: Vec<String>) -> Result<()> {
        let mut guard = self.write();
        let mut catalog = guard.catalog.clone();
        catalog.set_approved(approved_ids)?;
        guard.catalog = catalog;
        self.persist(&guard)
    }

    pub fn update_scoring_policy(&self, policy: ScoringPolicy) -> Result<()> {
        let mut guard = self.write();
        guard.scoring = policy;
        self.persist(&guard)
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: EngineSettings = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid settings in {}", self.path.display()))?;
        *self.write() = data;
        Ok(())
    }

    fn persist(&self, data: &EngineSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, EngineSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, EngineSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("posescore-{name}-{}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn missing_file_yields_defaults() {
        let store = SettingsStore::new(temp_path("missing")).unwrap();
        assert_eq!(store.settings(), EngineSettings::default());
        assert_eq!(store.scoring_policy().full_stability_reps, 3);
    }

    #[test]
    fn updates_persist_and_reload() {
        let path = temp_path("persist");
        let store = SettingsStore::new(path.clone()).unwrap();
        store
            .update_approved_exercises(vec!["squat".into(), "plank".into()])
            .unwrap();
        let mut policy = store.scoring_policy();
        policy.full_stability_reps = 5;
        store.update_scoring_policy(policy).unwrap();

        let reopened = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(reopened.catalog().approved().len(), 2);
        assert_eq!(reopened.scoring_policy().full_stability_reps, 5);
        reopened.reload().unwrap();

        let _ = fs::remove_file(path);
    }

    #[test]
    fn unknown_exercise_is_not_persisted() {
        let path = temp_path("reject");
        let store = SettingsStore::new(path.clone()).unwrap();
        assert!(store.update_approved_exercises(vec!["moonwalk".into()]).is_err());
        assert_eq!(store.catalog(), ExerciseCatalog::default());
        assert!(!path.exists());
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let path = temp_path("corrupt");
        fs::write(&path, "{ not json").unwrap();
        let store = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(store.settings(), EngineSettings::default());
        let _ = fs::remove_file(path);
    }
}
