use std::{fmt, str::FromStr};

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        Difficulty::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| anyhow!("unknown difficulty '{value}'"))
    }
}

/// Selectable session budgets as `(label, seconds)`.
pub const TIME_LIMIT_OPTIONS: [(&str, u32); 3] = [("0:30", 30), ("1:00", 60), ("2:00", 120)];

/// A session budget restricted to [`TIME_LIMIT_OPTIONS`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "u32", into = "u32")]
pub struct TimeLimit(u32);

impl TimeLimit {
    pub fn secs(self) -> u32 {
        self.0
    }

    pub fn label(self) -> &'static str {
        TIME_LIMIT_OPTIONS
            .iter()
            .find(|(_, secs)| *secs == self.0)
            .map(|(label, _)| *label)
            .unwrap_or("?")
    }
}

impl TryFrom<u32> for TimeLimit {
    type Error = anyhow::Error;

    fn try_from(secs: u32) -> Result<Self> {
        if TIME_LIMIT_OPTIONS.iter().any(|(_, allowed)| *allowed == secs) {
            Ok(TimeLimit(secs))
        } else {
            Err(anyhow!("time limit {secs}s is not one of the allowed options"))
        }
    }
}

impl From<TimeLimit> for u32 {
    fn from(limit: TimeLimit) -> Self {
        limit.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Exercise {
    pub key: String,
    pub label: String,
}

impl Exercise {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
        }
    }
}

const SEED_EXERCISES: [(&str, &str); 12] = [
    ("squat", "Squat"),
    ("pushup", "Push-Up"),
    ("jumpingjack", "Jumping Jack"),
    ("lunge", "Lunge"),
    ("plank", "Plank"),
    ("armraise", "Arm Raise"),
    ("shoulderpress", "Shoulder Press"),
    ("situp", "Sit-Up"),
    ("crunch", "Crunch"),
    ("warriorpose", "Warrior Pose"),
    ("treepose", "Tree Pose"),
    ("downwarddog", "Downward Dog"),
];

/// Exercises the tracker supports, plus the subset an instructor approved.
/// Only approved exercises can be selected for a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseCatalog {
    exercises: Vec<Exercise>,
    approved_ids: Vec<String>,
}

impl ExerciseCatalog {
    pub fn new(exercises: Vec<Exercise>, approved_ids: Vec<String>) -> Result<Self> {
        let mut catalog = Self {
            exercises,
            approved_ids: Vec::new(),
        };
        catalog.set_approved(approved_ids)?;
        Ok(catalog)
    }

    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    pub fn approved(&self) -> Vec<&Exercise> {
        self.exercises
            .iter()
            .filter(|ex| self.approved_ids.iter().any(|id| *id == ex.key))
            .collect()
    }

    /// Replaces the approved set. Unknown keys are rejected as a whole.
    pub fn set_approved(&mut self, approved_ids: Vec<String>) -> Result<()> {
        if let Some(unknown) = approved_ids.iter().find(|id| self.find(id).is_none()) {
            bail!("cannot approve unknown exercise '{unknown}'");
        }
        self.approved_ids = approved_ids;
        Ok(())
    }

    pub fn find(&self, key: &str) -> Option<&Exercise> {
        self.exercises.iter().find(|ex| ex.key == key)
    }

    pub fn find_approved(&self, key: &str) -> Option<&Exercise> {
        if self.approved_ids.iter().any(|id| id == key) {
            self.find(key)
        } else {
            None
        }
    }

    pub fn label_for(&self, key: &str) -> &str {
        self.find(key).map(|ex| ex.label.as_str()).unwrap_or("Unknown")
    }
}

impl Default for ExerciseCatalog {
    fn default() -> Self {
        let exercises: Vec<Exercise> = SEED_EXERCISES
            .iter()
            .map(|(key, label)| Exercise::new(*key, *label))
            .collect();
        let approved_ids = exercises.iter().map(|ex| ex.key.clone()).collect();
        Self {
            exercises,
            approved_ids,
        }
    }
}

/// Everything a session is pinned to once it starts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub exercise: Exercise,
    pub difficulty: Difficulty,
    pub time_limit: TimeLimit,
}

/// Choices collected on the selection screen. Becomes a [`SessionConfig`]
/// only once all three are set.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSelection {
    pub exercise: Option<Exercise>,
    pub difficulty: Option<Difficulty>,
    pub time_limit: Option<TimeLimit>,
}

impl SessionSelection {
    pub fn select_exercise(&mut self, catalog: &ExerciseCatalog, key: &str) -> Result<()> {
        let exercise = catalog
            .find_approved(key)
            .ok_or_else(|| anyhow!("exercise '{key}' is not approved"))?;
        self.exercise = Some(exercise.clone());
        Ok(())
    }

    pub fn select_difficulty(&mut self, difficulty: Difficulty) {
        self.difficulty = Some(difficulty);
    }

    pub fn select_time_limit(&mut self, secs: u32) -> Result<()> {
        self.time_limit = Some(TimeLimit::try_from(secs)?);
        Ok(())
    }

    pub fn to_config(&self) -> Option<SessionConfig> {
        Some(SessionConfig {
            exercise: self.exercise.clone()?,
            difficulty: self.difficulty?,
            time_limit: self.time_limit?,
        })
    }
}
