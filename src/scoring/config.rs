use serde::{Deserialize, Serialize};

use crate::session::Difficulty;

/// Final-score scaling per difficulty. Difficulty never changes how a frame
/// or rep is scored, only the last multiplication.
pub const DIFFICULTY_MULTIPLIERS: [(Difficulty, f64); 3] = [
    (Difficulty::Easy, 1.05),
    (Difficulty::Medium, 1.00),
    (Difficulty::Hard, 0.85),
];

/// Tunable scoring policy. The warm-up rule and the stability threshold are
/// heuristics, so they live here rather than as hard-coded constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoringPolicy {
    /// Ignore frames while the counter still reads 0 and nothing was scored yet.
    pub skip_warmup: bool,

    /// Rep count at which the stability discount stops applying.
    pub full_stability_reps: u32,

    pub easy_multiplier: f64,
    pub medium_multiplier: f64,
    pub hard_multiplier: f64,
}

impl ScoringPolicy {
    pub fn multiplier(&self, difficulty: Difficulty) -> f64 {
        match difficulty {
            Difficulty::Easy => self.easy_multiplier,
            Difficulty::Medium => self.medium_multiplier,
            Difficulty::Hard => self.hard_multiplier,
        }
    }
}

fn table_multiplier(difficulty: Difficulty) -> f64 {
    DIFFICULTY_MULTIPLIERS
        .iter()
        .find(|(d, _)| *d == difficulty)
        .map(|(_, m)| *m)
        .unwrap_or(1.0)
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            skip_warmup: true,
            full_stability_reps: 3,
            easy_multiplier: table_multiplier(Difficulty::Easy),
            medium_multiplier: table_multiplier(Difficulty::Medium),
            hard_multiplier: table_multiplier(Difficulty::Hard),
        }
    }
}
