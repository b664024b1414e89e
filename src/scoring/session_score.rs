use serde::Serialize;

use crate::scoring::{aggregator::RepAverage, config::ScoringPolicy};
use crate::session::Difficulty;

/// Every factor that went into a session score, for display and logging.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub session_average: u32,
    pub difficulty_multiplier: f64,
    pub stability_factor: f64,
    pub final_score: u32,
}

/// Rounded mean over closed rep averages plus the open bucket, if any.
pub fn session_average(closed: &[RepAverage], in_progress: Option<u32>) -> Option<u32> {
    let count = closed.len() + usize::from(in_progress.is_some());
    if count == 0 {
        return None;
    }
    let sum: u64 = closed
        .iter()
        .map(|rep| u64::from(rep.average))
        .chain(in_progress.map(u64::from))
        .sum();
    Some((sum as f64 / count as f64).round() as u32)
}

/// Linear confidence ramp: `min(1, total_reps / full_stability_reps)`.
pub fn stability_factor(total_reps: u32, full_stability_reps: u32) -> f64 {
    if full_stability_reps == 0 {
        return 1.0;
    }
    (f64::from(total_reps) / f64::from(full_stability_reps)).min(1.0)
}

/// Scores a session, or `None` when no frame was ever scored.
pub fn compute_score(
    closed: &[RepAverage],
    in_progress: Option<u32>,
    total_reps: u32,
    difficulty: Difficulty,
    policy: &ScoringPolicy,
) -> Option<ScoreBreakdown> {
    let average = session_average(closed, in_progress)?;
    let multiplier = policy.multiplier(difficulty);
    let stability = stability_factor(total_reps, policy.full_stability_reps);

    let scaled = (f64::from(average) * multiplier * stability).round();
    let final_score = if scaled.is_finite() {
        scaled.clamp(0.0, 100.0) as u32
    } else {
        0
    };

    Some(ScoreBreakdown {
        session_average: average,
        difficulty_multiplier: multiplier,
        stability_factor: stability,
        final_score,
    })
}
