use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::config::{SessionConfig, SessionSelection};
use crate::scoring::{FeedbackTier, RepAverage, ScoreBreakdown};

pub const DEFAULT_POSTURE_MESSAGE: &str = "Adjust your position to be detected";
pub const DEFAULT_DIRECTION: &str = "Unknown";

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    Selecting,
    Active,
    Finished,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FinishReason {
    /// The tracker reported the exercise as complete.
    TrackerFinished,
    /// The time budget ran out.
    TimeLimitReached,
    /// The athlete ended the session early.
    Manual,
}

/// Outcome of one session. Created once, at finalization.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionResult {
    pub session_id: Uuid,
    pub identity: String,
    pub config: SessionConfig,
    pub total_reps: u32,
    pub final_score: Option<u32>,
    pub breakdown: Option<ScoreBreakdown>,
    pub rep_averages: Vec<RepAverage>,
    pub elapsed_secs: u32,
    pub reason: FinishReason,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SessionResult {
    pub fn feedback(&self) -> Option<FeedbackTier> {
        FeedbackTier::for_score(self.final_score)
    }

    pub fn summary(&self) -> SessionSummary {
        let feedback = self.feedback();
        SessionSummary {
            exercise: self.config.exercise.label.clone(),
            difficulty: self.config.difficulty.to_string(),
            time_limit: format_clock(self.config.time_limit.secs()),
            total_reps: self.total_reps,
            score: self
                .final_score
                .map(|score| format!("{score}/100"))
                .unwrap_or_else(|| "N/A".to_string()),
            feedback: feedback.map(|tier| tier.message().to_string()),
        }
    }
}

/// Human-readable end-of-session card.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub exercise: String,
    pub difficulty: String,
    pub time_limit: String,
    pub total_reps: u32,
    pub score: String,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", tag = "phase")]
pub enum SessionState {
    Selecting,
    Active {
        /// Set the first time the tracker confirms a ready posture.
        started: bool,
        reps: u32,
        elapsed_secs: u32,
    },
    Finished(SessionResult),
}

impl SessionState {
    pub fn phase(&self) -> SessionPhase {
        match self {
            SessionState::Selecting => SessionPhase::Selecting,
            SessionState::Active { .. } => SessionPhase::Active,
            SessionState::Finished(_) => SessionPhase::Finished,
        }
    }
}

/// Latest posture guidance from the tracker, for the waiting overlay.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostureInfo {
    pub ready: bool,
    pub message: Option<String>,
    pub direction: Option<String>,
}

impl PostureInfo {
    pub fn message_or_default(&self) -> &str {
        self.message.as_deref().unwrap_or(DEFAULT_POSTURE_MESSAGE)
    }

    pub fn direction_or_default(&self) -> &str {
        self.direction.as_deref().unwrap_or(DEFAULT_DIRECTION)
    }
}

/// Point-in-time view of the current session for live display.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub phase: SessionPhase,
    pub selection: SessionSelection,
    pub config: Option<SessionConfig>,
    pub started: bool,
    pub reps: u32,
    pub elapsed_secs: u32,
    pub remaining_secs: u32,
    pub live_score: Option<u32>,
    pub posture: PostureInfo,
    pub result: Option<SessionResult>,
}

/// Formats seconds as `m:ss`.
pub fn format_clock(secs: u32) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}
