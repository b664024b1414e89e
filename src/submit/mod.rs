//! Hand-off of finished sessions to whatever stores them.

use std::future::Future;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::session::{Difficulty, SessionResult};

/// Body of the session upload, one per finished session. The result keys
/// keep the capitalised names the upload route stores; `sessionId` and
/// `finishedAt` ride along for idempotent storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub uid: String,
    pub session_id: Uuid,
    #[serde(rename = "Exercise")]
    pub exercise: String,
    #[serde(rename = "Difficulty")]
    pub difficulty: Difficulty,
    #[serde(rename = "TimeLimit")]
    pub time_limit: u32,
    #[serde(rename = "TotalReps")]
    pub total_reps: u32,
    #[serde(rename = "Score")]
    pub score: Option<u32>,
    pub finished_at: DateTime<Utc>,
}

impl From<&SessionResult> for SubmissionPayload {
    fn from(result: &SessionResult) -> Self {
        Self {
            uid: result.identity.clone(),
            session_id: result.session_id,
            exercise: result.config.exercise.key.clone(),
            difficulty: result.config.difficulty,
            time_limit: result.config.time_limit.secs(),
            total_reps: result.total_reps,
            score: result.final_score,
            finished_at: result.finished_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub session_id: Uuid,
    pub accepted_at: DateTime<Utc>,
}

/// External sink for finished sessions. Called at most once per session;
/// failures are logged by the caller and never retried.
pub trait ResultSubmitter: Send + Sync + 'static {
    fn submit(
        &self,
        payload: SubmissionPayload,
    ) -> impl Future<Output = Result<SubmissionReceipt>> + Send;
}

/// Writes each result to the log as JSON. Useful when no backend is wired up.
#[derive(Debug, Default, Clone)]
pub struct LogSubmitter;

impl ResultSubmitter for LogSubmitter {
    async fn submit(&self, payload: SubmissionPayload) -> Result<SubmissionReceipt> {
        let body = serde_json::to_string(&payload)?;
        info!("session result: {body}");
        Ok(SubmissionReceipt {
            session_id: payload.session_id,
            accepted_at: Utc::now(),
        })
    }
}

/// Forwards results into a channel drained by the host's upload task.
#[derive(Debug, Clone)]
pub struct ChannelSubmitter {
    sender: mpsc::UnboundedSender<SubmissionPayload>,
}

impl ChannelSubmitter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SubmissionPayload>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ResultSubmitter for ChannelSubmitter {
    async fn submit(&self, payload: SubmissionPayload) -> Result<SubmissionReceipt> {
        let session_id = payload.session_id;
        self.sender
            .send(payload)
            .map_err(|_| anyhow!("result receiver dropped; session {session_id} not submitted"))?;
        Ok(SubmissionReceipt {
            session_id,
            accepted_at: Utc::now(),
        })
    }
}
