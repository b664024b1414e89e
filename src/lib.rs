//! Live exercise-session scoring for pose-tracking streams.
//!
//! Raw tracker messages are classified into [`events::PoseEvent`]s, frame
//! scores are bucketed into repetitions by [`scoring::RepAggregator`], and a
//! [`session::SessionMachine`] turns them into exactly one
//! [`session::SessionResult`] per session. [`session::SessionController`]
//! hosts the machine on tokio with a countdown clock and a result submitter.

pub mod events;
pub mod scoring;
pub mod session;
pub mod settings;
pub mod submit;
mod utils;

pub use events::{classify, classify_message, PoseEvent, RawMessage};
pub use scoring::{FeedbackTier, RepAggregator, ScoringPolicy};
pub use session::{
    Difficulty, ExerciseCatalog, SessionController, SessionMachine, SessionResult,
    SessionSnapshot,
};
pub use settings::{EngineSettings, SettingsStore};
pub use submit::{ChannelSubmitter, LogSubmitter, ResultSubmitter, SubmissionPayload};

/// Initializes logging from `RUST_LOG`, defaulting to info. Safe to call
/// more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init();
}
