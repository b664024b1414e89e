pub mod aggregator;
pub mod config;
pub mod feedback;
pub mod session_score;

pub use aggregator::{RepAggregator, RepAverage};
pub use config::ScoringPolicy;
pub use feedback::FeedbackTier;
pub use session_score::{compute_score, ScoreBreakdown};
