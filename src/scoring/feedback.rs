use serde::Serialize;

/// Coaching message shown next to a finished score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FeedbackTier {
    Excellent,
    Good,
    NeedsImprovement,
}

impl FeedbackTier {
    pub fn for_score(score: Option<u32>) -> Option<Self> {
        match score? {
            s if s > 85 => Some(FeedbackTier::Excellent),
            s if s > 65 => Some(FeedbackTier::Good),
            _ => Some(FeedbackTier::NeedsImprovement),
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            FeedbackTier::Excellent => "Excellent form!",
            FeedbackTier::Good => "Good effort!",
            FeedbackTier::NeedsImprovement => "Needs improvement",
        }
    }
}
