//! Typed pose-tracking events and the classifier that produces them.

pub mod classifier;

use serde::{Deserialize, Serialize};

pub use classifier::{classify, classify_message};

/// Confidence for one tracked landmark in one frame, in `[0, 1]`.
/// Deserializing goes through [`FrameScore::new`], so the range holds there too.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "f64")]
pub struct FrameScore(f64);

impl FrameScore {
    /// Clamps into `[0, 1]`; non-finite input counts as zero confidence.
    pub fn new(confidence: f64) -> Self {
        if confidence.is_finite() {
            Self(confidence.clamp(0.0, 1.0))
        } else {
            Self(0.0)
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl From<f64> for FrameScore {
    fn from(confidence: f64) -> Self {
        Self::new(confidence)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PoseEvent {
    Counter {
        count: u32,
    },
    Posture {
        ready: bool,
        message: Option<String>,
        direction: Option<String>,
    },
    Keypoints {
        frames: Vec<FrameScore>,
    },
    Finished,
    Unknown,
}

impl PoseEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            PoseEvent::Counter { .. } => "counter",
            PoseEvent::Posture { .. } => "posture",
            PoseEvent::Keypoints { .. } => "keypoints",
            PoseEvent::Finished => "finished",
            PoseEvent::Unknown => "unknown",
        }
    }
}

/// Mean landmark confidence scaled to `0..=100`. An empty frame scores 0.
pub fn frame_score(frames: &[FrameScore]) -> u32 {
    if frames.is_empty() {
        return 0;
    }
    let sum: f64 = frames.iter().map(|f| f.value()).sum();
    let mean = sum / frames.len() as f64;
    (mean * 100.0).round().clamp(0.0, 100.0) as u32
}

/// One inbound message exactly as the tracker delivered it.
#[derive(Debug, Clone, PartialEq)]
pub enum RawMessage {
    Text(String),
    Json(serde_json::Value),
}

impl From<String> for RawMessage {
    fn from(value: String) -> Self {
        RawMessage::Text(value)
    }
}

impl From<&str> for RawMessage {
    fn from(value: &str) -> Self {
        RawMessage::Text(value.to_string())
    }
}

impl From<serde_json::Value> for RawMessage {
    fn from(value: serde_json::Value) -> Self {
        RawMessage::Json(value)
    }
}
