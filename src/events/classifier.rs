use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use serde_json::Value;

use super::{FrameScore, PoseEvent, RawMessage};

// Keypoint frames arrive many times per second; keep per-frame detail switchable.
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// Typed view of a tracker message. Every field is optional because the
/// widget reuses one envelope for all message types. `finished` is read
/// from the raw value instead, so a bad sibling field cannot hide it.
#[derive(Debug, Deserialize)]
struct TrackerMessage {
    #[serde(rename = "type")]
    kind: Option<String>,
    message: Option<String>,
    direction: Option<String>,
    ready: Option<bool>,
    current_count: Option<f64>,
    data: Option<Vec<Value>>,
}

/// Decodes one raw message into its primary event. Use
/// [`classify_message`] when the trailing `finished` flag matters.
pub fn classify(raw: &RawMessage) -> PoseEvent {
    classify_message(raw)
        .into_iter()
        .next()
        .unwrap_or(PoseEvent::Unknown)
}

/// Decodes one raw message. A message of any type may also carry
/// `"finished": true`, in which case `Finished` follows the primary event.
/// Never fails: undecodable input becomes `Unknown` and is logged.
pub fn classify_message(raw: &RawMessage) -> Vec<PoseEvent> {
    let value = match parse(raw) {
        Ok(value) => value,
        Err(err) => {
            log_warn!("discarding malformed tracker message: {err:#}");
            return vec![PoseEvent::Unknown];
        }
    };

    let finished = value.get("finished").and_then(Value::as_bool) == Some(true);
    let primary = match to_event(value) {
        Ok(event) => event,
        Err(err) => {
            log_warn!("discarding tracker message: {err:#}");
            PoseEvent::Unknown
        }
    };

    let mut events = Vec::with_capacity(2);
    match (&primary, finished) {
        (PoseEvent::Unknown, true) => events.push(PoseEvent::Finished),
        (PoseEvent::Finished, _) => events.push(PoseEvent::Finished),
        (_, true) => {
            events.push(primary);
            events.push(PoseEvent::Finished);
        }
        (_, false) => events.push(primary),
    }
    events
}

fn parse(raw: &RawMessage) -> Result<Value> {
    let value = match raw {
        RawMessage::Text(text) => {
            serde_json::from_str(text).context("tracker message is not valid JSON")?
        }
        RawMessage::Json(value) => value.clone(),
    };
    if !value.is_object() {
        return Err(anyhow!("tracker message is not a JSON object"));
    }
    Ok(value)
}

fn to_event(value: Value) -> Result<PoseEvent> {
    let message: TrackerMessage =
        serde_json::from_value(value).context("tracker payload has an unexpected shape")?;
    let Some(kind) = message.kind.as_deref() else {
        return Ok(PoseEvent::Unknown);
    };

    match kind {
        "counter" => {
            let raw = message
                .current_count
                .ok_or_else(|| anyhow!("counter message without current_count"))?;
            Ok(PoseEvent::Counter {
                count: to_count(raw)?,
            })
        }
        "posture" => Ok(PoseEvent::Posture {
            ready: message.ready.unwrap_or(false),
            message: message.message,
            direction: message.direction,
        }),
        "keypoints" => {
            let landmarks = message
                .data
                .ok_or_else(|| anyhow!("keypoints message without data"))?;
            Ok(PoseEvent::Keypoints {
                frames: to_frames(&landmarks)?,
            })
        }
        "finished" => Ok(PoseEvent::Finished),
        other => {
            log_debug!("ignoring tracker message of type '{other}'");
            Ok(PoseEvent::Unknown)
        }
    }
}

/// Landmarks without a numeric `score` are skipped. A non-empty frame with
/// no usable landmark at all carries no sample and is rejected.
fn to_frames(landmarks: &[Value]) -> Result<Vec<FrameScore>> {
    let frames: Vec<FrameScore> = landmarks
        .iter()
        .filter_map(|kp| kp.get("score").and_then(Value::as_f64))
        .map(FrameScore::new)
        .collect();

    let skipped = landmarks.len() - frames.len();
    if skipped > 0 {
        if frames.is_empty() {
            return Err(anyhow!("keypoints frame has no scored landmark"));
        }
        log_debug!("skipped {skipped} landmark(s) without a score");
    }
    Ok(frames)
}

fn to_count(raw: f64) -> Result<u32> {
    if !raw.is_finite() || raw < 0.0 || raw.fract() != 0.0 || raw > u32::MAX as f64 {
        return Err(anyhow!("current_count {raw} is not a repetition index"));
    }
    Ok(raw as u32)
}
