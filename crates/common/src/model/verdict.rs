use crate::sandbox_options::MAX_CONSOLE_LINES;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// The `type` tag every verdict message carries.
pub const VERDICT_MESSAGE_TYPE: &str = "result";

/// The identifier that correlates a verdict message to the run that produced it.
#[derive(Copy, Clone, Deserialize, Debug, Serialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(transparent)]
pub struct RunId(pub u64);

impl RunId {
    /// Returns the identifier that follows this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

/// The result of a single sandboxed run.
#[derive(Clone, Deserialize, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub ok: bool,
    pub has_test: bool,
    pub console_messages: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_value: Option<Value>,
}

impl Verdict {
    /// The verdict a controller substitutes when a run never reported one.
    pub fn no_verdict(waited: Duration) -> Self {
        Self {
            ok: false,
            has_test: false,
            console_messages: vec![],
            error: Some(format!(
                "no verdict received after {:.2}s",
                waited.as_secs_f32()
            )),
            result_value: None,
        }
    }
}

/// A [`Verdict`] as it travels from an isolated context to its controller.
#[derive(Clone, Deserialize, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerdictMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub run_id: RunId,
    #[serde(flatten)]
    pub verdict: Verdict,
}

impl VerdictMessage {
    pub fn new(run_id: RunId, verdict: Verdict) -> Self {
        Self {
            kind: VERDICT_MESSAGE_TYPE.to_string(),
            run_id,
            verdict,
        }
    }
}

/// The reason an inbound message was not accepted as a verdict.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("message is not an object")]
    NotAnObject,
    #[error("message type is not `result`")]
    WrongType,
    #[error("malformed verdict: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("verdict carries {0} console lines, more than the allowed maximum")]
    TooManyConsoleLines(usize),
    #[error("verdict is ok without a test")]
    OkWithoutTest,
}

/// Validates the shape of an inbound message before anything else reads it.
///
/// The message channel is shared and carries no origin information, so any value may arrive here:
/// stray messages from other producers, duplicates, or verdicts from runs that have since been replaced.
/// Only the shape is checked; correlating the `runId` is the caller's job.
pub fn parse_inbound(value: &Value) -> Result<VerdictMessage, MessageError> {
    let object = value.as_object().ok_or(MessageError::NotAnObject)?;
    if object.get("type").and_then(Value::as_str) != Some(VERDICT_MESSAGE_TYPE) {
        return Err(MessageError::WrongType);
    }
    let message = VerdictMessage::deserialize(value)?;
    let line_count = message.verdict.console_messages.len();
    if line_count > MAX_CONSOLE_LINES {
        return Err(MessageError::TooManyConsoleLines(line_count));
    }
    if message.verdict.ok && !message.verdict.has_test {
        return Err(MessageError::OkWithoutTest);
    }
    Ok(message)
}
