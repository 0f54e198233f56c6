//! Wire schema for the robot <-> brain channel: one JSON object per line.

use serde::{Deserialize, Serialize};

use crate::error::LinkError;
use crate::kernel::action::Action;
use crate::kernel::event::Telemetry;

/// Upper bound on one line. A 640x480 frame as a JSON byte array fits with room to spare.
pub const MAX_LINE_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    Request(Telemetry),
    Response { action: Action },
}

impl Message {
    pub fn response(action: Action) -> Self {
        Message::Response { action }
    }
}

#[derive(Serialize)]
struct RequestRef<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(flatten)]
    telemetry: &'a Telemetry,
}

pub fn decode(line: &str) -> Result<Message, LinkError> {
    Ok(serde_json::from_str(line.trim())?)
}

pub fn encode(message: &Message) -> Result<String, LinkError> {
    Ok(serde_json::to_string(message)?)
}

/// Encodes a request without cloning the frame.
pub fn encode_request(telemetry: &Telemetry) -> Result<String, LinkError> {
    Ok(serde_json::to_string(&RequestRef {
        kind: "request",
        telemetry,
    })?)
}
