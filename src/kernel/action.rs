use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The closed set of actions the brain can hand back to the robot.
/// Exactly one is emitted per telemetry request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Begin,
    Align,
    Seek,
    Turn,
    Jump,
    Grab,
    Wait,
    Clear,
    End,
    Finish,
}

impl Action {
    pub const ALL: [Action; 10] = [
        Action::Begin,
        Action::Align,
        Action::Seek,
        Action::Turn,
        Action::Jump,
        Action::Grab,
        Action::Wait,
        Action::Clear,
        Action::End,
        Action::Finish,
    ];

    /// Wire name, also the actuator command word.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Begin => "begin",
            Action::Align => "align",
            Action::Seek => "seek",
            Action::Turn => "turn",
            Action::Jump => "jump",
            Action::Grab => "grab",
            Action::Wait => "wait",
            Action::Clear => "clear",
            Action::End => "end",
            Action::Finish => "finish",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Action::Finish)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown action `{0}`")]
pub struct UnknownAction(pub String);

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let word = s.trim();
        Action::ALL
            .iter()
            .copied()
            .find(|a| a.as_str().eq_ignore_ascii_case(word))
            .ok_or_else(|| UnknownAction(word.to_string()))
    }
}
