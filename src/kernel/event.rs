use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tokio::sync::oneshot;

use super::action::Action;
use crate::error::VisionError;

/// End-of-row sensor flag as reported by the robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum EndSignal {
    #[default]
    MidRow,
    NearEnd,
    FarEnd,
}

impl TryFrom<u8> for EndSignal {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(EndSignal::MidRow),
            1 => Ok(EndSignal::NearEnd),
            2 => Ok(EndSignal::FarEnd),
            other => Err(format!("at_end must be 0, 1 or 2, got {other}")),
        }
    }
}

impl From<EndSignal> for u8 {
    fn from(signal: EndSignal) -> Self {
        match signal {
            EndSignal::MidRow => 0,
            EndSignal::NearEnd => 1,
            EndSignal::FarEnd => 2,
        }
    }
}

/// Which traversal of a doubled row the robot is on.
/// The return pass sees slots in mirrored order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Pass {
    #[default]
    Outbound,
    Return,
}

impl TryFrom<u8> for Pass {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Pass::Outbound),
            2 => Ok(Pass::Return),
            other => Err(format!("pass must be 1 or 2, got {other}")),
        }
    }
}

impl From<Pass> for u8 {
    fn from(pass: Pass) -> Self {
        match pass {
            Pass::Outbound => 1,
            Pass::Return => 2,
        }
    }
}

/// Raw camera frame: row-major RGB, 8 bits per channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl ImageFrame {
    pub fn from_rgb(img: &image::RgbImage) -> Self {
        Self {
            width: img.width(),
            height: img.height(),
            data: img.as_raw().clone(),
        }
    }

    pub fn to_rgb(&self) -> Result<image::RgbImage, VisionError> {
        let expected = self.width as usize * self.height as usize * 3;
        if self.data.len() != expected {
            return Err(VisionError::BadFrame {
                width: self.width,
                height: self.height,
                expected,
                actual: self.data.len(),
            });
        }
        image::RgbImage::from_raw(self.width, self.height, self.data.clone()).ok_or(
            VisionError::BadFrame {
                width: self.width,
                height: self.height,
                expected,
                actual: self.data.len(),
            },
        )
    }
}

/// One robot report. Immutable once received.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Telemetry {
    #[serde(default, alias = "lastAction")]
    pub last_action: Option<Action>,
    #[serde(default, alias = "atEnd")]
    pub at_end: EndSignal,
    /// 0 when not at a plant, else the 1-based slot the sensor reports.
    #[serde(default, alias = "atPlant")]
    pub at_plant: u32,
    #[serde(default)]
    pub pass: Pass,
    #[serde(default)]
    pub image: Option<ImageFrame>,
}

/// Operator console requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Run,
    Stop,
    Reset,
    Shutdown,
    Close,
    Status,
}

impl FromStr for ConsoleCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "run" => Ok(ConsoleCommand::Run),
            "stop" => Ok(ConsoleCommand::Stop),
            "reset" => Ok(ConsoleCommand::Reset),
            "shutdown" => Ok(ConsoleCommand::Shutdown),
            "close" => Ok(ConsoleCommand::Close),
            "status" => Ok(ConsoleCommand::Status),
            other => Err(format!("unknown console command `{other}`")),
        }
    }
}

/// A decoded request waiting for the reactor. The connection handler blocks
/// on `reply` before it reads the next line.
#[derive(Debug)]
pub struct PendingRequest {
    pub telemetry: Telemetry,
    pub reply: oneshot::Sender<Action>,
}

impl PendingRequest {
    pub fn new(telemetry: Telemetry) -> (Self, oneshot::Receiver<Action>) {
        let (reply, rx) = oneshot::channel();
        (Self { telemetry, reply }, rx)
    }
}

/// Everything the reactor drains on a tick.
#[derive(Debug)]
pub enum Event {
    Request(PendingRequest),
    Console(ConsoleCommand),
}
