//! Robot-side loop and its hardware edges.

pub mod actuator;
pub mod camera;
pub mod client;
pub mod runner;

pub use actuator::{ActuatorLink, ActuatorStatus};
pub use camera::{Camera, FileCamera};
pub use client::BrainClient;
pub use runner::{Backoff, RobotRunner, RunSummary, RunnerConfig};
