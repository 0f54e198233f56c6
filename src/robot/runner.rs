use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::actuator::{ActuatorLink, ActuatorStatus};
use super::camera::Camera;
use super::client::BrainClient;
use crate::config::Config;
use crate::error::{LinkError, LinkErrorKind};
use crate::kernel::action::Action;
use crate::kernel::event::Telemetry;

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub brain_addr: String,
    pub request_timeout: Duration,
    pub camera_flush: usize,
    pub max_consecutive_failures: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl From<&Config> for RunnerConfig {
    fn from(config: &Config) -> Self {
        Self {
            brain_addr: config.brain_addr.clone(),
            request_timeout: config.request_timeout(),
            camera_flush: config.camera_flush,
            max_consecutive_failures: config.max_consecutive_failures,
            backoff_base: Duration::from_millis(config.backoff_base_ms),
            backoff_max: Duration::from_millis(config.backoff_max_ms),
        }
    }
}

/// Exponential backoff over consecutive failed rounds.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    failures: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            failures: 0,
        }
    }

    /// Counts a failure and returns how long to wait: base * 2^(n-1), capped.
    pub fn record_failure(&mut self) -> Duration {
        self.failures += 1;
        let factor = 1u32.checked_shl(self.failures - 1).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }

    pub fn reset(&mut self) {
        self.failures = 0;
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub rounds: u64,
    pub failed_rounds: u64,
    pub last_action: Option<Action>,
}

/// The robot's sequential loop: request, execute, capture, repeat.
pub struct RobotRunner<S, C> {
    config: RunnerConfig,
    client: Option<BrainClient>,
    actuator: ActuatorLink<S>,
    camera: C,
    telemetry: Telemetry,
    backoff: Backoff,
}

impl<S, C> RobotRunner<S, C>
where
    S: AsyncRead + AsyncWrite,
    C: Camera,
{
    pub fn new(config: RunnerConfig, client: Option<BrainClient>, actuator: ActuatorLink<S>, camera: C) -> Self {
        let backoff = Backoff::new(config.backoff_base, config.backoff_max);
        Self {
            config,
            client,
            actuator,
            camera,
            telemetry: Telemetry::default(),
            backoff,
        }
    }

    pub async fn run(mut self, cancel: CancellationToken) -> Result<RunSummary, LinkError> {
        let mut summary = RunSummary::default();
        info!(target: "robot", addr = %self.config.brain_addr, "robot loop started");

        while !cancel.is_cancelled() {
            summary.rounds += 1;

            match self.round().await {
                Ok(action) => {
                    self.backoff.reset();
                    summary.last_action = Some(action);
                    if action.is_terminal() {
                        info!(target: "robot", rounds = summary.rounds, "finished");
                        break;
                    }
                }
                Err(e) => {
                    summary.failed_rounds += 1;
                    let delay = self.backoff.record_failure();
                    let failures = self.backoff.failures();
                    warn!(target: "robot", failures, ?delay, "round failed: {}", e);
                    if failures >= self.config.max_consecutive_failures {
                        return Err(LinkError::Exhausted { failures });
                    }
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = sleep(delay) => {}
                    }
                }
            }

            self.capture();
        }
        Ok(summary)
    }

    /// Request an action and execute it. Link failures drop the connection.
    pub async fn round(&mut self) -> Result<Action, LinkError> {
        if self.client.is_none() {
            let fresh = BrainClient::connect(&self.config.brain_addr, self.config.request_timeout).await?;
            self.client = Some(fresh);
        }
        let client = self.client.as_mut().ok_or(LinkError::Closed)?;

        let action = match client.request_action(&self.telemetry).await {
            Ok(action) => action,
            Err(e) => {
                self.client = None;
                return Err(e);
            }
        };
        info!(target: "robot", %action, "executing");

        // Without a status the sensor flags keep their previous values.
        match self.actuator.execute(action).await {
            Ok(status) => self.apply_status(&status),
            Err(e) if e.kind() == LinkErrorKind::Timeout => {
                warn!(target: "actuator", %action, "no status before timeout");
            }
            Err(e) => warn!(target: "actuator", %action, "command failed: {}", e),
        }
        self.telemetry.last_action = Some(action);
        Ok(action)
    }

    fn apply_status(&mut self, status: &ActuatorStatus) {
        if let Some(at_end) = status.at_end {
            self.telemetry.at_end = at_end;
        }
        if let Some(at_plant) = status.at_plant {
            self.telemetry.at_plant = at_plant;
        }
        if let Some(pass) = status.pass {
            self.telemetry.pass = pass;
        }
    }

    fn capture(&mut self) {
        match self.camera.capture(self.config.camera_flush) {
            Ok(frame) => self.telemetry.image = Some(frame),
            Err(e) => warn!(target: "camera", "capture failed: {}", e),
        }
    }
}
