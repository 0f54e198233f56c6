use serde::Deserialize;
use std::path::Path;
use tokio::io::{
    split, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf, WriteHalf,
};
use tokio::time::{timeout, Duration};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info};

use crate::error::LinkError;
use crate::kernel::action::Action;
use crate::kernel::event::{EndSignal, Pass};

/// Status line the actuator prints after finishing a command.
/// Missing fields mean "unchanged".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ActuatorStatus {
    #[serde(default)]
    pub at_end: Option<EndSignal>,
    #[serde(default)]
    pub at_plant: Option<u32>,
    #[serde(default)]
    pub pass: Option<Pass>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Newline-terminated text commands out, newline-terminated status lines back.
///
/// The firmware answers every command with exactly one status line, in order.
/// `owed` counts commands written whose status has not been read yet, so a
/// status that arrives after its command timed out is discarded instead of
/// being taken as the answer to the next command.
pub struct ActuatorLink<S> {
    reader: BufReader<ReadHalf<S>>,
    writer: WriteHalf<S>,
    timeout: Duration,
    owed: u32,
    // Survives a cancelled read so a half-received line is not split in two.
    line: String,
}

impl ActuatorLink<SerialStream> {
    /// Opens the serial device at the configured baud rate, 8N1.
    pub fn open(path: impl AsRef<Path>, baud: u32, timeout: Duration) -> Result<Self, LinkError> {
        let path = path.as_ref();
        let port = tokio_serial::new(path.to_string_lossy(), baud)
            .timeout(timeout)
            .open_native_async()
            .map_err(|e| LinkError::Hardware(format!("{}: {}", path.display(), e)))?;
        info!(target: "actuator", device = %path.display(), baud, "actuator opened");
        Ok(Self::new(port, timeout))
    }
}

impl<S: AsyncRead + AsyncWrite> ActuatorLink<S> {
    pub fn new(stream: S, timeout: Duration) -> Self {
        let (read, writer) = split(stream);
        Self {
            reader: BufReader::new(read),
            writer,
            timeout,
            owed: 0,
            line: String::new(),
        }
    }

    /// Sends the command and waits for its status line. The whole exchange,
    /// write included, is bounded by the link timeout.
    pub async fn execute(&mut self, action: Action) -> Result<ActuatorStatus, LinkError> {
        debug!(target: "actuator", %action, "sending command");
        let line = timeout(self.timeout, self.exchange(action))
            .await
            .map_err(|_| LinkError::Timeout)??;

        let status: ActuatorStatus = serde_json::from_str(line.trim())?;
        if let Some(err) = &status.error {
            return Err(LinkError::Hardware(err.clone()));
        }
        debug!(target: "actuator", ?status, "status");
        Ok(status)
    }

    async fn exchange(&mut self, action: Action) -> Result<String, LinkError> {
        self.writer
            .write_all(format!("{}\n", action.as_str()).as_bytes())
            .await?;
        self.owed += 1;
        self.writer.flush().await?;

        loop {
            let line = self.read_status_line().await?;
            self.owed = self.owed.saturating_sub(1);
            if self.owed == 0 {
                return Ok(line);
            }
            debug!(target: "actuator", late = %line.trim(), "discarding status of a timed-out command");
        }
    }

    async fn read_status_line(&mut self) -> Result<String, LinkError> {
        loop {
            if self.reader.read_line(&mut self.line).await? == 0 {
                return Err(LinkError::Closed);
            }
            let line = std::mem::take(&mut self.line);
            if !line.trim().is_empty() {
                return Ok(line);
            }
        }
    }
}
