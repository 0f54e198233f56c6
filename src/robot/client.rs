use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};
use tokio_util::codec::{Framed, LinesCodec};
use tracing::debug;

use crate::bridge::protocol::{self, Message, MAX_LINE_BYTES};
use crate::error::LinkError;
use crate::kernel::action::Action;
use crate::kernel::event::Telemetry;

/// Robot side of the request/response channel.
pub struct BrainClient {
    framed: Framed<TcpStream, LinesCodec>,
    timeout: Duration,
}

impl BrainClient {
    pub async fn connect(addr: &str, timeout_after: Duration) -> Result<Self, LinkError> {
        let stream = timeout(timeout_after, TcpStream::connect(addr))
            .await
            .map_err(|_| LinkError::Timeout)??;
        stream.set_nodelay(true)?;
        debug!(target: "robot", addr, "connected to brain");
        Ok(Self {
            framed: Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE_BYTES)),
            timeout: timeout_after,
        })
    }

    /// One round: send the telemetry, poll for the action.
    ///
    /// After a timeout the stream may still deliver the late reply, so the
    /// caller should drop this client and reconnect.
    pub async fn request_action(&mut self, telemetry: &Telemetry) -> Result<Action, LinkError> {
        let line = protocol::encode_request(telemetry)?;
        timeout(self.timeout, self.framed.send(line))
            .await
            .map_err(|_| LinkError::Timeout)??;

        let reply = timeout(self.timeout, self.framed.next())
            .await
            .map_err(|_| LinkError::Timeout)?
            .ok_or(LinkError::Closed)??;

        match protocol::decode(&reply)? {
            Message::Response { action } => Ok(action),
            Message::Request(_) => Err(LinkError::Protocol("brain sent a request".to_string())),
        }
    }
}
