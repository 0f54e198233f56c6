use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};
use tokio_util::codec::{Framed, LinesCodec};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::protocol::{self, Message, MAX_LINE_BYTES};
use crate::error::LinkError;
use crate::kernel::event::{Event, PendingRequest};

/// Terminates the robot's request/response channel.
///
/// Serves one connection at a time (one robot, one session). Each request is
/// handed to the reactor and the handler waits for the action before reading
/// the next line, so at most one request is ever in flight. A connection that
/// stays silent for `idle_timeout` is dropped so a robot that lost its side of
/// the socket can reconnect.
pub struct BridgeServer {
    listener: TcpListener,
    tx: mpsc::Sender<Event>,
    idle_timeout: Duration,
}

impl BridgeServer {
    pub async fn bind(
        addr: &str,
        tx: mpsc::Sender<Event>,
        idle_timeout: Duration,
    ) -> Result<Self, LinkError> {
        let listener = TcpListener::bind(addr).await?;
        info!(target: "bridge", addr = %listener.local_addr()?, ?idle_timeout, "listening for robot");
        Ok(Self {
            listener,
            tx,
            idle_timeout,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, LinkError> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn serve(self, cancel: CancellationToken) {
        loop {
            let accepted = tokio::select! {
                _ = cancel.cancelled() => break,
                accepted = self.listener.accept() => accepted,
            };

            let (stream, peer) = match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(target: "bridge", "accept failed: {}", e);
                    continue;
                }
            };
            info!(target: "bridge", %peer, "robot connected");

            tokio::select! {
                _ = cancel.cancelled() => break,
                result = handle_connection(stream, &self.tx, self.idle_timeout) => match result {
                    Ok(()) => info!(target: "bridge", %peer, "robot disconnected"),
                    Err(e) => warn!(target: "bridge", %peer, "connection ended: {}", e),
                },
            }
        }
        info!(target: "bridge", "bridge stopped");
    }
}

async fn handle_connection(
    stream: TcpStream,
    tx: &mpsc::Sender<Event>,
    idle_timeout: Duration,
) -> Result<(), LinkError> {
    let mut framed = Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE_BYTES));

    loop {
        let line = match timeout(idle_timeout, framed.next()).await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(_) => return Err(LinkError::Timeout),
        };
        // A codec error (oversized line, socket failure) ends the stream; the robot reconnects.
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let telemetry = match protocol::decode(&line) {
            Ok(Message::Request(t)) => t,
            Ok(Message::Response { .. }) => {
                warn!(target: "bridge", "robot sent a response message, ignoring");
                continue;
            }
            Err(e) => {
                // No response: the robot sees a timeout, never an error action.
                warn!(target: "bridge", "undecodable request: {}", e);
                continue;
            }
        };
        debug!(target: "bridge", last_action = ?telemetry.last_action, at_end = ?telemetry.at_end, at_plant = telemetry.at_plant, "request");

        let (pending, reply) = PendingRequest::new(telemetry);
        tx.send(Event::Request(pending))
            .await
            .map_err(|_| LinkError::Closed)?;
        let action = reply.await.map_err(|_| LinkError::Closed)?;

        let out = protocol::encode(&Message::response(action))?;
        framed.send(out).await?;
        debug!(target: "bridge", %action, "response sent");
    }
    Ok(())
}
