//! UDP frame receiver.
//!
//! Runs the serving loop: one blocking receive at a time, decode, hand
//! the frame to the lifecycle supervisor through a capacity-1 channel.
//! No user-space queue: while the supervisor is still rendering frame
//! N, frame N+1 waits in the kernel's receive buffer, and anything the
//! kernel drops on overflow is gone. Undecodable datagrams are logged
//! and dropped; the loop continues. Socket-level read errors end the
//! loop and are surfaced to the supervisor as a terminal event.

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::ppm::{self, Frame, MAX_IMAGE_BYTES};

// ── PipelineEvent ────────────────────────────────────────────────

/// Typed events flowing from the receiver to the lifecycle supervisor.
///
/// Routing both traffic and failure through one single-consumer channel
/// is what serializes "frame arrived" against "timer fired": the
/// supervisor is the only task that ever touches the canvas or the
/// device handle.
#[derive(Debug)]
pub enum PipelineEvent {
    /// A datagram decoded successfully.
    Frame(Frame),
    /// The socket failed; the serving loop is over.
    TransportFailed(std::io::Error),
}

// ── FrameReceiver ────────────────────────────────────────────────

/// The serving-loop half of the pipeline.
pub struct FrameReceiver {
    socket: UdpSocket,
    events: mpsc::Sender<PipelineEvent>,
    cancel: CancellationToken,
}

impl FrameReceiver {
    /// Wrap an already-bound socket.
    pub fn new(
        socket: UdpSocket,
        events: mpsc::Sender<PipelineEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            socket,
            events,
            cancel,
        }
    }

    /// Run the serving loop until cancellation or a socket error.
    ///
    /// Cancellation is the normal exit: the pending receive is
    /// abandoned and the socket dropped, with nothing reported upward.
    pub async fn run(self) {
        let mut buf = vec![0u8; MAX_IMAGE_BYTES];

        loop {
            let received = tokio::select! {
                _ = self.cancel.cancelled() => break,
                r = self.socket.recv_from(&mut buf) => r,
            };

            let (len, peer) = match received {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("socket read failed: {e}");
                    let _ = self
                        .events
                        .send(PipelineEvent::TransportFailed(e))
                        .await;
                    break;
                }
            };

            match ppm::decode(&buf[..len]) {
                Ok(frame) => {
                    debug!("{}x{} frame from {peer}", frame.width, frame.height);
                    if self.events.send(PipelineEvent::Frame(frame)).await.is_err() {
                        // Supervisor is gone; nothing left to feed.
                        break;
                    }
                }
                Err(e) => warn!("dropping {len}-byte datagram from {peer}: {e}"),
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
