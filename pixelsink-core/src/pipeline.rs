//! Pipeline root: socket binding, task wiring, and cancellation.
//!
//! Binding happens eagerly in [`Pipeline::bind`] so a port conflict is
//! a startup failure, and so tests binding port 0 can learn the
//! OS-assigned port before any traffic flows. [`Pipeline::run`] then
//! spawns the receiver task and drives the supervisor on the calling
//! task; it returns on cancellation or when the transport fails, the
//! only two ways the serving loop ends.

use std::net::SocketAddr;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::SinkError;
use crate::matrix::{MatrixConfig, MatrixDriver};
use crate::receiver::FrameReceiver;
use crate::supervisor::{LifecycleOptions, Supervisor};

/// A bound, not-yet-running pipeline.
pub struct Pipeline {
    socket: UdpSocket,
    driver: Box<dyn MatrixDriver>,
    config: MatrixConfig,
    options: LifecycleOptions,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline").finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Validate the configuration and bind the inbound socket.
    pub async fn bind(
        addr: SocketAddr,
        driver: Box<dyn MatrixDriver>,
        config: MatrixConfig,
        options: LifecycleOptions,
    ) -> Result<Self, SinkError> {
        config.validate()?;
        let socket = UdpSocket::bind(addr).await.map_err(SinkError::Bind)?;
        Ok(Self {
            socket,
            driver,
            config,
            options,
        })
    }

    /// The address the inbound socket actually bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Run until `cancel` fires or the transport fails.
    ///
    /// The receiver gets a child token so that however the supervisor
    /// exits, the receiver is stopped and joined before this returns;
    /// no task outlives the pipeline.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), SinkError> {
        // Capacity 1: at most one decoded frame in user space; later
        // datagrams wait in the kernel buffer behind the render.
        let (events_tx, events_rx) = mpsc::channel(1);

        let receiver_token = cancel.child_token();
        let receiver = FrameReceiver::new(self.socket, events_tx, receiver_token.clone());
        let receiver_task = tokio::spawn(receiver.run());

        let supervisor = Supervisor::new(self.driver, self.config, self.options, events_rx, cancel);
        let result = supervisor.run().await;

        receiver_token.cancel();
        let _ = receiver_task.await;
        result
    }
}
