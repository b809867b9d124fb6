//! Display lifecycle supervisor.
//!
//! Sole consumer of [`PipelineEvent`]s and sole owner of the canvas and
//! the device handle, so "frame arrived" and "idle deadline fired" can
//! never interleave. The state machine has two states:
//!
//! - `Idle`: no deadline armed; in lazy mode no device is held.
//! - `Active`: a single-shot idle deadline is armed, re-armed by every
//!   successfully decoded frame.
//!
//! When the deadline fires with no intervening frame, the configured
//! idle policy runs exactly once: release the device, or blank the
//! canvas and keep the device powered.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::canvas::Canvas;
use crate::error::SinkError;
use crate::matrix::{MatrixConfig, MatrixDevice, MatrixDriver};
use crate::ppm::Frame;
use crate::receiver::PipelineEvent;

// ── Lifecycle policy ─────────────────────────────────────────────

/// What the idle deadline does when it fires.
///
/// Releasing conserves power but pays re-open latency on the next
/// frame; blanking keeps the device powered and avoids the re-open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdlePolicy {
    /// Close the device; the next frame re-opens it.
    Release,
    /// Clear the canvas and render it blank; the device stays open.
    Blank,
}

/// When the device is first acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireMode {
    /// Open on the first frame. An open failure drops that frame and
    /// is retried on the next one.
    Lazy,
    /// Open at startup. An open failure is fatal.
    Eager,
}

/// Supervisor tunables.
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// How long without traffic before the idle policy runs.
    pub idle_timeout: Duration,
    pub idle_policy: IdlePolicy,
    pub acquire: AcquireMode,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(5),
            idle_policy: IdlePolicy::Release,
            acquire: AcquireMode::Lazy,
        }
    }
}

/// Observable supervisor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Active,
}

// ── Supervisor ───────────────────────────────────────────────────

/// Owns the canvas and the device handle; drives both from the event
/// channel until cancellation or a transport failure.
pub struct Supervisor {
    driver: Box<dyn MatrixDriver>,
    device: Option<Box<dyn MatrixDevice>>,
    canvas: Canvas,
    config: MatrixConfig,
    options: LifecycleOptions,
    /// At most one pending deadline exists at a time.
    deadline: Option<Instant>,
    events: mpsc::Receiver<PipelineEvent>,
    cancel: CancellationToken,
}

impl Supervisor {
    pub fn new(
        driver: Box<dyn MatrixDriver>,
        config: MatrixConfig,
        options: LifecycleOptions,
        events: mpsc::Receiver<PipelineEvent>,
        cancel: CancellationToken,
    ) -> Self {
        let canvas = config.canvas();
        Self {
            driver,
            device: None,
            canvas,
            config,
            options,
            deadline: None,
            events,
            cancel,
        }
    }

    /// `Active` while the idle deadline is armed.
    pub fn state(&self) -> LifecycleState {
        if self.deadline.is_some() {
            LifecycleState::Active
        } else {
            LifecycleState::Idle
        }
    }

    /// Run until cancelled or the transport fails.
    ///
    /// On exit the deadline is disarmed and the device, if held, is
    /// released, regardless of how the loop ended.
    pub async fn run(mut self) -> Result<(), SinkError> {
        if self.options.acquire == AcquireMode::Eager {
            let device = self.driver.open(&self.config)?;
            info!("display device opened at startup");
            self.device = Some(device);
        }

        let result = self.serve().await;

        self.deadline = None;
        self.release_device();
        result
    }

    async fn serve(&mut self) -> Result<(), SinkError> {
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(()),
                _ = Self::idle_sleep(self.deadline), if self.deadline.is_some() => {
                    self.on_idle();
                }
                event = self.events.recv() => match event {
                    Some(PipelineEvent::Frame(frame)) => self.on_frame(frame),
                    Some(PipelineEvent::TransportFailed(e)) => {
                        return Err(SinkError::SocketRead(e));
                    }
                    None => return Err(SinkError::ChannelClosed),
                },
            }
        }
    }

    /// Process one decoded frame: re-arm the deadline, make sure the
    /// device is open, blit, render.
    fn on_frame(&mut self, frame: Frame) {
        // Re-arm first: a decoded frame counts as traffic even when the
        // blit clips it away or the device cannot be opened.
        self.deadline = Some(Instant::now() + self.options.idle_timeout);

        if self.device.is_none() {
            match self.driver.open(&self.config) {
                Ok(device) => {
                    info!("display device opened");
                    self.device = Some(device);
                }
                Err(e) => {
                    warn!("device open failed; dropping frame: {e}");
                    return;
                }
            }
        }

        self.canvas.blit(&frame, 0, 0);
        debug!("blitted {}x{} frame", frame.width, frame.height);

        let failed = match self.device.as_mut() {
            Some(device) => device.render(&self.canvas).err(),
            None => None,
        };
        if let Some(e) = failed {
            warn!("render failed; releasing device: {e}");
            self.release_device();
        }
    }

    /// The deadline fired with no intervening frame.
    fn on_idle(&mut self) {
        self.deadline = None;
        match self.options.idle_policy {
            IdlePolicy::Release => {
                info!(
                    "no frames for {:?}; releasing display device",
                    self.options.idle_timeout
                );
                self.release_device();
            }
            IdlePolicy::Blank => {
                info!(
                    "no frames for {:?}; blanking canvas",
                    self.options.idle_timeout
                );
                self.canvas.clear();
                let failed = match self.device.as_mut() {
                    Some(device) => device.render(&self.canvas).err(),
                    None => None,
                };
                if let Some(e) = failed {
                    warn!("blank render failed; releasing device: {e}");
                    self.release_device();
                }
            }
        }
    }

    fn release_device(&mut self) {
        if let Some(mut device) = self.device.take() {
            device.close();
            info!("display device released");
        }
    }

    async fn idle_sleep(deadline: Option<Instant>) {
        match deadline {
            Some(at) => tokio::time::sleep_until(at).await,
            None => std::future::pending().await,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use bytes::Bytes;
    use tokio::task::JoinHandle;

    #[derive(Default)]
    struct Stats {
        open_attempts: usize,
        opens: usize,
        renders: usize,
        closes: usize,
        last_render_blank: bool,
    }

    #[derive(Clone, Default)]
    struct MockDriver {
        stats: Arc<Mutex<Stats>>,
        fail_open: Arc<AtomicBool>,
    }

    impl MatrixDriver for MockDriver {
        fn open(&self, config: &MatrixConfig) -> Result<Box<dyn MatrixDevice>, SinkError> {
            config.validate()?;
            let mut stats = self.stats.lock().unwrap();
            stats.open_attempts += 1;
            if self.fail_open.load(Ordering::SeqCst) {
                return Err(SinkError::DeviceOpen("mock open failure".into()));
            }
            stats.opens += 1;
            Ok(Box::new(MockDevice {
                stats: Arc::clone(&self.stats),
            }))
        }
    }

    struct MockDevice {
        stats: Arc<Mutex<Stats>>,
    }

    impl MatrixDevice for MockDevice {
        fn render(&mut self, canvas: &Canvas) -> Result<(), SinkError> {
            let mut stats = self.stats.lock().unwrap();
            stats.renders += 1;
            stats.last_render_blank = canvas.data().iter().all(|&b| b == 0);
            Ok(())
        }

        fn close(&mut self) {
            self.stats.lock().unwrap().closes += 1;
        }
    }

    fn options(idle: Duration, idle_policy: IdlePolicy, acquire: AcquireMode) -> LifecycleOptions {
        LifecycleOptions {
            idle_timeout: idle,
            idle_policy,
            acquire,
        }
    }

    fn white_frame() -> PipelineEvent {
        PipelineEvent::Frame(Frame {
            width: 4,
            height: 4,
            data: Bytes::from(vec![0xFF; 48]),
        })
    }

    fn spawn_supervisor(
        driver: MockDriver,
        opts: LifecycleOptions,
    ) -> (
        mpsc::Sender<PipelineEvent>,
        CancellationToken,
        JoinHandle<Result<(), SinkError>>,
    ) {
        let (tx, rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let supervisor = Supervisor::new(
            Box::new(driver),
            MatrixConfig::default(),
            opts,
            rx,
            cancel.clone(),
        );
        let handle = tokio::spawn(supervisor.run());
        (tx, cancel, handle)
    }

    /// Let the supervisor drain whatever is queued. Under paused time
    /// this also runs any deadline that falls inside the window.
    async fn settle(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    const IDLE: Duration = Duration::from_secs(5);

    #[tokio::test(start_paused = true)]
    async fn device_opens_once_across_rapid_frames() {
        let driver = MockDriver::default();
        let stats = Arc::clone(&driver.stats);
        let (tx, cancel, handle) =
            spawn_supervisor(driver, options(IDLE, IdlePolicy::Release, AcquireMode::Lazy));

        for _ in 0..5 {
            tx.send(white_frame()).await.unwrap();
            settle(1_000).await; // well inside the idle window
        }

        {
            let stats = stats.lock().unwrap();
            assert_eq!(stats.opens, 1);
            assert_eq!(stats.renders, 5);
            assert_eq!(stats.closes, 0);
        }

        cancel.cancel();
        handle.await.unwrap().unwrap();
        assert_eq!(stats.lock().unwrap().closes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_release_fires_exactly_once_per_idle_period() {
        let driver = MockDriver::default();
        let stats = Arc::clone(&driver.stats);
        let (tx, cancel, handle) =
            spawn_supervisor(driver, options(IDLE, IdlePolicy::Release, AcquireMode::Lazy));

        tx.send(white_frame()).await.unwrap();
        settle(6_000).await;
        assert_eq!(stats.lock().unwrap().closes, 1);

        // No further traffic, no further side effects.
        settle(20_000).await;
        assert_eq!(stats.lock().unwrap().closes, 1);

        // Next frame re-opens.
        tx.send(white_frame()).await.unwrap();
        settle(10).await;
        assert_eq!(stats.lock().unwrap().opens, 2);

        cancel.cancel();
        handle.await.unwrap().unwrap();
        assert_eq!(stats.lock().unwrap().closes, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn blank_policy_clears_without_releasing() {
        let driver = MockDriver::default();
        let stats = Arc::clone(&driver.stats);
        let (tx, cancel, handle) =
            spawn_supervisor(driver, options(IDLE, IdlePolicy::Blank, AcquireMode::Lazy));

        tx.send(white_frame()).await.unwrap();
        settle(10).await;
        assert!(!stats.lock().unwrap().last_render_blank);

        settle(6_000).await;
        {
            let stats = stats.lock().unwrap();
            assert_eq!(stats.closes, 0, "blank policy must not release");
            assert_eq!(stats.renders, 2, "frame render plus blank render");
            assert!(stats.last_render_blank);
        }

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn eager_mode_opens_before_any_traffic() {
        let driver = MockDriver::default();
        let stats = Arc::clone(&driver.stats);
        let (_tx, cancel, handle) =
            spawn_supervisor(driver, options(IDLE, IdlePolicy::Blank, AcquireMode::Eager));

        settle(10).await;
        assert_eq!(stats.lock().unwrap().opens, 1);

        cancel.cancel();
        handle.await.unwrap().unwrap();
        assert_eq!(stats.lock().unwrap().closes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn eager_open_failure_is_fatal() {
        let driver = MockDriver::default();
        driver.fail_open.store(true, Ordering::SeqCst);
        let (_tx, _cancel, handle) =
            spawn_supervisor(driver, options(IDLE, IdlePolicy::Release, AcquireMode::Eager));

        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, SinkError::DeviceOpen(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn lazy_open_failure_drops_frame_and_retries() {
        let driver = MockDriver::default();
        let stats = Arc::clone(&driver.stats);
        let fail = Arc::clone(&driver.fail_open);
        fail.store(true, Ordering::SeqCst);

        let (tx, cancel, handle) =
            spawn_supervisor(driver, options(IDLE, IdlePolicy::Release, AcquireMode::Lazy));

        tx.send(white_frame()).await.unwrap();
        settle(10).await;
        {
            let stats = stats.lock().unwrap();
            assert_eq!(stats.open_attempts, 1);
            assert_eq!(stats.opens, 0);
            assert_eq!(stats.renders, 0, "frame must be dropped, not rendered");
        }

        fail.store(false, Ordering::SeqCst);
        tx.send(white_frame()).await.unwrap();
        settle(10).await;
        {
            let stats = stats.lock().unwrap();
            assert_eq!(stats.open_attempts, 2);
            assert_eq!(stats.opens, 1);
            assert_eq!(stats.renders, 1);
        }

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failure_ends_the_loop() {
        let driver = MockDriver::default();
        let (tx, _cancel, handle) =
            spawn_supervisor(driver, options(IDLE, IdlePolicy::Release, AcquireMode::Lazy));

        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "socket gone");
        tx.send(PipelineEvent::TransportFailed(io)).await.unwrap();

        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, SinkError::SocketRead(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn frame_arms_the_state_machine() {
        let (_tx, rx) = mpsc::channel(1);
        let driver = MockDriver::default();
        let stats = Arc::clone(&driver.stats);
        let mut supervisor = Supervisor::new(
            Box::new(driver),
            MatrixConfig::default(),
            options(IDLE, IdlePolicy::Release, AcquireMode::Lazy),
            rx,
            CancellationToken::new(),
        );

        assert_eq!(supervisor.state(), LifecycleState::Idle);

        if let PipelineEvent::Frame(frame) = white_frame() {
            supervisor.on_frame(frame);
        }
        assert_eq!(supervisor.state(), LifecycleState::Active);
        assert_eq!(stats.lock().unwrap().opens, 1);

        supervisor.on_idle();
        assert_eq!(supervisor.state(), LifecycleState::Idle);
        assert_eq!(stats.lock().unwrap().closes, 1);
    }
}
