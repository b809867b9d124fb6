//! # pixelsink-core
//!
//! Core library for the pixelsink display daemon: receive raster
//! images as single UDP datagrams and keep an RGB LED matrix showing
//! the latest one, holding the display device open only while frames
//! are actively arriving.
//!
//! This crate contains:
//! - **Decoder**: [`ppm`] for binary PPM (`P6`) datagram payloads
//! - **Canvas**: [`Canvas`], the in-memory framebuffer with clipped blits
//! - **Device boundary**: [`MatrixConfig`], [`MatrixDriver`], [`MatrixDevice`]
//! - **Receiver**: [`FrameReceiver`], the UDP serving loop feeding typed events
//! - **Supervisor**: [`Supervisor`], the idle-timeout lifecycle state machine
//! - **Pipeline**: [`Pipeline`] for binding, task wiring, and cancellation
//! - **Error**: [`SinkError`], a typed `thiserror`-based error hierarchy

pub mod canvas;
pub mod error;
pub mod matrix;
pub mod pipeline;
pub mod ppm;
pub mod receiver;
pub mod supervisor;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use canvas::{Canvas, Rgb};
pub use error::{DecodeError, SinkError};
pub use matrix::{MatrixConfig, MatrixDevice, MatrixDriver};
pub use pipeline::Pipeline;
pub use ppm::{Frame, MAX_IMAGE_BYTES};
pub use receiver::{FrameReceiver, PipelineEvent};
pub use supervisor::{AcquireMode, IdlePolicy, LifecycleOptions, LifecycleState, Supervisor};
