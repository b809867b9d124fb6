//! Display device boundary.
//!
//! [`MatrixConfig`] carries the static panel wiring supplied once at
//! process start. [`MatrixDriver`] and [`MatrixDevice`] are the seam
//! between the pipeline and the actual output hardware: the pipeline
//! only ever opens a device, renders the canvas to it, and closes it.
//! The GPIO-level driver lives behind this seam, outside this crate.

use crate::canvas::Canvas;
use crate::error::SinkError;

// ── MatrixConfig ─────────────────────────────────────────────────

/// Static configuration of the panel chain. Immutable after startup.
#[derive(Debug, Clone)]
pub struct MatrixConfig {
    /// Rows per panel.
    pub rows: u32,
    /// Declared columns per panel (both scan banks; see
    /// [`display_width`](Self::display_width)).
    pub cols: u32,
    /// Number of panels daisy-chained on one channel.
    pub chain_length: u32,
    /// Number of parallel chains.
    pub parallel: u32,
    /// Brightness percentage, 0–100.
    pub brightness: u8,
    /// Name of the GPIO mapping in use.
    pub hardware_mapping: String,
    /// Print the achieved refresh rate.
    pub show_refresh_rate: bool,
    /// Panels with inverted colors.
    pub inverse_colors: bool,
    /// Skip hardware pin-pulse generation.
    pub disable_hardware_pulsing: bool,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            rows: 16,
            cols: 32,
            chain_length: 2,
            parallel: 1,
            brightness: 100,
            hardware_mapping: "regular".into(),
            show_refresh_rate: false,
            inverse_colors: false,
            disable_hardware_pulsing: false,
        }
    }
}

impl MatrixConfig {
    /// Check the wiring parameters. Run again on every device open,
    /// since a re-open after idle release must not trust stale state.
    pub fn validate(&self) -> Result<(), SinkError> {
        if self.rows == 0 {
            return Err(SinkError::InvalidConfig("rows must be non-zero"));
        }
        if self.cols < 2 {
            return Err(SinkError::InvalidConfig("cols must be at least 2"));
        }
        if self.chain_length == 0 {
            return Err(SinkError::InvalidConfig("chain length must be non-zero"));
        }
        if self.parallel == 0 {
            return Err(SinkError::InvalidConfig("parallel count must be non-zero"));
        }
        if self.brightness > 100 {
            return Err(SinkError::InvalidConfig("brightness must be 0-100"));
        }
        if self.hardware_mapping.is_empty() {
            return Err(SinkError::InvalidConfig("hardware mapping must be named"));
        }
        Ok(())
    }

    /// Effective pixel width of the chained display.
    ///
    /// A panel contributes `cols / 2` pixels of width (the declared
    /// column count covers both scan banks); daisy-chained panels
    /// multiply. Senders must produce frames for this geometry.
    pub fn display_width(&self) -> u32 {
        (self.cols / 2) * self.chain_length
    }

    /// Effective pixel height: panel rows times parallel chains.
    pub fn display_height(&self) -> u32 {
        self.rows * self.parallel
    }

    /// Allocate the canvas matching this display's geometry.
    pub fn canvas(&self) -> Canvas {
        Canvas::new(self.display_width(), self.display_height())
    }
}

// ── Device traits ────────────────────────────────────────────────

/// Factory for the scarce display device handle.
pub trait MatrixDriver: Send {
    /// Acquire the physical device.
    ///
    /// Called eagerly at startup or lazily on the first frame after an
    /// idle release, depending on the lifecycle mode. May fail
    /// (permissions, invalid wiring, device busy); every call
    /// re-validates the configuration.
    fn open(&self, config: &MatrixConfig) -> Result<Box<dyn MatrixDevice>, SinkError>;
}

/// An open handle to the physical output.
pub trait MatrixDevice: Send {
    /// Push the canvas contents to the output. May block briefly on
    /// device I/O. Must observe every canvas write that preceded the
    /// call.
    fn render(&mut self, canvas: &Canvas) -> Result<(), SinkError>;

    /// Release the device. Safe to call on an already-closed handle.
    fn close(&mut self);
}

// ── Tests ────────────────────────────────────────────────────────
