//! Terminal simulator device.
//!
//! Renders the canvas into the terminal as half-block cells, two pixel
//! rows per text row, honoring the configured brightness and color
//! inversion. Lets the daemon run end to end on a machine with no
//! panel hardware attached; the GPIO-level driver lives behind the
//! same [`MatrixDriver`] seam.

use std::io::{self, Write};

use crossterm::style::{Color, Colors, Print, ResetColor, SetColors};
use crossterm::terminal::{Clear, ClearType};
use crossterm::{QueueableCommand, cursor};

use pixelsink_core::{Canvas, MatrixConfig, MatrixDevice, MatrixDriver, Rgb, SinkError};

// ── TerminalDriver ───────────────────────────────────────────────

/// Opens terminal "devices" on stdout.
pub struct TerminalDriver;

impl MatrixDriver for TerminalDriver {
    fn open(&self, config: &MatrixConfig) -> Result<Box<dyn MatrixDevice>, SinkError> {
        config.validate()?;
        let mut out = io::stdout();
        prepare_screen(&mut out).map_err(|e| SinkError::DeviceOpen(e.to_string()))?;
        Ok(Box::new(TerminalDevice {
            brightness: config.brightness,
            inverse: config.inverse_colors,
            closed: false,
        }))
    }
}

fn prepare_screen(out: &mut io::Stdout) -> io::Result<()> {
    out.queue(Clear(ClearType::All))?;
    out.queue(cursor::Hide)?;
    out.flush()
}

fn restore_screen(out: &mut io::Stdout) -> io::Result<()> {
    out.queue(ResetColor)?;
    out.queue(cursor::Show)?;
    out.flush()
}

// ── TerminalDevice ───────────────────────────────────────────────

/// An "open" terminal: the screen is cleared and the cursor hidden
/// until [`close`](MatrixDevice::close).
pub struct TerminalDevice {
    brightness: u8,
    inverse: bool,
    closed: bool,
}

impl TerminalDevice {
    /// Apply brightness and inversion the way the panel would.
    fn shade(&self, px: Rgb) -> Color {
        let scale = |c: u8| ((u16::from(c) * u16::from(self.brightness)) / 100) as u8;
        let (mut r, mut g, mut b) = (scale(px.r), scale(px.g), scale(px.b));
        if self.inverse {
            (r, g, b) = (255 - r, 255 - g, 255 - b);
        }
        Color::Rgb { r, g, b }
    }

    fn draw(&self, canvas: &Canvas) -> io::Result<()> {
        let mut out = io::stdout();
        for row in 0..canvas.height().div_ceil(2) {
            out.queue(cursor::MoveTo(0, row as u16))?;
            for x in 0..canvas.width() {
                let top = canvas.pixel(x, row * 2).unwrap_or(Rgb::BLACK);
                let bottom = canvas.pixel(x, row * 2 + 1).unwrap_or(Rgb::BLACK);
                out.queue(SetColors(Colors::new(self.shade(top), self.shade(bottom))))?;
                out.queue(Print('▀'))?;
            }
        }
        out.queue(ResetColor)?;
        out.flush()
    }
}

impl MatrixDevice for TerminalDevice {
    fn render(&mut self, canvas: &Canvas) -> Result<(), SinkError> {
        self.draw(canvas)
            .map_err(|e| SinkError::Render(e.to_string()))
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let _ = restore_screen(&mut io::stdout());
    }
}

impl Drop for TerminalDevice {
    fn drop(&mut self) {
        self.close();
    }
}

// ── Tests ────────────────────────────────────────────────────────
