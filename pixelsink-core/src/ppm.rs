//! Binary PPM (`P6`) frame decoder.
//!
//! Each datagram carries one complete image: the `P6` magic,
//! whitespace-separated decimal width / height / maxval, a single
//! whitespace byte, then tightly packed RGB rows. `#` comments between
//! header tokens are honored per the netpbm spec.
//!
//! Decoding is pure and synchronous. The declared dimensions are
//! checked against the single-datagram ceiling before any pixel memory
//! is allocated, so a hostile header cannot force a large allocation.

use bytes::Bytes;

use crate::error::DecodeError;

/// Largest pixel payload a single datagram can carry.
///
/// Doubles as the receive buffer size: an image that does not fit in
/// one datagram cannot exist on this transport.
pub const MAX_IMAGE_BYTES: usize = 65535;

const MAGIC: &[u8; 2] = b"P6";

// ── Frame ────────────────────────────────────────────────────────

/// One decoded raster image extracted from a single datagram.
///
/// Ephemeral: blitted onto the canvas once and discarded.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Tightly packed RGB rows, `width * height * 3` bytes.
    pub data: Bytes,
}

// ── Decoding ─────────────────────────────────────────────────────

/// Decode a `P6` payload into a [`Frame`].
pub fn decode(payload: &[u8]) -> Result<Frame, DecodeError> {
    if payload.len() < MAGIC.len() {
        return Err(DecodeError::InvalidHeader("shorter than magic"));
    }
    if &payload[..2] != MAGIC {
        return Err(DecodeError::UnsupportedFormat {
            magic: [payload[0], payload[1]],
        });
    }

    let mut scanner = Scanner {
        buf: payload,
        pos: MAGIC.len(),
    };
    let width = scanner.field("unparsable width")?;
    let height = scanner.field("unparsable height")?;
    let maxval = scanner.field("unparsable maxval")?;
    scanner.header_terminator()?;

    if width == 0 || height == 0 {
        return Err(DecodeError::InvalidHeader("zero dimension"));
    }
    if maxval == 0 || maxval > 255 {
        return Err(DecodeError::InvalidHeader("maxval out of range"));
    }

    let pixel_bytes = u64::from(width)
        .checked_mul(u64::from(height))
        .and_then(|px| px.checked_mul(3))
        .filter(|&bytes| bytes <= MAX_IMAGE_BYTES as u64)
        .ok_or(DecodeError::DimensionsTooLarge {
            width,
            height,
            max_bytes: MAX_IMAGE_BYTES,
        })? as usize;

    let rest = &payload[scanner.pos..];
    if rest.len() < pixel_bytes {
        return Err(DecodeError::TruncatedPayload {
            expected: pixel_bytes,
            actual: rest.len(),
        });
    }

    // Trailing bytes beyond the pixel payload are tolerated.
    Ok(Frame {
        width,
        height,
        data: Bytes::copy_from_slice(&rest[..pixel_bytes]),
    })
}

// ── Header scanner ───────────────────────────────────────────────

struct Scanner<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl Scanner<'_> {
    /// Skip whitespace and `#` comments preceding a header token.
    fn skip_separators(&mut self) {
        while let Some(&b) = self.buf.get(self.pos) {
            if b.is_ascii_whitespace() {
                self.pos += 1;
            } else if b == b'#' {
                while self.pos < self.buf.len() && self.buf[self.pos] != b'\n' {
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    /// Parse the next decimal header field.
    fn field(&mut self, reason: &'static str) -> Result<u32, DecodeError> {
        self.skip_separators();
        let start = self.pos;
        while self.pos < self.buf.len() && self.buf[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(DecodeError::InvalidHeader(reason));
        }
        std::str::from_utf8(&self.buf[start..self.pos])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or(DecodeError::InvalidHeader(reason))
    }

    /// Consume the single whitespace byte separating maxval from the
    /// pixel data.
    fn header_terminator(&mut self) -> Result<(), DecodeError> {
        match self.buf.get(self.pos) {
            Some(b) if b.is_ascii_whitespace() => {
                self.pos += 1;
                Ok(())
            }
            _ => Err(DecodeError::InvalidHeader("missing header terminator")),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
