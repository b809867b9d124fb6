//! Domain-specific error types for the pixel pipeline.
//!
//! All fallible operations return `Result<T, SinkError>`.
//! Decode failures are local to a single datagram and never end the
//! serving loop; socket and device failures do.

use thiserror::Error;

/// The canonical error type for the pixelsink pipeline.
#[derive(Debug, Error)]
pub enum SinkError {
    // ── Transport Errors ─────────────────────────────────────────
    /// The UDP socket could not be bound at startup.
    #[error("failed to bind UDP socket: {0}")]
    Bind(std::io::Error),

    /// The socket failed while receiving. Ends the serving loop.
    #[error("socket read error: {0}")]
    SocketRead(std::io::Error),

    // ── Frame Errors ─────────────────────────────────────────────
    /// A datagram payload was not a decodable image.
    #[error("frame decode error: {0}")]
    Decode(#[from] DecodeError),

    // ── Device Errors ────────────────────────────────────────────
    /// The matrix configuration failed validation.
    #[error("invalid matrix configuration: {0}")]
    InvalidConfig(&'static str),

    /// The display device could not be acquired.
    #[error("failed to open display device: {0}")]
    DeviceOpen(String),

    /// The display device rejected a render.
    #[error("render failed: {0}")]
    Render(String),

    // ── Wiring Errors ────────────────────────────────────────────
    /// The pipeline event channel closed unexpectedly.
    #[error("pipeline channel closed")]
    ChannelClosed,
}

// ── DecodeError ──────────────────────────────────────────────────

/// Typed rejection reasons from the image decoder.
///
/// Every variant is scoped to one datagram: the receive loop logs the
/// error, drops the payload, and moves on to the next receive.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The payload does not start with the binary PPM magic (`P6`).
    #[error("unsupported image format: magic {magic:?}")]
    UnsupportedFormat { magic: [u8; 2] },

    /// A header field is missing, unparsable, or out of range.
    #[error("invalid header: {0}")]
    InvalidHeader(&'static str),

    /// The declared dimensions cannot fit inside a single datagram.
    #[error("dimensions too large: {width}x{height} exceeds {max_bytes} pixel bytes")]
    DimensionsTooLarge {
        width: u32,
        height: u32,
        max_bytes: usize,
    },

    /// The pixel payload is shorter than the declared dimensions require.
    #[error("truncated payload: expected {expected} pixel bytes, got {actual}")]
    TruncatedPayload { expected: usize, actual: usize },
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = SinkError::DeviceOpen("permission denied".into());
        assert!(e.to_string().contains("permission denied"));

        let e = DecodeError::TruncatedPayload {
            expected: 48,
            actual: 12,
        };
        assert!(e.to_string().contains("48"));
        assert!(e.to_string().contains("12"));
    }

    #[test]
    fn decode_error_nests_into_sink_error() {
        let e: SinkError = DecodeError::InvalidHeader("missing maxval").into();
        assert!(matches!(e, SinkError::Decode(_)));
        assert!(e.to_string().contains("missing maxval"));
    }
}
