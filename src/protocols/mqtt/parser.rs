//! MQTT control-packet frame reader.

use bytes::BytesMut;
use std::fmt;

/// Accumulated length at which any prefix is classified as CONNECT.
pub const CONNECT_LEN: usize = 20;

/// Accumulated length at which PINGREQ / DISCONNECT markers are checked.
pub const SHORT_FRAME_LEN: usize = 2;

/// First byte of a PINGREQ packet.
pub const PINGREQ_MARKER: u8 = 0xC0;

/// First byte of a DISCONNECT packet.
pub const DISCONNECT_MARKER: u8 = 0xE0;

/// CONNACK: session present 0, return code 0 (accepted).
pub const CONNACK: &[u8] = &[0x20, 0x02, 0x00, 0x00];

/// PINGRESP.
pub const PINGRESP: &[u8] = &[0xD0, 0x00];

/// Kind of a classified control packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    Connect,
    PingRequest,
    Disconnect,
}

impl FrameKind {
    /// Protocol name of the packet, as printed to the console.
    pub fn name(self) -> &'static str {
        match self {
            FrameKind::Connect => "CONNECT",
            FrameKind::PingRequest => "PINGREQ",
            FrameKind::Disconnect => "DISCONNECT",
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A classified frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    /// Bytes that were buffered when the frame was classified.
    pub len: usize,
}

/// Incremental classifier over a connection's byte stream.
///
/// Bytes are pushed one at a time. After every byte the buffered prefix is
/// checked against the rules; on a match the whole buffer is discarded and a
/// [`Frame`] is returned. Because CONNECT wins at [`CONNECT_LEN`] bytes the
/// buffer never holds more than that, and its allocation never grows.
#[derive(Debug)]
pub struct FrameReader {
    buffer: BytesMut,
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameReader {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(CONNECT_LEN),
        }
    }

    /// Append one byte and classify the buffered prefix.
    pub fn push(&mut self, byte: u8) -> Option<Frame> {
        debug_assert!(self.buffer.len() < CONNECT_LEN);
        self.buffer.extend_from_slice(&[byte]);

        let kind = classify(&self.buffer)?;
        let frame = Frame {
            kind,
            len: self.buffer.len(),
        };
        self.buffer.clear();
        Some(frame)
    }

    /// Number of bytes buffered toward the next frame.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

/// Classify a buffered prefix. Order matters: length first, then markers.
fn classify(buffer: &[u8]) -> Option<FrameKind> {
    if buffer.len() >= CONNECT_LEN {
        Some(FrameKind::Connect)
    } else if buffer.len() >= SHORT_FRAME_LEN && buffer[0] == PINGREQ_MARKER {
        Some(FrameKind::PingRequest)
    } else if buffer.len() >= SHORT_FRAME_LEN && buffer[0] == DISCONNECT_MARKER {
        Some(FrameKind::Disconnect)
    } else {
        None
    }
}
