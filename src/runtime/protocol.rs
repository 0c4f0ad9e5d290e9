//! Frame dispatch for the runtimes.
//!
//! Maps a classified frame to the action the connection must take. Pure and
//! synchronous so both the mio loop and the Tokio handler share it.

use crate::protocols::mqtt::parser::{CONNACK, PINGRESP};
use crate::protocols::mqtt::{Frame, FrameKind};

/// Action for a dispatched frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessResult {
    /// Send these bytes to the peer and keep reading.
    Reply(&'static [u8]),
    /// Send nothing and close the connection.
    Close,
}

/// Dispatch a classified frame.
pub fn dispatch(frame: &Frame) -> ProcessResult {
    match frame.kind {
        FrameKind::Connect => ProcessResult::Reply(CONNACK),
        FrameKind::PingRequest => ProcessResult::Reply(PINGRESP),
        FrameKind::Disconnect => ProcessResult::Close,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(kind: FrameKind, len: usize) -> Frame {
        Frame { kind, len }
    }

    #[test]
    fn test_connect_replies_connack() {
        assert_eq!(
            dispatch(&frame(FrameKind::Connect, 20)),
            ProcessResult::Reply(&[0x20, 0x02, 0x00, 0x00])
        );
    }

    #[test]
    fn test_pingreq_replies_pingresp() {
        assert_eq!(
            dispatch(&frame(FrameKind::PingRequest, 2)),
            ProcessResult::Reply(&[0xD0, 0x00])
        );
    }

    #[test]
    fn test_disconnect_closes() {
        assert_eq!(
            dispatch(&frame(FrameKind::Disconnect, 2)),
            ProcessResult::Close
        );
    }
}
