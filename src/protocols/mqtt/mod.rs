//! MQTT-style control-packet framing.
//!
//! Recognizes three control packets from a byte stream by prefix length and
//! marker byte, and acknowledges them with fixed replies:
//!
//! ```text
//! Condition                        Frame         Reply
//! buffered >= 20 bytes             CONNECT       20 02 00 00  (CONNACK, accepted)
//! buffered >= 2, byte[0] == C0     PINGREQ       D0 00        (PINGRESP)
//! buffered >= 2, byte[0] == E0     DISCONNECT    (none, connection closed)
//! ```
//!
//! The length check runs first, so 20 bytes of anything is a CONNECT.
//! Bytes that match none of the rules keep accumulating; they are never an
//! error.

pub mod handler;
pub mod parser;

pub use handler::handle_connection;
pub use parser::{Frame, FrameKind, FrameReader};
