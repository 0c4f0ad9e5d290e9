//! Protocol implementations.
//!
//! Each protocol has a parser module used by the runtime event loops and a
//! handler module for the Tokio runtime.
//!
//! - `mqtt`: fixed-prefix MQTT control-packet framing (CONNECT, PINGREQ, DISCONNECT)

pub mod mqtt;
