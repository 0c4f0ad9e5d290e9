//! Server runtimes.
//!
//! Two acceptors share the same session logic:
//! - `mio`: single-threaded, one session at a time (default)
//! - `tasks`: Tokio, one task per connection
//!
//! Both share common abstractions:
//! - `Session`: per-connection state machine fed with raw bytes
//! - `protocol::dispatch`: frame to reply/close mapping
//! - `listener::bind`: the `SO_REUSEADDR` listening socket

mod connection;
pub mod listener;
pub mod mio;
pub mod protocol;
pub mod signal;
pub mod tasks;

pub use connection::{CloseReason, Session};
#[cfg(test)]
pub use connection::ConnState;

use crate::config::{Config, RuntimeType};

/// Run the server with the configured acceptor.
pub fn run(config: &Config) -> std::io::Result<()> {
    match config.runtime {
        RuntimeType::Mio => mio::run(config),
        RuntimeType::Tokio => tasks::run(config),
    }
}
