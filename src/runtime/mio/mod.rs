//! mio-based sequential acceptor.
//!
//! Readiness-based I/O using mio (epoll on Linux, kqueue on macOS). One
//! thread, one active session at a time.

mod event_loop;

pub use event_loop::Acceptor;

use crate::config::Config;
use crate::runtime::{listener, signal};
use std::io;
use tracing::info;

/// Run the server using the mio backend until interrupted.
pub fn run(config: &Config) -> io::Result<()> {
    let listener = listener::bind(&config.listen_addr(), config.backlog)?;
    let acceptor = Acceptor::new(listener, config.read_size)?;
    signal::install(&acceptor.shutdown_handle())?;

    info!(
        addr = %acceptor.local_addr()?,
        backlog = config.backlog,
        "Listening (sequential)"
    );

    acceptor.run()
}
