//! Tokio-based concurrent acceptor.
//!
//! One task per accepted connection. Sessions share no mutable state; the
//! only coordination is the connection limit and the shutdown broadcast.

mod event_loop;

pub use event_loop::serve;

use crate::config::Config;
use crate::runtime::listener;
use std::io;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Run the server on a multi-threaded Tokio runtime until interrupted.
pub fn run(config: &Config) -> io::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("mini-mqttd-worker")
        .build()?;

    runtime.block_on(async {
        let listener = TcpListener::from_std(listener::bind(
            &config.listen_addr(),
            config.backlog,
        )?)?;

        info!(
            addr = %listener.local_addr()?,
            backlog = config.backlog,
            max_connections = config.max_connections,
            "Listening (task per connection)"
        );

        serve(
            listener,
            config.max_connections,
            config.read_size,
            shutdown_signal(),
        )
        .await
    })
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
