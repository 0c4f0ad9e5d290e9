//! MQTT framing handler for the Tokio runtime.

use bytes::BytesMut;
use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tracing::warn;

use crate::runtime::{CloseReason, Session};

/// Handle one connection until its session closes.
///
/// The session is closed on end of stream, on DISCONNECT, on an I/O error,
/// or when `shutdown` changes. The closed session is returned for its
/// counters; dropping `stream` closes the connection.
pub async fn handle_connection<S>(
    mut stream: S,
    peer: SocketAddr,
    read_size: usize,
    shutdown: watch::Receiver<bool>,
) -> Session
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut session = Session::new(peer);

    if let Err(e) = drive(&mut stream, &mut session, read_size, shutdown).await {
        warn!(peer = %peer, error = %e, "Session I/O error");
        session.close(CloseReason::Error);
    }

    session
}

async fn drive<S>(
    stream: &mut S,
    session: &mut Session,
    read_size: usize,
    mut shutdown: watch::Receiver<bool>,
) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; read_size.max(1)];
    let mut out = BytesMut::with_capacity(64);

    while session.is_open() {
        let n = tokio::select! {
            res = stream.read(&mut buf) => res?,
            _ = shutdown.changed() => {
                session.close(CloseReason::Shutdown);
                break;
            }
        };

        if n == 0 {
            session.end_of_stream();
            break;
        }

        session.feed(&buf[..n], &mut out).map_err(io::Error::other)?;

        if !out.is_empty() {
            // A peer that stops reading must not pin the task past shutdown.
            tokio::select! {
                res = stream.write_all(&out) => res?,
                _ = shutdown.changed() => {
                    session.close(CloseReason::Shutdown);
                    break;
                }
            }
            out.clear();
        }
    }

    Ok(())
}
