//! Accept loop for the Tokio runtime.

use crate::protocols::mqtt::handle_connection;
use std::future::Future;
use std::io;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info};

/// Accept connections until `shutdown` resolves, spawning a task for each.
///
/// At most `max_connections` sessions run at once; further connections wait
/// in the listen backlog. On shutdown every open session is closed and
/// awaited before this returns.
pub async fn serve<F>(
    listener: TcpListener,
    max_connections: usize,
    read_size: usize,
    shutdown: F,
) -> io::Result<()>
where
    F: Future<Output = ()>,
{
    let connection_limit = Arc::new(Semaphore::new(max_connections.max(1)));
    let (stop_tx, stop_rx) = watch::channel(false);
    let mut sessions = JoinSet::new();
    tokio::pin!(shutdown);

    loop {
        let permit = tokio::select! {
            _ = &mut shutdown => break,
            permit = connection_limit.clone().acquire_owned() => {
                permit.map_err(io::Error::other)?
            }
        };

        let (stream, peer) = tokio::select! {
            _ = &mut shutdown => break,
            Some(_) = sessions.join_next() => continue,
            res = listener.accept() => match res {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                    continue;
                }
            },
        };

        info!(peer = %peer, "Client connected");
        let stop = stop_rx.clone();

        sessions.spawn(async move {
            let session = handle_connection(stream, peer, read_size, stop).await;
            drop(permit);
            session
        });
    }

    info!(active = sessions.len(), "Shutting down");
    let _ = stop_tx.send(true);
    while sessions.join_next().await.is_some() {}

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::listener;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;
    use tokio::task::JoinHandle;

    struct TestServer {
        addr: SocketAddr,
        stop: oneshot::Sender<()>,
        task: JoinHandle<io::Result<()>>,
    }

    impl TestServer {
        fn start(max_connections: usize) -> Self {
            let listener =
                TcpListener::from_std(listener::bind("127.0.0.1:0", 8).unwrap()).unwrap();
            let addr = listener.local_addr().unwrap();
            let (stop, stopped) = oneshot::channel::<()>();
            let task = tokio::spawn(serve(listener, max_connections, 1024, async move {
                let _ = stopped.await;
            }));
            Self { addr, stop, task }
        }

        async fn stop(self) {
            self.stop.send(()).unwrap();
            self.task.await.unwrap().unwrap();
        }
    }

    #[tokio::test]
    async fn test_connect_and_ping() {
        let server = TestServer::start(4);
        let mut client = TcpStream::connect(server.addr).await.unwrap();

        client.write_all(&[0x41; 20]).await.unwrap();
        let mut connack = [0u8; 4];
        client.read_exact(&mut connack).await.unwrap();
        assert_eq!(connack, [0x20, 0x02, 0x00, 0x00]);

        client.write_all(&[0xC0, 0x00]).await.unwrap();
        let mut pingresp = [0u8; 2];
        client.read_exact(&mut pingresp).await.unwrap();
        assert_eq!(pingresp, [0xD0, 0x00]);

        client.write_all(&[0xE0, 0x00]).await.unwrap();
        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());

        server.stop().await;
    }

    #[tokio::test]
    async fn test_sessions_run_concurrently() {
        let server = TestServer::start(4);
        let mut first = TcpStream::connect(server.addr).await.unwrap();
        let mut second = TcpStream::connect(server.addr).await.unwrap();

        // `first` stays open with a partial frame while `second` is served.
        first.write_all(&[0xC0]).await.unwrap();
        second.write_all(&[0xC0, 0x00]).await.unwrap();
        let mut reply = [0u8; 2];
        second.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply, [0xD0, 0x00]);

        first.write_all(&[0x00]).await.unwrap();
        first.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply, [0xD0, 0x00]);

        server.stop().await;
    }

    #[tokio::test]
    async fn test_shutdown_closes_open_sessions() {
        let server = TestServer::start(4);
        let mut client = TcpStream::connect(server.addr).await.unwrap();
        client.write_all(&[0xC0, 0x00]).await.unwrap();
        let mut reply = [0u8; 2];
        client.read_exact(&mut reply).await.unwrap();

        server.stop().await;

        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_connection_limit_defers_accept() {
        let server = TestServer::start(1);
        let mut first = TcpStream::connect(server.addr).await.unwrap();
        first.write_all(&[0xC0, 0x00]).await.unwrap();
        let mut reply = [0u8; 2];
        first.read_exact(&mut reply).await.unwrap();

        let mut second = TcpStream::connect(server.addr).await.unwrap();
        second.write_all(&[0xC0, 0x00]).await.unwrap();
        let waited = tokio::time::timeout(
            std::time::Duration::from_millis(200),
            second.read_exact(&mut reply),
        )
        .await;
        assert!(waited.is_err());

        drop(first);
        second.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply, [0xD0, 0x00]);

        server.stop().await;
    }
}
