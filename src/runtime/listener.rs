//! Listening socket setup.

use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};

/// Bind a non-blocking TCP listener with `SO_REUSEADDR` set.
///
/// `addr` may be any `host:port` that resolves; the first resolved address
/// is used.
pub fn bind(addr: &str, backlog: i32) -> io::Result<TcpListener> {
    let addr: SocketAddr = addr.to_socket_addrs()?.next().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("address resolved to nothing: {addr}"),
        )
    })?;

    let socket = socket2::Socket::new(
        match addr {
            SocketAddr::V4(_) => socket2::Domain::IPV4,
            SocketAddr::V6(_) => socket2::Domain::IPV6,
        },
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog)?;

    Ok(socket.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_ephemeral() {
        let listener = bind("127.0.0.1:0", 1).unwrap();
        let addr = listener.local_addr().unwrap();
        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);

        // Non-blocking: nothing pending yet.
        let err = listener.accept().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
    }

    #[test]
    fn test_reuse_address() {
        let socket = socket2::Socket::from(bind("127.0.0.1:0", 1).unwrap());
        assert!(socket.reuse_address().unwrap());
    }

    #[test]
    fn test_bad_address() {
        assert!(bind("not an address", 1).is_err());
    }
}
