//! mio event loop implementation.
//!
//! Single-threaded and sequential: the loop accepts one connection, runs
//! its session until it closes, then drains whatever else is pending on the
//! listener. While a session is active the listener is not serviced.
//!
//! mio readiness is edge-triggered, so reads and accepts always run until
//! `WouldBlock`.

use crate::runtime::signal::ShutdownHandle;
use crate::runtime::{CloseReason, Session};
use bytes::{Buf, BytesMut};
use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token, Waker};
use std::io::{self, Read, Write};
use std::net::SocketAddr;
use tracing::{debug, error, info, warn};

const LISTENER_TOKEN: Token = Token(0);
const WAKER_TOKEN: Token = Token(1);
const SESSION_TOKEN: Token = Token(2);

/// Owns the listening socket and serves one session at a time.
pub struct Acceptor {
    poll: Poll,
    events: Events,
    listener: TcpListener,
    shutdown: ShutdownHandle,
    read_size: usize,
}

/// Outcome of waiting on the session socket.
enum Wait {
    Ready,
    Shutdown,
}

impl Acceptor {
    /// Take ownership of a non-blocking std listener.
    pub fn new(listener: std::net::TcpListener, read_size: usize) -> io::Result<Self> {
        let poll = Poll::new()?;
        let mut listener = TcpListener::from_std(listener);
        poll.registry()
            .register(&mut listener, LISTENER_TOKEN, Interest::READABLE)?;
        let waker = Waker::new(poll.registry(), WAKER_TOKEN)?;

        Ok(Self {
            poll,
            events: Events::with_capacity(64),
            listener,
            shutdown: ShutdownHandle::new(waker),
            read_size: read_size.max(1),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Handle that stops `run` from another thread.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Accept and serve connections until shutdown is requested.
    ///
    /// The listener is closed when this returns, on every path.
    pub fn run(mut self) -> io::Result<()> {
        loop {
            if self.shutdown.is_requested() {
                break;
            }

            match self.poll.poll(&mut self.events, None) {
                Ok(()) => {}
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }

            if self
                .events
                .iter()
                .any(|event| event.token() == LISTENER_TOKEN)
            {
                self.accept_pending();
            }
        }

        info!("Shutting down");
        Ok(())
    }

    fn accept_pending(&mut self) {
        while !self.shutdown.is_requested() {
            match self.listener.accept() {
                Ok((stream, peer)) => self.serve(stream, peer),
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                    break;
                }
            }
        }
    }

    /// Run one session to completion. Errors only end this session.
    fn serve(&mut self, mut stream: TcpStream, peer: SocketAddr) {
        info!(peer = %peer, "Client connected");
        let mut session = Session::new(peer);

        if let Err(e) = self.drive(&mut stream, &mut session) {
            warn!(peer = %session.peer(), error = %e, "Session I/O error");
            session.close(CloseReason::Error);
        }

        if let Err(e) = self.poll.registry().deregister(&mut stream) {
            debug!(peer = %peer, error = %e, "Failed to deregister connection");
        }
    }

    fn drive(&mut self, stream: &mut TcpStream, session: &mut Session) -> io::Result<()> {
        self.poll.registry().register(
            stream,
            SESSION_TOKEN,
            Interest::READABLE | Interest::WRITABLE,
        )?;

        let mut buf = vec![0u8; self.read_size];
        let mut out = BytesMut::new();

        loop {
            loop {
                let n = match stream.read(&mut buf) {
                    Ok(0) => {
                        session.end_of_stream();
                        return Ok(());
                    }
                    Ok(n) => n,
                    Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                    Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {
                        if self.shutdown.is_requested() {
                            session.close(CloseReason::Shutdown);
                            return Ok(());
                        }
                        continue;
                    }
                    Err(e) => return Err(e),
                };

                session.feed(&buf[..n], &mut out).map_err(io::Error::other)?;
                if !self.flush(stream, &mut out)? {
                    session.close(CloseReason::Shutdown);
                    return Ok(());
                }
                if !session.is_open() {
                    return Ok(());
                }
            }

            if let Wait::Shutdown = self.wait()? {
                session.close(CloseReason::Shutdown);
                return Ok(());
            }
        }
    }

    /// Write all pending replies. Returns false if shutdown interrupted it.
    fn flush(&mut self, stream: &mut TcpStream, out: &mut BytesMut) -> io::Result<bool> {
        while !out.is_empty() {
            match stream.write(&out[..]) {
                Ok(0) => {
                    return Err(io::Error::new(io::ErrorKind::WriteZero, "write returned 0"));
                }
                Ok(n) => out.advance(n),
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    if let Wait::Shutdown = self.wait()? {
                        return Ok(false);
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {
                    if self.shutdown.is_requested() {
                        return Ok(false);
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Ok(true)
    }

    /// Block until the session socket is ready or shutdown is requested.
    ///
    /// Listener events seen here are dropped; `accept_pending` drains the
    /// backlog after the session ends.
    fn wait(&mut self) -> io::Result<Wait> {
        loop {
            match self.poll.poll(&mut self.events, None) {
                Ok(()) => {}
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }

            if self.shutdown.is_requested() {
                return Ok(Wait::Shutdown);
            }
            if self
                .events
                .iter()
                .any(|event| event.token() == SESSION_TOKEN)
            {
                return Ok(Wait::Ready);
            }
        }
    }
}
