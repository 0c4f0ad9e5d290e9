//! Session state machine for a single client connection.
//!
//! A session owns the frame reader for its connection and is either open
//! (reading and dispatching frames) or closed. Closed is terminal. The
//! session does no I/O itself: runtimes feed it the bytes they read and
//! write out whatever replies it produces.

use crate::protocols::mqtt::{FrameKind, FrameReader};
use crate::runtime::protocol::{dispatch, ProcessResult};
use bytes::BytesMut;
use std::fmt;
use std::net::SocketAddr;
use thiserror::Error;
use tracing::{debug, info};

/// Why a session closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Peer closed its side (zero-byte read).
    EndOfStream,
    /// A DISCONNECT frame was dispatched.
    Disconnect,
    /// An I/O error on the connection.
    Error,
    /// The server is shutting down.
    Shutdown,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CloseReason::EndOfStream => "end of stream",
            CloseReason::Disconnect => "disconnect",
            CloseReason::Error => "error",
            CloseReason::Shutdown => "shutdown",
        })
    }
}

/// Current state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Open,
    Closed(CloseReason),
}

/// Counters kept for the lifetime of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub bytes_received: usize,
    pub connects: usize,
    pub pings: usize,
    pub disconnects: usize,
}

impl SessionStats {
    fn record(&mut self, kind: FrameKind) {
        match kind {
            FrameKind::Connect => self.connects += 1,
            FrameKind::PingRequest => self.pings += 1,
            FrameKind::Disconnect => self.disconnects += 1,
        }
    }

    pub fn frames(&self) -> usize {
        self.connects + self.pings + self.disconnects
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session already closed ({0})")]
    Closed(CloseReason),
}

/// Per-connection protocol state.
#[derive(Debug)]
pub struct Session {
    peer: SocketAddr,
    reader: FrameReader,
    state: ConnState,
    stats: SessionStats,
}

impl Session {
    /// Create a session for a freshly accepted connection. Starts open.
    pub fn new(peer: SocketAddr) -> Self {
        Self {
            peer,
            reader: FrameReader::new(),
            state: ConnState::Open,
            stats: SessionStats::default(),
        }
    }

    /// Feed bytes read from the connection.
    ///
    /// Replies are appended to `out`. Returns the state after the input was
    /// processed; once a DISCONNECT is dispatched the rest of `input` is
    /// ignored.
    pub fn feed(&mut self, input: &[u8], out: &mut BytesMut) -> Result<ConnState, SessionError> {
        if let ConnState::Closed(reason) = self.state {
            return Err(SessionError::Closed(reason));
        }

        for &byte in input {
            self.stats.bytes_received += 1;

            let Some(frame) = self.reader.push(byte) else {
                continue;
            };

            info!(peer = %self.peer, len = frame.len, "{}", frame.kind);
            self.stats.record(frame.kind);

            match dispatch(&frame) {
                ProcessResult::Reply(reply) => out.extend_from_slice(reply),
                ProcessResult::Close => {
                    self.close(CloseReason::Disconnect);
                    break;
                }
            }
        }

        Ok(self.state)
    }

    /// The peer half-closed the connection.
    pub fn end_of_stream(&mut self) {
        self.close(CloseReason::EndOfStream);
    }

    /// Close the session. Has no effect if it is already closed.
    pub fn close(&mut self, reason: CloseReason) {
        if self.state != ConnState::Open {
            return;
        }
        self.state = ConnState::Closed(reason);

        debug!(
            peer = %self.peer,
            %reason,
            frames = self.stats.frames(),
            connects = self.stats.connects,
            pings = self.stats.pings,
            bytes = self.stats.bytes_received,
            pending = self.reader.buffered(),
            "Session closed"
        );
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnState::Open
    }

    #[cfg(test)]
    pub fn state(&self) -> ConnState {
        self.state
    }

    #[cfg(test)]
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}
