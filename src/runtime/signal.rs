//! Process interrupt handling and shutdown requests.
//!
//! SIGINT and SIGTERM are routed to the acceptor's [`ShutdownHandle`]: the
//! handler sets its flag and wakes its poll through the `mio::Waker`, so a
//! signal landing between the flag check and `epoll_wait` is not lost.

use mio::Waker;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

static SIGNAL_TARGET: OnceLock<ShutdownHandle> = OnceLock::new();

extern "C" fn on_signal(_signum: libc::c_int) {
    // Atomic load, atomic store and an eventfd/kevent write: all
    // async-signal-safe.
    if let Some(handle) = SIGNAL_TARGET.get() {
        let _ = handle.shutdown();
    }
}

/// Route SIGINT/SIGTERM to `handle`.
///
/// Only one handle can be installed per process.
pub fn install(handle: &ShutdownHandle) -> io::Result<()> {
    SIGNAL_TARGET.set(handle.clone()).map_err(|_| {
        io::Error::new(
            io::ErrorKind::AlreadyExists,
            "signal handler already installed",
        )
    })?;

    for signum in [libc::SIGINT, libc::SIGTERM] {
        // SAFETY: `action` is fully initialized before use and the handler
        // only performs async-signal-safe operations.
        let rc = unsafe {
            let mut action: libc::sigaction = std::mem::zeroed();
            action.sa_sigaction = on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
            action.sa_flags = 0;
            libc::sigemptyset(&mut action.sa_mask);
            libc::sigaction(signum, &action, std::ptr::null_mut())
        };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

/// Requests shutdown of a mio acceptor from any thread or a signal handler.
#[derive(Clone)]
pub struct ShutdownHandle {
    requested: Arc<AtomicBool>,
    waker: Arc<Waker>,
}

impl ShutdownHandle {
    pub fn new(waker: Waker) -> Self {
        Self {
            requested: Arc::new(AtomicBool::new(false)),
            waker: Arc::new(waker),
        }
    }

    /// Ask the acceptor to stop and wake its poll.
    pub fn shutdown(&self) -> io::Result<()> {
        self.requested.store(true, Ordering::SeqCst);
        self.waker.wake()
    }

    /// True once `shutdown` was called.
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}
