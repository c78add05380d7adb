// SPDX-License-Identifier: MIT
//
// Signal flags: termination and resize, observed from the read loop.
//
// Handlers only store into an `AtomicBool`, which is async-signal-safe, and
// the work happens on the main thread. The read loop wakes at least once
// per read timeout, so it sees a raised flag within one tick and leaves
// through the raw-mode guard like any other exit. No second thread and no
// terminal calls inside a handler.
//
// Repeated terminating signals only set the flag again. Exiting from a
// handler would skip the guard and leave the terminal raw; SIGKILL is the
// way to stop a wedged loop.
//
// ISIG is off in raw mode, so Ctrl-C arrives as a byte and not as SIGINT.
// SIGINT is still watched for `kill -INT` from outside.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM, SIGWINCH};
use signal_hook::flag;

/// Signals that end the editor loop.
pub const TERMINATE_SIGNALS: [libc::c_int; 4] = [SIGTERM, SIGHUP, SIGINT, SIGQUIT];

/// Flags raised by signal handlers and polled by the editor loop.
///
/// `SignalFlags::default()` registers nothing, which is what tests want.
#[derive(Debug, Clone, Default)]
pub struct SignalFlags {
    terminate: Arc<AtomicBool>,
    resize: Arc<AtomicBool>,
}

impl SignalFlags {
    /// Register handlers for the terminating signals and SIGWINCH.
    ///
    /// # Errors
    ///
    /// Returns an error if a handler cannot be registered.
    pub fn install() -> io::Result<Self> {
        let flags = Self::default();

        for signal in TERMINATE_SIGNALS {
            flag::register(signal, Arc::clone(&flags.terminate))?;
        }
        flag::register(SIGWINCH, Arc::clone(&flags.resize))?;

        Ok(flags)
    }

    /// Whether a terminating signal has arrived.
    #[must_use]
    pub fn terminate_requested(&self) -> bool {
        self.terminate.load(Ordering::Relaxed)
    }

    /// Consume a pending resize notification.
    #[must_use]
    pub fn take_resize(&self) -> bool {
        self.resize.swap(false, Ordering::Relaxed)
    }

    /// Raise the terminate flag without a signal.
    pub fn request_terminate(&self) {
        self.terminate.store(true, Ordering::Relaxed);
    }

    /// Raise the resize flag without a signal.
    pub fn request_resize(&self) {
        self.resize.store(true, Ordering::Relaxed);
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
