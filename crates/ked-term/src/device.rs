// SPDX-License-Identifier: MIT
//
// The terminal device, sole owner of the tty file descriptor.
//
// Safety: This module necessarily uses `unsafe` for termios (tcgetattr,
// tcsetattr) and ioctl (TIOCGWINSZ). These are the standard POSIX
// interfaces for terminal control; there is no safe alternative. Each
// unsafe block is a single FFI call on a descriptor we own.
#![allow(unsafe_code)]
//
// The device is opened from the controlling-terminal special file
// (`/dev/tty`) rather than borrowed from stdin/stdout, so redirecting those
// streams does not take the terminal away from the editor. It is opened
// with O_NOCTTY so opening never reassigns the controlling terminal.
//
// The descriptor lives in a `File`, which closes it exactly once on drop.
//
// Reads follow the VMIN/VTIME policy installed by the raw-mode guard: with
// VMIN = 0 a read that finds nothing before VTIME expires returns zero
// bytes. That is the "no input yet" outcome and is reported as `Ok(0)`,
// never as an error.
//
// Writes are a single write(2) call. A short write is an error, not
// something to finish later: the tail of a half-written escape sequence
// would land on screen as text.
//
// Panic safety: opening the device records its pristine mode in a global
// backup keyed by descriptor and installs a panic hook (once per process)
// that puts every open device's mode back before the original hook prints. Unwinding also drops any live
// guard, but the hook runs first and is what makes the panic message
// readable.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, Once};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::geometry::Geometry;
use crate::mode::TerminalMode;

/// The controlling-terminal special file.
pub const DEFAULT_DEVICE: &str = "/dev/tty";

// ─── TerminalIo ─────────────────────────────────────────────────────────────

/// Byte-level access to a terminal plus control of its line discipline.
///
/// Implemented by [`TerminalDevice`] for the real tty and by
/// [`FakeTerminal`](crate::fake::FakeTerminal) for tests.
pub trait TerminalIo {
    /// Read up to `buf.len()` bytes.
    ///
    /// Returns `Ok(0)` when the read timeout passes with nothing available.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReadFailed`] if the OS rejects the read.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Read a single byte, `None` on timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReadFailed`] if the OS rejects the read.
    fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        Ok((self.read(&mut byte)? == 1).then_some(byte[0]))
    }

    /// Write `bytes` in one call. Never retried.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WriteFailed`] or [`Error::ShortWrite`].
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()>;

    /// Snapshot the current line discipline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModeFailed`] if the mode cannot be read.
    fn capture_mode(&self) -> Result<TerminalMode>;

    /// Apply `mode` immediately, discarding unread input (TCSAFLUSH).
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModeFailed`] if the mode cannot be applied.
    fn apply_mode(&mut self, mode: &TerminalMode) -> Result<()>;

    /// Window size reported by the OS, if the platform offers one.
    fn window_size(&self) -> Option<Geometry> {
        None
    }
}

// ─── Panic-Safe Restore ─────────────────────────────────────────────────────

/// Pristine mode of every open device, for the panic hook.
///
/// The hook can't reach the devices or their guards, so it restores from
/// these copies instead. Behind a [`Mutex`], not `static mut`.
static PRISTINE: Mutex<Vec<(RawFd, libc::termios)>> = Mutex::new(Vec::new());

static PANIC_HOOK_INSTALLED: Once = Once::new();

fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            restore_pristine();
            original(info);
        }));
    });
}

fn remember_pristine(fd: RawFd, termios: libc::termios) {
    if let Ok(mut backup) = PRISTINE.lock() {
        backup.retain(|&(saved, _)| saved != fd);
        backup.push((fd, termios));
    }
}

fn forget_pristine(fd: RawFd) {
    if let Ok(mut backup) = PRISTINE.lock() {
        backup.retain(|&(saved, _)| saved != fd);
    }
}

#[cfg(test)]
fn has_pristine(fd: RawFd) -> bool {
    PRISTINE
        .lock()
        .is_ok_and(|backup| backup.iter().any(|&(saved, _)| saved == fd))
}

/// Put every pristine mode back. Best-effort, ignores errors.
fn restore_pristine() {
    if let Ok(backup) = PRISTINE.lock() {
        for (fd, termios) in backup.iter() {
            unsafe {
                let _ = libc::tcsetattr(*fd, libc::TCSAFLUSH, termios);
            }
        }
    }
}

// ─── TerminalDevice ─────────────────────────────────────────────────────────

/// An open terminal device.
///
/// # Example
///
/// ```no_run
/// use ked_term::{RawModeGuard, ReadPolicy, TerminalDevice};
///
/// let mut tty = TerminalDevice::open()?;
/// let guard = RawModeGuard::enter(&mut tty, ReadPolicy::default())?;
/// // ... byte-at-a-time I/O ...
/// guard.exit()?;
/// # Ok::<(), ked_term::Error>(())
/// ```
#[derive(Debug)]
pub struct TerminalDevice {
    file: File,
    path: PathBuf,
}

impl TerminalDevice {
    /// Open the controlling terminal.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceUnavailable`] if there is no controlling
    /// terminal.
    pub fn open() -> Result<Self> {
        Self::open_path(DEFAULT_DEVICE)
    }

    /// Open a specific terminal device.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceUnavailable`] if the path cannot be opened
    /// read-write or is not a terminal.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let unavailable = |source| Error::DeviceUnavailable {
            path: path.to_path_buf(),
            source,
        };

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(path)
            .map_err(unavailable)?;

        let device = Self {
            file,
            path: path.to_path_buf(),
        };

        // tcgetattr doubles as the "is this a terminal" check (ENOTTY).
        let pristine = device.get_termios().map_err(unavailable)?;
        remember_pristine(device.file.as_raw_fd(), pristine);
        install_panic_hook();

        info!(path = %path.display(), "opened terminal device");
        Ok(device)
    }

    /// The path this device was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn get_termios(&self) -> io::Result<libc::termios> {
        let mut termios: libc::termios = unsafe { std::mem::zeroed() };
        if unsafe { libc::tcgetattr(self.file.as_raw_fd(), &raw mut termios) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(termios)
    }

    fn set_termios(&self, termios: &libc::termios) -> io::Result<()> {
        if unsafe { libc::tcsetattr(self.file.as_raw_fd(), libc::TCSAFLUSH, termios) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl TerminalIo for TerminalDevice {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.file.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if matches!(e.kind(), io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock) => {
                Ok(0)
            }
            Err(e) => Err(Error::ReadFailed(e)),
        }
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        match self.file.write(bytes) {
            Ok(n) if n == bytes.len() => Ok(()),
            Ok(n) => Err(Error::ShortWrite {
                written: n,
                expected: bytes.len(),
            }),
            Err(e) => Err(Error::WriteFailed(e)),
        }
    }

    fn capture_mode(&self) -> Result<TerminalMode> {
        self.get_termios()
            .map(|t| TerminalMode::from_termios(&t))
            .map_err(|source| Error::ModeFailed {
                op: "tcgetattr",
                source,
            })
    }

    fn apply_mode(&mut self, mode: &TerminalMode) -> Result<()> {
        // Start from the live struct so fields outside the snapshot keep
        // their current values.
        let mut termios = self.get_termios().map_err(|source| Error::ModeFailed {
            op: "tcgetattr",
            source,
        })?;
        mode.write_to(&mut termios);
        self.set_termios(&termios)
            .map_err(|source| Error::ModeFailed {
                op: "tcsetattr",
                source,
            })?;
        debug!(raw = mode.is_raw(), "applied terminal mode");
        Ok(())
    }

    fn window_size(&self) -> Option<Geometry> {
        let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
        let result = unsafe { libc::ioctl(self.file.as_raw_fd(), libc::TIOCGWINSZ, &raw mut ws) };
        if result == 0 {
            Geometry::new(ws.ws_row, ws.ws_col)
        } else {
            None
        }
    }
}

impl Drop for TerminalDevice {
    fn drop(&mut self) {
        forget_pristine(self.file.as_raw_fd());
        debug!(path = %self.path.display(), "closed terminal device");
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
//
// Nothing here assumes a controlling terminal exists: CI runs without one.
// The real-device paths are exercised over a pseudo-terminal in tests/pty.rs.
