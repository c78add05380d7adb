// SPDX-License-Identifier: MIT
//
// Error taxonomy for terminal control.
//
// Every variant here is fatal to the editor loop. The one expected
// non-event, a read that times out with nothing available, is not an
// error at all: it surfaces as `Ok(0)` from `TerminalIo::read` and
// `Ok(None)` from `TerminalIo::read_byte`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong while driving the terminal.
#[derive(Debug, Error)]
pub enum Error {
    /// The terminal device could not be opened, or is not a terminal.
    #[error("terminal device {} is unavailable", .path.display())]
    DeviceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// `tcgetattr` or `tcsetattr` was rejected by the OS.
    #[error("{op} failed on the terminal device")]
    ModeFailed {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    /// Reading from the device failed for a reason other than a timeout.
    #[error("reading from the terminal failed")]
    ReadFailed(#[source] io::Error),

    /// The OS rejected a write.
    #[error("writing to the terminal failed")]
    WriteFailed(#[source] io::Error),

    /// The OS accepted only part of a write. Never retried: the tail of an
    /// escape sequence sent on its own would be interpreted as text.
    #[error("short write to the terminal: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    /// The cursor position report was malformed or never arrived.
    #[error("geometry probe failed: {0}")]
    ProbeFailed(String),
}

/// Result alias used throughout ked-term.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_unavailable_names_the_path() {
        let err = Error::DeviceUnavailable {
            path: PathBuf::from("/dev/tty"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert_eq!(err.to_string(), "terminal device /dev/tty is unavailable");
    }

    #[test]
    fn short_write_reports_counts() {
        let err = Error::ShortWrite {
            written: 3,
            expected: 7,
        };
        assert_eq!(err.to_string(), "short write to the terminal: 3 of 7 bytes");
    }

    #[test]
    fn mode_failed_keeps_source() {
        let err = Error::ModeFailed {
            op: "tcsetattr",
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().starts_with("tcsetattr"));
    }

    #[test]
    fn probe_failed_message() {
        let err = Error::ProbeFailed("no reply".into());
        assert_eq!(err.to_string(), "geometry probe failed: no reply");
    }
}
