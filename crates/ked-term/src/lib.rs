// SPDX-License-Identifier: MIT
//
// ked-term: terminal control for ked.
//
// Everything that touches the controlling terminal lives here: opening the
// tty device, snapshotting and restoring its line discipline, the raw-mode
// guard, the escape sequence channel, and the geometry probe that finds
// the screen size by parking the cursor in the bottom-right corner and
// asking the terminal where it ended up.
//
// Talks to /dev/tty directly through termios rather than through stdin and
// stdout, so the editor keeps working when those are redirected. No TUI
// framework sits in between; every byte written is an escape sequence we
// chose.

#[cfg(not(unix))]
compile_error!("ked-term drives a POSIX terminal device and only builds on Unix");

pub mod ansi;
pub mod channel;
pub mod device;
pub mod error;
pub mod fake;
pub mod geometry;
pub mod guard;
pub mod mode;
pub mod signals;

pub use channel::EscapeChannel;
pub use device::{TerminalDevice, TerminalIo};
pub use error::{Error, Result};
pub use geometry::{CursorPosition, Geometry, GeometryStrategy};
pub use guard::RawModeGuard;
pub use mode::{ReadPolicy, TerminalMode};
