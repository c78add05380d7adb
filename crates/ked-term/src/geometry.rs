// SPDX-License-Identifier: MIT
//
// Terminal geometry and the cursor-overshoot probe.
//
// Without a window-size ioctl, the way to learn the screen size is to ask
// the terminal where its cursor is after pushing it as far right and down
// as it will go. The terminal clamps `CSI 999C` / `CSI 999B` to the last
// column and row, so the position report that follows *is* the size.
//
// The reply must parse as exactly two positive integers. Anything else is a
// probe failure. There is no default size to fall back to, because a wrong
// size would put every later cursor move in the wrong place.
//
// `detect` runs the probe under its own raw-mode guard with a three-second
// read timeout, whatever policy the caller's loop uses. A reply crossing a
// slow link (ssh, serial) easily takes longer than one editor tick.

use std::fmt;

use tracing::{debug, info};

use crate::ansi;
use crate::channel::EscapeChannel;
use crate::device::TerminalIo;
use crate::error::{Error, Result};
use crate::guard::RawModeGuard;
use crate::mode::ReadPolicy;

/// How far past the edge the probe pushes the cursor.
const OVERSHOOT: u16 = 999;

/// Read policy while waiting for the cursor position report.
pub const PROBE_READ_POLICY: ReadPolicy = ReadPolicy::polling(30);

// ─── Geometry ───────────────────────────────────────────────────────────────

/// Terminal size in character cells. Both dimensions are at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Geometry {
    rows: u16,
    cols: u16,
}

impl Geometry {
    /// `None` if either dimension is zero.
    #[must_use]
    pub const fn new(rows: u16, cols: u16) -> Option<Self> {
        if rows == 0 || cols == 0 {
            None
        } else {
            Some(Self { rows, cols })
        }
    }

    #[inline]
    #[must_use]
    pub const fn rows(self) -> u16 {
        self.rows
    }

    #[inline]
    #[must_use]
    pub const fn cols(self) -> u16 {
        self.cols
    }

    /// Clamp a 1-indexed position onto the screen, the way a terminal
    /// clamps cursor movement.
    #[must_use]
    pub fn clamp(self, row: u16, col: u16) -> CursorPosition {
        CursorPosition {
            row: row.clamp(1, self.rows),
            col: col.clamp(1, self.cols),
        }
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

/// A 1-indexed cursor position as reported by the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CursorPosition {
    pub row: u16,
    pub col: u16,
}

// ─── Strategy ───────────────────────────────────────────────────────────────

/// Where geometry comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GeometryStrategy {
    /// Always use the cursor-overshoot probe.
    Probe,
    /// Ask the OS for the window size, probing only if that fails.
    #[default]
    WindowSizeFirst,
}

// ─── Probe ──────────────────────────────────────────────────────────────────

/// Parse a cursor position report of the form `ESC [ row ; col` with an
/// optional trailing `R`.
///
/// # Errors
///
/// Returns [`Error::ProbeFailed`] unless the text is exactly the prefix
/// followed by two positive integers separated by one `;`.
pub fn parse_cursor_report(text: &str) -> Result<CursorPosition> {
    let malformed = || Error::ProbeFailed(format!("malformed cursor position report {text:?}"));

    let body = text.strip_prefix("\x1b[").ok_or_else(malformed)?;
    let body = body.strip_suffix('R').unwrap_or(body);

    let mut parts = body.split(';');
    let (Some(row), Some(col), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(malformed());
    };

    Ok(CursorPosition {
        row: parse_coordinate(row).ok_or_else(malformed)?,
        col: parse_coordinate(col).ok_or_else(malformed)?,
    })
}

/// A positive decimal integer with no sign, spaces or other decoration.
fn parse_coordinate(s: &str) -> Option<u16> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<u16>().ok().filter(|&n| n > 0)
}

/// Find the terminal size by overshooting the cursor into the bottom-right
/// corner and asking where it landed.
///
/// # Errors
///
/// Returns [`Error::ProbeFailed`] if no report arrives before the read
/// timeout or the report is malformed, and propagates device I/O errors.
pub fn probe<T: TerminalIo>(channel: &mut EscapeChannel<'_, T>) -> Result<Geometry> {
    channel.send(&format!("{OVERSHOOT}C"), false)?;
    channel.send(&format!("{OVERSHOOT}B"), false)?;

    let reply = channel
        .send(ansi::CURSOR_POSITION_REQUEST_BODY, true)?
        .ok_or_else(|| Error::ProbeFailed("no cursor position report before timeout".into()))?;

    let position = parse_cursor_report(&reply)?;
    let geometry = Geometry::new(position.row, position.col)
        .ok_or_else(|| Error::ProbeFailed(format!("zero-sized report {reply:?}")))?;

    debug!(%geometry, "probed terminal geometry");
    Ok(geometry)
}

/// Determine the terminal size with the given strategy.
///
/// The probe runs inside a nested [`RawModeGuard`] using
/// [`PROBE_READ_POLICY`]; the mode in force before the call is back when
/// it returns. Entering and leaving that guard flush unread input, so keys
/// typed during the probe are lost.
///
/// # Errors
///
/// See [`probe`]. Also returns [`Error::ModeFailed`] if the probe's read
/// policy cannot be installed or removed.
pub fn detect<T: TerminalIo>(tty: &mut T, strategy: GeometryStrategy) -> Result<Geometry> {
    if strategy == GeometryStrategy::WindowSizeFirst {
        if let Some(geometry) = tty.window_size() {
            info!(%geometry, "window size from the OS");
            return Ok(geometry);
        }
        debug!("window size unavailable, falling back to the probe");
    }

    let mut guard = RawModeGuard::enter(tty, PROBE_READ_POLICY)?;
    let geometry = probe(&mut EscapeChannel::new(&mut *guard))?;
    guard.exit()?;

    info!(%geometry, "terminal geometry");
    Ok(geometry)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
