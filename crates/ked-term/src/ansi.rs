// SPDX-License-Identifier: MIT
//
// ANSI escape sequence encoding.
//
// Pure functions that write escape sequences to any `impl Write`. No state,
// no decisions about when to emit. The screen decides that; this module
// only knows the bytes.
//
// Coordinates are 1-indexed, the terminal's own convention, so callers pass
// exactly what ends up on the wire.
//
// `CURSOR_POSITION_REQUEST_BODY` is a sequence body without the CSI prefix,
// for the escape channel, which adds the prefix itself.

use std::io::{self, Write};

/// Escape, the first byte of every sequence.
pub const ESC: u8 = 0x1b;

/// Control Sequence Introducer: `ESC [`.
pub const CSI: &[u8] = b"\x1b[";

/// Final byte of a cursor position report (`CSI row ; col R`).
pub const REPORT_TERMINATOR: u8 = b'R';

/// Device status report body asking for the cursor position.
pub const CURSOR_POSITION_REQUEST_BODY: &str = "6n";

/// Write `CSI` followed by `body`.
#[inline]
pub fn csi(w: &mut impl Write, body: &str) -> io::Result<()> {
    w.write_all(CSI)?;
    w.write_all(body.as_bytes())
}

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// Move the cursor to `(row, col)` with CUP. Both 1-indexed.
#[inline]
pub fn cursor_to(w: &mut impl Write, row: u16, col: u16) -> io::Result<()> {
    write!(w, "\x1b[{row};{col}H")
}

/// Hide the cursor (DECTCEM reset).
#[inline]
pub fn cursor_hide(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25l")
}

/// Show the cursor (DECTCEM set).
#[inline]
pub fn cursor_show(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25h")
}

// ─── Erasing ─────────────────────────────────────────────────────────────────

/// Clear the entire screen (ED 2). The cursor does not move.
#[inline]
pub fn clear_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[2J")
}

/// Erase from the cursor to the end of the line (EL 0).
#[inline]
pub fn erase_line_right(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[K")
}

// ─── Tests ───────────────────────────────────────────────────────────────────
