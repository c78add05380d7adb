// SPDX-License-Identifier: MIT
//
// The escape sequence channel: one synchronous request/response exchange.
//
// Commands to the terminal and replies from it share one byte stream in
// each direction. `send` writes `CSI body` in a single write and, when a
// reply is expected, reads byte by byte until the report terminator `R`.
// Nothing else reads the device while a transaction is open. The channel
// holds the only `&mut` to it, so no other write can land between the
// request and its reply.
//
// A reply always starts with ESC. Bytes read before the last ESC are keys
// the user typed ahead of the reply; they are dropped and logged at debug
// so the reply itself still parses. An `R` only ends a reply that has
// started.
//
// A read timeout before `R` means no reply, and so does a scan that runs
// past `MAX_REPLY_LEN` bytes. Neither is an error here; the caller decides
// what a missing reply means.

use tracing::debug;

use crate::ansi;
use crate::device::TerminalIo;
use crate::error::{Error, Result};

/// Most bytes scanned for a reply before giving up on the terminator.
///
/// `ESC [ 65535 ; 65535` is 13 bytes. The rest of the budget covers keys
/// typed ahead of the reply, which are scanned and dropped.
pub const MAX_REPLY_LEN: usize = 32;

/// A request/response transaction over a terminal.
pub struct EscapeChannel<'a, T: TerminalIo> {
    tty: &'a mut T,
}

impl<'a, T: TerminalIo> EscapeChannel<'a, T> {
    pub const fn new(tty: &'a mut T) -> Self {
        Self { tty }
    }

    /// Send `CSI body`; with `expect_response`, wait for an `R`-terminated
    /// reply.
    ///
    /// The reply is returned without its terminator but with its `ESC [`
    /// prefix, decoded as lossy UTF-8. `Ok(None)` means no terminator
    /// arrived before a read timed out.
    ///
    /// # Errors
    ///
    /// Propagates write and read failures from the device.
    pub fn send(&mut self, body: &str, expect_response: bool) -> Result<Option<String>> {
        let mut request = Vec::with_capacity(ansi::CSI.len() + body.len());
        ansi::csi(&mut request, body).map_err(Error::WriteFailed)?;
        self.tty.write_bytes(&request)?;

        if !expect_response {
            return Ok(None);
        }
        self.read_reply()
    }

    fn read_reply(&mut self) -> Result<Option<String>> {
        let mut reply = Vec::new();
        let mut scanned = 0usize;

        loop {
            let Some(byte) = self.tty.read_byte()? else {
                debug!(partial = reply.len(), "timed out waiting for terminal reply");
                return Ok(None);
            };
            scanned += 1;

            match byte {
                ansi::REPORT_TERMINATOR if reply.first() == Some(&ansi::ESC) => {
                    let text = String::from_utf8_lossy(&reply).into_owned();
                    debug!(reply = ?text, "received terminal reply");
                    return Ok(Some(text));
                }
                ansi::ESC => {
                    if !reply.is_empty() {
                        let dropped = String::from_utf8_lossy(&reply);
                        debug!(?dropped, "dropped input ahead of terminal reply");
                        reply.clear();
                    }
                    reply.push(byte);
                }
                _ => reply.push(byte),
            }

            if scanned > MAX_REPLY_LEN {
                debug!(scanned, "reply exceeded limit without terminator");
                return Ok(None);
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeTerminal;
    use crate::geometry::Geometry;
    use pretty_assertions::assert_eq;

    fn silent() -> FakeTerminal {
        FakeTerminal::new(Geometry::new(24, 80).unwrap()).silent()
    }

    #[test]
    fn send_writes_prefix_and_body_once() {
        let mut tty = silent();
        let reply = EscapeChannel::new(&mut tty).send("999C", false).unwrap();
        assert_eq!(reply, None);
        assert_eq!(tty.output(), b"\x1b[999C");
        assert_eq!(tty.write_calls(), 1);
    }

    #[test]
    fn reply_stops_at_terminator() {
        let mut tty = silent();
        tty.push_input(b"\x1b[24;80Rhello");
        let reply = EscapeChannel::new(&mut tty).send("6n", true).unwrap();
        assert_eq!(reply.as_deref(), Some("\x1b[24;80"));

        // Bytes after the terminator stay queued for the editor.
        assert_eq!(tty.read_byte().unwrap(), Some(b'h'));
    }

    #[test]
    fn timeout_without_terminator_is_none() {
        let mut tty = silent();
        tty.push_input(b"\x1b[24;8");
        let reply = EscapeChannel::new(&mut tty).send("6n", true).unwrap();
        assert_eq!(reply, None);
    }

    #[test]
    fn no_input_at_all_is_none() {
        let mut tty = silent();
        assert_eq!(EscapeChannel::new(&mut tty).send("6n", true).unwrap(), None);
    }

    #[test]
    fn typed_ahead_keys_are_dropped_from_the_reply() {
        let mut tty = silent();
        tty.push_input(b"ab\x1b[24;80R");
        let reply = EscapeChannel::new(&mut tty).send("6n", true).unwrap();
        assert_eq!(reply.as_deref(), Some("\x1b[24;80"));
    }

    #[test]
    fn typed_terminator_before_the_reply_is_not_the_end() {
        let mut tty = silent();
        tty.push_input(b"R\x1b[5;6R");
        let reply = EscapeChannel::new(&mut tty).send("6n", true).unwrap();
        assert_eq!(reply.as_deref(), Some("\x1b[5;6"));
    }

    #[test]
    fn lone_escape_ahead_of_the_reply_is_dropped() {
        let mut tty = silent();
        tty.push_input(b"\x1b\x1b[3;4R");
        let reply = EscapeChannel::new(&mut tty).send("6n", true).unwrap();
        assert_eq!(reply.as_deref(), Some("\x1b[3;4"));
    }

    #[test]
    fn runaway_reply_is_abandoned() {
        let mut tty = silent();
        tty.push_input(&[b'x'; MAX_REPLY_LEN + 8]);
        tty.push_input(b"R");
        assert_eq!(EscapeChannel::new(&mut tty).send("6n", true).unwrap(), None);
    }

    #[test]
    fn answering_terminal_replies_with_cursor_position() {
        let mut tty = FakeTerminal::new(Geometry::new(40, 120).unwrap());
        let reply = EscapeChannel::new(&mut tty).send("6n", true).unwrap();
        assert_eq!(reply.as_deref(), Some("\x1b[1;1"));
    }

    #[test]
    fn write_failure_propagates() {
        let mut tty = silent();
        tty.set_fail_writes(true);
        assert!(EscapeChannel::new(&mut tty).send("6n", true).is_err());
    }
}
