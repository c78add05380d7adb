// SPDX-License-Identifier: MIT
//
// An in-memory terminal for tests.
//
// `FakeTerminal` implements `TerminalIo` over a scripted input queue and a
// captured output buffer, and records every mode applied to it. It also
// keeps a small model of the cursor: it interprets CUP, CUU/CUD/CUF/CUB and
// printable bytes, clamping to its geometry the way a real terminal does,
// and answers `CSI 6n` with the clamped position. The overshoot probe
// therefore only works against it for the same reason it works against a
// real terminal.
//
// Replies are queued *ahead* of any scripted input, as if the user typed
// after the query. `.silent()` turns replies off so tests can script them
// by hand. Mode changes do not flush the input queue the way TCSAFLUSH
// would; scripted input stands for keys typed after raw mode is on.

use std::collections::VecDeque;
use std::io;

use crate::ansi;
use crate::device::TerminalIo;
use crate::error::{Error, Result};
use crate::geometry::{CursorPosition, Geometry};
use crate::mode::{ControlFlags, InputFlags, LocalFlags, OutputFlags, TerminalMode};

/// Escape sequence parser state for the output interpreter.
#[derive(Debug, Clone, Default)]
enum Parse {
    #[default]
    Ground,
    Escape,
    Csi(Vec<u8>),
}

/// A scripted stand-in for a terminal device.
#[derive(Debug, Clone)]
pub struct FakeTerminal {
    geometry: Geometry,
    window_size: Option<Geometry>,
    answers_reports: bool,
    cursor: CursorPosition,
    parse: Parse,
    input: VecDeque<u8>,
    output: Vec<u8>,
    write_calls: usize,
    mode: TerminalMode,
    applied: Vec<TerminalMode>,
    fail_writes: bool,
    fail_reads: bool,
}

impl FakeTerminal {
    /// A cooked-mode terminal of the given size that answers cursor
    /// position requests.
    #[must_use]
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            window_size: None,
            answers_reports: true,
            cursor: CursorPosition { row: 1, col: 1 },
            parse: Parse::Ground,
            input: VecDeque::new(),
            output: Vec::new(),
            write_calls: 0,
            mode: Self::cooked_mode(),
            applied: Vec::new(),
            fail_writes: false,
            fail_reads: false,
        }
    }

    /// Stop answering `CSI 6n`; replies must be scripted with
    /// [`push_input`](Self::push_input).
    #[must_use]
    pub fn silent(mut self) -> Self {
        self.answers_reports = false;
        self
    }

    /// Report `size` from [`TerminalIo::window_size`].
    #[must_use]
    pub fn with_window_size(mut self, size: Geometry) -> Self {
        self.window_size = Some(size);
        self
    }

    /// A typical line-buffered, echoing terminal mode.
    #[must_use]
    pub fn cooked_mode() -> TerminalMode {
        let mut control_chars = [0; libc::NCCS];
        control_chars[libc::VINTR] = 0x03;
        control_chars[libc::VEOF] = 0x04;
        control_chars[libc::VMIN] = 1;
        control_chars[libc::VTIME] = 0;

        TerminalMode {
            input: InputFlags::from_bits_retain(
                libc::BRKINT | libc::ICRNL | libc::IXON | libc::IMAXBEL,
            ),
            output: OutputFlags::from_bits_retain(libc::OPOST | libc::ONLCR),
            control: ControlFlags::from_bits_retain(libc::CS8 | libc::CREAD),
            local: LocalFlags::from_bits_retain(
                libc::ECHO | libc::ICANON | libc::ISIG | libc::IEXTEN | libc::ECHOE,
            ),
            control_chars,
        }
    }

    /// Queue bytes for the reader.
    pub fn push_input(&mut self, bytes: &[u8]) {
        self.input.extend(bytes);
    }

    /// Everything written so far.
    #[must_use]
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Take and clear the written bytes.
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }

    /// Number of `write_bytes` calls that succeeded.
    #[must_use]
    pub const fn write_calls(&self) -> usize {
        self.write_calls
    }

    /// Every mode applied, oldest first.
    #[must_use]
    pub fn applied_modes(&self) -> &[TerminalMode] {
        &self.applied
    }

    /// Where the modelled cursor is.
    #[must_use]
    pub const fn cursor(&self) -> CursorPosition {
        self.cursor
    }

    /// Make every following write fail.
    pub const fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Make every following read fail.
    pub const fn set_fail_reads(&mut self, fail: bool) {
        self.fail_reads = fail;
    }

    // ── Output interpreter ──────────────────────────────────────────

    fn interpret(&mut self, byte: u8) {
        match std::mem::take(&mut self.parse) {
            Parse::Ground => match byte {
                0x1b => self.parse = Parse::Escape,
                b'\r' => self.cursor.col = 1,
                b'\n' => self.cursor = self.geometry.clamp(self.cursor.row + 1, self.cursor.col),
                // UTF-8 continuation bytes don't move the cursor.
                0x80..=0xbf => {}
                b if b >= 0x20 && b != 0x7f => {
                    self.cursor = self.geometry.clamp(self.cursor.row, self.cursor.col + 1);
                }
                _ => {}
            },
            Parse::Escape => {
                if byte == b'[' {
                    self.parse = Parse::Csi(Vec::new());
                }
            }
            Parse::Csi(mut params) => {
                if (0x40..=0x7e).contains(&byte) {
                    self.execute_csi(&params, byte);
                } else {
                    params.push(byte);
                    self.parse = Parse::Csi(params);
                }
            }
        }
    }

    fn execute_csi(&mut self, params: &[u8], final_byte: u8) {
        let text = String::from_utf8_lossy(params);
        let mut numbers = text.split(';').map(|p| p.parse::<u16>().unwrap_or(0));
        let n = numbers.next().unwrap_or(0).max(1);
        let CursorPosition { row, col } = self.cursor;

        match final_byte {
            b'A' => self.cursor = self.geometry.clamp(row.saturating_sub(n), col),
            b'B' => self.cursor = self.geometry.clamp(row.saturating_add(n), col),
            b'C' => self.cursor = self.geometry.clamp(row, col.saturating_add(n)),
            b'D' => self.cursor = self.geometry.clamp(row, col.saturating_sub(n)),
            b'H' => {
                let target_col = numbers.next().unwrap_or(1).max(1);
                self.cursor = self.geometry.clamp(n, target_col);
            }
            b'n' if text == "6" && self.answers_reports => {
                let reply = format!(
                    "\x1b[{};{}{}",
                    self.cursor.row,
                    self.cursor.col,
                    char::from(ansi::REPORT_TERMINATOR)
                );
                for byte in reply.bytes().rev() {
                    self.input.push_front(byte);
                }
            }
            _ => {}
        }
    }
}

impl TerminalIo for FakeTerminal {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.fail_reads {
            return Err(Error::ReadFailed(io::Error::other("injected read failure")));
        }
        let mut n = 0;
        while n < buf.len() {
            match self.input.pop_front() {
                Some(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if self.fail_writes {
            return Err(Error::WriteFailed(io::Error::other("injected write failure")));
        }
        self.write_calls += 1;
        self.output.extend_from_slice(bytes);
        for &byte in bytes {
            self.interpret(byte);
        }
        Ok(())
    }

    fn capture_mode(&self) -> Result<TerminalMode> {
        Ok(self.mode)
    }

    fn apply_mode(&mut self, mode: &TerminalMode) -> Result<()> {
        self.mode = *mode;
        self.applied.push(*mode);
        Ok(())
    }

    fn window_size(&self) -> Option<Geometry> {
        self.window_size
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
