// SPDX-License-Identifier: MIT
//
// Terminal mode snapshots and the raw-mode transform.
//
// A `TerminalMode` is a plain-data copy of the four termios flag words plus
// the control character table. It is captured before anything is changed
// and is only ever used to put the line discipline back the way it was.
//
// The flag words are bitflags types over `tcflag_t` with `const _ = !0`, so
// bits we do not name (ONLCR, CREAD, ECHOE and friends) survive the round
// trip untouched. Fields outside the flag words and `c_cc` (the separate
// speed fields, `c_line`) are not part of the snapshot; applying one keeps
// whatever the device currently reports for them.
//
// `TerminalMode::raw` is a pure function. Keeping the flag surgery away
// from the syscalls lets it be tested without a tty.

use bitflags::bitflags;

// ─── Flag Words ─────────────────────────────────────────────────────────────

bitflags! {
    /// Input processing flags (`c_iflag`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct InputFlags: libc::tcflag_t {
        /// Break condition sends SIGINT.
        const BRKINT = libc::BRKINT;
        /// Translate carriage return to newline on input.
        const ICRNL = libc::ICRNL;
        /// Input parity checking.
        const INPCK = libc::INPCK;
        /// Strip the eighth bit of every input byte.
        const ISTRIP = libc::ISTRIP;
        /// Software flow control (Ctrl-S / Ctrl-Q).
        const IXON = libc::IXON;

        const _ = !0;
    }
}

bitflags! {
    /// Output processing flags (`c_oflag`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OutputFlags: libc::tcflag_t {
        /// Implementation-defined output post-processing (`\n` → `\r\n`).
        const OPOST = libc::OPOST;

        const _ = !0;
    }
}

bitflags! {
    /// Control flags (`c_cflag`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ControlFlags: libc::tcflag_t {
        /// Character size mask.
        const CSIZE = libc::CSIZE;
        /// Eight bits per character.
        const CS8 = libc::CS8;

        const _ = !0;
    }
}

bitflags! {
    /// Local flags (`c_lflag`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LocalFlags: libc::tcflag_t {
        /// Echo input characters.
        const ECHO = libc::ECHO;
        /// Canonical (line-buffered) input.
        const ICANON = libc::ICANON;
        /// Implementation-defined input processing (Ctrl-V).
        const IEXTEN = libc::IEXTEN;
        /// INTR, QUIT and SUSP generate signals.
        const ISIG = libc::ISIG;

        const _ = !0;
    }
}

// ─── ReadPolicy ─────────────────────────────────────────────────────────────

/// How `read()` behaves once the terminal is raw: the VMIN/VTIME pair.
///
/// The editor uses `min_bytes = 0` with a short decisecond timeout, so a
/// read returns empty instead of blocking forever and the loop can re-render
/// between keystrokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadPolicy {
    /// Minimum bytes before `read()` returns (VMIN).
    pub min_bytes: u8,
    /// Read timeout in tenths of a second (VTIME).
    pub timeout_ds: u8,
}

impl ReadPolicy {
    /// Non-blocking polling with the given timeout in deciseconds.
    #[must_use]
    pub const fn polling(timeout_ds: u8) -> Self {
        Self {
            min_bytes: 0,
            timeout_ds,
        }
    }
}

impl Default for ReadPolicy {
    fn default() -> Self {
        Self::polling(1)
    }
}

// ─── TerminalMode ───────────────────────────────────────────────────────────

/// A captured line-discipline configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalMode {
    pub input: InputFlags,
    pub output: OutputFlags,
    pub control: ControlFlags,
    pub local: LocalFlags,
    /// Control character table (`c_cc`), including VMIN and VTIME.
    pub control_chars: [libc::cc_t; libc::NCCS],
}

impl TerminalMode {
    /// Snapshot the flag words and control characters of a termios struct.
    #[must_use]
    pub const fn from_termios(termios: &libc::termios) -> Self {
        Self {
            input: InputFlags::from_bits_retain(termios.c_iflag),
            output: OutputFlags::from_bits_retain(termios.c_oflag),
            control: ControlFlags::from_bits_retain(termios.c_cflag),
            local: LocalFlags::from_bits_retain(termios.c_lflag),
            control_chars: termios.c_cc,
        }
    }

    /// Overlay this snapshot onto a termios struct.
    pub const fn write_to(&self, termios: &mut libc::termios) {
        termios.c_iflag = self.input.bits();
        termios.c_oflag = self.output.bits();
        termios.c_cflag = self.control.bits();
        termios.c_lflag = self.local.bits();
        termios.c_cc = self.control_chars;
    }

    /// The raw-mode version of this mode.
    ///
    /// Clears flow control, CR→NL translation, parity checking, bit
    /// stripping and break signals on input; output post-processing; echo,
    /// canonical mode, extended processing and signal keys locally. Forces
    /// 8-bit characters and installs the read policy as VMIN/VTIME.
    #[must_use]
    pub fn raw(&self, policy: ReadPolicy) -> Self {
        let mut mode = *self;

        mode.input.remove(
            InputFlags::IXON
                | InputFlags::ICRNL
                | InputFlags::INPCK
                | InputFlags::ISTRIP
                | InputFlags::BRKINT,
        );
        mode.output.remove(OutputFlags::OPOST);
        mode.control.remove(ControlFlags::CSIZE);
        mode.control.insert(ControlFlags::CS8);
        mode.local.remove(
            LocalFlags::ECHO | LocalFlags::ICANON | LocalFlags::IEXTEN | LocalFlags::ISIG,
        );

        mode.control_chars[libc::VMIN] = policy.min_bytes;
        mode.control_chars[libc::VTIME] = policy.timeout_ds;
        mode
    }

    /// Whether this mode has echo and canonical input switched off.
    #[must_use]
    pub const fn is_raw(&self) -> bool {
        !self.local.contains(LocalFlags::ECHO) && !self.local.contains(LocalFlags::ICANON)
    }

    /// The read policy currently encoded in VMIN/VTIME.
    #[must_use]
    pub const fn read_policy(&self) -> ReadPolicy {
        ReadPolicy {
            min_bytes: self.control_chars[libc::VMIN],
            timeout_ds: self.control_chars[libc::VTIME],
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
