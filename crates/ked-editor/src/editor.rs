//! The editor loop.
//!
//! [`Editor::run`] owns one session against a terminal:
//!
//! 1. switch the terminal to raw mode behind a [`RawModeGuard`],
//! 2. find the screen size and clear the screen,
//! 3. loop: check signals, draw a frame, read one byte, decode, act,
//! 4. restore the terminal, exactly once, however the loop ended.
//!
//! A frame is always drawn before the next read, so what is on screen is
//! the state the next key applies to. A read that times out is an idle
//! tick; it also resolves a pending lone `ESC` into the Escape key.
//!
//! The loop has two states and only moves one way: [`LoopState::Running`]
//! to [`LoopState::Terminated`]. The quit key, a terminating signal and
//! any I/O error all end it. I/O errors are returned from `run` after the
//! terminal has been restored, never before.

use ked_term::signals::SignalFlags;
use ked_term::{RawModeGuard, TerminalIo};
use tracing::{debug, info, warn};

use crate::buffer::LineBuffer;
use crate::command::{Command, Keymap};
use crate::config::EditorConfig;
use crate::error::{EditorError, Result};
use crate::key::{Key, KeyDecoder};
use crate::screen::Screen;

/// Where the loop is in its lifecycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    #[default]
    Running,
    Terminated,
}

/// A single-line editor session.
#[derive(Debug)]
pub struct Editor {
    config: EditorConfig,
    keymap: Keymap,
    status: String,
    buffer: LineBuffer,
    screen: Screen,
    decoder: KeyDecoder,
    signals: SignalFlags,
    state: LoopState,
}

impl Editor {
    #[must_use]
    pub fn new(config: EditorConfig) -> Self {
        Self {
            keymap: config.keymap(),
            status: config.status_message(),
            buffer: LineBuffer::new(),
            screen: Screen::new(config.geometry),
            decoder: KeyDecoder::new(),
            signals: SignalFlags::default(),
            state: LoopState::Running,
            config,
        }
    }

    /// Watch `signals` for termination and resize requests.
    #[must_use]
    pub fn with_signals(mut self, signals: SignalFlags) -> Self {
        self.signals = signals;
        self
    }

    #[must_use]
    pub const fn state(&self) -> LoopState {
        self.state
    }

    #[must_use]
    pub const fn buffer(&self) -> &LineBuffer {
        &self.buffer
    }

    #[must_use]
    pub fn into_buffer(self) -> LineBuffer {
        self.buffer
    }

    #[must_use]
    pub const fn screen(&self) -> &Screen {
        &self.screen
    }

    /// Apply one command to the session.
    pub fn apply(&mut self, command: Command) {
        match command {
            Command::Insert(c) => self.buffer.insert(c),
            Command::DeleteBackward => {
                self.buffer.delete_backward();
            }
            Command::Quit => {
                info!("quit requested");
                self.state = LoopState::Terminated;
            }
            Command::Noop => {}
        }
    }

    /// Run the session until it terminates.
    ///
    /// The terminal mode in force before the call is back in force when it
    /// returns, whether it returns `Ok` or `Err`.
    ///
    /// # Errors
    ///
    /// Returns the first failure: entering raw mode, the initial geometry
    /// probe, a read or write, or restoring the terminal.
    pub fn run<T: TerminalIo>(&mut self, tty: &mut T) -> Result<()> {
        self.state = LoopState::Running;
        let mut guard = RawModeGuard::enter(tty, self.config.read_policy)?;
        info!(quit = %self.keymap.quit, "editor loop started");

        let result = self.drive(&mut *guard);
        self.state = LoopState::Terminated;

        // Restore before reporting anything.
        let restored = guard.exit();
        match result {
            Err(e) => {
                if let Err(restore) = restored {
                    warn!(error = %restore, "terminal restore failed after loop error");
                }
                Err(e)
            }
            Ok(()) => {
                restored?;
                info!(len = self.buffer.as_str().len(), "editor loop finished");
                Ok(())
            }
        }
    }

    fn drive<T: TerminalIo>(&mut self, tty: &mut T) -> Result<()> {
        self.screen.resize(tty)?;
        self.screen.clear();

        while self.state == LoopState::Running {
            if self.signals.terminate_requested() {
                info!("terminate signal received");
                self.state = LoopState::Terminated;
                break;
            }
            if self.signals.take_resize() {
                self.reprobe(tty)?;
            }

            self.refresh(tty)?;

            let key = match tty.read_byte()? {
                Some(byte) => self.decoder.feed(byte),
                None => self.decoder.flush(),
            };
            if let Some(key) = key {
                self.handle_key(key);
            }
        }

        // After SIGHUP the terminal may be gone; don't draw on the way out.
        if self.signals.terminate_requested() {
            return Ok(());
        }
        self.leave(tty)
    }

    fn handle_key(&mut self, key: Key) {
        let command = self.keymap.command_for(key);
        debug!(?key, ?command, "key");
        self.apply(command);
    }

    /// Re-detect the geometry after SIGWINCH.
    ///
    /// A garbled reply keeps the old size; device errors still end the
    /// loop. Keys typed while the reply is outstanding are dropped.
    fn reprobe<T: TerminalIo>(&mut self, tty: &mut T) -> Result<()> {
        match self.screen.resize(tty) {
            Ok(_) => {}
            Err(EditorError::Term(ked_term::Error::ProbeFailed(reason))) => {
                warn!(%reason, "re-probe failed, keeping previous geometry");
            }
            Err(e) => return Err(e),
        }
        self.screen.clear();
        Ok(())
    }

    /// Draw the line, the status line, and park the cursor after the text.
    fn refresh<T: TerminalIo>(&mut self, tty: &mut T) -> Result<()> {
        self.screen.hide_cursor();
        self.screen.render_buffer(self.buffer.as_str())?;
        self.screen.render_status_line(&self.status)?;
        let col = u16::try_from(self.buffer.width().saturating_add(1)).unwrap_or(u16::MAX);
        self.screen.move_cursor(1, col)?;
        self.screen.show_cursor();
        self.screen.flush(tty)
    }

    /// Leave a blank screen with the cursor home and visible.
    fn leave<T: TerminalIo>(&mut self, tty: &mut T) -> Result<()> {
        self.screen.clear();
        self.screen.move_cursor(1, 1)?;
        self.screen.show_cursor();
        self.screen.flush(tty)
    }
}
