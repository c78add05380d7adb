//! Key-to-command mapping.
//!
//! The editor loop never looks at keys directly. Each decoded [`Key`] goes
//! through a [`Keymap`], which says what it means as a [`Command`]:
//!
//! | Key                | Command          |
//! |--------------------|------------------|
//! | the quit key       | `Quit`           |
//! | printable `Char`   | `Insert(char)`   |
//! | `Backspace`        | `DeleteBackward` |
//! | anything else      | `Noop`           |
//!
//! The quit key is matched first, so a printable quit key such as `q`
//! quits rather than typing itself.

use crate::key::Key;

/// What the loop does in response to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Append a character to the line.
    Insert(char),
    /// Remove the last grapheme cluster.
    DeleteBackward,
    /// Leave the loop.
    Quit,
    /// Keys with no binding.
    Noop,
}

/// Key bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keymap {
    pub quit: Key,
}

impl Keymap {
    #[must_use]
    pub const fn new(quit: Key) -> Self {
        Self { quit }
    }

    /// Map a key to its command.
    #[must_use]
    pub fn command_for(&self, key: Key) -> Command {
        if key == self.quit {
            return Command::Quit;
        }
        match key {
            Key::Char(c) if !c.is_control() => Command::Insert(c),
            Key::Backspace => Command::DeleteBackward,
            _ => Command::Noop,
        }
    }
}

impl Default for Keymap {
    fn default() -> Self {
        Self::new(Key::Ctrl('q'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Arrow;

    #[test]
    fn default_quit_is_ctrl_q() {
        let keymap = Keymap::default();
        assert_eq!(keymap.command_for(Key::Ctrl('q')), Command::Quit);
        assert_eq!(keymap.command_for(Key::Char('q')), Command::Insert('q'));
    }

    #[test]
    fn printable_quit_key_wins_over_insert() {
        let keymap = Keymap::new(Key::Char('q'));
        assert_eq!(keymap.command_for(Key::Char('q')), Command::Quit);
        assert_eq!(keymap.command_for(Key::Char('Q')), Command::Insert('Q'));
    }

    #[test]
    fn backspace_deletes() {
        assert_eq!(Keymap::default().command_for(Key::Backspace), Command::DeleteBackward);
    }

    #[test]
    fn unbound_keys_do_nothing() {
        let keymap = Keymap::default();
        for key in [
            Key::Enter,
            Key::Tab,
            Key::Escape,
            Key::Unknown,
            Key::Ctrl('a'),
            Key::Arrow(Arrow::Left),
        ] {
            assert_eq!(keymap.command_for(key), Command::Noop, "{key:?}");
        }
    }

    #[test]
    fn c1_controls_are_not_inserted() {
        assert_eq!(Keymap::default().command_for(Key::Char('\u{9b}')), Command::Noop);
    }

    #[test]
    fn escape_can_be_the_quit_key() {
        let keymap = Keymap::new(Key::Escape);
        assert_eq!(keymap.command_for(Key::Escape), Command::Quit);
    }
}
