//! Keys and the byte-level key decoder.
//!
//! The terminal hands us bytes, one `read` at a time. [`KeyDecoder`] turns
//! them into [`Key`]s, holding back the bytes of a sequence that has not
//! finished yet. Every feed yields at most one key.
//!
//! # Escape ambiguity
//!
//! `ESC` on its own is the Escape key, but it also starts every CSI
//! sequence. The decoder keeps a lone `ESC` pending. When the next byte is
//! `[`, a sequence follows. When the read times out instead, the loop calls
//! [`KeyDecoder::flush`] and the pending `ESC` comes out as
//! [`Key::Escape`].
//!
//! Only the sequences a single-line editor reacts to are named: arrows
//! decode to [`Key::Arrow`], and every other complete CSI sequence decodes
//! to [`Key::Unknown`], so it is consumed whole and never leaks into the
//! buffer as text.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::warn;

const ESC: u8 = 0x1b;

/// Longest CSI sequence we wait for before giving up on its final byte.
const MAX_SEQUENCE_LEN: usize = 16;

// ---------------------------------------------------------------------------
// Key
// ---------------------------------------------------------------------------

/// Arrow key direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arrow {
    Up,
    Down,
    Right,
    Left,
}

/// A decoded keypress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A printable character.
    Char(char),
    /// A control chord, stored as the lowercase letter (`Ctrl('q')` is 0x11).
    /// Chords with their own key (`Ctrl-M`, `Ctrl-I`, `Ctrl-H`) decode to
    /// that key instead.
    Ctrl(char),
    Enter,
    Tab,
    Backspace,
    Escape,
    Arrow(Arrow),
    /// A complete escape sequence the editor has no use for.
    Unknown,
}

impl Key {
    /// Decode a single ASCII byte. Returns `None` for bytes above 0x7f,
    /// which only appear inside UTF-8 sequences.
    #[must_use]
    pub const fn from_ascii(byte: u8) -> Option<Self> {
        let key = match byte {
            ESC => Self::Escape,
            b'\r' | b'\n' => Self::Enter,
            b'\t' => Self::Tab,
            0x7f | 0x08 => Self::Backspace,
            0x00 => Self::Ctrl('@'),
            0x01..=0x1a => Self::Ctrl((byte - 1 + b'a') as char),
            0x1c..=0x1f => Self::Ctrl((byte + 0x40) as char),
            0x20..=0x7e => Self::Char(byte as char),
            _ => return None,
        };
        Some(key)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Char(c) => write!(f, "{c}"),
            Self::Ctrl(c) => write!(f, "Ctrl-{}", c.to_ascii_uppercase()),
            Self::Enter => f.write_str("Enter"),
            Self::Tab => f.write_str("Tab"),
            Self::Backspace => f.write_str("Backspace"),
            Self::Escape => f.write_str("Esc"),
            Self::Arrow(arrow) => write!(f, "{arrow:?}"),
            Self::Unknown => f.write_str("<unknown>"),
        }
    }
}

/// Why a key name was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseKeyError {
    #[error("key name is empty")]
    Empty,
    #[error("unrecognised key {0:?} (expected a character, ctrl-<letter> or ^<letter>)")]
    Unrecognised(String),
}

/// Parses key names as typed on a command line: `q`, `ctrl-q`, `Ctrl-Q`,
/// `^q`, `esc`, `enter`, `tab`, `backspace`.
impl FromStr for Key {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (None, _) => return Err(ParseKeyError::Empty),
            (Some(c), None) if !c.is_control() => return Ok(Self::Char(c)),
            _ => {}
        }

        let lower = s.to_ascii_lowercase();
        let chord = lower
            .strip_prefix("ctrl-")
            .or_else(|| lower.strip_prefix("c-"))
            .or_else(|| lower.strip_prefix('^'));
        if let Some(&[letter]) = chord.map(str::as_bytes) {
            if letter.is_ascii_lowercase() {
                if let Some(key) = Self::from_ascii(letter - b'a' + 1) {
                    return Ok(key);
                }
            }
        }

        match lower.as_str() {
            "esc" | "escape" => Ok(Self::Escape),
            "enter" | "return" => Ok(Self::Enter),
            "tab" => Ok(Self::Tab),
            "backspace" => Ok(Self::Backspace),
            _ => Err(ParseKeyError::Unrecognised(s.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// KeyDecoder
// ---------------------------------------------------------------------------

/// Incremental decoder from raw terminal bytes to [`Key`]s.
#[derive(Debug, Default)]
pub struct KeyDecoder {
    /// Bytes of an unfinished escape or UTF-8 sequence.
    pending: Vec<u8>,
}

impl KeyDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte. Returns a key when the byte completes one.
    pub fn feed(&mut self, byte: u8) -> Option<Key> {
        match self.pending.first() {
            None => self.start(byte),
            Some(&ESC) => self.escape(byte),
            Some(_) => self.continue_utf8(byte),
        }
    }

    /// Resolve whatever is pending after a read timeout.
    ///
    /// A lone `ESC` becomes [`Key::Escape`]; an unfinished CSI sequence
    /// becomes [`Key::Unknown`]; a truncated UTF-8 sequence is dropped.
    pub fn flush(&mut self) -> Option<Key> {
        let key = match self.pending.as_slice() {
            [] => None,
            [ESC] => Some(Key::Escape),
            [ESC, ..] => Some(Key::Unknown),
            bytes => {
                warn!(?bytes, "dropping truncated UTF-8 sequence");
                None
            }
        };
        self.pending.clear();
        key
    }

    /// Are there bytes waiting for the rest of their sequence?
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    fn start(&mut self, byte: u8) -> Option<Key> {
        match byte {
            ESC | 0xc2..=0xf4 => {
                self.pending.push(byte);
                None
            }
            _ => {
                let key = Key::from_ascii(byte);
                if key.is_none() {
                    warn!(byte, "dropping invalid input byte");
                }
                key
            }
        }
    }

    fn escape(&mut self, byte: u8) -> Option<Key> {
        if self.pending.len() == 1 {
            return match byte {
                b'[' => {
                    self.pending.push(byte);
                    None
                }
                // ESC ESC: the first one was a keypress, the second may
                // still start a sequence.
                ESC => Some(Key::Escape),
                // Alt chords are not bound to anything.
                _ => {
                    self.pending.clear();
                    Some(Key::Unknown)
                }
            };
        }

        if (0x40..=0x7e).contains(&byte) {
            self.pending.clear();
            return Some(match byte {
                b'A' => Key::Arrow(Arrow::Up),
                b'B' => Key::Arrow(Arrow::Down),
                b'C' => Key::Arrow(Arrow::Right),
                b'D' => Key::Arrow(Arrow::Left),
                _ => Key::Unknown,
            });
        }

        self.pending.push(byte);
        if self.pending.len() > MAX_SEQUENCE_LEN {
            warn!(len = self.pending.len(), "abandoning runaway escape sequence");
            self.pending.clear();
            return Some(Key::Unknown);
        }
        None
    }

    fn continue_utf8(&mut self, byte: u8) -> Option<Key> {
        if byte & 0xc0 != 0x80 {
            warn!(bytes = ?self.pending, "dropping truncated UTF-8 sequence");
            self.pending.clear();
            return self.start(byte);
        }

        self.pending.push(byte);
        if self.pending.len() < utf8_len(self.pending[0]) {
            return None;
        }

        let decoded = std::str::from_utf8(&self.pending)
            .ok()
            .and_then(|s| s.chars().next());
        if decoded.is_none() {
            warn!(bytes = ?self.pending, "dropping invalid UTF-8 sequence");
        }
        self.pending.clear();
        decoded.map(Key::Char)
    }
}

/// Encoded length announced by a UTF-8 lead byte in `0xc2..=0xf4`.
const fn utf8_len(lead: u8) -> usize {
    match lead {
        0xc2..=0xdf => 2,
        0xe0..=0xef => 3,
        _ => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn decode(bytes: &[u8]) -> Vec<Key> {
        let mut decoder = KeyDecoder::new();
        bytes.iter().filter_map(|&b| decoder.feed(b)).collect()
    }

    // -- Single bytes -------------------------------------------------------

    #[test]
    fn printable_ascii() {
        assert_eq!(decode(b"hi q"), vec![
            Key::Char('h'),
            Key::Char('i'),
            Key::Char(' '),
            Key::Char('q'),
        ]);
    }

    #[test]
    fn named_control_bytes() {
        assert_eq!(decode(b"\r\n\t\x7f\x08"), vec![
            Key::Enter,
            Key::Enter,
            Key::Tab,
            Key::Backspace,
            Key::Backspace,
        ]);
    }

    #[test]
    fn control_chords() {
        assert_eq!(decode(&[0x11, 0x01, 0x1a, 0x00, 0x1c]), vec![
            Key::Ctrl('q'),
            Key::Ctrl('a'),
            Key::Ctrl('z'),
            Key::Ctrl('@'),
            Key::Ctrl('\\'),
        ]);
    }

    #[test]
    fn stray_continuation_byte_is_dropped() {
        assert_eq!(decode(&[0x80, b'a']), vec![Key::Char('a')]);
    }

    // -- UTF-8 --------------------------------------------------------------

    #[test]
    fn multibyte_characters() {
        assert_eq!(decode("é€😀".as_bytes()), vec![
            Key::Char('é'),
            Key::Char('€'),
            Key::Char('😀'),
        ]);
    }

    #[test]
    fn utf8_waits_for_continuation() {
        let mut decoder = KeyDecoder::new();
        assert_eq!(decoder.feed(0xc3), None);
        assert!(decoder.has_pending());
        assert_eq!(decoder.feed(0xa9), Some(Key::Char('é')));
        assert!(!decoder.has_pending());
    }

    #[test]
    fn truncated_utf8_then_ascii() {
        assert_eq!(decode(&[0xe2, 0x82, b'x']), vec![Key::Char('x')]);
    }

    #[test]
    fn surrogate_encoding_is_dropped() {
        // ED A0 80 would be U+D800.
        assert_eq!(decode(&[0xed, 0xa0, 0x80, b'k']), vec![Key::Char('k')]);
    }

    // -- Escape sequences ---------------------------------------------------

    #[test]
    fn arrows() {
        assert_eq!(decode(b"\x1b[A\x1b[B\x1b[C\x1b[D"), vec![
            Key::Arrow(Arrow::Up),
            Key::Arrow(Arrow::Down),
            Key::Arrow(Arrow::Right),
            Key::Arrow(Arrow::Left),
        ]);
    }

    #[test]
    fn arrow_with_modifier_parameters() {
        assert_eq!(decode(b"\x1b[1;5C"), vec![Key::Arrow(Arrow::Right)]);
    }

    #[test]
    fn other_sequences_are_unknown_and_consumed() {
        assert_eq!(decode(b"\x1b[3~x"), vec![Key::Unknown, Key::Char('x')]);
    }

    #[test]
    fn lone_escape_waits_for_flush() {
        let mut decoder = KeyDecoder::new();
        assert_eq!(decoder.feed(ESC), None);
        assert!(decoder.has_pending());
        assert_eq!(decoder.flush(), Some(Key::Escape));
        assert!(!decoder.has_pending());
        assert_eq!(decoder.flush(), None);
    }

    #[test]
    fn double_escape() {
        let mut decoder = KeyDecoder::new();
        assert_eq!(decoder.feed(ESC), None);
        assert_eq!(decoder.feed(ESC), Some(Key::Escape));
        assert_eq!(decoder.feed(b'['), None);
        assert_eq!(decoder.feed(b'A'), Some(Key::Arrow(Arrow::Up)));
    }

    #[test]
    fn alt_chord_is_unknown() {
        assert_eq!(decode(b"\x1bxy"), vec![Key::Unknown, Key::Char('y')]);
    }

    #[test]
    fn flush_mid_sequence_is_unknown() {
        let mut decoder = KeyDecoder::new();
        decoder.feed(ESC);
        decoder.feed(b'[');
        decoder.feed(b'1');
        assert_eq!(decoder.flush(), Some(Key::Unknown));
    }

    #[test]
    fn runaway_sequence_is_abandoned() {
        let mut bytes = b"\x1b[".to_vec();
        bytes.extend(std::iter::repeat_n(b'1', MAX_SEQUENCE_LEN - 1));
        bytes.push(b'z');
        assert_eq!(decode(&bytes), vec![Key::Unknown, Key::Char('z')]);
    }

    // -- Names --------------------------------------------------------------

    #[test]
    fn parse_single_character() {
        assert_eq!("q".parse(), Ok(Key::Char('q')));
        assert_eq!("é".parse(), Ok(Key::Char('é')));
        assert_eq!("^".parse(), Ok(Key::Char('^')));
    }

    #[test]
    fn parse_control_chords() {
        assert_eq!("ctrl-q".parse(), Ok(Key::Ctrl('q')));
        assert_eq!("Ctrl-Q".parse(), Ok(Key::Ctrl('q')));
        assert_eq!("^x".parse(), Ok(Key::Ctrl('x')));
        assert_eq!("C-c".parse(), Ok(Key::Ctrl('c')));
    }

    #[test]
    fn parse_chords_with_their_own_key() {
        assert_eq!("ctrl-m".parse(), Ok(Key::Enter));
        assert_eq!("ctrl-i".parse(), Ok(Key::Tab));
        assert_eq!("ctrl-h".parse(), Ok(Key::Backspace));
    }

    #[test]
    fn parse_named_keys() {
        assert_eq!("esc".parse(), Ok(Key::Escape));
        assert_eq!("Enter".parse(), Ok(Key::Enter));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!("".parse::<Key>(), Err(ParseKeyError::Empty));
        assert!(matches!("ctrl-".parse::<Key>(), Err(ParseKeyError::Unrecognised(_))));
        assert!(matches!("ctrl-1".parse::<Key>(), Err(ParseKeyError::Unrecognised(_))));
        assert!(matches!("\t".parse::<Key>(), Err(ParseKeyError::Unrecognised(_))));
        assert!(matches!("quit".parse::<Key>(), Err(ParseKeyError::Unrecognised(_))));
    }

    #[test]
    fn display_round_trips_through_parse() {
        for key in [Key::Char('q'), Key::Ctrl('q'), Key::Escape, Key::Enter, Key::Tab] {
            assert_eq!(key.to_string().parse(), Ok(key));
        }
        assert_eq!(Key::Ctrl('q').to_string(), "Ctrl-Q");
    }
}
