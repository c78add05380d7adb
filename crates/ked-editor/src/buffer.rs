//! The line buffer: the single line of text being edited.
//!
//! Text only grows at the end and shrinks from the end, so a `String` is all
//! the storage it needs. Deleting backwards removes a whole extended
//! grapheme cluster, so `e` + combining acute or a flag emoji goes away in
//! one keypress and never leaves half a character behind.
//!
//! Width is measured in terminal display columns, not chars: a CJK ideograph
//! occupies two columns, a combining mark none.

use std::fmt;

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// The editable line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineBuffer {
    text: String,
}

impl LineBuffer {
    #[must_use]
    pub const fn new() -> Self {
        Self { text: String::new() }
    }

    /// Append a character at the end of the line.
    pub fn insert(&mut self, c: char) {
        self.text.push(c);
    }

    /// Remove the last grapheme cluster. Returns `false` on an empty line.
    pub fn delete_backward(&mut self) -> bool {
        match self.text.grapheme_indices(true).next_back() {
            Some((start, _)) => {
                self.text.truncate(start);
                true
            }
            None => false,
        }
    }

    /// Display width of the line in terminal columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.text.width()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.text
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl From<&str> for LineBuffer {
    fn from(text: &str) -> Self {
        Self { text: text.to_owned() }
    }
}

impl fmt::Display for LineBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
