//! Editor configuration.
//!
//! Everything the loop needs to know up front. The binary fills this in
//! from its command line; tests build it directly.
//!
//! | Field        | Default          | Effect                                |
//! |--------------|------------------|---------------------------------------|
//! | `quit_key`   | `Ctrl-Q`         | key that ends the session             |
//! | `read_policy`| VMIN 0, VTIME 1  | raw-mode read timeout                 |
//! | `geometry`   | `WindowSizeFirst`| how the screen size is found          |
//! | `status`     | `None`           | status line text; `None` shows help   |

use ked_term::{GeometryStrategy, ReadPolicy};

use crate::command::Keymap;
use crate::key::Key;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorConfig {
    pub quit_key: Key,
    pub read_policy: ReadPolicy,
    pub geometry: GeometryStrategy,
    pub status: Option<String>,
}

impl EditorConfig {
    /// Bindings derived from this configuration.
    #[must_use]
    pub const fn keymap(&self) -> Keymap {
        Keymap::new(self.quit_key)
    }

    /// Text for the status line.
    #[must_use]
    pub fn status_message(&self) -> String {
        self.status
            .clone()
            .unwrap_or_else(|| format!("ked | {} to quit", self.quit_key))
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            quit_key: Keymap::default().quit,
            read_policy: ReadPolicy::default(),
            geometry: GeometryStrategy::default(),
            status: None,
        }
    }
}
