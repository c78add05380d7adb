//! # ked-editor: the single-line editor on top of ked-term
//!
//! - **[`key`]**: `Key` and the byte-level `KeyDecoder`
//! - **[`command`]**: `Command` and the `Keymap` from keys to commands
//! - **[`buffer`]**: `LineBuffer`, the one editable line
//! - **[`screen`]**: `Screen`, frame composition over the probed geometry
//! - **[`config`]**: `EditorConfig`
//! - **[`editor`]**: `Editor`, the raw-mode read/render loop
//!
//! Everything here talks to the terminal through [`ked_term::TerminalIo`],
//! so the whole loop runs against [`ked_term::fake::FakeTerminal`] in tests.

pub mod buffer;
pub mod command;
pub mod config;
pub mod editor;
pub mod error;
pub mod key;
pub mod screen;

pub use buffer::LineBuffer;
pub use command::{Command, Keymap};
pub use config::EditorConfig;
pub use editor::{Editor, LoopState};
pub use error::{EditorError, Result};
pub use key::{Key, KeyDecoder};
pub use screen::Screen;
