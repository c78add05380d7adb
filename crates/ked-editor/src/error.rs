//! Editor errors.
//!
//! Terminal failures pass through unchanged; the editor adds only the
//! conditions it can detect on its own.

use thiserror::Error;

/// Anything that can stop the editor loop.
#[derive(Debug, Error)]
pub enum EditorError {
    /// The terminal layer failed: device, mode, read, write or probe.
    #[error(transparent)]
    Term(#[from] ked_term::Error),

    /// A frame was drawn before the screen learned its size.
    #[error("screen has no geometry; resize before rendering")]
    NotSized,
}

/// Shorthand for editor results.
pub type Result<T, E = EditorError> = std::result::Result<T, E>;
