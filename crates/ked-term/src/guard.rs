// SPDX-License-Identifier: MIT
//
// Raw mode as a scoped resource.
//
// `RawModeGuard::enter` snapshots the current mode, applies the raw
// transform, and hands back a guard that derefs to the device. The snapshot
// goes back on the device when the guard is dropped, or earlier through
// `exit()` when the caller wants to see a restore failure. Either path
// restores exactly once.
//
// Entering always captures the *current* mode, even if it is already raw.
// A guard nested inside another guard therefore saves the intermediate raw
// mode, and dropping guards innermost-first walks the device back to the
// mode that existed before the outermost `enter`.

use std::ops::{Deref, DerefMut};

use tracing::{debug, warn};

use crate::device::TerminalIo;
use crate::error::Result;
use crate::mode::{ReadPolicy, TerminalMode};

/// Holds a terminal in raw mode until dropped.
///
/// ```
/// use ked_term::fake::FakeTerminal;
/// use ked_term::{Geometry, RawModeGuard, ReadPolicy, TerminalIo};
///
/// let mut tty = FakeTerminal::new(Geometry::new(24, 80).unwrap());
/// let before = tty.capture_mode()?;
/// {
///     let guard = RawModeGuard::enter(&mut tty, ReadPolicy::default())?;
///     assert!(guard.capture_mode()?.is_raw());
/// }
/// assert_eq!(tty.capture_mode()?, before);
/// # Ok::<(), ked_term::Error>(())
/// ```
pub struct RawModeGuard<'a, T: TerminalIo> {
    tty: &'a mut T,
    /// `None` once restored.
    saved: Option<TerminalMode>,
}

impl<'a, T: TerminalIo> RawModeGuard<'a, T> {
    /// Capture the current mode and switch the terminal to raw mode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModeFailed`](crate::Error::ModeFailed) if the mode
    /// cannot be read or the raw mode cannot be applied. Nothing needs
    /// restoring in that case.
    pub fn enter(tty: &'a mut T, policy: ReadPolicy) -> Result<Self> {
        let saved = tty.capture_mode()?;
        tty.apply_mode(&saved.raw(policy))?;
        debug!(
            min_bytes = policy.min_bytes,
            timeout_ds = policy.timeout_ds,
            "entered raw mode"
        );
        Ok(Self {
            tty,
            saved: Some(saved),
        })
    }

    /// The mode that will be restored.
    #[must_use]
    pub const fn saved_mode(&self) -> Option<&TerminalMode> {
        self.saved.as_ref()
    }

    /// Restore the saved mode now and report whether that worked.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModeFailed`](crate::Error::ModeFailed) if the
    /// restore is rejected.
    pub fn exit(mut self) -> Result<()> {
        self.restore()
    }

    fn restore(&mut self) -> Result<()> {
        match self.saved.take() {
            Some(mode) => {
                self.tty.apply_mode(&mode)?;
                debug!("restored terminal mode");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl<T: TerminalIo> Deref for RawModeGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.tty
    }
}

impl<T: TerminalIo> DerefMut for RawModeGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.tty
    }
}

impl<T: TerminalIo> Drop for RawModeGuard<'_, T> {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            warn!(error = %e, "failed to restore terminal mode");
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
