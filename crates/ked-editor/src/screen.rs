//! Screen: frame composition and cursor placement.
//!
//! The screen owns the terminal [`Geometry`] and an in-memory frame. Render
//! calls append escape sequences and text to the frame; [`Screen::flush`]
//! sends the whole frame to the terminal in one write, so the terminal
//! never shows half a frame and never sees a write interleaved with a probe.
//!
//! The geometry comes from [`Screen::resize`], which runs the configured
//! detection strategy. Until it has succeeded once, every call that
//! positions something fails with [`EditorError::NotSized`]: there is no
//! size to clamp against, and guessing one would put the status line
//! somewhere random.
//!
//! Layout:
//!
//! ```text
//! row 1          the line buffer, from column 1
//! row rows - 1   the status line (row 1 on a one-row terminal)
//! ```
//!
//! Every rendered line ends with erase-to-end-of-line so a shorter line
//! does not leave the tail of the previous frame behind.

use ked_term::geometry::detect;
use ked_term::{Geometry, GeometryStrategy, TerminalIo, ansi};
use tracing::debug;
use unicode_width::UnicodeWidthChar;

use crate::error::{EditorError, Result};

/// Frame capacity reserved up front; a single-line frame rarely exceeds it.
const FRAME_CAPACITY: usize = 1024;

/// The editor's view of the terminal screen.
#[derive(Debug)]
pub struct Screen {
    geometry: Option<Geometry>,
    strategy: GeometryStrategy,
    frame: Vec<u8>,
}

impl Screen {
    /// An unsized screen that detects its geometry with `strategy`.
    #[must_use]
    pub fn new(strategy: GeometryStrategy) -> Self {
        Self {
            geometry: None,
            strategy,
            frame: Vec::with_capacity(FRAME_CAPACITY),
        }
    }

    /// A screen with a known geometry. [`resize`](Self::resize) can still
    /// replace it.
    #[must_use]
    pub fn with_geometry(geometry: Geometry) -> Self {
        Self {
            geometry: Some(geometry),
            ..Self::new(GeometryStrategy::default())
        }
    }

    /// Detect the terminal size and adopt it.
    ///
    /// # Errors
    ///
    /// Returns the probe or I/O error. The previous geometry is kept.
    pub fn resize<T: TerminalIo>(&mut self, tty: &mut T) -> Result<Geometry> {
        let geometry = detect(tty, self.strategy)?;
        if self.geometry != Some(geometry) {
            debug!(from = ?self.geometry, to = %geometry, "screen resized");
        }
        self.geometry = Some(geometry);
        Ok(geometry)
    }

    /// Current geometry, if known.
    #[must_use]
    pub const fn geometry(&self) -> Option<Geometry> {
        self.geometry
    }

    fn sized(&self) -> Result<Geometry> {
        self.geometry.ok_or(EditorError::NotSized)
    }

    /// Queue a cursor move to `(row, col)`, 1-indexed and clamped to the
    /// screen.
    ///
    /// # Errors
    ///
    /// [`EditorError::NotSized`] before the first successful resize.
    pub fn move_cursor(&mut self, row: u16, col: u16) -> Result<()> {
        let target = self.sized()?.clamp(row, col);
        ansi::cursor_to(&mut self.frame, target.row, target.col).ok();
        Ok(())
    }

    /// Draw `msg` on the status row, cut to the screen width.
    ///
    /// Control characters are skipped; the status line never wraps.
    ///
    /// # Errors
    ///
    /// [`EditorError::NotSized`] before the first successful resize.
    pub fn render_status_line(&mut self, msg: &str) -> Result<()> {
        let geometry = self.sized()?;
        let row = geometry.rows().saturating_sub(1).max(1);
        self.move_cursor(row, 1)?;

        let mut used = 0;
        for c in msg.chars() {
            if c.is_control() {
                continue;
            }
            let width = c.width().unwrap_or(0);
            if used + width > usize::from(geometry.cols()) {
                break;
            }
            used += width;
            let mut utf8 = [0; 4];
            self.frame.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
        }
        ansi::erase_line_right(&mut self.frame).ok();
        Ok(())
    }

    /// Draw the line buffer from the top-left corner.
    ///
    /// # Errors
    ///
    /// [`EditorError::NotSized`] before the first successful resize.
    pub fn render_buffer(&mut self, text: &str) -> Result<()> {
        self.move_cursor(1, 1)?;
        self.frame.extend_from_slice(text.as_bytes());
        ansi::erase_line_right(&mut self.frame).ok();
        Ok(())
    }

    /// Queue an erase of the whole screen.
    pub fn clear(&mut self) {
        ansi::clear_screen(&mut self.frame).ok();
    }

    pub fn hide_cursor(&mut self) {
        ansi::cursor_hide(&mut self.frame).ok();
    }

    pub fn show_cursor(&mut self) {
        ansi::cursor_show(&mut self.frame).ok();
    }

    /// Bytes queued since the last flush.
    #[must_use]
    pub fn frame(&self) -> &[u8] {
        &self.frame
    }

    /// Write the queued frame to the terminal in one write and start a new
    /// one. An empty frame writes nothing.
    ///
    /// # Errors
    ///
    /// Propagates the device write error; the frame is kept in that case.
    pub fn flush<T: TerminalIo>(&mut self, tty: &mut T) -> Result<()> {
        if self.frame.is_empty() {
            return Ok(());
        }
        tty.write_bytes(&self.frame)?;
        self.frame.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ked_term::fake::FakeTerminal;
    use pretty_assertions::assert_eq;

    fn geometry(rows: u16, cols: u16) -> Geometry {
        Geometry::new(rows, cols).unwrap()
    }

    fn frame_text(screen: &Screen) -> String {
        String::from_utf8(screen.frame().to_vec()).unwrap()
    }

    // -- Sizing -------------------------------------------------------------

    #[test]
    fn unsized_screen_refuses_to_render() {
        let mut screen = Screen::new(GeometryStrategy::Probe);
        assert!(matches!(screen.move_cursor(1, 1), Err(EditorError::NotSized)));
        assert!(matches!(screen.render_buffer("x"), Err(EditorError::NotSized)));
        assert!(matches!(screen.render_status_line("x"), Err(EditorError::NotSized)));
        assert!(screen.frame().is_empty());
    }

    #[test]
    fn resize_probes_the_terminal() {
        let mut tty = FakeTerminal::new(geometry(30, 100));
        let mut screen = Screen::new(GeometryStrategy::Probe);
        assert_eq!(screen.resize(&mut tty).unwrap(), geometry(30, 100));
        assert_eq!(screen.geometry(), Some(geometry(30, 100)));
    }

    #[test]
    fn failed_resize_keeps_old_geometry() {
        let mut tty = FakeTerminal::new(geometry(30, 100)).silent();
        let mut screen = Screen::with_geometry(geometry(24, 80));
        assert!(screen.resize(&mut tty).is_err());
        assert_eq!(screen.geometry(), Some(geometry(24, 80)));
    }

    #[test]
    fn resize_uses_window_size_when_asked() {
        let mut tty = FakeTerminal::new(geometry(30, 100))
            .silent()
            .with_window_size(geometry(50, 132));
        let mut screen = Screen::new(GeometryStrategy::WindowSizeFirst);
        assert_eq!(screen.resize(&mut tty).unwrap(), geometry(50, 132));
        assert!(tty.output().is_empty());
    }

    // -- Cursor -------------------------------------------------------------

    #[test]
    fn move_cursor_exact_bytes() {
        let mut screen = Screen::with_geometry(geometry(24, 80));
        screen.move_cursor(5, 7).unwrap();
        assert_eq!(screen.frame(), b"\x1b[5;7H");
    }

    #[test]
    fn move_cursor_clamps_rows_and_cols() {
        let mut screen = Screen::with_geometry(geometry(24, 80));
        screen.move_cursor(24 + 50, 200).unwrap();
        assert_eq!(screen.frame(), b"\x1b[24;80H");
    }

    #[test]
    fn move_cursor_clamps_zero_to_one() {
        let mut screen = Screen::with_geometry(geometry(24, 80));
        screen.move_cursor(0, 0).unwrap();
        assert_eq!(screen.frame(), b"\x1b[1;1H");
    }

    // -- Rendering ----------------------------------------------------------

    #[test]
    fn buffer_goes_to_top_left() {
        let mut screen = Screen::with_geometry(geometry(24, 80));
        screen.render_buffer("hi").unwrap();
        assert_eq!(frame_text(&screen), "\x1b[1;1Hhi\x1b[K");
    }

    #[test]
    fn status_line_is_second_to_last_row() {
        let mut screen = Screen::with_geometry(geometry(24, 80));
        screen.render_status_line("ready").unwrap();
        assert_eq!(frame_text(&screen), "\x1b[23;1Hready\x1b[K");
    }

    #[test]
    fn status_line_on_one_row_terminal() {
        let mut screen = Screen::with_geometry(geometry(1, 80));
        screen.render_status_line("ok").unwrap();
        assert_eq!(frame_text(&screen), "\x1b[1;1Hok\x1b[K");
    }

    #[test]
    fn status_line_is_truncated_to_width() {
        let mut screen = Screen::with_geometry(geometry(24, 5));
        screen.render_status_line("truncated").unwrap();
        assert_eq!(frame_text(&screen), "\x1b[23;1Htrunc\x1b[K");
    }

    #[test]
    fn status_truncation_counts_wide_characters() {
        let mut screen = Screen::with_geometry(geometry(24, 5));
        screen.render_status_line("日本語").unwrap();
        assert_eq!(frame_text(&screen), "\x1b[23;1H日本\x1b[K");
    }

    #[test]
    fn status_line_drops_control_characters() {
        let mut screen = Screen::with_geometry(geometry(24, 80));
        screen.render_status_line("a\x1b[2Jb").unwrap();
        assert_eq!(frame_text(&screen), "\x1b[23;1Ha[2Jb\x1b[K");
    }

    #[test]
    fn visibility_and_clear() {
        let mut screen = Screen::new(GeometryStrategy::Probe);
        screen.hide_cursor();
        screen.clear();
        screen.show_cursor();
        assert_eq!(screen.frame(), b"\x1b[?25l\x1b[2J\x1b[?25h");
    }

    // -- Flushing -----------------------------------------------------------

    #[test]
    fn flush_is_one_write() {
        let mut tty = FakeTerminal::new(geometry(24, 80));
        let mut screen = Screen::with_geometry(geometry(24, 80));
        screen.render_buffer("abc").unwrap();
        screen.render_status_line("status").unwrap();
        screen.move_cursor(1, 4).unwrap();
        screen.flush(&mut tty).unwrap();

        assert_eq!(tty.write_calls(), 1);
        assert!(screen.frame().is_empty());
        assert_eq!(tty.cursor(), ked_term::CursorPosition { row: 1, col: 4 });
    }

    #[test]
    fn empty_frame_writes_nothing() {
        let mut tty = FakeTerminal::new(geometry(24, 80));
        Screen::with_geometry(geometry(24, 80)).flush(&mut tty).unwrap();
        assert_eq!(tty.write_calls(), 0);
    }

    #[test]
    fn failed_flush_keeps_frame() {
        let mut tty = FakeTerminal::new(geometry(24, 80));
        tty.set_fail_writes(true);
        let mut screen = Screen::with_geometry(geometry(24, 80));
        screen.render_buffer("x").unwrap();
        assert!(matches!(
            screen.flush(&mut tty),
            Err(EditorError::Term(ked_term::Error::WriteFailed(_)))
        ));
        assert!(!screen.frame().is_empty());
    }
}
