//! The differential renderer.
//!
//! Maintains the last-committed frame and diffs the next buffered
//! frame against it line by line, emitting only the cursor movement
//! and erase sequences needed to paint the difference. Two diff
//! modes share the same line-compare core: inline mode (relative
//! cursor movement, a "print-above" queue for log lines, scrollback
//! preserved) and alt-screen mode (absolute positioning, no
//! print-above).

use std::collections::HashSet;
use std::io::{self, Write};

use unicode_width::UnicodeWidthStr;

use crate::ansi;

/// Frame-rate bounds: default 60 Hz, configurable from 1 to 120 Hz.
pub const MIN_FRAME_RATE_HZ: u8 = 1;
pub const MAX_FRAME_RATE_HZ: u8 = 120;
const DEFAULT_FRAME_RATE_HZ: u8 = 60;

/// Renderer construction options.
#[derive(Debug, Clone, Copy)]
pub struct RendererOptions {
    /// Tick rate driving `flush`. Clamped to `[MIN_FRAME_RATE_HZ,
    /// MAX_FRAME_RATE_HZ]` by [`RendererOptions::frame_rate_hz`].
    pub frame_rate_hz: u8,
    /// Start in alternate-screen mode rather than inline mode.
    pub alt_screen: bool,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            frame_rate_hz: DEFAULT_FRAME_RATE_HZ,
            alt_screen: false,
        }
    }
}

impl RendererOptions {
    /// The tick interval implied by `frame_rate_hz`, clamped to the
    /// supported range.
    #[must_use]
    pub fn tick_interval(&self) -> std::time::Duration {
        let hz = self.frame_rate_hz.clamp(MIN_FRAME_RATE_HZ, MAX_FRAME_RATE_HZ);
        std::time::Duration::from_secs_f64(1.0 / f64::from(hz))
    }
}

/// The line-based differential renderer.
///
/// `W` is the single output writer; all terminal output is expected to
/// be serialized through one `Mutex<W>` at a higher level (the
/// runtime's `TerminalController` owns that mutex) so this type itself
/// does no locking.
pub struct Renderer<W: Write> {
    writer: W,
    width: u16,
    height: u16,
    alt_screen: bool,
    cursor_hidden: bool,
    /// The last frame actually written to the output, split into
    /// lines, used for the per-line skip optimization.
    last_lines: Vec<String>,
    /// Lines queued by `PrintLine` not yet flushed. No-op while
    /// `alt_screen` is active.
    print_above: Vec<String>,
    /// Line indices excluded from the normal diff because a scroll
    /// region owns them.
    ignored_lines: HashSet<usize>,
    /// Set by `repaint()`; forces the next flush to treat every line
    /// as changed regardless of `last_lines`.
    force_repaint: bool,
    /// The buffered next frame, awaiting the next `flush`.
    pending: Option<String>,
}

impl<W: Write> Renderer<W> {
    /// Construct a renderer over `writer` with an initial terminal
    /// size. The renderer starts with an empty last-committed frame,
    /// so the first flush paints everything.
    pub fn new(writer: W, width: u16, height: u16, options: RendererOptions) -> Self {
        Self {
            writer,
            width,
            height,
            alt_screen: options.alt_screen,
            cursor_hidden: false,
            last_lines: Vec::new(),
            print_above: Vec::new(),
            ignored_lines: HashSet::new(),
            force_repaint: false,
            pending: None,
        }
    }

    /// Buffer `frame` as the next view to paint. Does not write
    /// anything; the next `flush` call performs the diff.
    pub fn write_frame(&mut self, frame: impl Into<String>) {
        self.pending = Some(frame.into());
    }

    /// Queue a line to be printed above the UI region on the next
    /// flush (`PrintLine`). A no-op while in alt-screen mode: there is
    /// no scrollback to print above.
    pub fn queue_print_above(&mut self, line: impl Into<String>) {
        if !self.alt_screen {
            self.print_above.push(line.into());
        }
    }

    /// Force the next flush to repaint every line (`Repaint`
    /// message), by clearing the cached last-committed frame.
    pub fn repaint(&mut self) {
        self.force_repaint = true;
    }

    /// Update the known terminal dimensions (`WindowSize`). This also
    /// marks the renderer for repaint since the previous frame's line
    /// wrapping may no longer be valid.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.repaint();
    }

    /// Switch between inline and alt-screen diff modes. Cursor
    /// visibility is re-asserted by the caller (the terminal
    /// controller), since some terminals keep independent cursor
    /// states per buffer.
    pub fn set_alt_screen(&mut self, alt_screen: bool) {
        if self.alt_screen != alt_screen {
            self.alt_screen = alt_screen;
            self.repaint();
        }
    }

    /// Mark `[top, bottom]` (0-indexed, inclusive) as owned by a
    /// scroll region: the normal diff skips these line indices.
    pub fn set_scroll_region(&mut self, top: usize, bottom: usize) {
        self.ignored_lines.clear();
        self.ignored_lines.extend(top..=bottom);
    }

    /// Clear any scroll-region exclusion, returning to a plain diff
    /// over every line.
    pub fn clear_scroll_region(&mut self) {
        self.ignored_lines.clear();
    }

    pub fn hide_cursor(&mut self) -> io::Result<()> {
        if !self.cursor_hidden {
            ansi::cursor_hide(&mut self.writer)?;
            self.cursor_hidden = true;
        }
        Ok(())
    }

    pub fn show_cursor(&mut self) -> io::Result<()> {
        if self.cursor_hidden {
            ansi::cursor_show(&mut self.writer)?;
            self.cursor_hidden = false;
        }
        Ok(())
    }

    /// Compare the buffered frame against the last-committed one and
    /// write the minimal diff. A no-op when the buffered frame is
    /// absent or byte-equal to the last committed frame and no repaint
    /// was forced.
    pub fn flush(&mut self) -> io::Result<()> {
        let Some(frame) = self.pending.take() else {
            return Ok(());
        };

        let new_lines: Vec<String> = frame.split('\n').map(str::to_string).collect();
        let unchanged = !self.force_repaint && new_lines == self.last_lines;
        if unchanged {
            return Ok(());
        }

        if self.alt_screen {
            self.flush_alt_screen(&new_lines)?;
        } else {
            self.flush_inline(&new_lines)?;
        }

        self.last_lines = new_lines;
        self.force_repaint = false;
        self.writer.flush()
    }

    fn flush_inline(&mut self, new_lines: &[String]) -> io::Result<()> {
        let visible: Vec<&String> = if self.height > 0 && new_lines.len() > self.height as usize {
            &new_lines[new_lines.len() - self.height as usize..]
        } else {
            new_lines
        };

        if !self.print_above.is_empty() {
            for line in self.print_above.drain(..) {
                self.write_truncated(&line)?;
                ansi::erase_line(&mut self.writer, ansi::EraseLineMode::ToEnd)?;
                write!(self.writer, "\r\n")?;
            }
        }

        let previous_len = self.last_lines.len();
        for (idx, line) in visible.iter().enumerate() {
            if self.ignored_lines.contains(&idx) {
                if idx + 1 < visible.len() {
                    write!(self.writer, "\r\n")?;
                }
                continue;
            }

            let unchanged = !self.force_repaint
                && self
                    .last_lines
                    .get(idx)
                    .is_some_and(|prev| prev == *line);
            if unchanged {
                if idx + 1 < visible.len() {
                    ansi::cud(&mut self.writer, 1)?;
                }
                continue;
            }

            self.write_truncated(line)?;
            if self.width > 0 && line.width() < self.width as usize {
                ansi::erase_line(&mut self.writer, ansi::EraseLineMode::ToEnd)?;
            }
            if idx + 1 < visible.len() {
                write!(self.writer, "\r\n")?;
            }
        }

        if visible.len() < previous_len {
            ansi::erase_display(&mut self.writer, ansi::EraseDisplayMode::Below)?;
        }

        Ok(())
    }

    fn flush_alt_screen(&mut self, new_lines: &[String]) -> io::Result<()> {
        ansi::cup(&mut self.writer, 1, 1)?;

        let previous_len = self.last_lines.len();
        for (idx, line) in new_lines.iter().enumerate() {
            if self.ignored_lines.contains(&idx) {
                continue;
            }

            let unchanged = !self.force_repaint
                && self
                    .last_lines
                    .get(idx)
                    .is_some_and(|prev| prev == line);
            if unchanged {
                continue;
            }

            ansi::cup(&mut self.writer, idx as u16 + 1, 1)?;
            self.write_truncated(line)?;
            if self.width > 0 && line.width() < self.width as usize {
                ansi::erase_line(&mut self.writer, ansi::EraseLineMode::ToEnd)?;
            }
        }

        if new_lines.len() < previous_len {
            ansi::cup(&mut self.writer, new_lines.len() as u16 + 1, 1)?;
            ansi::erase_display(&mut self.writer, ansi::EraseDisplayMode::Below)?;
        }

        Ok(())
    }

    fn write_truncated(&mut self, line: &str) -> io::Result<()> {
        if self.width == 0 {
            return self.writer.write_all(line.as_bytes());
        }
        let width = self.width as usize;
        if line.width() <= width {
            return self.writer.write_all(line.as_bytes());
        }
        let mut acc = 0usize;
        let mut end = line.len();
        for (byte_idx, ch) in line.char_indices() {
            let w = UnicodeWidthStr::width(ch.encode_utf8(&mut [0u8; 4]) as &str);
            if acc + w > width {
                end = byte_idx;
                break;
            }
            acc += w;
        }
        self.writer.write_all(line[..end].as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_once(r: &mut Renderer<Vec<u8>>, frame: &str) -> String {
        r.write_frame(frame);
        r.flush().unwrap();
        let out = String::from_utf8(std::mem::take(&mut r.writer)).unwrap();
        out
    }

    #[test]
    fn idempotent_render_emits_nothing_twice() {
        let mut r = Renderer::new(Vec::new(), 80, 24, RendererOptions::default());
        let first = render_once(&mut r, "A\nB\nC");
        assert!(!first.is_empty());
        let second = render_once(&mut r, "A\nB\nC");
        assert!(second.is_empty(), "expected no output, got {second:?}");
    }

    #[test]
    fn changed_middle_line_only_repaints_that_line() {
        let mut r = Renderer::new(Vec::new(), 80, 24, RendererOptions::default());
        render_once(&mut r, "A\nB\nC");
        let diff = render_once(&mut r, "A\nX\nC");
        // Line 0 and line 2 are untouched (cursor-down only); line 1 is rewritten.
        assert!(diff.contains('X'));
        assert!(!diff.contains('C'));
    }

    #[test]
    fn shrinking_frame_erases_below() {
        let mut r = Renderer::new(Vec::new(), 80, 24, RendererOptions::default());
        render_once(&mut r, "A\nB\nC");
        let diff = render_once(&mut r, "A\nB");
        assert!(diff.contains("\x1b[0J"));
    }

    #[test]
    fn print_above_flushes_before_the_frame_and_clears_queue() {
        let mut r = Renderer::new(Vec::new(), 80, 24, RendererOptions::default());
        r.queue_print_above("log line");
        let out = render_once(&mut r, "UI");
        assert!(out.contains("log line"));
        assert!(r.print_above.is_empty());
    }

    #[test]
    fn print_above_is_suppressed_in_alt_screen() {
        let mut r = Renderer::new(
            Vec::new(),
            80,
            24,
            RendererOptions {
                alt_screen: true,
                ..Default::default()
            },
        );
        r.queue_print_above("should be ignored");
        assert!(r.print_above.is_empty());
    }

    #[test]
    fn alt_screen_positions_absolutely() {
        let mut r = Renderer::new(
            Vec::new(),
            80,
            24,
            RendererOptions {
                alt_screen: true,
                ..Default::default()
            },
        );
        let out = render_once(&mut r, "A\nB");
        assert!(out.starts_with("\x1b[1;1H"));
    }

    #[test]
    fn repaint_forces_full_redraw() {
        let mut r = Renderer::new(Vec::new(), 80, 24, RendererOptions::default());
        render_once(&mut r, "A\nB");
        r.repaint();
        let diff = render_once(&mut r, "A\nB");
        assert!(diff.contains('A'));
        assert!(diff.contains('B'));
    }

    #[test]
    fn scroll_region_lines_are_skipped_by_the_diff() {
        let mut r = Renderer::new(Vec::new(), 80, 24, RendererOptions::default());
        render_once(&mut r, "A\nB\nC");
        r.set_scroll_region(1, 1);
        let diff = render_once(&mut r, "A\nZZZ\nC");
        assert!(!diff.contains("ZZZ"));
    }

    #[test]
    fn frame_rate_clamped_to_supported_range() {
        let opts = RendererOptions {
            frame_rate_hz: 255,
            alt_screen: false,
        };
        assert_eq!(
            opts.tick_interval(),
            std::time::Duration::from_secs_f64(1.0 / f64::from(MAX_FRAME_RATE_HZ))
        );
    }

    #[test]
    fn lines_beyond_terminal_height_are_dropped_from_the_top() {
        let mut r = Renderer::new(Vec::new(), 80, 2, RendererOptions::default());
        let out = render_once(&mut r, "one\ntwo\nthree");
        assert!(!out.contains("one"));
        assert!(out.contains("two"));
        assert!(out.contains("three"));
    }

    #[test]
    fn cursor_hide_show_are_idempotent() {
        let mut r = Renderer::new(Vec::new(), 80, 24, RendererOptions::default());
        r.hide_cursor().unwrap();
        r.hide_cursor().unwrap();
        let out = String::from_utf8(std::mem::take(&mut r.writer)).unwrap();
        assert_eq!(out.matches("\x1b[?25l").count(), 1);
    }

    proptest::proptest! {
        // Rendering the same frame twice in a row emits nothing on the
        // second call, for any frame.
        #[test]
        fn rendering_the_same_frame_twice_is_silent(
            lines in proptest::collection::vec("[ -~]{0,40}", 0..8),
        ) {
            let frame = lines.join("\n");
            let mut r = Renderer::new(Vec::new(), 80, 24, RendererOptions::default());
            render_once(&mut r, &frame);
            let second = render_once(&mut r, &frame);
            proptest::prop_assert!(second.is_empty(), "expected no output, got {second:?}");
        }

        // Repainting after any sequence of frames always reproduces
        // every line of the most recent one somewhere in the output.
        #[test]
        fn repaint_always_reproduces_every_line(
            lines in proptest::collection::vec("[ -~]{1,20}", 1..6),
        ) {
            let frame = lines.join("\n");
            let mut r = Renderer::new(Vec::new(), 80, 24, RendererOptions::default());
            render_once(&mut r, "stale");
            r.repaint();
            let out = render_once(&mut r, &frame);
            for line in &lines {
                proptest::prop_assert!(out.contains(line.as_str()));
            }
        }
    }
}
