//! ANSI escape sequence generation helpers.
//!
//! Cursor-movement, erase, scroll-region, and mode-toggle helpers for
//! the plain differential-frame renderer this crate implements. No
//! SGR/color helpers live here: this crate only ever writes whole,
//! already-styled line strings handed to it by `view()`.
//!
//! # Design Principles
//!
//! - **Pure functions**: no state tracking, just byte generation.
//! - **Explicit**: readable helpers over clever formatting.

use std::io::{self, Write};

// =============================================================================
// Cursor movement
// =============================================================================

/// CUP: absolute cursor position, 1-indexed (`CSI row ; col H`).
#[inline]
pub fn cup<W: Write>(w: &mut W, row: u16, col: u16) -> io::Result<()> {
    write!(w, "\x1b[{row};{col}H")
}

/// CHA: move to column `col` on the current line (`CSI col G`).
#[inline]
pub fn cha<W: Write>(w: &mut W, col: u16) -> io::Result<()> {
    write!(w, "\x1b[{col}G")
}

/// CUU: cursor up `n` lines.
#[inline]
pub fn cuu<W: Write>(w: &mut W, n: u16) -> io::Result<()> {
    if n == 0 {
        return Ok(());
    }
    write!(w, "\x1b[{n}A")
}

/// CUD: cursor down `n` lines.
#[inline]
pub fn cud<W: Write>(w: &mut W, n: u16) -> io::Result<()> {
    if n == 0 {
        return Ok(());
    }
    write!(w, "\x1b[{n}B")
}

/// CUF: cursor forward `n` columns.
#[inline]
pub fn cuf<W: Write>(w: &mut W, n: u16) -> io::Result<()> {
    if n == 0 {
        return Ok(());
    }
    write!(w, "\x1b[{n}C")
}

/// CUB: cursor back `n` columns.
#[inline]
pub fn cub<W: Write>(w: &mut W, n: u16) -> io::Result<()> {
    if n == 0 {
        return Ok(());
    }
    write!(w, "\x1b[{n}D")
}

/// DECSC: save cursor position (`ESC 7`).
pub const CURSOR_SAVE: &[u8] = b"\x1b7";
/// DECRC: restore cursor position (`ESC 8`).
pub const CURSOR_RESTORE: &[u8] = b"\x1b8";

#[inline]
pub fn cursor_save<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(CURSOR_SAVE)
}

#[inline]
pub fn cursor_restore<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(CURSOR_RESTORE)
}

/// `CSI ?25l`: hide cursor.
pub const CURSOR_HIDE: &[u8] = b"\x1b[?25l";
/// `CSI ?25h`: show cursor.
pub const CURSOR_SHOW: &[u8] = b"\x1b[?25h";

#[inline]
pub fn cursor_hide<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(CURSOR_HIDE)
}

#[inline]
pub fn cursor_show<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(CURSOR_SHOW)
}

// =============================================================================
// Erase
// =============================================================================

/// EL parameter: which part of the line to erase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraseLineMode {
    /// From cursor to end of line.
    ToEnd,
    /// From start of line to cursor.
    ToStart,
    /// The entire line.
    All,
}

/// ED parameter: which part of the display to erase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraseDisplayMode {
    /// From cursor to end of screen.
    Below,
    /// From start of screen to cursor.
    Above,
    /// The entire screen.
    All,
}

/// EL: erase in line (`CSI n K`).
#[inline]
pub fn erase_line<W: Write>(w: &mut W, mode: EraseLineMode) -> io::Result<()> {
    let n = match mode {
        EraseLineMode::ToEnd => 0,
        EraseLineMode::ToStart => 1,
        EraseLineMode::All => 2,
    };
    write!(w, "\x1b[{n}K")
}

/// ED: erase in display (`CSI n J`).
#[inline]
pub fn erase_display<W: Write>(w: &mut W, mode: EraseDisplayMode) -> io::Result<()> {
    let n = match mode {
        EraseDisplayMode::Below => 0,
        EraseDisplayMode::Above => 1,
        EraseDisplayMode::All => 2,
    };
    write!(w, "\x1b[{n}J")
}

// =============================================================================
// Scroll region / insert-line (legacy, deprecated surface — prefer
// letting the core diff drive the terminal instead)
// =============================================================================

/// DECSTBM: set scrolling region (`CSI top ; bottom r`).
#[inline]
pub fn set_scroll_region<W: Write>(w: &mut W, top: u16, bottom: u16) -> io::Result<()> {
    write!(w, "\x1b[{top};{bottom}r")
}

/// Reset the scrolling region to the full screen (`CSI r`).
pub const RESET_SCROLL_REGION: &[u8] = b"\x1b[r";

#[inline]
pub fn reset_scroll_region<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(RESET_SCROLL_REGION)
}

/// IL: insert `n` blank lines at the cursor (`CSI n L`).
///
/// Deprecated surface: kept for compatibility with callers that
/// explicitly opt into scroll regions, but the ordinary
/// line-by-line diff never emits this itself.
#[inline]
#[deprecated(note = "prefer the core line diff; only meaningful inside an opted-in scroll region")]
pub fn insert_line<W: Write>(w: &mut W, n: u16) -> io::Result<()> {
    write!(w, "\x1b[{n}L")
}

// =============================================================================
// Synchronized output
// =============================================================================

pub const SYNC_BEGIN: &[u8] = b"\x1b[?2026h";
pub const SYNC_END: &[u8] = b"\x1b[?2026l";

#[inline]
pub fn sync_begin<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(SYNC_BEGIN)
}

#[inline]
pub fn sync_end<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(SYNC_END)
}

// =============================================================================
// Alternate screen / input modes
// =============================================================================

pub const ALT_SCREEN_ENTER: &[u8] = b"\x1b[?1049h";
pub const ALT_SCREEN_LEAVE: &[u8] = b"\x1b[?1049l";

pub const BRACKETED_PASTE_ENABLE: &[u8] = b"\x1b[?2004h";
pub const BRACKETED_PASTE_DISABLE: &[u8] = b"\x1b[?2004l";

/// Cell-motion + all-motion + SGR mouse reporting, enabled together.
pub const MOUSE_ENABLE: &[u8] = b"\x1b[?1000;1002;1003;1006h";
pub const MOUSE_DISABLE: &[u8] = b"\x1b[?1000;1002;1003;1006l";

pub const FOCUS_ENABLE: &[u8] = b"\x1b[?1004h";
pub const FOCUS_DISABLE: &[u8] = b"\x1b[?1004l";

/// Kitty keyboard protocol: push flags `1` (disambiguate escape codes)
/// onto the enhancement stack.
pub const KITTY_KEYBOARD_PUSH: &[u8] = b"\x1b[>1u";
/// Kitty keyboard protocol: pop the pushed flags.
pub const KITTY_KEYBOARD_POP: &[u8] = b"\x1b[<u";

/// XTerm modifyOtherKeys, level 2.
pub const MODIFY_OTHER_KEYS_SET: &[u8] = b"\x1b[>4;2m";
/// XTerm modifyOtherKeys, reset to terminal default.
pub const MODIFY_OTHER_KEYS_RESET: &[u8] = b"\x1b[>4;0m";

/// Grapheme clustering mode (DECSET 2027): the terminal reports cursor
/// motion and selection in grapheme-cluster steps instead of codepoints.
pub const GRAPHEME_CLUSTERING_ENABLE: &[u8] = b"\x1b[?2027h";
pub const GRAPHEME_CLUSTERING_DISABLE: &[u8] = b"\x1b[?2027l";

#[inline]
pub fn alt_screen_enter<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(ALT_SCREEN_ENTER)
}

#[inline]
pub fn alt_screen_leave<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(ALT_SCREEN_LEAVE)
}

#[inline]
pub fn bracketed_paste_enable<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(BRACKETED_PASTE_ENABLE)
}

#[inline]
pub fn bracketed_paste_disable<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(BRACKETED_PASTE_DISABLE)
}

#[inline]
pub fn mouse_enable<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(MOUSE_ENABLE)
}

#[inline]
pub fn mouse_disable<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(MOUSE_DISABLE)
}

#[inline]
pub fn focus_enable<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(FOCUS_ENABLE)
}

#[inline]
pub fn focus_disable<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(FOCUS_DISABLE)
}

#[inline]
pub fn kitty_keyboard_push<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(KITTY_KEYBOARD_PUSH)
}

#[inline]
pub fn kitty_keyboard_pop<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(KITTY_KEYBOARD_POP)
}

#[inline]
pub fn modify_other_keys_set<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(MODIFY_OTHER_KEYS_SET)
}

#[inline]
pub fn modify_other_keys_reset<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(MODIFY_OTHER_KEYS_RESET)
}

#[inline]
pub fn grapheme_clustering_enable<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(GRAPHEME_CLUSTERING_ENABLE)
}

#[inline]
pub fn grapheme_clustering_disable<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(GRAPHEME_CLUSTERING_DISABLE)
}

// =============================================================================
// Window title / color reset
// =============================================================================

/// OSC 2: set window title.
#[inline]
pub fn set_window_title<W: Write>(w: &mut W, title: &str) -> io::Result<()> {
    write!(w, "\x1b]2;{title}\x07")
}

/// OSC 110/111/112: reset foreground/background/cursor color.
#[inline]
pub fn reset_foreground_color<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(b"\x1b]110\x07")
}

#[inline]
pub fn reset_background_color<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(b"\x1b]111\x07")
}

#[inline]
pub fn reset_cursor_color<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(b"\x1b]112\x07")
}

/// OSC 10/11/12 query form (`?` in place of a color spec). The reply
/// arrives as an ordinary input event (`ForegroundColor` et al.) and
/// is parsed by `wisp_core::Decoder`, not by this module.
#[inline]
pub fn query_foreground_color<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(b"\x1b]10;?\x07")
}

#[inline]
pub fn query_background_color<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(b"\x1b]11;?\x07")
}

#[inline]
pub fn query_cursor_color<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(b"\x1b]12;?\x07")
}

/// OSC 10/11/12 with an explicit `rgb:RR/GG/BB` spec.
#[inline]
pub fn set_foreground_color<W: Write>(w: &mut W, r: u8, g: u8, b: u8) -> io::Result<()> {
    write!(w, "\x1b]10;rgb:{r:02x}/{g:02x}/{b:02x}\x07")
}

#[inline]
pub fn set_background_color<W: Write>(w: &mut W, r: u8, g: u8, b: u8) -> io::Result<()> {
    write!(w, "\x1b]11;rgb:{r:02x}/{g:02x}/{b:02x}\x07")
}

#[inline]
pub fn set_cursor_color<W: Write>(w: &mut W, r: u8, g: u8, b: u8) -> io::Result<()> {
    write!(w, "\x1b]12;rgb:{r:02x}/{g:02x}/{b:02x}\x07")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cup_writes_one_indexed_position() {
        let mut buf = Vec::new();
        cup(&mut buf, 5, 10).unwrap();
        assert_eq!(buf, b"\x1b[5;10H");
    }

    #[test]
    fn cud_skips_zero() {
        let mut buf = Vec::new();
        cud(&mut buf, 0).unwrap();
        assert!(buf.is_empty());
    }

    #[test]
    fn erase_line_to_end() {
        let mut buf = Vec::new();
        erase_line(&mut buf, EraseLineMode::ToEnd).unwrap();
        assert_eq!(buf, b"\x1b[0K");
    }

    #[test]
    fn alt_screen_sequences() {
        assert_eq!(ALT_SCREEN_ENTER, b"\x1b[?1049h");
        assert_eq!(ALT_SCREEN_LEAVE, b"\x1b[?1049l");
    }

    #[test]
    fn window_title_roundtrips_text() {
        let mut buf = Vec::new();
        set_window_title(&mut buf, "wisp").unwrap();
        assert_eq!(buf, b"\x1b]2;wisp\x07");
    }

    #[test]
    fn color_query_uses_question_mark_spec() {
        let mut buf = Vec::new();
        query_background_color(&mut buf).unwrap();
        assert_eq!(buf, b"\x1b]11;?\x07");
    }

    #[test]
    fn color_set_formats_rgb_hex() {
        let mut buf = Vec::new();
        set_cursor_color(&mut buf, 0x1a, 0x2b, 0x3c).unwrap();
        assert_eq!(buf, b"\x1b]12;rgb:1a/2b/3c\x07");
    }
}
