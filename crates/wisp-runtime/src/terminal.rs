//! Terminal controller: raw-mode entry/exit, the mode enable/disable
//! escape sequences, and window-size queries.
//!
//! Raw mode is entered via plain `libc` `termios` calls rather than
//! the `nix` crate, matching the style `wisp-reader` already
//! established for its own platform code. The enabled-mode set is
//! tracked with `wisp_render::mode::Modes` (open-ended) rather than a
//! fixed set of boolean fields, since the mode list here (keyboard
//! enhancement levels, grapheme clustering) is longer than a fixed
//! struct comfortably holds.

use std::io::{self, Write};

use wisp_core::Error;
use wisp_render::ansi;
use wisp_render::mode::{ModeId, Modes};

#[cfg(unix)]
mod unix_tty {
    use std::io;
    use std::os::unix::io::RawFd;

    /// Saved termios state, restored verbatim on teardown.
    #[derive(Clone, Copy)]
    pub struct SavedTermios(libc::termios);

    /// Enter raw mode on `fd`, returning the previous termios so the
    /// caller can restore it later.
    pub fn enable_raw_mode(fd: RawFd) -> io::Result<SavedTermios> {
        let mut original: libc::termios = unsafe { std::mem::zeroed() };
        if unsafe { libc::tcgetattr(fd, &mut original) } != 0 {
            return Err(io::Error::last_os_error());
        }

        let mut raw = original;
        unsafe {
            libc::cfmakeraw(&mut raw);
        }
        if unsafe { libc::tcsetattr(fd, libc::TCSAFLUSH, &raw) } != 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(SavedTermios(original))
    }

    /// Restore a previously saved termios state.
    pub fn restore(fd: RawFd, saved: SavedTermios) -> io::Result<()> {
        if unsafe { libc::tcsetattr(fd, libc::TCSAFLUSH, &saved.0) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Query the terminal's column/row size via `TIOCGWINSZ`.
    pub fn window_size(fd: RawFd) -> io::Result<(u16, u16)> {
        let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
        if unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut ws) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok((ws.ws_col, ws.ws_row))
    }

    pub fn is_tty(fd: RawFd) -> bool {
        unsafe { libc::isatty(fd) == 1 }
    }
}

#[cfg(windows)]
mod windows_tty {
    use std::io;
    use std::os::windows::io::RawHandle;

    use windows_sys::Win32::Foundation::HANDLE;
    use windows_sys::Win32::System::Console::{
        CONSOLE_MODE, ENABLE_PROCESSED_INPUT, ENABLE_VIRTUAL_TERMINAL_INPUT,
        ENABLE_VIRTUAL_TERMINAL_PROCESSING, GetConsoleMode, GetConsoleScreenBufferInfo,
        SetConsoleMode, CONSOLE_SCREEN_BUFFER_INFO,
    };

    #[derive(Clone, Copy)]
    pub struct SavedMode(CONSOLE_MODE);

    pub fn enable_raw_mode(handle: RawHandle) -> io::Result<SavedMode> {
        let handle = handle as HANDLE;
        let mut original: CONSOLE_MODE = 0;
        if unsafe { GetConsoleMode(handle, &mut original) } == 0 {
            return Err(io::Error::last_os_error());
        }
        let raw = ENABLE_VIRTUAL_TERMINAL_INPUT;
        if unsafe { SetConsoleMode(handle, raw) } == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(SavedMode(original))
    }

    pub fn restore(handle: RawHandle, saved: SavedMode) -> io::Result<()> {
        let handle = handle as HANDLE;
        if unsafe { SetConsoleMode(handle, saved.0) } == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    pub fn enable_virtual_terminal_processing(handle: RawHandle) -> io::Result<()> {
        let handle = handle as HANDLE;
        let mut mode: CONSOLE_MODE = 0;
        if unsafe { GetConsoleMode(handle, &mut mode) } == 0 {
            return Err(io::Error::last_os_error());
        }
        if unsafe { SetConsoleMode(handle, mode | ENABLE_VIRTUAL_TERMINAL_PROCESSING) } == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    pub fn window_size(handle: RawHandle) -> io::Result<(u16, u16)> {
        let handle = handle as HANDLE;
        let mut info: CONSOLE_SCREEN_BUFFER_INFO = unsafe { std::mem::zeroed() };
        if unsafe { GetConsoleScreenBufferInfo(handle, &mut info) } == 0 {
            return Err(io::Error::last_os_error());
        }
        let width = (info.srWindow.Right - info.srWindow.Left + 1).max(0) as u16;
        let height = (info.srWindow.Bottom - info.srWindow.Top + 1).max(0) as u16;
        Ok((width, height))
    }
}

/// Which optional modes to enable at startup, and the renderer's
/// frame rate.
#[derive(Debug, Clone, Copy)]
pub struct TerminalOptions {
    pub alt_screen: bool,
    pub mouse: bool,
    pub bracketed_paste: bool,
    pub focus_reports: bool,
    pub kitty_keyboard: bool,
    pub hide_cursor: bool,
}

impl Default for TerminalOptions {
    fn default() -> Self {
        Self {
            alt_screen: false,
            mouse: false,
            bracketed_paste: false,
            focus_reports: false,
            kitty_keyboard: false,
            hide_cursor: false,
        }
    }
}

#[cfg(unix)]
struct Platform {
    in_fd: std::os::unix::io::RawFd,
    out_fd: std::os::unix::io::RawFd,
    saved_termios: Option<unix_tty::SavedTermios>,
}

#[cfg(windows)]
struct Platform {
    in_handle: std::os::windows::io::RawHandle,
    out_handle: std::os::windows::io::RawHandle,
    saved_mode: Option<windows_tty::SavedMode>,
}

/// Owns raw-mode entry/exit and the set of currently-enabled terminal
/// modes, and writes the escape sequences that toggle them.
///
/// On drop (or explicit `teardown`), every mode enabled during startup
/// is disabled in reverse order and the termios/console-mode state is
/// restored byte-for-byte.
pub struct TerminalController<W: Write> {
    writer: W,
    modes: Modes,
    platform: Platform,
    torn_down: bool,
}

impl<W: Write> TerminalController<W> {
    /// Take raw-mode ownership of the given input/output descriptors
    /// and enable `options`' requested modes in the well-known order:
    /// alt-screen, then cursor visibility, then mouse, bracketed-paste,
    /// focus, keyboard protocols.
    #[cfg(unix)]
    pub fn open(
        in_fd: std::os::unix::io::RawFd,
        out_fd: std::os::unix::io::RawFd,
        writer: W,
        options: TerminalOptions,
    ) -> wisp_core::Result<Self> {
        let saved_termios = if unix_tty::is_tty(in_fd) {
            Some(unix_tty::enable_raw_mode(in_fd).map_err(|source| Error::ModeSet {
                mode: "raw",
                source,
            })?)
        } else {
            None
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(tty = saved_termios.is_some(), "raw mode entered");

        let mut controller = Self {
            writer,
            modes: Modes::new(),
            platform: Platform {
                in_fd,
                out_fd,
                saved_termios,
            },
            torn_down: false,
        };
        controller.apply_startup_modes(options)?;
        Ok(controller)
    }

    #[cfg(windows)]
    pub fn open(
        in_handle: std::os::windows::io::RawHandle,
        out_handle: std::os::windows::io::RawHandle,
        writer: W,
        options: TerminalOptions,
    ) -> wisp_core::Result<Self> {
        let saved_mode = windows_tty::enable_raw_mode(in_handle)
            .map_err(|source| Error::ModeSet { mode: "raw", source })?;
        let _ = windows_tty::enable_virtual_terminal_processing(out_handle);
        #[cfg(feature = "tracing")]
        tracing::debug!("raw mode entered");

        let mut controller = Self {
            writer,
            modes: Modes::new(),
            platform: Platform {
                in_handle,
                out_handle,
                saved_mode: Some(saved_mode),
            },
            torn_down: false,
        };
        controller.apply_startup_modes(options)?;
        Ok(controller)
    }

    fn apply_startup_modes(&mut self, options: TerminalOptions) -> wisp_core::Result<()> {
        if options.alt_screen {
            self.enable_mode(ModeId::AltScreen)?;
        }
        if options.hide_cursor {
            self.writer
                .write_all(ansi::CURSOR_HIDE)
                .map_err(Error::Io)?;
            self.modes.mark_enabled(ModeId::CursorVisibility);
        }
        if options.mouse {
            self.enable_mode(ModeId::MouseSgr)?;
        }
        if options.bracketed_paste {
            self.enable_mode(ModeId::BracketedPaste)?;
        }
        if options.focus_reports {
            self.enable_mode(ModeId::FocusReports)?;
        }
        if options.kitty_keyboard {
            self.enable_mode(ModeId::KittyKeyboard)?;
        }
        self.writer.flush().map_err(Error::Io)?;
        Ok(())
    }

    /// Enable one mode and record it for reverse-order teardown.
    pub fn enable_mode(&mut self, mode: ModeId) -> wisp_core::Result<()> {
        let result = match mode {
            ModeId::AltScreen => ansi::alt_screen_enter(&mut self.writer),
            ModeId::BracketedPaste => ansi::bracketed_paste_enable(&mut self.writer),
            ModeId::MouseCellMotion | ModeId::MouseAllMotion | ModeId::MouseSgr => {
                ansi::mouse_enable(&mut self.writer)
            }
            ModeId::FocusReports => ansi::focus_enable(&mut self.writer),
            ModeId::CursorVisibility => {
                self.writer.write_all(ansi::CURSOR_HIDE)
            }
            ModeId::ModifyOtherKeys => ansi::modify_other_keys_set(&mut self.writer),
            ModeId::KittyKeyboard => ansi::kitty_keyboard_push(&mut self.writer),
            ModeId::GraphemeClustering => ansi::grapheme_clustering_enable(&mut self.writer),
        };
        result.map_err(|source| Error::ModeSet {
            mode: mode.name(),
            source,
        })?;
        self.modes.mark_enabled(mode);
        #[cfg(feature = "tracing")]
        tracing::trace!(mode = mode.name(), "mode enabled");
        self.writer.flush().map_err(Error::Io)
    }

    /// Disable one mode and remove it from the tracked set.
    pub fn disable_mode(&mut self, mode: ModeId) -> wisp_core::Result<()> {
        let result = match mode {
            ModeId::AltScreen => ansi::alt_screen_leave(&mut self.writer),
            ModeId::BracketedPaste => ansi::bracketed_paste_disable(&mut self.writer),
            ModeId::MouseCellMotion | ModeId::MouseAllMotion | ModeId::MouseSgr => {
                ansi::mouse_disable(&mut self.writer)
            }
            ModeId::FocusReports => ansi::focus_disable(&mut self.writer),
            ModeId::CursorVisibility => self.writer.write_all(ansi::CURSOR_SHOW),
            ModeId::ModifyOtherKeys => ansi::modify_other_keys_reset(&mut self.writer),
            ModeId::KittyKeyboard => ansi::kitty_keyboard_pop(&mut self.writer),
            ModeId::GraphemeClustering => ansi::grapheme_clustering_disable(&mut self.writer),
        };
        result.map_err(|source| Error::ModeSet {
            mode: mode.name(),
            source,
        })?;
        self.modes.mark_disabled(mode);
        #[cfg(feature = "tracing")]
        tracing::trace!(mode = mode.name(), "mode disabled");
        self.writer.flush().map_err(Error::Io)
    }

    pub fn set_window_title(&mut self, title: &str) -> wisp_core::Result<()> {
        ansi::set_window_title(&mut self.writer, title).map_err(Error::Io)?;
        self.writer.flush().map_err(Error::Io)
    }

    pub fn clear_screen(&mut self) -> wisp_core::Result<()> {
        ansi::erase_display(&mut self.writer, ansi::EraseDisplayMode::All).map_err(Error::Io)?;
        ansi::cup(&mut self.writer, 1, 1).map_err(Error::Io)?;
        self.writer.flush().map_err(Error::Io)
    }

    pub fn write_raw(&mut self, bytes: &[u8]) -> wisp_core::Result<()> {
        self.writer.write_all(bytes).map_err(Error::Io)?;
        self.writer.flush().map_err(Error::Io)
    }

    /// `Some(color)` writes an explicit OSC 10/11/12 set sequence;
    /// `None` writes the query form (`?`) and the reply later arrives
    /// as a `ForegroundColor`/`BackgroundColor`/`CursorColor` input
    /// event, parsed by `wisp_core::Decoder`.
    pub fn set_color(
        &mut self,
        target: crate::message::ColorTarget,
        color: Option<wisp_core::Color>,
    ) -> wisp_core::Result<()> {
        use crate::message::ColorTarget;
        let result = match (target, color) {
            (ColorTarget::Foreground, None) => ansi::query_foreground_color(&mut self.writer),
            (ColorTarget::Background, None) => ansi::query_background_color(&mut self.writer),
            (ColorTarget::Cursor, None) => ansi::query_cursor_color(&mut self.writer),
            (ColorTarget::Foreground, Some(wisp_core::Color::Rgb(r, g, b))) => {
                ansi::set_foreground_color(&mut self.writer, r, g, b)
            }
            (ColorTarget::Background, Some(wisp_core::Color::Rgb(r, g, b))) => {
                ansi::set_background_color(&mut self.writer, r, g, b)
            }
            (ColorTarget::Cursor, Some(wisp_core::Color::Rgb(r, g, b))) => {
                ansi::set_cursor_color(&mut self.writer, r, g, b)
            }
            // `Color::Unknown` carries a spec string we cannot safely
            // re-emit (it may not be an `rgb:` triple); silently skip
            // rather than write a malformed sequence.
            (_, Some(wisp_core::Color::Unknown(_))) => return Ok(()),
        };
        result.map_err(Error::Io)?;
        self.writer.flush().map_err(Error::Io)
    }

    /// Query the real terminal size.
    #[cfg(unix)]
    pub fn window_size(&self) -> wisp_core::Result<(u16, u16)> {
        unix_tty::window_size(self.platform.out_fd).map_err(Error::Io)
    }

    #[cfg(windows)]
    pub fn window_size(&self) -> wisp_core::Result<(u16, u16)> {
        windows_tty::window_size(self.platform.out_handle).map_err(Error::Io)
    }

    /// Relinquish raw mode and every enabled terminal mode, in
    /// reverse enable order (bounded, idempotent — safe to call more
    /// than once). Used both by the ordinary shutdown sequence and by
    /// `Suspend` (release the terminal before `SIGTSTP`).
    pub fn teardown(&mut self) -> wisp_core::Result<()> {
        if self.torn_down {
            return Ok(());
        }
        let modes: Vec<ModeId> = self.modes.teardown_order().collect();
        let mut first_err = None;
        for mode in modes {
            if let Err(err) = self.disable_mode(mode) {
                first_err.get_or_insert(err);
            }
        }
        self.restore_raw_mode();
        self.torn_down = true;
        #[cfg(feature = "tracing")]
        tracing::debug!(error = first_err.is_some(), "raw mode restored");
        if let Some(err) = first_err {
            return Err(err);
        }
        Ok(())
    }

    /// Re-acquire raw mode and restore every mode that was enabled
    /// before `teardown` (used by `Suspend`/`Resume`).
    #[cfg(unix)]
    pub fn reacquire(&mut self, options: TerminalOptions) -> wisp_core::Result<()> {
        if unix_tty::is_tty(self.platform.in_fd) {
            self.platform.saved_termios =
                Some(unix_tty::enable_raw_mode(self.platform.in_fd).map_err(|source| {
                    Error::ModeSet {
                        mode: "raw",
                        source,
                    }
                })?);
        }
        self.torn_down = false;
        self.apply_startup_modes(options)
    }

    #[cfg(unix)]
    fn restore_raw_mode(&mut self) {
        if let Some(saved) = self.platform.saved_termios.take() {
            let _ = unix_tty::restore(self.platform.in_fd, saved);
        }
    }

    #[cfg(windows)]
    fn restore_raw_mode(&mut self) {
        if let Some(saved) = self.platform.saved_mode.take() {
            let _ = windows_tty::restore(self.platform.in_handle, saved);
        }
    }
}

impl<W: Write> Drop for TerminalController<W> {
    fn drop(&mut self) {
        let _ = self.teardown();
    }
}

/// Best-effort `is_tty` check used by `Program::new` to decide whether
/// raw-mode/escape-sequence output should be attempted at all.
#[cfg(unix)]
pub fn stdin_is_tty() -> bool {
    unix_tty::is_tty(0)
}

#[cfg(windows)]
pub fn stdin_is_tty() -> bool {
    true
}

/// Query the real terminal size directly on the standard output
/// descriptor/handle, independent of any open [`TerminalController`].
/// Used by the signal watcher, which reports resizes before (or
/// between) controller lifetimes.
#[cfg(unix)]
pub fn query_window_size() -> io::Result<(u16, u16)> {
    unix_tty::window_size(1)
}

#[cfg(windows)]
pub fn query_window_size() -> io::Result<(u16, u16)> {
    use std::os::windows::io::AsRawHandle;
    windows_tty::window_size(io::stdout().as_raw_handle())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn enable_then_disable_round_trips_a_mode() {
        // Exercises the ansi byte output without touching a real TTY:
        // writer is an in-memory buffer, platform fd fields are dummy.
        let mut controller = TerminalController {
            writer: Vec::<u8>::new(),
            modes: Modes::new(),
            platform: Platform {
                in_fd: -1,
                out_fd: -1,
                saved_termios: None,
            },
            torn_down: true, // skip Drop's real teardown attempt
        };
        controller.enable_mode(ModeId::AltScreen).unwrap();
        assert!(controller.modes.is_enabled(ModeId::AltScreen));
        controller.disable_mode(ModeId::AltScreen).unwrap();
        assert!(!controller.modes.is_enabled(ModeId::AltScreen));
        let out = String::from_utf8(controller.writer).unwrap();
        assert!(out.contains("\x1b[?1049h"));
        assert!(out.contains("\x1b[?1049l"));
    }

    #[test]
    fn grapheme_clustering_writes_decset_2027() {
        let mut controller = TerminalController {
            writer: Vec::<u8>::new(),
            modes: Modes::new(),
            platform: Platform {
                in_fd: -1,
                out_fd: -1,
                saved_termios: None,
            },
            torn_down: true,
        };
        controller.enable_mode(ModeId::GraphemeClustering).unwrap();
        assert!(controller.modes.is_enabled(ModeId::GraphemeClustering));
        controller.disable_mode(ModeId::GraphemeClustering).unwrap();
        assert!(!controller.modes.is_enabled(ModeId::GraphemeClustering));
        let out = String::from_utf8(controller.writer).unwrap();
        assert!(out.contains("\x1b[?2027h"));
        assert!(out.contains("\x1b[?2027l"));
    }
}
