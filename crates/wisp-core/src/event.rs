//! The canonical input event taxonomy produced by the decoder.
//!
//! All events derive `Debug, Clone, PartialEq` so application code and
//! tests can match and compare them; `KeyEvent`/`KeyCode`/`Modifiers`
//! additionally derive `Eq, Hash` so they can key a binding table.

use bitflags::bitflags;

use crate::color::Color;

/// A decoded terminal input event.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A key was pressed (or repeated — see [`KeyEvent::is_repeat`]).
    KeyPress(KeyEvent),
    /// A key was released. Only terminals speaking the Kitty keyboard
    /// protocol (or certain Windows consoles) report this.
    KeyRelease(KeyEvent),

    /// A mouse button went down.
    MouseClick(MouseEvent),
    /// A mouse button was released.
    MouseRelease(MouseEvent),
    /// The mouse moved, with or without a button held.
    MouseMotion(MouseEvent),
    /// The mouse wheel was scrolled (`button` is one of the `Wheel*`
    /// variants).
    MouseWheel(MouseEvent),

    /// A full bracketed-paste run, already reassembled.
    Paste(String),
    /// The `CSI 200~` bracketed-paste start marker.
    PasteStart,
    /// The `CSI 201~` bracketed-paste end marker.
    PasteEnd,

    /// The terminal gained focus (`CSI I`).
    Focus,
    /// The terminal lost focus (`CSI O`).
    Blur,

    /// The terminal window was resized.
    WindowSize {
        /// New width in columns.
        width: u16,
        /// New height in rows.
        height: u16,
    },
    /// A cursor position report (`CSI row ; col R`).
    CursorPosition {
        /// 0-indexed column.
        x: u16,
        /// 0-indexed row.
        y: u16,
    },

    /// Reply to an OSC 10 foreground color query.
    ForegroundColor(Color),
    /// Reply to an OSC 11 background color query.
    BackgroundColor(Color),
    /// Reply to an OSC 12 cursor color query.
    CursorColor(Color),

    /// `CSI ? ... c` primary device attributes, as raw parameters.
    PrimaryDeviceAttributes(Vec<u16>),
    /// `DCS > | ... ST` (XTVERSION) terminal name/version string.
    TerminalVersion(String),
    /// `DCS 1 + r name=value;... ST` (XTGETTCAP) capability reply.
    CapabilityReport(Vec<(String, String)>),
    /// `CSI ? mode $ y` DECRQM mode report.
    ModeReport {
        /// The queried DEC private mode number.
        mode: u16,
        /// 0 = not recognized, 1 = set, 2 = reset, 3 = permanently
        /// set, 4 = permanently reset.
        value: u16,
    },
    /// `CSI ? flags u` Kitty keyboard-enhancement flag report.
    KeyboardEnhancements(u8),

    /// OSC 52 clipboard reply (system clipboard, `c`).
    Clipboard(String),
    /// OSC 52 clipboard reply (primary/selection clipboard, `p`).
    PrimaryClipboard(String),

    /// A byte sequence the decoder recognized the *shape* of but not
    /// the *meaning* of, preserved for debugging. Never stops the
    /// loop.
    Unknown(Vec<u8>),

    /// More than one event was produced by a single input chunk (for
    /// example the F3-vs-cursor-position ambiguity, or Windows
    /// console key-repeat expansion).
    MultiEvent(Vec<Event>),
}

/// A keyboard event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    /// The key as reported (after applying modifier-derived policy).
    pub code: KeyCode,
    /// The physical key with no modifiers applied, when the terminal
    /// told us (Kitty keyboard protocol "base layout" codepoint).
    pub base_code: Option<KeyCode>,
    /// The key as it would appear with Shift applied, when the
    /// terminal told us (Kitty keyboard protocol "shifted" codepoint).
    pub shifted_code: Option<KeyCode>,
    /// Modifier keys held during the event.
    pub modifiers: Modifiers,
    /// The text this key would insert, if any (empty for pure control
    /// keys such as arrows).
    pub text: String,
    /// True if the terminal reported this as an auto-repeat (Kitty
    /// keyboard protocol event-type 2, or Windows `wRepeatCount > 1`).
    pub is_repeat: bool,
}

impl KeyEvent {
    /// Construct a plain key press with no modifiers, no repeat, and
    /// no base/shifted disambiguation.
    #[must_use]
    pub fn new(code: KeyCode) -> Self {
        Self {
            code,
            base_code: None,
            shifted_code: None,
            modifiers: Modifiers::NONE,
            text: String::new(),
            is_repeat: false,
        }
    }

    /// Builder: attach modifiers.
    #[must_use]
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Builder: attach the text this key would insert.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Builder: mark this event as a repeat.
    #[must_use]
    pub fn with_repeat(mut self, repeat: bool) -> Self {
        self.is_repeat = repeat;
        self
    }

    /// True if this is a plain, unmodified character key.
    #[must_use]
    pub fn is_char(&self, c: char) -> bool {
        matches!(self.code, KeyCode::Char(ch) if ch == c)
    }

    /// True if Ctrl is held.
    #[must_use]
    pub const fn ctrl(&self) -> bool {
        self.modifiers.contains(Modifiers::CTRL)
    }

    /// True if Alt is held.
    #[must_use]
    pub const fn alt(&self) -> bool {
        self.modifiers.contains(Modifiers::ALT)
    }

    /// True if Shift is held.
    #[must_use]
    pub const fn shift(&self) -> bool {
        self.modifiers.contains(Modifiers::SHIFT)
    }
}

/// Key codes, covering both printable characters and symbolic keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A single-codepoint printable character.
    Char(char),
    /// Enter/Return.
    Enter,
    /// Escape.
    Escape,
    /// Backspace.
    Backspace,
    /// Tab.
    Tab,
    /// Shift+Tab (back-tab), reported as its own symbolic key by most
    /// terminals rather than as Tab with a Shift modifier.
    BackTab,
    /// Delete (forward delete).
    Delete,
    /// Insert.
    Insert,
    /// Home.
    Home,
    /// End.
    End,
    /// Page Up.
    PageUp,
    /// Page Down.
    PageDown,
    /// Up arrow.
    Up,
    /// Down arrow.
    Down,
    /// Left arrow.
    Left,
    /// Right arrow.
    Right,
    /// The keypad "Begin" key (SS3 `E`, CSI `1;mod E`).
    Begin,
    /// Function key F1 through F63 (terminals that collapse F13+ onto
    /// F1-F12 with modifiers never produce values above 12 — see
    /// `DecoderOptions::extended_function_keys`).
    F(u8),
    /// NUL (Ctrl+Space / Ctrl+@), when policy reports it symbolically.
    Null,
    /// Legacy "Find" key (`CSI 1~`).
    Find,
    /// Legacy "Select" key (`CSI 4~`, distinct from Home on some
    /// terminals).
    Select,
    /// A grapheme cluster made of more than one Unicode codepoint
    /// (flag sequences, ZWJ emoji, combining marks). `text` on the
    /// enclosing `KeyEvent` carries the cluster; this variant exists
    /// so `code` is still hashable/comparable without allocating.
    Extended,
}

bitflags! {
    /// Modifier keys held during a key or mouse event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u16 {
        /// No modifiers.
        const NONE        = 0;
        /// Shift.
        const SHIFT       = 1 << 0;
        /// Alt/Option.
        const ALT         = 1 << 1;
        /// Control.
        const CTRL        = 1 << 2;
        /// Meta (distinct from Super on terminals that report both).
        const META        = 1 << 3;
        /// Hyper.
        const HYPER       = 1 << 4;
        /// Super/Windows/Command.
        const SUPER       = 1 << 5;
        /// Caps Lock is engaged (Kitty keyboard protocol lock state,
        /// not a modifier the key was chorded with).
        const CAPS_LOCK   = 1 << 6;
        /// Num Lock is engaged.
        const NUM_LOCK    = 1 << 7;
        /// Scroll Lock is engaged.
        const SCROLL_LOCK = 1 << 8;
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::NONE
    }
}

/// A mouse event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MouseEvent {
    /// 0-indexed column.
    pub x: u16,
    /// 0-indexed row.
    pub y: u16,
    /// The button involved, or `None` for a motion-only report.
    pub button: MouseButton,
    /// Modifier keys held during the event.
    pub modifiers: Modifiers,
}

impl MouseEvent {
    /// Construct a mouse event with no modifiers.
    #[must_use]
    pub const fn new(x: u16, y: u16, button: MouseButton) -> Self {
        Self {
            x,
            y,
            button,
            modifiers: Modifiers::NONE,
        }
    }

    /// Builder: attach modifiers.
    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// Mouse button / wheel direction identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// No button (plain motion report).
    None,
    /// Left button.
    Left,
    /// Middle button.
    Middle,
    /// Right button.
    Right,
    /// "Back" side button.
    Backward,
    /// "Forward" side button.
    Forward,
    /// First extra button beyond the five above (SGR button code 128+).
    Extra1,
    /// Second extra button.
    Extra2,
    /// Wheel scrolled up.
    WheelUp,
    /// Wheel scrolled down.
    WheelDown,
    /// Wheel scrolled left (horizontal tilt).
    WheelLeft,
    /// Wheel scrolled right.
    WheelRight,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_event_is_char() {
        let ev = KeyEvent::new(KeyCode::Char('q'));
        assert!(ev.is_char('q'));
        assert!(!ev.is_char('Q'));
    }

    #[test]
    fn key_event_modifier_queries() {
        let ev = KeyEvent::new(KeyCode::Char('c')).with_modifiers(Modifiers::CTRL);
        assert!(ev.ctrl());
        assert!(!ev.alt());
        assert!(!ev.shift());
    }

    #[test]
    fn modifiers_combine() {
        let m = Modifiers::CTRL | Modifiers::SHIFT;
        assert!(m.contains(Modifiers::CTRL));
        assert!(m.contains(Modifiers::SHIFT));
        assert!(!m.contains(Modifiers::ALT));
    }

    #[test]
    fn modifiers_default_is_none() {
        assert_eq!(Modifiers::default(), Modifiers::NONE);
    }

    #[test]
    fn mouse_event_builder() {
        let ev = MouseEvent::new(10, 20, MouseButton::Left).with_modifiers(Modifiers::ALT);
        assert_eq!((ev.x, ev.y), (10, 20));
        assert_eq!(ev.button, MouseButton::Left);
        assert!(ev.modifiers.contains(Modifiers::ALT));
    }

    #[test]
    fn event_variants_construct_and_compare() {
        let a = Event::KeyPress(KeyEvent::new(KeyCode::Char('a')));
        let b = a.clone();
        assert_eq!(a, b);
        assert_eq!(
            Event::WindowSize {
                width: 80,
                height: 24
            },
            Event::WindowSize {
                width: 80,
                height: 24
            }
        );
    }

    #[test]
    fn multi_event_nests() {
        let m = Event::MultiEvent(vec![
            Event::KeyPress(KeyEvent::new(KeyCode::F(3))),
            Event::CursorPosition { x: 1, y: 0 },
        ]);
        match m {
            Event::MultiEvent(events) => assert_eq!(events.len(), 2),
            _ => panic!("expected MultiEvent"),
        }
    }
}
