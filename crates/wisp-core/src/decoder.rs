//! Incremental ANSI/terminal input decoder.
//!
//! A byte-at-a-time state machine (`Ground` / `Escape` / CSI / OSC /
//! UTF-8 accumulation states, with DoS-protection length caps on each)
//! whose dispatch tables cover the full input grammar this runtime
//! needs to recognize: DCS/APC framing, X10 and SGR mouse, Kitty
//! keyboard `CSI u` reports, XTerm modifyOtherKeys, device attributes,
//! cursor position reports (with the F3 ambiguity), and OSC
//! color/clipboard replies.
//!
//! The decoder is restartable at any byte boundary: every byte is fed
//! through [`Decoder::feed`] one at a time and state carries across
//! calls, so a sequence split across two reads from the cancelable
//! reader decodes identically to one delivered whole.

use std::collections::VecDeque;

use unicode_segmentation::GraphemeCursor;

use crate::color::Color;
use crate::event::{Event, KeyCode, KeyEvent, Modifiers, MouseButton, MouseEvent};

/// DoS protection: maximum bytes collected for one CSI sequence.
const MAX_CSI_LEN: usize = 256;
/// DoS protection: maximum bytes collected for one OSC sequence.
const MAX_OSC_LEN: usize = 4096;
/// DoS protection: maximum bytes collected for one DCS sequence.
const MAX_DCS_LEN: usize = 8192;
/// DoS protection: maximum bytes collected for one APC sequence.
const MAX_APC_LEN: usize = 4096;
/// DoS protection: maximum bytes collected for one paste run.
const MAX_PASTE_LEN: usize = 1024 * 1024;

/// Policy switches for the handful of genuinely ambiguous control
/// codes, plus the two knobs that trade strict correctness for
/// terminal-specific quirks (legacy Find/Select, F13+ collapsing).
#[derive(Debug, Clone)]
pub struct DecoderOptions {
    /// `true`: NUL (0x00) is reported as Ctrl+Space (`Char(' ')` with
    /// `CTRL`). `false`: reported as Ctrl+@ (`Char('@')` with `CTRL`).
    pub nul_is_ctrl_space: bool,
    /// `true`: HT (0x09) is reported as `KeyCode::Tab`. `false`:
    /// reported as Ctrl+I (`Char('i')` with `CTRL`).
    pub tab_is_symbolic: bool,
    /// `true`: CR (0x0D) is reported as `KeyCode::Enter`. `false`:
    /// reported as Ctrl+M (`Char('m')` with `CTRL`).
    pub cr_is_enter: bool,
    /// `true`: ESC (0x1B) alone is reported as `KeyCode::Escape`.
    /// `false`: reported as Ctrl+[ (`Char('[')` with `CTRL`).
    pub esc_is_symbolic: bool,
    /// `true`: DEL (0x7F) is reported as `KeyCode::Backspace`.
    /// `false`: reported as `KeyCode::Delete`.
    pub del_is_backspace: bool,
    /// Recognize the legacy VT220 Find (`CSI 1~`) and Select
    /// (`CSI 4~`) keys as distinct from Home/End.
    pub legacy_find_select: bool,
    /// Preserve F13-F63 as distinct `KeyCode::F(n)` values. When
    /// `false`, terminals that only go up to F12 have already
    /// collapsed the high function keys onto F1-F12 with modifiers
    /// before we ever see them, so this only affects how *we* report
    /// values above 12 if a terminal does send them uncollapsed.
    pub extended_function_keys: bool,
    /// A terminfo-derived override table for the control-code path,
    /// keyed by the raw byte. When present, an entry here wins over
    /// the built-in policy for that byte. This is the integration
    /// point a caller uses to consult a terminfo database; parsing
    /// terminfo itself is outside this crate.
    pub control_code_overrides: Option<std::collections::HashMap<u8, KeyEvent>>,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            nul_is_ctrl_space: true,
            tab_is_symbolic: true,
            cr_is_enter: true,
            esc_is_symbolic: true,
            del_is_backspace: true,
            legacy_find_select: false,
            extended_function_keys: false,
            control_code_overrides: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ground,
    Escape,
    Csi,
    X10MouseByte(u8),
    Ss3,
    Osc,
    OscEscape,
    Dcs,
    DcsEscape,
    Apc,
    ApcEscape,
    Utf8 { collected: u8, expected: u8 },
}

/// Incremental terminal input decoder.
#[derive(Debug)]
pub struct Decoder {
    state: State,
    csi_buf: Vec<u8>,
    osc_buf: Vec<u8>,
    dcs_buf: Vec<u8>,
    apc_buf: Vec<u8>,
    paste_buf: Vec<u8>,
    x10_buf: [u8; 2],
    utf8_buf: [u8; 4],
    in_paste: bool,
    /// Holds a second event produced by a byte that completed two
    /// events at once (the F3/cursor-position ambiguity, or a
    /// coalesced escape produced while flushing an ambiguous ESC).
    pending: VecDeque<Event>,
    /// A decoded UTF-8 codepoint (or run of codepoints already known to
    /// belong to the same grapheme cluster) not yet known to be
    /// complete: it is held until either a following codepoint proves
    /// it is not a combining continuation, or `flush_timeout` gives up
    /// waiting.
    grapheme_pending: Option<String>,
    options: DecoderOptions,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new(DecoderOptions::default())
    }
}

impl Decoder {
    /// Create a decoder with the given policy options.
    #[must_use]
    pub fn new(options: DecoderOptions) -> Self {
        Self {
            state: State::Ground,
            csi_buf: Vec::with_capacity(32),
            osc_buf: Vec::new(),
            dcs_buf: Vec::new(),
            apc_buf: Vec::new(),
            paste_buf: Vec::new(),
            x10_buf: [0; 2],
            utf8_buf: [0; 4],
            in_paste: false,
            pending: VecDeque::new(),
            grapheme_pending: None,
            options,
        }
    }

    /// Decode a chunk of bytes, returning every event it completes.
    ///
    /// Incomplete sequences at the end of `input` are buffered
    /// internally and will complete on a future call.
    pub fn feed(&mut self, input: &[u8]) -> Vec<Event> {
        let mut events = Vec::new();
        for &byte in input {
            if let Some(event) = self.feed_byte(byte) {
                #[cfg(feature = "tracing")]
                if let Event::Unknown(bytes) = &event {
                    tracing::debug!(?bytes, "decoder resynced after malformed sequence");
                }
                events.push(event);
            }
            while let Some(event) = self.pending.pop_front() {
                events.push(event);
            }
        }
        events
    }

    /// Force-flush a lone, ambiguous ESC, or a UTF-8 grapheme cluster
    /// still waiting to see whether a combining codepoint follows, when
    /// the reader hits a quiet period with no more input expected soon.
    pub fn flush_timeout(&mut self) -> Option<Event> {
        if self.state == State::Escape {
            self.state = State::Ground;
            return Some(self.escape_key_event());
        }
        self.flush_grapheme()
    }

    fn feed_byte(&mut self, byte: u8) -> Option<Event> {
        if self.in_paste {
            return self.feed_paste_byte(byte);
        }
        match self.state {
            State::Ground => self.feed_ground(byte),
            State::Escape => self.feed_escape(byte),
            State::Csi => self.feed_csi(byte),
            State::X10MouseByte(n) => self.feed_x10(byte, n),
            State::Ss3 => self.feed_ss3(byte),
            State::Osc => self.feed_osc(byte),
            State::OscEscape => self.feed_osc_escape(byte),
            State::Dcs => self.feed_dcs(byte),
            State::DcsEscape => self.feed_dcs_escape(byte),
            State::Apc => self.feed_apc(byte),
            State::ApcEscape => self.feed_apc_escape(byte),
            State::Utf8 { collected, expected } => self.feed_utf8(byte, collected, expected),
        }
    }

    // -- Ground -------------------------------------------------------

    fn feed_ground(&mut self, byte: u8) -> Option<Event> {
        // Any byte other than a UTF-8 continuation lead definitively
        // ends a grapheme cluster still being held, open since the last
        // completed codepoint; flush it ahead of this byte's own event.
        if !matches!(byte, 0x80..=0xFF) {
            if let Some(flushed) = self.flush_grapheme() {
                if let Some(event) = self.feed_ground_inner(byte) {
                    self.pending.push_back(event);
                }
                return Some(flushed);
            }
        }
        self.feed_ground_inner(byte)
    }

    fn feed_ground_inner(&mut self, byte: u8) -> Option<Event> {
        match byte {
            0x1B => {
                self.state = State::Escape;
                None
            }
            0x00..=0x1F | 0x7F => Some(self.control_code_event(byte)),
            0x20 => Some(Event::KeyPress(KeyEvent::new(KeyCode::Char(' ')).with_text(" "))),
            0x80..=0xFF => self.begin_utf8(byte),
            _ => Some(ascii_key_event(byte as char)),
        }
    }

    fn control_code_event(&self, byte: u8) -> Event {
        if let Some(overrides) = &self.options.control_code_overrides {
            if let Some(key) = overrides.get(&byte) {
                return Event::KeyPress(key.clone());
            }
        }
        let key = match byte {
            0x00 => {
                if self.options.nul_is_ctrl_space {
                    KeyEvent::new(KeyCode::Char(' ')).with_modifiers(Modifiers::CTRL)
                } else {
                    KeyEvent::new(KeyCode::Char('@')).with_modifiers(Modifiers::CTRL)
                }
            }
            0x09 => {
                if self.options.tab_is_symbolic {
                    KeyEvent::new(KeyCode::Tab).with_text("\t")
                } else {
                    KeyEvent::new(KeyCode::Char('i')).with_modifiers(Modifiers::CTRL)
                }
            }
            0x0D => {
                if self.options.cr_is_enter {
                    KeyEvent::new(KeyCode::Enter).with_text("\r")
                } else {
                    KeyEvent::new(KeyCode::Char('m')).with_modifiers(Modifiers::CTRL)
                }
            }
            0x7F => {
                if self.options.del_is_backspace {
                    KeyEvent::new(KeyCode::Backspace)
                } else {
                    KeyEvent::new(KeyCode::Delete)
                }
            }
            0x01..=0x1A => {
                let letter = (b'a' + (byte - 1)) as char;
                KeyEvent::new(KeyCode::Char(letter)).with_modifiers(Modifiers::CTRL)
            }
            0x1C..=0x1F => {
                let letter = (b'\\' + (byte - 0x1C)) as char;
                KeyEvent::new(KeyCode::Char(letter)).with_modifiers(Modifiers::CTRL)
            }
            _ => unreachable!("control_code_event called with non-control byte {byte:#x}"),
        };
        Event::KeyPress(key)
    }

    fn escape_key_event(&self) -> Event {
        let key = if self.options.esc_is_symbolic {
            KeyEvent::new(KeyCode::Escape)
        } else {
            KeyEvent::new(KeyCode::Char('[')).with_modifiers(Modifiers::CTRL)
        };
        Event::KeyPress(key)
    }

    // -- Escape ---------------------------------------------------------

    fn feed_escape(&mut self, byte: u8) -> Option<Event> {
        match byte {
            b'O' => {
                self.state = State::Ss3;
                self.csi_buf.clear();
                None
            }
            b'P' => {
                self.state = State::Dcs;
                self.dcs_buf.clear();
                None
            }
            b'[' => {
                self.state = State::Csi;
                self.csi_buf.clear();
                None
            }
            b']' => {
                self.state = State::Osc;
                self.osc_buf.clear();
                None
            }
            b'_' => {
                self.state = State::Apc;
                self.apc_buf.clear();
                None
            }
            0x1B => {
                // ESC ESC: flush the first as a lone Escape and stay
                // in Escape state for the second.
                Some(self.escape_key_event())
            }
            0x20..=0x7E => {
                // Alt+<printable>.
                self.state = State::Ground;
                let mut key = ascii_key_event_code(byte as char);
                key.modifiers |= Modifiers::ALT;
                Some(Event::KeyPress(key))
            }
            _ => {
                self.state = State::Ground;
                Some(Event::Unknown(vec![0x1B, byte]))
            }
        }
    }

    // -- CSI --------------------------------------------------------------

    fn feed_csi(&mut self, byte: u8) -> Option<Event> {
        // The raw 6-byte X10 mouse form `CSI M b x y` has no final
        // byte and must be special-cased before the generic
        // parameter/final-byte scan, since its payload bytes can
        // collide with the 0x40-0x7E final-byte range.
        if self.csi_buf.is_empty() && byte == b'M' {
            self.state = State::X10MouseByte(0);
            return None;
        }
        if self.csi_buf.len() >= MAX_CSI_LEN {
            self.state = State::Ground;
            self.csi_buf.clear();
            return Some(Event::Unknown(b"\x1b[<csi-too-long>".to_vec()));
        }
        match byte {
            0x40..=0x7E => {
                self.state = State::Ground;
                let event = parse_csi(&self.csi_buf, byte, &self.options);
                self.csi_buf.clear();
                match event {
                    CsiResult::One(e) => Some(e),
                    CsiResult::PasteStart => {
                        self.in_paste = true;
                        self.paste_buf.clear();
                        Some(Event::PasteStart)
                    }
                }
            }
            _ => {
                self.csi_buf.push(byte);
                None
            }
        }
    }

    fn feed_x10(&mut self, byte: u8, n: u8) -> Option<Event> {
        if n == 0 {
            self.x10_buf[0] = byte;
            self.state = State::X10MouseByte(1);
            None
        } else if n == 1 {
            self.x10_buf[1] = byte;
            self.state = State::X10MouseByte(2);
            None
        } else {
            self.state = State::Ground;
            let b = self.x10_buf[0];
            let x = self.x10_buf[1];
            let y = byte;
            Some(decode_x10_mouse(b, x, y))
        }
    }

    // -- SS3 ----------------------------------------------------------------

    fn feed_ss3(&mut self, byte: u8) -> Option<Event> {
        match byte {
            0x30..=0x39 | b';' => {
                self.csi_buf.push(byte);
                None
            }
            _ => {
                self.state = State::Ground;
                let event = parse_ss3(&self.csi_buf, byte);
                self.csi_buf.clear();
                Some(event)
            }
        }
    }

    // -- OSC ------------------------------------------------------------------

    fn feed_osc(&mut self, byte: u8) -> Option<Event> {
        if self.osc_buf.len() >= MAX_OSC_LEN {
            self.state = State::Ground;
            self.osc_buf.clear();
            return Some(Event::Unknown(b"\x1b]<osc-too-long>".to_vec()));
        }
        match byte {
            0x07 => {
                self.state = State::Ground;
                let event = parse_osc(&self.osc_buf);
                self.osc_buf.clear();
                Some(event)
            }
            0x1B => {
                self.state = State::OscEscape;
                None
            }
            _ => {
                self.osc_buf.push(byte);
                None
            }
        }
    }

    fn feed_osc_escape(&mut self, byte: u8) -> Option<Event> {
        self.state = State::Ground;
        if byte == b'\\' {
            let event = parse_osc(&self.osc_buf);
            self.osc_buf.clear();
            Some(event)
        } else {
            // Not a valid ST; treat the buffered OSC as unterminated
            // and re-enter ground, reprocessing this byte.
            self.osc_buf.clear();
            self.feed_byte(byte)
        }
    }

    // -- DCS ------------------------------------------------------------------

    fn feed_dcs(&mut self, byte: u8) -> Option<Event> {
        if self.dcs_buf.len() >= MAX_DCS_LEN {
            self.state = State::Ground;
            self.dcs_buf.clear();
            return Some(Event::Unknown(b"\x1bP<dcs-too-long>".to_vec()));
        }
        if byte == 0x1B {
            self.state = State::DcsEscape;
            return None;
        }
        self.dcs_buf.push(byte);
        None
    }

    fn feed_dcs_escape(&mut self, byte: u8) -> Option<Event> {
        self.state = State::Ground;
        if byte == b'\\' {
            let event = parse_dcs(&self.dcs_buf);
            self.dcs_buf.clear();
            Some(event)
        } else {
            self.dcs_buf.clear();
            self.feed_byte(byte)
        }
    }

    // -- APC ------------------------------------------------------------------

    fn feed_apc(&mut self, byte: u8) -> Option<Event> {
        if self.apc_buf.len() >= MAX_APC_LEN {
            self.state = State::Ground;
            self.apc_buf.clear();
            return Some(Event::Unknown(b"\x1b_<apc-too-long>".to_vec()));
        }
        if byte == 0x1B {
            self.state = State::ApcEscape;
            return None;
        }
        self.apc_buf.push(byte);
        None
    }

    fn feed_apc_escape(&mut self, byte: u8) -> Option<Event> {
        self.state = State::Ground;
        if byte == b'\\' {
            let payload = std::mem::take(&mut self.apc_buf);
            Some(Event::Unknown(payload))
        } else {
            self.apc_buf.clear();
            self.feed_byte(byte)
        }
    }

    // -- Bracketed paste --------------------------------------------------

    fn feed_paste_byte(&mut self, byte: u8) -> Option<Event> {
        const END_MARKER: &[u8] = b"\x1b[201~";
        self.paste_buf.push(byte);
        if self.paste_buf.ends_with(END_MARKER) {
            self.in_paste = false;
            let end = self.paste_buf.len() - END_MARKER.len();
            let text = String::from_utf8_lossy(&self.paste_buf[..end]).into_owned();
            self.paste_buf.clear();
            self.pending.push_back(Event::PasteEnd);
            return Some(Event::Paste(text));
        }
        if self.paste_buf.len() >= MAX_PASTE_LEN {
            self.in_paste = false;
            let text = String::from_utf8_lossy(&self.paste_buf).into_owned();
            self.paste_buf.clear();
            self.pending.push_back(Event::PasteEnd);
            return Some(Event::Paste(text));
        }
        None
    }

    // -- UTF-8 --------------------------------------------------------------

    fn begin_utf8(&mut self, byte: u8) -> Option<Event> {
        let expected = match byte {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => {
                // Invalid leading byte; surface as Unknown.
                return Some(Event::Unknown(vec![byte]));
            }
        };
        self.utf8_buf[0] = byte;
        self.state = State::Utf8 {
            collected: 1,
            expected,
        };
        None
    }

    fn feed_utf8(&mut self, byte: u8, collected: u8, expected: u8) -> Option<Event> {
        self.utf8_buf[collected as usize] = byte;
        let collected = collected + 1;
        if collected < expected {
            self.state = State::Utf8 { collected, expected };
            return None;
        }
        self.state = State::Ground;
        let bytes = &self.utf8_buf[..expected as usize];
        let ch = match std::str::from_utf8(bytes) {
            Ok(s) => match s.chars().next() {
                Some(c) => c,
                None => return Some(Event::Unknown(bytes.to_vec())),
            },
            Err(_) => return Some(Event::Unknown(bytes.to_vec())),
        };
        self.feed_grapheme_char(ch)
    }

    /// Merge a newly decoded codepoint into the pending grapheme
    /// cluster, or start a new one. Each incoming codepoint arrives as
    /// its own independent byte run, so the boundary between it and
    /// whatever is already buffered is only known once it is fully
    /// decoded — `GraphemeCursor` is asked incrementally, one codepoint
    /// at a time, rather than over a string collected all at once.
    fn feed_grapheme_char(&mut self, ch: char) -> Option<Event> {
        if let Some(pending) = &mut self.grapheme_pending {
            let prev_len = pending.len();
            pending.push(ch);
            let mut cursor = GraphemeCursor::new(prev_len, pending.len(), true);
            let is_boundary = cursor.is_boundary(pending, 0).unwrap_or(true);
            if is_boundary {
                let finished: String = pending.drain(..prev_len).collect();
                return Some(grapheme_key_event(&finished));
            }
            return None;
        }
        self.grapheme_pending = Some(ch.to_string());
        None
    }

    /// Emit whatever grapheme cluster is being held, if any.
    fn flush_grapheme(&mut self) -> Option<Event> {
        self.grapheme_pending.take().map(|text| grapheme_key_event(&text))
    }
}

/// Build the `KeyPress` event for a complete grapheme cluster: a single
/// codepoint becomes a plain `Char`, more than one becomes `Extended`
/// carrying the whole cluster as text.
fn grapheme_key_event(text: &str) -> Event {
    let mut chars = text.chars();
    let first = chars.next().expect("grapheme cluster is never empty");
    if chars.next().is_some() {
        Event::KeyPress(KeyEvent::new(KeyCode::Extended).with_text(text))
    } else {
        Event::KeyPress(KeyEvent::new(KeyCode::Char(first)).with_text(text))
    }
}

fn ascii_key_event(c: char) -> Event {
    Event::KeyPress(ascii_key_event_code(c))
}

fn ascii_key_event_code(c: char) -> KeyEvent {
    if c.is_ascii_uppercase() {
        KeyEvent {
            code: KeyCode::Char(c.to_ascii_lowercase()),
            base_code: None,
            shifted_code: Some(KeyCode::Char(c)),
            modifiers: Modifiers::SHIFT,
            text: c.to_string(),
            is_repeat: false,
        }
    } else {
        KeyEvent::new(KeyCode::Char(c)).with_text(c.to_string())
    }
}

// =============================================================================
// CSI dispatch
// =============================================================================

enum CsiResult {
    One(Event),
    PasteStart,
}

/// A parsed CSI sequence: optional private marker, semicolon/colon
/// separated parameters, intermediate bytes, and the final byte.
struct CsiSeq {
    marker: Option<u8>,
    params: Vec<Vec<i64>>,
    final_byte: u8,
}

fn split_csi(buf: &[u8], final_byte: u8) -> CsiSeq {
    let mut rest = buf;
    let marker = match rest.first() {
        Some(b @ (b'<' | b'?' | b'>' | b'=')) => {
            rest = &rest[1..];
            Some(*b)
        }
        _ => None,
    };
    // Strip intermediates (0x20-0x2F) from the tail; we don't branch
    // on them except to drop them from the parameter scan.
    let param_end = rest
        .iter()
        .position(|b| (0x20..=0x2F).contains(b))
        .unwrap_or(rest.len());
    let param_bytes = &rest[..param_end];
    let params = param_bytes
        .split(|b| *b == b';')
        .map(|group| {
            group
                .split(|b| *b == b':')
                .map(|sub| {
                    std::str::from_utf8(sub)
                        .ok()
                        .and_then(|s| s.parse::<i64>().ok())
                        .unwrap_or(-1)
                })
                .collect::<Vec<_>>()
        })
        .collect();
    CsiSeq {
        marker,
        params,
        final_byte,
    }
}

fn param(seq: &CsiSeq, idx: usize, default: i64) -> i64 {
    seq.params
        .get(idx)
        .and_then(|g| g.first())
        .copied()
        .filter(|v| *v >= 0)
        .unwrap_or(default)
}

fn parse_csi(buf: &[u8], final_byte: u8, options: &DecoderOptions) -> CsiResult {
    let seq = split_csi(buf, final_byte);

    match (seq.marker, seq.final_byte) {
        (None, b'I') => return CsiResult::One(Event::Focus),
        (None, b'O') => return CsiResult::One(Event::Blur),
        _ => {}
    }

    match seq.final_byte {
        b'M' | b'm' if seq.marker == Some(b'<') => {
            return CsiResult::One(decode_sgr_mouse(&seq));
        }
        b'~' => return parse_tilde(&seq, options),
        b'u' => {
            if seq.marker == Some(b'?') {
                let flags = param(&seq, 0, 0);
                return CsiResult::One(Event::KeyboardEnhancements(flags as u8));
            }
            return CsiResult::One(decode_kitty_key(&seq));
        }
        b'c' if seq.marker == Some(b'?') => {
            let ids = seq
                .params
                .iter()
                .filter_map(|g| g.first().copied())
                .filter(|v| *v >= 0)
                .map(|v| v as u16)
                .collect();
            return CsiResult::One(Event::PrimaryDeviceAttributes(ids));
        }
        b'R' => return parse_cursor_position(&seq),
        b'y' if seq.marker == Some(b'?') => {
            // CSI ? mode ; value $ y -- `$` is an intermediate, already
            // stripped from the parameter scan by `split_csi`.
            let mode = param(&seq, 0, 0) as u16;
            let value = param(&seq, 1, 0) as u16;
            return CsiResult::One(Event::ModeReport { mode, value });
        }
        b'A'..=b'H' | b'P'..=b'S' | b'Z' => return parse_csi_letter(&seq),
        _ => {}
    }

    // URxvt "modified with `$`": replace the final byte with `~` and
    // set Shift, matching the `$`-suffixed variant of navigation keys.
    if seq.final_byte == b'$' {
        let mut shifted = seq;
        shifted.final_byte = b'~';
        if let CsiResult::One(Event::KeyPress(mut key)) = parse_tilde(&shifted, options) {
            key.modifiers |= Modifiers::SHIFT;
            return CsiResult::One(Event::KeyPress(key));
        }
    }

    CsiResult::One(Event::Unknown(buf.to_vec()))
}

fn modifiers_from_xterm(code: i64) -> Modifiers {
    if code <= 0 {
        return Modifiers::NONE;
    }
    let bits = (code - 1) as u16;
    let mut m = Modifiers::NONE;
    if bits & 0b0001 != 0 {
        m |= Modifiers::SHIFT;
    }
    if bits & 0b0010 != 0 {
        m |= Modifiers::ALT;
    }
    if bits & 0b0100 != 0 {
        m |= Modifiers::CTRL;
    }
    if bits & 0b1000 != 0 {
        m |= Modifiers::META;
    }
    m
}

fn parse_csi_letter(seq: &CsiSeq) -> CsiResult {
    let modifiers = modifiers_from_xterm(param(seq, 1, 1));
    let code = match seq.final_byte {
        b'A' => KeyCode::Up,
        b'B' => KeyCode::Down,
        b'C' => KeyCode::Right,
        b'D' => KeyCode::Left,
        b'E' => KeyCode::Begin,
        b'F' => KeyCode::End,
        b'H' => KeyCode::Home,
        b'P' => KeyCode::F(1),
        b'Q' => KeyCode::F(2),
        b'R' => KeyCode::F(3),
        b'S' => KeyCode::F(4),
        b'Z' => KeyCode::BackTab,
        _ => unreachable!(),
    };
    CsiResult::One(Event::KeyPress(
        KeyEvent::new(code).with_modifiers(modifiers),
    ))
}

fn parse_tilde(seq: &CsiSeq, options: &DecoderOptions) -> CsiResult {
    let n = param(seq, 0, 0);

    if n == 200 {
        return CsiResult::PasteStart;
    }
    if n == 201 {
        // Stray end marker with no matching start; surface as an
        // empty paste rather than panicking the caller.
        return CsiResult::One(Event::PasteEnd);
    }
    if n == 27 {
        // XTerm modifyOtherKeys level 2: `27;mod;code~`.
        let modifiers = modifiers_from_xterm(param(seq, 1, 1));
        let codepoint = param(seq, 2, 0) as u32;
        let code = char::from_u32(codepoint).map_or(KeyCode::Null, KeyCode::Char);
        return CsiResult::One(Event::KeyPress(
            KeyEvent::new(code).with_modifiers(modifiers),
        ));
    }

    let modifiers = modifiers_from_xterm(param(seq, 1, 1));
    let code = match n {
        1 if options.legacy_find_select => KeyCode::Find,
        1 | 7 => KeyCode::Home,
        2 => KeyCode::Insert,
        3 => KeyCode::Delete,
        4 if options.legacy_find_select => KeyCode::Select,
        4 | 8 => KeyCode::End,
        5 => KeyCode::PageUp,
        6 => KeyCode::PageDown,
        11..=15 => KeyCode::F((n - 10) as u8),
        17..=21 => KeyCode::F((n - 11) as u8),
        23 | 24 => KeyCode::F((n - 12) as u8),
        25 | 26 => KeyCode::F((n - 14) as u8),
        28 | 29 => KeyCode::F((n - 15) as u8),
        31 | 32 => KeyCode::F((n - 17) as u8),
        33 | 34 => KeyCode::F((n - 18) as u8),
        _ => return CsiResult::One(Event::Unknown(format!("CSI {n}~").into_bytes())),
    };
    CsiResult::One(Event::KeyPress(
        KeyEvent::new(code).with_modifiers(modifiers),
    ))
}

fn parse_cursor_position(seq: &CsiSeq) -> CsiResult {
    let row = param(seq, 0, 1);
    let col = param(seq, 1, 1);
    let position = Event::CursorPosition {
        x: (col - 1).max(0) as u16,
        y: (row - 1).max(0) as u16,
    };
    // F3 ambiguity: `CSI 1 ; mod R` ("row=1") could equally be a
    // modified F3 key report on terminals that use the cursor-key
    // final byte for F3. Surface both when the shape fits.
    const MAX_PLAUSIBLE_MODIFIER: i64 = 16;
    if row == 1 && col >= 1 && col - 1 <= MAX_PLAUSIBLE_MODIFIER {
        let modifiers = modifiers_from_xterm(col);
        let key_event = Event::KeyPress(
            KeyEvent::new(KeyCode::F(3)).with_modifiers(modifiers),
        );
        return CsiResult::One(Event::MultiEvent(vec![key_event, position]));
    }
    CsiResult::One(position)
}

fn decode_kitty_key(seq: &CsiSeq) -> Event {
    let codepoints = seq.params.first().cloned().unwrap_or_default();
    let unicode = codepoints.first().copied().unwrap_or(0);
    let shifted = codepoints.get(1).copied().filter(|v| *v >= 0);
    let base = codepoints.get(2).copied().filter(|v| *v >= 0);

    let mod_event = seq.params.get(1).cloned().unwrap_or_default();
    let raw_mod = mod_event.first().copied().unwrap_or(1);
    let event_type = mod_event.get(1).copied().unwrap_or(1);
    let modifiers = modifiers_from_xterm(raw_mod);

    let text: String = seq
        .params
        .get(2)
        .map(|codes| {
            codes
                .iter()
                .filter_map(|c| char::from_u32(*c as u32))
                .collect()
        })
        .unwrap_or_default();

    let code = kitty_codepoint_to_keycode(unicode);
    let shifted_code = shifted.and_then(|v| char::from_u32(v as u32)).map(KeyCode::Char);
    let base_code = base.and_then(|v| char::from_u32(v as u32)).map(KeyCode::Char);

    let key = KeyEvent {
        code,
        base_code,
        shifted_code,
        modifiers,
        text,
        is_repeat: event_type == 2,
    };

    match event_type {
        3 => Event::KeyRelease(key),
        _ => Event::KeyPress(key),
    }
}

fn kitty_codepoint_to_keycode(cp: i64) -> KeyCode {
    match cp {
        9 => KeyCode::Tab,
        13 => KeyCode::Enter,
        27 => KeyCode::Escape,
        127 => KeyCode::Backspace,
        57344 => KeyCode::Escape,
        _ => char::from_u32(cp as u32).map_or(KeyCode::Null, KeyCode::Char),
    }
}

fn decode_sgr_mouse(seq: &CsiSeq) -> Event {
    let code = param(seq, 0, 0);
    let x = (param(seq, 1, 1) - 1).max(0) as u16;
    let y = (param(seq, 2, 1) - 1).max(0) as u16;
    let is_release = seq.final_byte == b'm';
    let (button, modifiers) = decode_mouse_button_code(code);

    let mouse = MouseEvent::new(x, y, button).with_modifiers(modifiers);
    match button {
        MouseButton::WheelUp | MouseButton::WheelDown | MouseButton::WheelLeft
        | MouseButton::WheelRight => Event::MouseWheel(mouse),
        MouseButton::None => Event::MouseMotion(mouse),
        _ if is_release => Event::MouseRelease(mouse),
        _ if code & 0x20 != 0 => Event::MouseMotion(mouse),
        _ => Event::MouseClick(mouse),
    }
}

/// Shared button+modifier decode for both SGR and X10 mouse encodings
/// (SGR passes the raw code; X10 passes `byte - 32`).
fn decode_mouse_button_code(code: i64) -> (MouseButton, Modifiers) {
    let mut modifiers = Modifiers::NONE;
    if code & 0x04 != 0 {
        modifiers |= Modifiers::SHIFT;
    }
    if code & 0x08 != 0 {
        modifiers |= Modifiers::META;
    }
    if code & 0x10 != 0 {
        modifiers |= Modifiers::CTRL;
    }

    let button = if code & 0x40 != 0 {
        match code & 0x03 {
            0 => MouseButton::WheelUp,
            1 => MouseButton::WheelDown,
            2 => MouseButton::WheelLeft,
            _ => MouseButton::WheelRight,
        }
    } else if code & 0x80 != 0 {
        match code & 0x03 {
            0 => MouseButton::Backward,
            1 => MouseButton::Forward,
            2 => MouseButton::Extra1,
            _ => MouseButton::Extra2,
        }
    } else {
        match code & 0x03 {
            0 => MouseButton::Left,
            1 => MouseButton::Middle,
            2 => MouseButton::Right,
            _ => MouseButton::None,
        }
    };
    (button, modifiers)
}

fn decode_x10_mouse(b: u8, x: u8, y: u8) -> Event {
    let code = (b as i64) - 32;
    let (button, modifiers) = decode_mouse_button_code(code);
    // Coordinates are 1-indexed and offset by 32; values beyond 223
    // wrap in the raw byte encoding.
    let cx = (x as i64 - 32 - 1) as i16;
    let cy = (y as i64 - 32 - 1) as i16;
    let mouse = MouseEvent::new(cx.max(0) as u16, cy.max(0) as u16, button)
        .with_modifiers(modifiers);
    match button {
        MouseButton::WheelUp | MouseButton::WheelDown | MouseButton::WheelLeft
        | MouseButton::WheelRight => Event::MouseWheel(mouse),
        MouseButton::None => Event::MouseMotion(mouse),
        _ if code & 0x20 != 0 => Event::MouseMotion(mouse),
        _ => Event::MouseClick(mouse),
    }
}

// =============================================================================
// SS3
// =============================================================================

fn parse_ss3(params: &[u8], final_byte: u8) -> Event {
    let modifier_code: i64 = std::str::from_utf8(params)
        .ok()
        .and_then(|s| s.trim_end_matches(';').parse().ok())
        .unwrap_or(1);
    let modifiers = modifiers_from_xterm(modifier_code);
    let code = match final_byte {
        b'A' => KeyCode::Up,
        b'B' => KeyCode::Down,
        b'C' => KeyCode::Right,
        b'D' => KeyCode::Left,
        b'E' => KeyCode::Begin,
        b'F' => KeyCode::End,
        b'H' => KeyCode::Home,
        b'P' => KeyCode::F(1),
        b'Q' => KeyCode::F(2),
        b'R' => KeyCode::F(3),
        b'S' => KeyCode::F(4),
        b'M' => KeyCode::Enter, // keypad Enter
        b'p'..=b'y' => KeyCode::Char((b'0' + (final_byte - b'p')) as char), // keypad digits
        b'j' => KeyCode::Char('*'),
        b'k' => KeyCode::Char('+'),
        b'l' => KeyCode::Char(','),
        b'm' => KeyCode::Char('-'),
        b'n' => KeyCode::Char('.'),
        b'o' => KeyCode::Char('/'),
        _ => return Event::Unknown([b"\x1bO", params, &[final_byte]].concat()),
    };
    Event::KeyPress(KeyEvent::new(code).with_modifiers(modifiers))
}

// =============================================================================
// OSC
// =============================================================================

fn parse_osc(buf: &[u8]) -> Event {
    let text = String::from_utf8_lossy(buf);
    let mut parts = text.splitn(2, ';');
    let cmd = parts.next().unwrap_or_default();
    let data = parts.next().unwrap_or_default();

    match cmd {
        "10" => Event::ForegroundColor(Color::parse_x_spec(data)),
        "11" => Event::BackgroundColor(Color::parse_x_spec(data)),
        "12" => Event::CursorColor(Color::parse_x_spec(data)),
        "52" => {
            let mut clip_parts = data.splitn(2, ';');
            let selection = clip_parts.next().unwrap_or_default();
            let payload = clip_parts.next().unwrap_or_default();
            let decoded = decode_base64_lossy(payload);
            if selection.contains('p') {
                Event::PrimaryClipboard(decoded)
            } else {
                Event::Clipboard(decoded)
            }
        }
        _ => Event::Unknown(buf.to_vec()),
    }
}

fn decode_base64_lossy(data: &str) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(data)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

// =============================================================================
// DCS
// =============================================================================

fn parse_dcs(buf: &[u8]) -> Event {
    // XTVERSION: `DCS > | name(version) ST`.
    if buf.first() == Some(&b'>') && buf.get(1) == Some(&b'|') {
        let text = String::from_utf8_lossy(&buf[2..]).into_owned();
        return Event::TerminalVersion(text);
    }
    // XTGETTCAP reply: `DCS 1 + r name=hex[;name=hex...] ST`.
    if buf.first() == Some(&b'1') {
        if let Some(rest) = buf.strip_prefix(b"1+r") {
            let text = String::from_utf8_lossy(rest);
            let caps = text
                .split(';')
                .filter_map(|entry| {
                    let mut kv = entry.splitn(2, '=');
                    let name_hex = kv.next()?;
                    let value_hex = kv.next()?;
                    let name = decode_hex_ascii(name_hex)?;
                    let value = decode_hex_ascii(value_hex)?;
                    Some((name, value))
                })
                .collect();
            return Event::CapabilityReport(caps);
        }
    }
    // `DCS 0 + r ST` (param 0) is treated as invalid; only param 1 is
    // a valid capability report.
    Event::Unknown(buf.to_vec())
}

fn decode_hex_ascii(s: &str) -> Option<String> {
    if s.len() % 2 != 0 {
        return None;
    }
    let mut out = Vec::with_capacity(s.len() / 2);
    let bytes = s.as_bytes();
    for chunk in bytes.chunks(2) {
        let byte = u8::from_str_radix(std::str::from_utf8(chunk).ok()?, 16).ok()?;
        out.push(byte);
    }
    Some(String::from_utf8_lossy(&out).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(input: &[u8]) -> Vec<Event> {
        Decoder::default().feed(input)
    }

    #[test]
    fn shift_up_arrow() {
        let events = decode_all(b"\x1b[1;2A");
        assert_eq!(
            events,
            vec![Event::KeyPress(
                KeyEvent::new(KeyCode::Up).with_modifiers(Modifiers::SHIFT)
            )]
        );
    }

    #[test]
    fn x10_mouse_motion_scenario_2() {
        // ESC [ M # ! ! -> MouseMotion{x=0,y=0,button=None}.
        let events = decode_all(b"\x1b[M#!!");
        assert_eq!(events.len(), 1);
        match &events[0] {
            Event::MouseMotion(m) => {
                assert_eq!((m.x, m.y), (0, 0));
                assert_eq!(m.button, MouseButton::None);
            }
            other => panic!("expected MouseMotion, got {other:?}"),
        }
    }

    #[test]
    fn sgr_mouse_click_then_release_scenario_3() {
        let mut decoder = Decoder::default();
        let mut events = decoder.feed(b"\x1b[<0;11;21M");
        events.extend(decoder.feed(b"\x1b[<0;11;21m"));
        assert_eq!(events.len(), 2);
        match &events[0] {
            Event::MouseClick(m) => {
                assert_eq!((m.x, m.y), (10, 20));
                assert_eq!(m.button, MouseButton::Left);
            }
            other => panic!("expected MouseClick, got {other:?}"),
        }
        match &events[1] {
            Event::MouseRelease(m) => {
                assert_eq!((m.x, m.y), (10, 20));
                assert_eq!(m.button, MouseButton::Left);
            }
            other => panic!("expected MouseRelease, got {other:?}"),
        }
    }

    #[test]
    fn bracketed_paste_scenario_4() {
        let events = decode_all(b"\x1b[200~Hello\x1b[201~");
        assert_eq!(
            events,
            vec![
                Event::PasteStart,
                Event::Paste("Hello".to_string()),
                Event::PasteEnd,
            ]
        );
    }

    #[test]
    fn kitty_keyboard_press_with_shifted_and_base() {
        let events = decode_all(b"\x1b[97:65:97;1u");
        match &events[0] {
            Event::KeyPress(key) => {
                assert_eq!(key.code, KeyCode::Char('a'));
                assert_eq!(key.shifted_code, Some(KeyCode::Char('A')));
                assert_eq!(key.base_code, Some(KeyCode::Char('a')));
            }
            other => panic!("expected KeyPress, got {other:?}"),
        }
    }

    #[test]
    fn kitty_keyboard_release_event_type() {
        let events = decode_all(b"\x1b[97;1:3u");
        assert!(matches!(events[0], Event::KeyRelease(_)));
    }

    #[test]
    fn modify_other_keys_ctrl_letter() {
        // Ctrl+Shift+M reported with original codepoint 77 ('M').
        let events = decode_all(b"\x1b[27;6;77~");
        match &events[0] {
            Event::KeyPress(key) => {
                assert_eq!(key.code, KeyCode::Char('M'));
                assert!(key.modifiers.contains(Modifiers::CTRL));
                assert!(key.modifiers.contains(Modifiers::SHIFT));
            }
            other => panic!("expected KeyPress, got {other:?}"),
        }
    }

    #[test]
    fn device_attributes() {
        let events = decode_all(b"\x1b[?62;1;6c");
        assert_eq!(
            events,
            vec![Event::PrimaryDeviceAttributes(vec![62, 1, 6])]
        );
    }

    #[test]
    fn cursor_position_report() {
        let events = decode_all(b"\x1b[5;10R");
        assert_eq!(events, vec![Event::CursorPosition { x: 9, y: 4 }]);
    }

    #[test]
    fn cursor_position_f3_ambiguity() {
        let events = decode_all(b"\x1b[1;2R");
        assert_eq!(events.len(), 1);
        match &events[0] {
            Event::MultiEvent(inner) => {
                assert!(matches!(
                    &inner[0],
                    Event::KeyPress(k) if k.code == KeyCode::F(3)
                ));
                assert!(matches!(&inner[1], Event::CursorPosition { .. }));
            }
            other => panic!("expected MultiEvent, got {other:?}"),
        }
    }

    #[test]
    fn osc_background_color() {
        let events = decode_all(b"\x1b]11;rgb:ff/00/00\x07");
        assert_eq!(events, vec![Event::BackgroundColor(Color::Rgb(255, 0, 0))]);
    }

    #[test]
    fn osc_clipboard_base64() {
        // "hi" base64-encoded is "aGk=".
        let events = decode_all(b"\x1b]52;c;aGk=\x07");
        assert_eq!(events, vec![Event::Clipboard("hi".to_string())]);
    }

    #[test]
    fn osc_clipboard_malformed_base64_yields_empty_payload() {
        let events = decode_all(b"\x1b]52;c;not-valid-base64!!\x07");
        assert_eq!(events, vec![Event::Clipboard(String::new())]);
    }

    #[test]
    fn dcs_xtversion() {
        let events = decode_all(b"\x1bP>|wisp(1.0)\x1b\\");
        assert_eq!(events, vec![Event::TerminalVersion("wisp(1.0)".to_string())]);
    }

    #[test]
    fn dcs_xtgettcap_param1() {
        // "Co" = 0x43 0x6f, "8" = 0x38.
        let events = decode_all(b"\x1bP1+r436f=38\x1b\\");
        assert_eq!(
            events,
            vec![Event::CapabilityReport(vec![("Co".to_string(), "8".to_string())])]
        );
    }

    #[test]
    fn dcs_xtgettcap_param0_is_invalid() {
        let events = decode_all(b"\x1bP0+r436f=38\x1b\\");
        assert!(matches!(events[0], Event::Unknown(_)));
    }

    #[test]
    fn ctrl_letter_control_codes() {
        let events = decode_all(b"\x01");
        assert_eq!(
            events,
            vec![Event::KeyPress(
                KeyEvent::new(KeyCode::Char('a')).with_modifiers(Modifiers::CTRL)
            )]
        );
    }

    #[test]
    fn nul_policy_ctrl_space_default() {
        let events = decode_all(b"\x00");
        assert_eq!(
            events,
            vec![Event::KeyPress(
                KeyEvent::new(KeyCode::Char(' ')).with_modifiers(Modifiers::CTRL)
            )]
        );
    }

    #[test]
    fn nul_policy_ctrl_at_when_disabled() {
        let mut opts = DecoderOptions::default();
        opts.nul_is_ctrl_space = false;
        let events = Decoder::new(opts).feed(b"\x00");
        assert_eq!(
            events,
            vec![Event::KeyPress(
                KeyEvent::new(KeyCode::Char('@')).with_modifiers(Modifiers::CTRL)
            )]
        );
    }

    #[test]
    fn lone_escape_is_escape_key() {
        let events = decode_all(b"\x1b");
        assert!(events.is_empty()); // buffered, waiting for more input or a timeout flush
        let mut decoder = Decoder::default();
        decoder.feed(b"\x1b");
        assert_eq!(
            decoder.flush_timeout(),
            Some(Event::KeyPress(KeyEvent::new(KeyCode::Escape)))
        );
    }

    #[test]
    fn alt_plus_key() {
        let events = decode_all(b"\x1bx");
        assert_eq!(
            events,
            vec![Event::KeyPress(
                KeyEvent::new(KeyCode::Char('x')).with_modifiers(Modifiers::ALT)
            )]
        );
    }

    #[test]
    fn single_codepoint_utf8_char_holds_until_flushed() {
        // Held rather than emitted immediately: a combining mark could
        // still arrive as the next, separately-read codepoint.
        let mut decoder = Decoder::default();
        assert!(decoder.feed("é".as_bytes()).is_empty());
        assert_eq!(
            decoder.flush_timeout(),
            Some(Event::KeyPress(
                KeyEvent::new(KeyCode::Char('é')).with_text("é")
            ))
        );
    }

    #[test]
    fn combining_mark_in_a_separate_read_merges_into_one_cluster() {
        // The base codepoint and its combining mark each arrive through
        // their own independent `feed` call, as two back-to-back reads
        // from the cancelable reader would deliver them. Both are
        // non-ASCII so both take the multi-byte UTF-8 path that buffers
        // for clustering (a plain ASCII base never does).
        let mut decoder = Decoder::default();
        assert!(decoder.feed("é".as_bytes()).is_empty());
        assert!(decoder.feed("\u{0301}".as_bytes()).is_empty());
        let cluster = "é\u{0301}";
        assert_eq!(
            decoder.flush_timeout(),
            Some(Event::KeyPress(
                KeyEvent::new(KeyCode::Extended).with_text(cluster)
            ))
        );
    }

    #[test]
    fn a_following_plain_key_flushes_the_pending_cluster_first() {
        let mut decoder = Decoder::default();
        assert!(decoder.feed("é".as_bytes()).is_empty());
        let events = decoder.feed(b"x");
        assert_eq!(
            events,
            vec![
                Event::KeyPress(KeyEvent::new(KeyCode::Char('é')).with_text("é")),
                Event::KeyPress(KeyEvent::new(KeyCode::Char('x')).with_text("x")),
            ]
        );
    }

    #[test]
    fn uppercase_ascii_reports_shift() {
        let events = decode_all(b"Q");
        match &events[0] {
            Event::KeyPress(key) => {
                assert_eq!(key.code, KeyCode::Char('q'));
                assert_eq!(key.shifted_code, Some(KeyCode::Char('Q')));
                assert!(key.shift());
            }
            other => panic!("expected KeyPress, got {other:?}"),
        }
    }

    #[test]
    fn csi_sequence_length_is_bounded() {
        let mut garbage = vec![0x1B, b'['];
        garbage.extend(std::iter::repeat(b'9').take(MAX_CSI_LEN + 16));
        let events = decode_all(&garbage);
        assert!(events.iter().any(|e| matches!(e, Event::Unknown(_))));
    }

    #[test]
    fn focus_and_blur() {
        assert_eq!(decode_all(b"\x1b[I"), vec![Event::Focus]);
        assert_eq!(decode_all(b"\x1b[O"), vec![Event::Blur]);
    }

    #[test]
    fn keyboard_enhancement_report() {
        let events = decode_all(b"\x1b[?5u");
        assert_eq!(events, vec![Event::KeyboardEnhancements(5)]);
    }

    #[test]
    fn mode_report() {
        let events = decode_all(b"\x1b[?2004;1$y");
        assert_eq!(events, vec![Event::ModeReport { mode: 2004, value: 1 }]);
    }

    #[test]
    fn function_keys_via_tilde() {
        assert!(matches!(
            &decode_all(b"\x1b[15~")[0],
            Event::KeyPress(k) if k.code == KeyCode::F(5)
        ));
    }

    #[test]
    fn ss3_arrow_and_f_keys() {
        assert!(matches!(
            &decode_all(b"\x1bOA")[0],
            Event::KeyPress(k) if k.code == KeyCode::Up
        ));
        assert!(matches!(
            &decode_all(b"\x1bOP")[0],
            Event::KeyPress(k) if k.code == KeyCode::F(1)
        ));
    }

    #[test]
    fn urxvt_dollar_shift_variant() {
        let events = decode_all(b"\x1b[5$");
        match &events[0] {
            Event::KeyPress(key) => {
                assert_eq!(key.code, KeyCode::PageUp);
                assert!(key.shift());
            }
            other => panic!("expected KeyPress, got {other:?}"),
        }
    }

    proptest::proptest! {
        // Round-trip: every plain ASCII printable byte the decoder is
        // fed comes back out as exactly one KeyPress carrying that
        // same character in `text`, regardless of chunk boundaries.
        #[test]
        fn ascii_printable_round_trips_through_arbitrary_chunking(
            bytes in proptest::collection::vec(0x20u8..=0x7E, 0..64),
            split_at in 0usize..64,
        ) {
            let mut decoder = Decoder::default();
            let split = split_at.min(bytes.len());
            let mut events = decoder.feed(&bytes[..split]);
            events.extend(decoder.feed(&bytes[split..]));

            let decoded: String = events
                .into_iter()
                .map(|e| match e {
                    Event::KeyPress(k) => k.text,
                    other => panic!("unexpected event for plain ASCII input: {other:?}"),
                })
                .collect();
            let expected = String::from_utf8(bytes).unwrap();
            proptest::prop_assert_eq!(decoded, expected);
        }

        // Feeding a byte stream one byte at a time must produce the
        // exact same events as feeding it all at once: the decoder is
        // restartable at any boundary.
        #[test]
        fn byte_at_a_time_matches_whole_buffer(
            bytes in proptest::collection::vec(0x20u8..=0x7E, 0..64),
        ) {
            let whole = Decoder::default().feed(&bytes);

            let mut decoder = Decoder::default();
            let mut piecewise = Vec::new();
            for &b in &bytes {
                piecewise.extend(decoder.feed(&[b]));
            }
            proptest::prop_assert_eq!(whole, piecewise);
        }

        // CSI cursor-movement sequences with arbitrary small modifier
        // codes always decode to exactly one KeyPress, never panicking
        // or silently dropping the event.
        #[test]
        fn csi_arrow_with_modifier_always_decodes(mod_code in 1i64..16) {
            let seq = format!("\x1b[1;{mod_code}A");
            let events = decode_all(seq.as_bytes());
            proptest::prop_assert_eq!(events.len(), 1);
            proptest::prop_assert!(matches!(
                &events[0],
                Event::KeyPress(k) if k.code == KeyCode::Up
            ));
        }
    }
}
