//! Terminal capability probing from environment variables.
//!
//! Covers color-support tier, the `dumb` no-TTY override, and the
//! Google Cloud Shell special case.

use std::env;

/// The color support a terminal is believed to offer, from weakest to
/// strongest. Ordering matters: `max` between two tiers picks the
/// stronger one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ColorLevel {
    /// No color output; text attributes (bold, underline) still run.
    None,
    /// 16-color ANSI palette.
    Ansi16,
    /// 256-color indexed palette.
    Ansi256,
    /// 24-bit truecolor.
    TrueColor,
}

/// Terminal capabilities inferred from the process environment.
///
/// Construct with [`Capabilities::probe`] for the real environment, or
/// [`Capabilities::from_vars`] in tests to inject a fixed variable
/// set without touching the process environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    /// `false` when `TERM=dumb` or `TERM` is unset: callers should not
    /// attempt raw mode or any escape sequence output at all.
    pub is_tty_capable: bool,
    /// The color tier to render at.
    pub color_level: ColorLevel,
    /// `TERM` value, verbatim, for terminfo lookups.
    pub term: Option<String>,
}

impl Capabilities {
    /// Probe the real process environment.
    #[must_use]
    pub fn probe() -> Self {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Probe using a supplied variable lookup, e.g. a fixed `HashMap`
    /// for tests.
    pub fn from_vars<F>(mut get: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        let term = get("TERM");
        let is_tty_capable = !matches!(term.as_deref(), None | Some("dumb") | Some(""));

        let mut level = match term.as_deref() {
            Some(t) if t.contains("256color") => ColorLevel::Ansi256,
            Some(t) if t.starts_with("xterm") || t.starts_with("screen") || t.starts_with("vt") => {
                ColorLevel::Ansi16
            }
            Some(_) => ColorLevel::Ansi16,
            None => ColorLevel::None,
        };

        if matches!(
            get("COLORTERM").as_deref(),
            Some("truecolor") | Some("24bit")
        ) {
            level = level.max(ColorLevel::TrueColor);
        }
        if get("GOOGLE_CLOUD_SHELL").as_deref() == Some("true") {
            level = level.max(ColorLevel::TrueColor);
        }

        match get("CLICOLOR_FORCE").as_deref() {
            Some(v) if v != "0" && !v.is_empty() => {
                if level == ColorLevel::None {
                    level = ColorLevel::Ansi16;
                }
            }
            _ => {}
        }
        if let Some(v) = get("CLICOLOR") {
            if v == "0" {
                level = ColorLevel::None;
            }
        }
        // NO_COLOR wins over everything else per https://no-color.org.
        if get("NO_COLOR").is_some() {
            level = ColorLevel::None;
        }

        if !is_tty_capable {
            level = ColorLevel::None;
        }

        Self {
            is_tty_capable,
            color_level: level,
            term,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn caps(vars: &[(&str, &str)]) -> Capabilities {
        let map: HashMap<_, _> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Capabilities::from_vars(|name| map.get(name).cloned())
    }

    #[test]
    fn dumb_term_disables_tty_capability() {
        let c = caps(&[("TERM", "dumb")]);
        assert!(!c.is_tty_capable);
        assert_eq!(c.color_level, ColorLevel::None);
    }

    #[test]
    fn missing_term_disables_tty_capability() {
        let c = caps(&[]);
        assert!(!c.is_tty_capable);
    }

    #[test]
    fn colorterm_truecolor_upgrades() {
        let c = caps(&[("TERM", "xterm"), ("COLORTERM", "truecolor")]);
        assert_eq!(c.color_level, ColorLevel::TrueColor);
    }

    #[test]
    fn no_color_overrides_everything() {
        let c = caps(&[("TERM", "xterm-256color"), ("COLORTERM", "truecolor"), ("NO_COLOR", "1")]);
        assert_eq!(c.color_level, ColorLevel::None);
    }

    #[test]
    fn google_cloud_shell_forces_truecolor() {
        let c = caps(&[("TERM", "xterm"), ("GOOGLE_CLOUD_SHELL", "true")]);
        assert_eq!(c.color_level, ColorLevel::TrueColor);
    }

    #[test]
    fn clicolor_zero_disables_color() {
        let c = caps(&[("TERM", "xterm-256color"), ("CLICOLOR", "0")]);
        assert_eq!(c.color_level, ColorLevel::None);
    }

    #[test]
    fn clicolor_force_enables_color_on_dumb_pipe() {
        // A TERM that would otherwise be Ansi16 stays untouched; the
        // force flag only lifts `None` up to a minimal tier.
        let c = caps(&[("TERM", "xterm-256color"), ("CLICOLOR_FORCE", "1")]);
        assert_eq!(c.color_level, ColorLevel::Ansi256);
    }

    #[test]
    fn term_256color_is_ansi256() {
        let c = caps(&[("TERM", "xterm-256color")]);
        assert_eq!(c.color_level, ColorLevel::Ansi256);
    }
}
