//! The minimal color value the decoder needs to report what a
//! terminal told us via OSC 10/11/12 and OSC 52 replies.
//!
//! The color/style *engine* (palettes, blending, SGR attribute
//! formatting) is explicitly out of scope for this crate; `Color`
//! exists only to carry a parsed reply back to the application.

/// A color reported by the terminal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Color {
    /// A 24-bit RGB triple, parsed from `rgb:RR/GG/BB`, `#RRGGBB`, or
    /// `rgbi:R/G/B`.
    Rgb(u8, u8, u8),

    /// A spec string the parser recognized the shape of but could not
    /// decode (e.g. an X11 named color), preserved verbatim.
    Unknown(String),
}

impl Color {
    /// Parse an X-color-spec as emitted by OSC 10/11/12 responses.
    ///
    /// Accepts `rgb:RR/GG/BB` (arbitrary component width, high byte
    /// used when more than 2 hex digits are given), `#RRGGBB`, and
    /// `rgbi:R/G/B` (floating point 0.0-1.0 components). Anything
    /// else is preserved as `Color::Unknown`.
    #[must_use]
    pub fn parse_x_spec(spec: &str) -> Self {
        let spec = spec.trim();
        if let Some(body) = spec.strip_prefix("rgb:") {
            if let Some(c) = parse_rgb_colon(body) {
                return c;
            }
        } else if let Some(body) = spec.strip_prefix('#') {
            if let Some(c) = parse_hex6(body) {
                return c;
            }
        } else if let Some(body) = spec.strip_prefix("rgbi:") {
            if let Some(c) = parse_rgbi(body) {
                return c;
            }
        }
        Color::Unknown(spec.to_string())
    }
}

fn parse_hex_component(s: &str) -> Option<u8> {
    if s.is_empty() || s.len() > 4 {
        return None;
    }
    let value = u32::from_str_radix(s, 16).ok()?;
    let max = (1u32 << (s.len() * 4)) - 1;
    // Scale down to 8 bits by taking the most significant byte.
    Some(((value * 255) / max.max(1)) as u8)
}

fn parse_rgb_colon(body: &str) -> Option<Color> {
    let mut parts = body.split('/');
    let r = parse_hex_component(parts.next()?)?;
    let g = parse_hex_component(parts.next()?)?;
    let b = parse_hex_component(parts.next()?)?;
    if parts.next().is_some() {
        return None;
    }
    Some(Color::Rgb(r, g, b))
}

fn parse_hex6(body: &str) -> Option<Color> {
    if body.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&body[0..2], 16).ok()?;
    let g = u8::from_str_radix(&body[2..4], 16).ok()?;
    let b = u8::from_str_radix(&body[4..6], 16).ok()?;
    Some(Color::Rgb(r, g, b))
}

fn parse_rgbi(body: &str) -> Option<Color> {
    let mut parts = body.split('/');
    let r = parts.next()?.parse::<f64>().ok()?;
    let g = parts.next()?.parse::<f64>().ok()?;
    let b = parts.next()?.parse::<f64>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    let scale = |v: f64| -> u8 { (v.clamp(0.0, 1.0) * 255.0).round() as u8 };
    Some(Color::Rgb(scale(r), scale(g), scale(b)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rgb_colon_full_width() {
        assert_eq!(Color::parse_x_spec("rgb:ff/00/80"), Color::Rgb(255, 0, 128));
    }

    #[test]
    fn parses_rgb_colon_four_digit_components() {
        // rgb:ffff/0000/8080 -> scaled down to 8 bits per component.
        assert_eq!(Color::parse_x_spec("rgb:ffff/0000/8080"), Color::Rgb(255, 0, 128));
    }

    #[test]
    fn parses_hex6() {
        assert_eq!(Color::parse_x_spec("#112233"), Color::Rgb(0x11, 0x22, 0x33));
    }

    #[test]
    fn parses_rgbi() {
        assert_eq!(Color::parse_x_spec("rgbi:1.0/0.0/0.5"), Color::Rgb(255, 0, 128));
    }

    #[test]
    fn unrecognized_spec_preserved_verbatim() {
        assert_eq!(
            Color::parse_x_spec("DeepSkyBlue"),
            Color::Unknown("DeepSkyBlue".to_string())
        );
    }

    #[test]
    fn malformed_rgb_colon_preserved() {
        assert_eq!(
            Color::parse_x_spec("rgb:zz/00/00"),
            Color::Unknown("rgb:zz/00/00".to_string())
        );
    }
}
