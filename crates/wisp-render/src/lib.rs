//! Differential frame renderer and ANSI output encoding.
//!
//! `ansi` holds pure byte-writing helpers for cursor movement, erase,
//! scroll regions, and mode toggles (deliberately no SGR/color
//! helpers — this runtime has no color/style engine of its own).
//! `mode` tracks the open-ended set of currently-enabled terminal
//! modes in enable order. `renderer` is the line-based differential
//! painter: it diffs each frame against the last one committed and
//! writes only the minimal set of cursor moves and line rewrites,
//! expressed using the `ansi` helpers above.

pub mod ansi;
pub mod mode;
pub mod renderer;

pub use mode::{ModeId, Modes};
pub use renderer::{Renderer, RendererOptions};
