//! Public facade for the wisp terminal UI runtime.
//!
//! Re-exports the pieces application code actually needs from the
//! `wisp-core`/`wisp-reader`/`wisp-render`/`wisp-runtime` crates so a
//! program depending on this crate alone can build a full
//! model-update-view application. If you only depend on one crate,
//! it should be this one.

// --- Core re-exports ---------------------------------------------------

pub use wisp_core::{
    Capabilities, Color, ColorLevel, Decoder, DecoderOptions, Error, Event, KeyCode, KeyEvent,
    Modifiers, MouseButton, MouseEvent, Result,
};

// --- Reader re-exports --------------------------------------------------

pub use wisp_reader::{Cancel, CancelableRead};

// --- Render re-exports ---------------------------------------------------

pub use wisp_render::{ModeId, Modes, Renderer, RendererOptions};

// --- Runtime re-exports (feature-gated so the decoder/renderer halves
// of this crate stay usable without pulling in thread/signal plumbing
// on targets that don't want it) -----------------------------------------

#[cfg(feature = "runtime")]
pub use wisp_runtime::{run, Cmd, ColorTarget, Message, MessageFilter, Model, ProgramOptions, Signal};

/// A lightweight prelude for day-to-day use: the event types you match
/// on in `update`, plus the runtime entry points when the `runtime`
/// feature is enabled.
pub mod prelude {
    pub use crate::{Color, Error, Event, KeyCode, KeyEvent, Modifiers, MouseButton, Result};

    #[cfg(feature = "runtime")]
    pub use crate::{run, Cmd, ColorTarget, Model, ProgramOptions, Signal};
}

pub use wisp_core as core;
pub use wisp_reader as reader;
pub use wisp_render as render;
#[cfg(feature = "runtime")]
pub use wisp_runtime as runtime;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prelude_reexports_core_event_types() {
        let _event: Event = Event::Focus;
        let _code: KeyCode = KeyCode::Enter;
    }

    #[cfg(feature = "runtime")]
    #[test]
    fn prelude_reexports_runtime_types() {
        let options = ProgramOptions::default();
        assert_eq!(options.frame_rate_hz, 60);
    }
}
