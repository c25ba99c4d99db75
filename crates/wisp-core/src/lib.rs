//! Event taxonomy, incremental ANSI input decoding, and terminal
//! capability probing shared by the wisp runtime.

pub mod capabilities;
pub mod color;
pub mod decoder;
pub mod error;
pub mod event;

pub use capabilities::{Capabilities, ColorLevel};
pub use color::Color;
pub use decoder::{Decoder, DecoderOptions};
pub use error::{Error, Result};
pub use event::{Event, KeyCode, KeyEvent, Modifiers, MouseButton, MouseEvent};
