//! Event loop, command scheduler, terminal controller, and `Program`
//! entry point.

pub mod command;
pub mod message;
pub mod program;
#[cfg(unix)]
pub mod signal;
pub mod terminal;

pub use command::dispatch;
pub use message::{Cmd, ColorTarget, Message, MessageFilter};
pub use program::{run, Model, ProgramOptions, Signal};
pub use terminal::{TerminalController, TerminalOptions};

/// A trivial convenience alias: most callers just want `Program::run`.
pub mod prelude {
    pub use crate::message::{Cmd, ColorTarget};
    pub use crate::program::{Model, ProgramOptions, Signal};
    pub use wisp_core::{Event, KeyCode, KeyEvent, Modifiers};
}
