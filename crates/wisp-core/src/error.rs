//! Error kinds shared across the wisp crates.
//!
//! `Io` and `Cancel` are the two I/O-layer outcomes, `ModeSet` covers a
//! failed terminal-mode transition, `Decode` never escapes the decoder
//! (it degrades to `Event::Unknown` instead), `Invariant` marks a
//! programmer error such as running two event loops against one
//! program, and `Close` aggregates the failures of a multi-descriptor
//! teardown that keeps trying every descriptor rather than stopping at
//! the first error.

use std::fmt;
use std::io;

/// The error type returned by fallible wisp operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An underlying read or write failed.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A blocking read was canceled. Expected during shutdown; callers
    /// should treat this as a normal, non-fatal outcome rather than
    /// surface it to the user.
    #[error("read canceled")]
    Cancel,

    /// Entering or leaving a terminal mode failed.
    #[error("failed to set terminal mode {mode}: {source}")]
    ModeSet {
        /// Name of the mode that failed to transition.
        mode: &'static str,
        /// The underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// An internal invariant was violated (e.g. two concurrent event
    /// loops on the same terminal). Always fatal.
    #[error("invariant violated: {0}")]
    Invariant(&'static str),

    /// A byte sequence did not match any recognized grammar.
    ///
    /// The decoder never returns this to its caller — it is folded
    /// into `Event::Unknown` instead. The variant exists so internal
    /// helpers and tests can report *why* a sequence fell through.
    #[error("could not decode sequence: {context}")]
    Decode {
        /// Human-readable description of what failed to parse.
        context: String,
    },

    /// One or more descriptors failed to close during an explicit
    /// `close()`. Every descriptor is still attempted; this collects
    /// whichever of them failed instead of stopping at the first.
    #[error("{0}")]
    Close(#[source] CloseErrors),
}

/// The failures collected by an aggregated `close()`.
#[derive(Debug)]
pub struct CloseErrors(pub Vec<io::Error>);

impl fmt::Display for CloseErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} descriptor(s) failed to close: ", self.0.len())?;
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CloseErrors {}

/// Convenience alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
