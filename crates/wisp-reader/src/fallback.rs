//! Best-effort cancelable reader for sources with no cancellation
//! primitive at all (a piped, non-TTY stdin; an exotic platform with
//! neither epoll, kqueue, nor `select`).
//!
//! `cancel()` only ever sets a flag: future reads short-circuit
//! immediately, but a read already blocked in the underlying source
//! runs to natural completion before the flag is observed.

use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use wisp_core::{Error, Result};

use crate::{Cancel, CancelableRead};

/// Wraps any [`std::io::Read`] with a flag-only cancellation contract.
pub struct FlagOnlyReader<R> {
    inner: R,
    canceled: Arc<AtomicBool>,
}

/// A handle that sets the cancellation flag on a [`FlagOnlyReader`].
#[derive(Clone)]
pub struct Canceler {
    canceled: Arc<AtomicBool>,
}

impl Cancel for Canceler {
    fn cancel(&self) -> bool {
        self.canceled.store(true, Ordering::SeqCst);
        #[cfg(feature = "tracing")]
        tracing::debug!("reader cancel requested (flag only, best-effort)");
        false
    }
}

impl<R: Read + Send> FlagOnlyReader<R> {
    /// Wrap `inner` with a best-effort canceler.
    pub fn new(inner: R) -> (Self, Canceler) {
        let canceled = Arc::new(AtomicBool::new(false));
        let reader = Self {
            inner,
            canceled: Arc::clone(&canceled),
        };
        (reader, Canceler { canceled })
    }
}

impl<R: Read + Send> CancelableRead for FlagOnlyReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.canceled.load(Ordering::SeqCst) {
            return Err(Error::Cancel);
        }
        let n = self.inner.read(buf).map_err(Error::Io)?;
        if self.canceled.load(Ordering::SeqCst) {
            return Err(Error::Cancel);
        }
        Ok(n)
    }

    fn close(self: Box<Self>) -> Result<()> {
        // `inner` owns no descriptor we opened; it closes itself, if it
        // owns anything at all, when this box is dropped.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_before_read_short_circuits() {
        let (mut reader, canceler) = FlagOnlyReader::new(std::io::Cursor::new(b"hello".to_vec()));
        assert!(!canceler.cancel());
        let mut buf = [0u8; 8];
        assert!(matches!(reader.read(&mut buf), Err(Error::Cancel)));
    }

    #[test]
    fn reads_through_when_not_canceled() {
        let (mut reader, _canceler) = FlagOnlyReader::new(std::io::Cursor::new(b"hi".to_vec()));
        let mut buf = [0u8; 8];
        let n = reader.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"hi");
    }
}
