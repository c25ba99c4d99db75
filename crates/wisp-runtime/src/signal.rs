//! `SIGWINCH`/`SIGHUP`/`SIGINT` watcher.
//!
//! A dedicated thread drives `signal_hook::iterator::Signals::forever()`,
//! coalescing a storm of deliveries into a single wakeup via a bounded
//! channel, and is torn down by closing the iterator's `Handle` and
//! joining the thread. A resize is reported by querying the real
//! terminal size through the caller-supplied `query_size` closure
//! rather than carrying a fixed width/height of its own.
//!
//! `SIGINT` needs its own handler even though raw mode clears `ISIG`
//! (so a terminal-generated Ctrl+C never reaches the kernel as a
//! signal at all, only as byte 0x03 through the decoder): a
//! `kill -INT` sent from outside the controlling terminal still
//! delivers the signal, and it should become an overridable
//! `Interrupt` message rather than the default terminate-the-process
//! action.

use std::io;
use std::thread::{self, JoinHandle};

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGWINCH};
use signal_hook::iterator::{Handle, Signals};

use crate::message::{Message, MessageSender};

/// Owns the signal-watcher thread; torn down on drop.
pub struct SignalWatcher {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl SignalWatcher {
    /// Spawn the watcher thread, sending `Message::WindowSize` (via
    /// `query_size`) on `SIGWINCH`, `Message::Hangup` on `SIGHUP`, and
    /// `Message::Interrupt` on `SIGINT`.
    ///
    /// A `SyncSender` of capacity 1 coalesces a burst of `SIGWINCH`s:
    /// a single pending notification is enough, since the real size is
    /// queried fresh each time rather than carried in the signal
    /// itself.
    pub fn spawn<M>(
        tx: MessageSender<M>,
        query_size: impl Fn() -> io::Result<(u16, u16)> + Send + 'static,
    ) -> io::Result<Self>
    where
        M: Send + 'static,
    {
        let mut signals = Signals::new([SIGWINCH, SIGHUP, SIGINT]).map_err(io::Error::other)?;
        let handle = signals.handle();
        let (coalesce_tx, coalesce_rx) = std::sync::mpsc::sync_channel::<()>(1);
        let coalesce_thread = spawn_coalescer(coalesce_rx, tx.clone(), query_size);

        let thread = thread::spawn(move || {
            for signal in signals.forever() {
                match signal {
                    SIGWINCH => {
                        let _ = coalesce_tx.try_send(());
                    }
                    SIGHUP => {
                        if tx.send(Message::Hangup).is_err() {
                            break;
                        }
                    }
                    SIGINT => {
                        if tx.send(Message::Interrupt).is_err() {
                            break;
                        }
                    }
                    _ => {}
                }
            }
            drop(coalesce_tx);
            let _ = coalesce_thread.join();
        });

        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }
}

/// A second thread does the (possibly blocking) `ioctl` size query so
/// the signal-delivery thread never stalls waiting on it.
fn spawn_coalescer<M>(
    rx: std::sync::mpsc::Receiver<()>,
    tx: MessageSender<M>,
    query_size: impl Fn() -> io::Result<(u16, u16)> + Send + 'static,
) -> JoinHandle<()>
where
    M: Send + 'static,
{
    thread::spawn(move || {
        while rx.recv().is_ok() {
            if let Ok((width, height)) = query_size() {
                if tx.send(Message::WindowSize { width, height }).is_err() {
                    break;
                }
            }
        }
    })
}

impl Drop for SignalWatcher {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn sighup_reaches_the_inbox() {
        let (tx, rx) = mpsc::channel::<Message<()>>();
        let tx = MessageSender::new(tx, None, false);
        let watcher = SignalWatcher::spawn(tx, || Ok((80, 24))).unwrap();
        unsafe {
            libc::raise(SIGHUP);
        }
        let msg = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(matches!(msg, Message::Hangup));
        drop(watcher);
    }

    #[test]
    fn sigwinch_queries_and_reports_size() {
        let (tx, rx) = mpsc::channel::<Message<()>>();
        let tx = MessageSender::new(tx, None, false);
        let watcher = SignalWatcher::spawn(tx, || Ok((100, 40))).unwrap();
        unsafe {
            libc::raise(SIGWINCH);
        }
        let msg = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(matches!(
            msg,
            Message::WindowSize {
                width: 100,
                height: 40
            }
        ));
        drop(watcher);
    }
}
