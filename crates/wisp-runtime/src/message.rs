//! Commands and messages.
//!
//! What a user's `update` returns (batched/sequenced bundles of
//! deferred work) is kept distinct from what actually reaches
//! `update` (one message at a time): [`Cmd`] is what `init`/`update`
//! return and the command runner consumes — `Batch` and `Sequence`
//! only ever exist here, before dispatch. [`Message`] is what is
//! actually delivered through the event loop's inbox; it has no
//! bundling variants because by the time something is a `Message` it
//! has already been flattened to one unit of work.

use std::sync::mpsc::{SendError, Sender};
use std::sync::Arc;

use wisp_core::Color;
use wisp_render::ModeId;

/// Which OSC color query/set a [`Cmd::SetColor`] or [`Message::SetColor`]
/// addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorTarget {
    Foreground,
    Background,
    Cursor,
}

/// A boxed, one-shot closure run on a Command Runner worker thread.
/// Produces the single message that closes out the command.
pub type Task<M> = Box<dyn FnOnce() -> M + Send>;

/// A deferred, possibly-blocking unit of work, as returned by
/// [`crate::program::Model::init`] and
/// [`crate::program::Model::update`].
///
/// `Batch` and `Sequence` bundle further commands; every other
/// variant is a leaf that the Command Runner (`crate::command`)
/// reduces to at most one [`Message`].
pub enum Cmd<M> {
    /// No-op.
    None,
    /// Terminate the event loop after this command's (non-existent)
    /// message would have been delivered.
    Quit,
    /// Run every command concurrently; no ordering between them.
    Batch(Vec<Cmd<M>>),
    /// Run every command in order, one at a time; later commands do
    /// not start until the earlier one's message has been produced.
    Sequence(Vec<Cmd<M>>),
    /// Deliver a user message directly, without running a worker.
    Msg(M),
    /// Run a blocking closure on a worker thread; its return value
    /// becomes the resulting message.
    Task(Task<M>),
    /// Queue a line above the rendered frame (no-op in alt-screen).
    PrintLine(String),
    /// Enable a terminal mode.
    EnableMode(ModeId),
    /// Disable a terminal mode.
    DisableMode(ModeId),
    /// Set the window title (OSC 2).
    SetWindowTitle(String),
    /// Clear the screen and force a full repaint.
    ClearScreen,
    /// Force the renderer to forget its last-committed frame.
    Repaint,
    /// Ask the controller to re-query and report the window size.
    RequestWindowSize,
    /// Write bytes directly to the terminal, bypassing the renderer.
    Raw(Vec<u8>),
    /// Query or reset a color (OSC 10/11/12/110/111/112).
    SetColor(ColorTarget, Option<Color>),
    /// Release the terminal and send `SIGTSTP` to the process group.
    Suspend,
}

impl<M> Cmd<M> {
    /// Shorthand for `Cmd::Batch(cmds.into_iter().collect())`.
    pub fn batch(cmds: impl IntoIterator<Item = Cmd<M>>) -> Self {
        Cmd::Batch(cmds.into_iter().collect())
    }

    /// Shorthand for `Cmd::Sequence(cmds.into_iter().collect())`.
    pub fn sequence(cmds: impl IntoIterator<Item = Cmd<M>>) -> Self {
        Cmd::Sequence(cmds.into_iter().collect())
    }
}

/// One unit of work delivered to the event loop's inbox.
///
/// Produced either by the input decoder (`User` wraps the
/// application's own message type, which implements
/// `From<wisp_core::Event>`), by the signal watcher (`Hangup`,
/// `WindowSize`), or by a reduced [`Cmd`] leaf.
#[derive(Debug)]
pub enum Message<M> {
    /// The program should terminate.
    Quit,
    /// `SIGINT` (or Ctrl+C under the control-code policy), before the
    /// program has had a chance to swallow it.
    Interrupt,
    /// `SIGHUP`.
    Hangup,
    /// `SIGTSTP`: the terminal has been released, the process is about
    /// to stop.
    Suspend,
    /// The process has been resumed after `Suspend`.
    Resume,
    /// A line to print above the rendered frame.
    PrintLine(String),
    /// A terminal mode to enable.
    EnableMode(ModeId),
    /// A terminal mode to disable.
    DisableMode(ModeId),
    /// A new window title.
    SetWindowTitle(String),
    /// Clear the screen and force a full repaint.
    ClearScreen,
    /// Force a full repaint on the next tick.
    Repaint,
    /// Ask the controller to re-query and report the window size.
    RequestWindowSize,
    /// The terminal was resized (from the signal watcher or a
    /// `RequestWindowSize` message).
    WindowSize { width: u16, height: u16 },
    /// Raw bytes to write directly to the terminal.
    Raw(Vec<u8>),
    /// Query or reset a color.
    SetColor(ColorTarget, Option<Color>),
    /// The application's own message (including those constructed
    /// from a decoded [`wisp_core::Event`]).
    User(M),
}

/// A user-installed hook that inspects every candidate message before
/// it reaches the event loop's inbox and may replace it or drop it by
/// returning `None`. Shared (`Arc`, not `Box`) so it can be cloned onto
/// the reader task, the signal watcher, and every command worker
/// without requiring the closure itself to be `Clone`.
pub type MessageFilter<M> = Arc<dyn Fn(Message<M>) -> Option<Message<M>> + Send + Sync>;

/// Wraps the inbox's raw [`Sender`] with the installed [`MessageFilter`],
/// applied at the point each task hands a message over rather than once
/// centrally where the event loop dequeues — so a dropped message never
/// displaces the relative order of the ones that survive.
///
/// `Message::Interrupt` bypasses the filter entirely while
/// `handle_interrupt` is set: a filter may reshape or swallow anything
/// else, but it cannot make the loop miss an interrupt the program has
/// opted into handling.
pub struct MessageSender<M> {
    tx: Sender<Message<M>>,
    filter: Option<MessageFilter<M>>,
    handle_interrupt: bool,
}

impl<M> MessageSender<M> {
    pub fn new(
        tx: Sender<Message<M>>,
        filter: Option<MessageFilter<M>>,
        handle_interrupt: bool,
    ) -> Self {
        Self {
            tx,
            filter,
            handle_interrupt,
        }
    }

    /// Run `message` through the filter (if any) and forward whatever
    /// survives. Returns `Err` only when the receiving end has hung up,
    /// matching `Sender::send`.
    pub fn send(&self, message: Message<M>) -> Result<(), SendError<Message<M>>> {
        if self.handle_interrupt && matches!(message, Message::Interrupt) {
            return self.tx.send(message);
        }
        match &self.filter {
            Some(filter) => match filter(message) {
                Some(message) => self.tx.send(message),
                None => Ok(()),
            },
            None => self.tx.send(message),
        }
    }
}

impl<M> Clone for MessageSender<M> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            filter: self.filter.clone(),
            handle_interrupt: self.handle_interrupt,
        }
    }
}

#[cfg(test)]
mod filter_tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn filter_can_replace_a_message() {
        let (tx, rx) = mpsc::channel::<Message<u32>>();
        let filter: MessageFilter<u32> = Arc::new(|_msg| Some(Message::User(99)));
        let sender = MessageSender::new(tx, Some(filter), false);
        sender.send(Message::User(1)).unwrap();
        assert!(matches!(rx.recv().unwrap(), Message::User(99)));
    }

    #[test]
    fn filter_can_drop_a_message() {
        let (tx, rx) = mpsc::channel::<Message<u32>>();
        let filter: MessageFilter<u32> = Arc::new(|_msg| None);
        let sender = MessageSender::new(tx, Some(filter), false);
        sender.send(Message::User(1)).unwrap();
        sender.send(Message::Quit).unwrap();
        assert!(matches!(rx.recv().unwrap(), Message::Quit));
    }

    #[test]
    fn interrupt_bypasses_a_dropping_filter_once_handling_is_opted_in() {
        let (tx, rx) = mpsc::channel::<Message<u32>>();
        let filter: MessageFilter<u32> = Arc::new(|_msg| None);
        let sender = MessageSender::new(tx, Some(filter), true);
        sender.send(Message::Interrupt).unwrap();
        assert!(matches!(rx.recv().unwrap(), Message::Interrupt));
    }

    #[test]
    fn interrupt_can_be_dropped_when_interrupt_handling_is_not_opted_in() {
        let (tx, rx) = mpsc::channel::<Message<u32>>();
        let filter: MessageFilter<u32> = Arc::new(|_msg| None);
        let sender = MessageSender::new(tx, Some(filter), false);
        sender.send(Message::Interrupt).unwrap();
        sender.send(Message::Quit).unwrap();
        assert!(matches!(rx.recv().unwrap(), Message::Quit));
    }
}
