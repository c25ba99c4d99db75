//! The command runner: executes `Cmd` values off the event loop and
//! routes their resulting messages back to its inbox.
//!
//! `Batch` spawns one thread per member and does not wait for them;
//! `Sequence` runs its members one at a time on a single thread,
//! recursing into nested `Batch`/`Sequence` so that a `Batch` nested
//! inside a `Sequence` still blocks the sequence until every one of
//! its members has completed.

use std::thread;

use crate::message::{Cmd, Message, MessageSender};

/// Schedule `cmd` for execution without blocking the caller. The top
/// level always runs on its own thread so that dispatching a command
/// never stalls the event loop.
pub fn dispatch<M>(cmd: Cmd<M>, tx: MessageSender<M>)
where
    M: Send + 'static,
{
    if matches!(cmd, Cmd::None) {
        return;
    }
    thread::spawn(move || run(cmd, &tx));
}

/// Run `cmd` to completion on the calling thread, sending every
/// message it produces to `tx` as soon as it is available. Every send
/// passes through `tx`'s installed filter, if any.
fn run<M>(cmd: Cmd<M>, tx: &MessageSender<M>)
where
    M: Send + 'static,
{
    match cmd {
        Cmd::None => {}
        Cmd::Batch(cmds) => {
            let handles: Vec<_> = cmds
                .into_iter()
                .map(|c| {
                    let tx = tx.clone();
                    thread::spawn(move || run(c, &tx))
                })
                .collect();
            for handle in handles {
                if handle.join().is_err() {
                    #[cfg(feature = "tracing")]
                    tracing::error!("batched command panicked");
                }
            }
        }
        Cmd::Sequence(cmds) => {
            for c in cmds {
                run(c, tx);
            }
        }
        leaf => {
            if let Some(msg) = leaf_to_message(leaf) {
                let _ = tx.send(msg);
            }
        }
    }
}

/// Reduce a non-`Batch`/`Sequence` `Cmd` to the single `Message` it
/// produces. Runs `Task` closures inline (on the calling worker
/// thread) since they are expected to block.
fn leaf_to_message<M>(cmd: Cmd<M>) -> Option<Message<M>> {
    match cmd {
        Cmd::None | Cmd::Batch(_) | Cmd::Sequence(_) => {
            unreachable!("leaf_to_message called with a non-leaf Cmd")
        }
        Cmd::Quit => Some(Message::Quit),
        Cmd::Msg(m) => Some(Message::User(m)),
        Cmd::Task(task) => Some(Message::User(task())),
        Cmd::PrintLine(line) => Some(Message::PrintLine(line)),
        Cmd::EnableMode(mode) => Some(Message::EnableMode(mode)),
        Cmd::DisableMode(mode) => Some(Message::DisableMode(mode)),
        Cmd::SetWindowTitle(title) => Some(Message::SetWindowTitle(title)),
        Cmd::ClearScreen => Some(Message::ClearScreen),
        Cmd::Repaint => Some(Message::Repaint),
        Cmd::RequestWindowSize => Some(Message::RequestWindowSize),
        Cmd::Raw(bytes) => Some(Message::Raw(bytes)),
        Cmd::SetColor(target, color) => Some(Message::SetColor(target, color)),
        Cmd::Suspend => Some(Message::Suspend),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    #[derive(Debug, Clone, PartialEq)]
    struct Stamp(&'static str, Instant);

    fn task(tag: &'static str, log: Arc<Mutex<Vec<Stamp>>>) -> Cmd<()> {
        Cmd::Task(Box::new(move || {
            log.lock().unwrap().push(Stamp(tag, Instant::now()));
        }))
    }

    fn unfiltered<M>(tx: mpsc::Sender<Message<M>>) -> MessageSender<M> {
        MessageSender::new(tx, None, false)
    }

    #[test]
    fn sequence_runs_in_order() {
        let (tx, rx) = mpsc::channel();
        let log = Arc::new(Mutex::new(Vec::new()));
        let cmd = Cmd::sequence([
            task("a", log.clone()),
            task("b", log.clone()),
            task("c", log.clone()),
        ]);
        dispatch(cmd, unfiltered(tx));
        for _ in 0..3 {
            rx.recv_timeout(Duration::from_secs(1)).unwrap();
        }
        let log = log.lock().unwrap();
        let tags: Vec<_> = log.iter().map(|s| s.0).collect();
        assert_eq!(tags, vec!["a", "b", "c"]);
        assert!(log[0].1 <= log[1].1);
        assert!(log[1].1 <= log[2].1);
    }

    #[test]
    fn nested_batch_inside_sequence_completes_before_next_item() {
        let (tx, rx) = mpsc::channel();
        let log = Arc::new(Mutex::new(Vec::new()));
        let cmd = Cmd::sequence([
            Cmd::batch([task("x", log.clone()), task("y", log.clone())]),
            task("z", log.clone()),
        ]);
        dispatch(cmd, unfiltered(tx));
        for _ in 0..3 {
            rx.recv_timeout(Duration::from_secs(1)).unwrap();
        }
        let log = log.lock().unwrap();
        let z_index = log.iter().position(|s| s.0 == "z").unwrap();
        assert_eq!(z_index, 2, "z must come after both batch members");
    }

    #[test]
    fn batch_members_both_run_without_order_guarantee() {
        let (tx, rx) = mpsc::channel();
        let log = Arc::new(Mutex::new(Vec::new()));
        let cmd = Cmd::batch([task("p", log.clone()), task("q", log.clone())]);
        dispatch(cmd, unfiltered(tx));
        for _ in 0..2 {
            rx.recv_timeout(Duration::from_secs(1)).unwrap();
        }
        let log = log.lock().unwrap();
        let mut tags: Vec<_> = log.iter().map(|s| s.0).collect();
        tags.sort();
        assert_eq!(tags, vec!["p", "q"]);
    }

    #[test]
    fn none_is_dispatched_without_sending_anything() {
        let (tx, rx) = mpsc::channel::<Message<()>>();
        dispatch(Cmd::None, unfiltered(tx));
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn quit_produces_quit_message() {
        let (tx, rx) = mpsc::channel();
        dispatch(Cmd::<()>::Quit, unfiltered(tx));
        assert!(matches!(
            rx.recv_timeout(Duration::from_secs(1)).unwrap(),
            Message::Quit
        ));
    }
}
