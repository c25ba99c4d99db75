//! The `Model` trait, `Signal`, `ProgramOptions`, and the event loop
//! entry point.
//!
//! `Model` keeps three capabilities (`init`, `update`, `view`), and
//! `ProgramOptions` is built with chainable setters. The event loop
//! owns the Model directly and drives the reader task, signal task,
//! and command-runner threads through a single `mpsc` inbox, so the
//! Model is only ever mutated from one place.

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use wisp_core::{Decoder, DecoderOptions, Error, Event};
use wisp_render::{Renderer, RendererOptions};

use crate::command;
use crate::message::{Cmd, Message, MessageFilter, MessageSender};
use crate::terminal::{self, TerminalController, TerminalOptions};

#[cfg(unix)]
use crate::signal::SignalWatcher;

/// A lifecycle notification the loop intercepts for its own bookkeeping
/// but also hands to the Model, so that applications which care (status
/// lines, "are you sure you want to quit" prompts, resize-aware
/// layouts) can react. Bridged into `M::Message` the same way a
/// decoded [`wisp_core::Event`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// `SIGINT` arrived and `ProgramOptions::handle_interrupt` is set,
    /// so the loop is giving the Model a chance to act before quitting
    /// would otherwise follow automatically.
    Interrupt,
    /// `SIGHUP`.
    Hangup,
    /// The terminal was released and the process is about to stop via
    /// `SIGTSTP`. Delivered just before the stop, not after.
    Suspend,
    /// The process has resumed after `Suspend` and the terminal has
    /// been reacquired.
    Resume,
    /// The terminal was resized.
    WindowSize { width: u16, height: u16 },
}

/// A value with the three capabilities the event loop drives: an
/// initial command, a pure state transition, and a view. The core
/// never inspects the Model's fields — it is opaque.
pub trait Model: Send {
    /// The application's own message type. It must be constructible
    /// from both a decoded input [`Event`] and a loop [`Signal`], the
    /// two things the core itself can produce without the Model's
    /// help.
    type Message: From<Event> + From<Signal> + Send + 'static;

    /// Run once at startup, after modes are enabled and the initial
    /// `WindowSize` has been queried but before the first `view`.
    fn init(&mut self) -> Cmd<Self::Message> {
        Cmd::None
    }

    /// The only place the Model's state changes.
    fn update(&mut self, message: Self::Message) -> Cmd<Self::Message>;

    /// Render the current state to the string the renderer will diff
    /// against the last-committed frame.
    fn view(&self) -> String;
}

/// Builder-style startup configuration. Combines the Terminal
/// Controller's [`TerminalOptions`], the Renderer's [`RendererOptions`],
/// and the loop-level policy switches (`handle_interrupt`, `decoder`,
/// `filter`) that don't belong to either.
///
/// Generic over the application's message type solely to carry an
/// optional [`MessageFilter`]; everything else here is independent of
/// `M`. Defaults to `()` so `ProgramOptions::default()` still resolves
/// without an explicit type argument for callers that never install a
/// filter.
pub struct ProgramOptions<M = ()> {
    pub alt_screen: bool,
    pub mouse: bool,
    pub bracketed_paste: bool,
    pub focus_reports: bool,
    pub kitty_keyboard: bool,
    pub hide_cursor: bool,
    pub frame_rate_hz: u8,
    /// When false (the default), an unhandled `SIGINT` quits
    /// immediately, matching a plain terminal's Ctrl+C. When true, it
    /// is instead forwarded to `update` as `Signal::Interrupt` and the
    /// Model decides whether to quit.
    pub handle_interrupt: bool,
    pub decoder: DecoderOptions,
    /// Sees every candidate message before it reaches the inbox; see
    /// [`ProgramOptions::filter`].
    pub filter: Option<MessageFilter<M>>,
}

impl<M> fmt::Debug for ProgramOptions<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgramOptions")
            .field("alt_screen", &self.alt_screen)
            .field("mouse", &self.mouse)
            .field("bracketed_paste", &self.bracketed_paste)
            .field("focus_reports", &self.focus_reports)
            .field("kitty_keyboard", &self.kitty_keyboard)
            .field("hide_cursor", &self.hide_cursor)
            .field("frame_rate_hz", &self.frame_rate_hz)
            .field("handle_interrupt", &self.handle_interrupt)
            .field("decoder", &self.decoder)
            .field("filter", &self.filter.is_some())
            .finish()
    }
}

impl<M> Clone for ProgramOptions<M> {
    fn clone(&self) -> Self {
        Self {
            alt_screen: self.alt_screen,
            mouse: self.mouse,
            bracketed_paste: self.bracketed_paste,
            focus_reports: self.focus_reports,
            kitty_keyboard: self.kitty_keyboard,
            hide_cursor: self.hide_cursor,
            frame_rate_hz: self.frame_rate_hz,
            handle_interrupt: self.handle_interrupt,
            decoder: self.decoder.clone(),
            filter: self.filter.clone(),
        }
    }
}

impl<M> Default for ProgramOptions<M> {
    fn default() -> Self {
        Self {
            alt_screen: false,
            mouse: false,
            bracketed_paste: false,
            focus_reports: false,
            kitty_keyboard: false,
            hide_cursor: false,
            frame_rate_hz: 60,
            handle_interrupt: false,
            decoder: DecoderOptions::default(),
            filter: None,
        }
    }
}

impl<M> ProgramOptions<M> {
    pub fn alt_screen(mut self) -> Self {
        self.alt_screen = true;
        self
    }

    pub fn mouse(mut self) -> Self {
        self.mouse = true;
        self
    }

    pub fn bracketed_paste(mut self) -> Self {
        self.bracketed_paste = true;
        self
    }

    pub fn focus_reports(mut self) -> Self {
        self.focus_reports = true;
        self
    }

    pub fn kitty_keyboard(mut self) -> Self {
        self.kitty_keyboard = true;
        self
    }

    pub fn hide_cursor(mut self) -> Self {
        self.hide_cursor = true;
        self
    }

    pub fn frame_rate(mut self, hz: u8) -> Self {
        self.frame_rate_hz = hz;
        self
    }

    pub fn handle_interrupt(mut self) -> Self {
        self.handle_interrupt = true;
        self
    }

    pub fn decoder_options(mut self, options: DecoderOptions) -> Self {
        self.decoder = options;
        self
    }

    /// Install a hook that sees every candidate message before it
    /// reaches the event loop's inbox and may replace it, or drop it
    /// by returning `None`. Cannot drop `Message::Interrupt` once
    /// `handle_interrupt` is set — see [`MessageSender`].
    pub fn filter(
        mut self,
        filter: impl Fn(Message<M>) -> Option<Message<M>> + Send + Sync + 'static,
    ) -> Self {
        self.filter = Some(Arc::new(filter));
        self
    }

    fn terminal_options(&self) -> TerminalOptions {
        TerminalOptions {
            alt_screen: self.alt_screen,
            mouse: self.mouse,
            bracketed_paste: self.bracketed_paste,
            focus_reports: self.focus_reports,
            kitty_keyboard: self.kitty_keyboard,
            hide_cursor: self.hide_cursor,
        }
    }

    fn renderer_options(&self) -> RendererOptions {
        RendererOptions {
            frame_rate_hz: self.frame_rate_hz,
            alt_screen: self.alt_screen,
        }
    }
}

/// One output stream shared by the Terminal Controller and the
/// Renderer, serialized by a mutex so writes from either never
/// interleave.
struct SharedWriter<W: Write>(Arc<Mutex<W>>);

impl<W: Write> SharedWriter<W> {
    fn new(writer: W) -> Self {
        Self(Arc::new(Mutex::new(writer)))
    }
}

impl<W: Write> Clone for SharedWriter<W> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<W: Write> Write for SharedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.lock().unwrap().flush()
    }
}

/// Flatten a `MultiEvent` into the individual events it bundles (the
/// F3/cursor-position ambiguity is the only producer of these today),
/// recursively, so the loop's inbox never needs a bundling variant of
/// its own — mirroring the `Cmd`/`Message` split in `crate::message`.
fn flatten_event(event: Event) -> Vec<Event> {
    match event {
        Event::MultiEvent(events) => events.into_iter().flat_map(flatten_event).collect(),
        other => vec![other],
    }
}

#[cfg(unix)]
fn open_reader() -> io::Result<(Box<dyn wisp_reader::CancelableRead>, Arc<dyn wisp_reader::Cancel>)> {
    let (reader, canceler) = wisp_reader::open(0, false)?;
    Ok((Box::new(reader), Arc::new(canceler)))
}

#[cfg(windows)]
fn open_reader() -> io::Result<(Box<dyn wisp_reader::CancelableRead>, Arc<dyn wisp_reader::Cancel>)> {
    use std::os::windows::io::AsRawHandle;
    let handle = io::stdin().as_raw_handle();
    let (reader, canceler) = wisp_reader::open(handle, true)?;
    Ok((Box::new(reader), Arc::new(canceler)))
}

/// Spawn the reader task: blocking reads, fed
/// through a shared [`Decoder`], translated to `Message::User` and
/// pushed to `tx`. A companion thread periodically calls
/// [`Decoder::flush_timeout`] so a lone ESC is resolved even when no
/// further input ever arrives, without requiring the cancelable reader
/// itself to support a read timeout.
fn spawn_input_tasks<M>(
    mut reader: Box<dyn wisp_reader::CancelableRead>,
    decoder: Arc<Mutex<Decoder>>,
    tx: MessageSender<M>,
) -> thread::JoinHandle<()>
where
    M: From<Event> + Send + 'static,
{
    let esc_stop = Arc::new(AtomicBool::new(false));
    let esc_decoder = Arc::clone(&decoder);
    let esc_tx = tx.clone();
    let esc_stop_flag = Arc::clone(&esc_stop);
    let esc_thread = thread::spawn(move || {
        while !esc_stop_flag.load(Ordering::Relaxed) {
            thread::sleep(Duration::from_millis(50));
            if let Some(event) = esc_decoder.lock().unwrap().flush_timeout() {
                if esc_tx.send(Message::User(event.into())).is_err() {
                    return;
                }
            }
        }
    });

    thread::spawn(move || {
        let mut buf = [0u8; 1024];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => continue,
                Ok(n) => {
                    let events = decoder.lock().unwrap().feed(&buf[..n]);
                    for event in events {
                        for flat in flatten_event(event) {
                            if tx.send(Message::User(flat.into())).is_err() {
                                esc_stop.store(true, Ordering::Relaxed);
                                let _ = esc_thread.join();
                                if let Err(err) = reader.close() {
                                    #[cfg(feature = "tracing")]
                                    tracing::warn!(%err, "input reader failed to close");
                                    #[cfg(not(feature = "tracing"))]
                                    let _ = err;
                                }
                                return;
                            }
                        }
                    }
                }
                Err(Error::Cancel) => break,
                Err(_) => {
                    let _ = tx.send(Message::Quit);
                    break;
                }
            }
        }
        esc_stop.store(true, Ordering::Relaxed);
        let _ = esc_thread.join();
        if let Err(err) = reader.close() {
            #[cfg(feature = "tracing")]
            tracing::warn!(%err, "input reader failed to close");
            #[cfg(not(feature = "tracing"))]
            let _ = err;
        }
    })
}

/// Run `model` to completion against the real terminal: open raw
/// mode, drive the event loop, and tear everything down on
/// exit — returning the final Model so the caller can inspect it
/// (exit code, accumulated results) after the terminal is restored.
pub fn run<M>(
    mut model: M,
    writer: impl Write + Send + 'static,
    options: ProgramOptions<M::Message>,
) -> wisp_core::Result<M>
where
    M: Model,
{
    let (tx, rx) = mpsc::channel::<Message<M::Message>>();
    let tx = MessageSender::new(tx, options.filter.clone(), options.handle_interrupt);

    let shared_writer = SharedWriter::new(writer);

    #[cfg(unix)]
    let mut controller =
        TerminalController::open(0, 1, shared_writer.clone(), options.terminal_options())?;
    #[cfg(windows)]
    let mut controller = {
        use std::os::windows::io::AsRawHandle;
        TerminalController::open(
            io::stdin().as_raw_handle(),
            io::stdout().as_raw_handle(),
            shared_writer.clone(),
            options.terminal_options(),
        )?
    };

    let (initial_width, initial_height) = controller.window_size().unwrap_or((80, 24));
    let mut renderer = Renderer::new(
        shared_writer,
        initial_width,
        initial_height,
        options.renderer_options(),
    );

    let (reader, canceler) = open_reader().map_err(Error::Io)?;
    let decoder = Arc::new(Mutex::new(Decoder::new(options.decoder.clone())));
    let reader_thread = spawn_input_tasks(reader, decoder, tx.clone());

    #[cfg(unix)]
    let _signal_watcher = SignalWatcher::spawn(tx.clone(), terminal::query_window_size).ok();

    let _ = tx.send(Message::WindowSize {
        width: initial_width,
        height: initial_height,
    });

    let init_cmd = model.init();
    command::dispatch(init_cmd, tx.clone());

    renderer.write_frame(model.view());
    renderer.flush().map_err(Error::Io)?;

    let tick = renderer.tick_interval();
    loop {
        let message = match rx.recv_timeout(tick) {
            Ok(message) => message,
            Err(RecvTimeoutError::Timeout) => {
                renderer.flush().map_err(Error::Io)?;
                continue;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        };

        match message {
            Message::Quit => break,
            Message::Interrupt => {
                if options.handle_interrupt {
                    let cmd = model.update(Signal::Interrupt.into());
                    command::dispatch(cmd, tx.clone());
                } else {
                    break;
                }
            }
            Message::Hangup => {
                let cmd = model.update(Signal::Hangup.into());
                command::dispatch(cmd, tx.clone());
            }
            Message::Suspend => {
                let cmd = model.update(Signal::Suspend.into());
                command::dispatch(cmd, tx.clone());
                suspend_and_reacquire(&mut controller, &options)?;
                let cmd = model.update(Signal::Resume.into());
                command::dispatch(cmd, tx.clone());
            }
            Message::Resume => {
                let cmd = model.update(Signal::Resume.into());
                command::dispatch(cmd, tx.clone());
            }
            Message::PrintLine(line) => renderer.queue_print_above(line),
            Message::EnableMode(mode) => controller.enable_mode(mode)?,
            Message::DisableMode(mode) => controller.disable_mode(mode)?,
            Message::SetWindowTitle(title) => controller.set_window_title(&title)?,
            Message::ClearScreen => {
                controller.clear_screen()?;
                renderer.repaint();
            }
            Message::Repaint => renderer.repaint(),
            Message::RequestWindowSize => {
                let (width, height) = controller.window_size()?;
                let _ = tx.send(Message::WindowSize { width, height });
            }
            Message::WindowSize { width, height } => {
                renderer.resize(width, height);
                let cmd = model.update(Signal::WindowSize { width, height }.into());
                command::dispatch(cmd, tx.clone());
            }
            Message::Raw(bytes) => controller.write_raw(&bytes)?,
            Message::SetColor(target, color) => controller.set_color(target, color)?,
            Message::User(user_message) => {
                let cmd = model.update(user_message);
                command::dispatch(cmd, tx.clone());
            }
        }

        renderer.write_frame(model.view());
        renderer.flush().map_err(Error::Io)?;
    }

    shutdown(canceler, reader_thread, renderer, controller)?;
    Ok(model)
}

/// Release the terminal, signal the process group to stop, and
/// reacquire on resume — grounded on the `restore(); kill(SIGTSTP);
/// set_modes()` sequence used for suspend/resume in terminal
/// applications that manage raw mode by hand.
#[cfg(unix)]
fn suspend_and_reacquire<W: Write, M>(
    controller: &mut TerminalController<W>,
    options: &ProgramOptions<M>,
) -> wisp_core::Result<()> {
    controller.teardown()?;
    // SIGTSTP's default action stops every thread in the process; this
    // call does not return until a subsequent SIGCONT resumes it.
    unsafe {
        libc::kill(0, libc::SIGTSTP);
    }
    controller.reacquire(options.terminal_options())
}

/// Windows has no `SIGTSTP`/`SIGCONT` equivalent, so `Suspend` is a
/// no-op beyond the `Signal::Suspend`/`Signal::Resume` pair already
/// delivered to the Model.
#[cfg(windows)]
fn suspend_and_reacquire<W: Write, M>(
    _controller: &mut TerminalController<W>,
    _options: &ProgramOptions<M>,
) -> wisp_core::Result<()> {
    Ok(())
}

/// Bounded, idempotent shutdown: cancel the reader, wait up to
/// 500ms for it to notice, flush the final frame, then disable every
/// mode in reverse order and restore raw mode (via `TerminalController`'s
/// own `teardown`/`Drop`).
fn shutdown<W: Write>(
    canceler: Arc<dyn wisp_reader::Cancel>,
    reader_thread: thread::JoinHandle<()>,
    mut renderer: Renderer<W>,
    mut controller: TerminalController<W>,
) -> wisp_core::Result<()> {
    canceler.cancel();
    let deadline = Instant::now() + Duration::from_millis(500);
    while !reader_thread.is_finished() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    if reader_thread.is_finished() {
        let _ = reader_thread.join();
    }

    renderer.flush().map_err(Error::Io)?;
    controller.teardown()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum TestMessage {
        Input(Event),
        Lifecycle(Signal),
        Increment,
    }

    impl From<Event> for TestMessage {
        fn from(event: Event) -> Self {
            TestMessage::Input(event)
        }
    }

    impl From<Signal> for TestMessage {
        fn from(signal: Signal) -> Self {
            TestMessage::Lifecycle(signal)
        }
    }

    struct Counter {
        count: u32,
    }

    impl Model for Counter {
        type Message = TestMessage;

        fn update(&mut self, message: Self::Message) -> Cmd<Self::Message> {
            if matches!(message, TestMessage::Increment) {
                self.count += 1;
            }
            Cmd::None
        }

        fn view(&self) -> String {
            self.count.to_string()
        }
    }

    #[test]
    fn flatten_event_recurses_into_nested_multi_events() {
        let nested = Event::MultiEvent(vec![
            Event::Focus,
            Event::MultiEvent(vec![Event::Blur, Event::PasteStart]),
        ]);
        let flat = flatten_event(nested);
        assert_eq!(flat, vec![Event::Focus, Event::Blur, Event::PasteStart]);
    }

    #[test]
    fn flatten_event_passes_through_non_multi_events() {
        let flat = flatten_event(Event::Focus);
        assert_eq!(flat, vec![Event::Focus]);
    }

    #[test]
    fn model_update_mutates_only_through_update() {
        let mut counter = Counter { count: 0 };
        assert_eq!(counter.view(), "0");
        counter.update(TestMessage::Increment);
        assert_eq!(counter.view(), "1");
    }

    #[test]
    fn program_options_builder_sets_requested_flags() {
        let options = ProgramOptions::default()
            .alt_screen()
            .mouse()
            .frame_rate(30)
            .handle_interrupt();
        assert!(options.alt_screen);
        assert!(options.mouse);
        assert!(!options.bracketed_paste);
        assert_eq!(options.frame_rate_hz, 30);
        assert!(options.handle_interrupt);
    }

    #[test]
    fn shared_writer_clones_see_each_others_writes() {
        let mut a = SharedWriter::new(Vec::<u8>::new());
        let mut b = a.clone();
        a.write_all(b"hello").unwrap();
        b.write_all(b" world").unwrap();
        let buf = a.0.lock().unwrap();
        assert_eq!(&**buf, b"hello world");
    }
}
