//! Unix cancelable reader: the self-pipe trick, waited on with
//! whichever kernel readiness primitive the target offers.
//!
//! This module intentionally does not carry `#![forbid(unsafe_code)]`
//! — every wait strategy below is a thin wrapper around a handful of
//! `libc` syscalls that have no safe equivalent.

use std::io;
use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use wisp_core::error::CloseErrors;
use wisp_core::{Error, Result};

use crate::{Cancel, CancelableRead};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    #[cfg(target_os = "linux")]
    Epoll,
    #[cfg(any(
        target_os = "macos",
        target_os = "freebsd",
        target_os = "netbsd",
        target_os = "openbsd",
        target_os = "dragonfly"
    ))]
    Kqueue,
    Select,
    FlagOnly,
}

enum WaitOutcome {
    TtyReady,
    PipeOnly,
}

struct PipeFds {
    read_fd: RawFd,
    write_fd: RawFd,
    /// Set once either `UnixReader::close` or `Drop` has attempted to
    /// close these fds, so whichever runs second is a no-op rather than
    /// a double close.
    closed: AtomicBool,
}

impl PipeFds {
    /// Close both ends of the pipe exactly once, however many times
    /// this is called. Returns any failures observed on that one
    /// attempt; later calls return an empty list.
    fn close_once(&self) -> Vec<io::Error> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Vec::new();
        }
        let mut errors = Vec::new();
        for fd in [self.read_fd, self.write_fd] {
            if unsafe { libc::close(fd) } != 0 {
                errors.push(io::Error::last_os_error());
            }
        }
        errors
    }
}

impl Drop for PipeFds {
    fn drop(&mut self) {
        let errors = self.close_once();
        #[cfg(feature = "tracing")]
        if !errors.is_empty() {
            tracing::warn!(count = errors.len(), "pipe fd(s) failed to close on drop");
        }
        #[cfg(not(feature = "tracing"))]
        let _ = errors;
    }
}

/// A cancelable reader over a Unix file descriptor (normally a TTY).
pub struct UnixReader {
    fd: RawFd,
    pipe: Arc<PipeFds>,
    canceled: Arc<AtomicBool>,
    strategy: Strategy,
    /// The epoll or kqueue instance, owned solely by this reader and
    /// registered once in `open`.
    poll_fd: Option<RawFd>,
}

impl Drop for UnixReader {
    fn drop(&mut self) {
        if let Some(poll_fd) = self.poll_fd.take() {
            unsafe {
                libc::close(poll_fd);
            }
        }
        let _ = self.pipe.close_once();
    }
}

/// A handle that interrupts a blocked [`UnixReader::read`].
#[derive(Clone)]
pub struct Canceler {
    pipe: Arc<PipeFds>,
    canceled: Arc<AtomicBool>,
    can_interrupt: bool,
}

impl Cancel for Canceler {
    fn cancel(&self) -> bool {
        self.canceled.store(true, Ordering::SeqCst);
        #[cfg(feature = "tracing")]
        tracing::debug!(can_interrupt = self.can_interrupt, "reader cancel requested");
        if self.can_interrupt {
            const WAKE: &[u8] = b"\0";
            unsafe {
                loop {
                    let n = libc::write(
                        self.pipe.write_fd,
                        WAKE.as_ptr().cast(),
                        WAKE.len(),
                    );
                    if n >= 0 {
                        break;
                    }
                    let err = io::Error::last_os_error();
                    match err.raw_os_error() {
                        Some(libc::EINTR) => continue,
                        // EAGAIN: the pipe is already primed with a
                        // pending wake byte, which is sufficient.
                        Some(libc::EAGAIN) => break,
                        _ => break,
                    }
                }
            }
        }
        self.can_interrupt
    }
}

/// Open a cancelable reader over `fd`.
///
/// `is_dev_tty` should be `true` when `fd` refers to `/dev/tty`
/// specifically: on BSD-family kernels the kqueue readiness primitive
/// can return immediately for that special path, so the select
/// strategy is used there instead.
pub fn open(fd: RawFd, is_dev_tty: bool) -> io::Result<(UnixReader, Canceler)> {
    let (read_fd, write_fd) = make_pipe()?;
    let pipe = Arc::new(PipeFds {
        read_fd,
        write_fd,
        closed: AtomicBool::new(false),
    });
    let canceled = Arc::new(AtomicBool::new(false));

    let (strategy, poll_fd) = select_strategy(fd, read_fd, is_dev_tty)?;
    let can_interrupt = !matches!(strategy, Strategy::FlagOnly);

    let reader = UnixReader {
        fd,
        pipe: Arc::clone(&pipe),
        canceled: Arc::clone(&canceled),
        strategy,
        poll_fd,
    };
    let canceler = Canceler {
        pipe,
        canceled,
        can_interrupt,
    };
    Ok((reader, canceler))
}

fn make_pipe() -> io::Result<(RawFd, RawFd)> {
    let mut fds = [0 as RawFd; 2];
    let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    set_nonblocking(fds[0])?;
    set_nonblocking(fds[1])?;
    Ok((fds[0], fds[1]))
}

fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL, 0);
        if flags < 0 {
            return Err(io::Error::last_os_error());
        }
        if libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) < 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

#[cfg(target_os = "linux")]
fn select_strategy(
    fd: RawFd,
    pipe_read: RawFd,
    _is_dev_tty: bool,
) -> io::Result<(Strategy, Option<RawFd>)> {
    let epfd = unsafe { libc::epoll_create1(0) };
    if epfd < 0 {
        return Err(io::Error::last_os_error());
    }
    register_epoll(epfd, fd, 0)?;
    register_epoll(epfd, pipe_read, 1)?;
    Ok((Strategy::Epoll, Some(epfd)))
}

#[cfg(target_os = "linux")]
fn register_epoll(epfd: RawFd, fd: RawFd, tag: u64) -> io::Result<()> {
    let mut ev = libc::epoll_event {
        events: libc::EPOLLIN as u32,
        u64: tag,
    };
    let rc = unsafe { libc::epoll_ctl(epfd, libc::EPOLL_CTL_ADD, fd, &mut ev) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(any(
    target_os = "macos",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly"
))]
fn select_strategy(
    fd: RawFd,
    pipe_read: RawFd,
    is_dev_tty: bool,
) -> io::Result<(Strategy, Option<RawFd>)> {
    if is_dev_tty {
        return select_fallback_strategy(fd, pipe_read);
    }
    let kq = unsafe { libc::kqueue() };
    if kq < 0 {
        return Err(io::Error::last_os_error());
    }
    let changes = [
        kevent_read(fd, 0),
        kevent_read(pipe_read, 1),
    ];
    let rc = unsafe {
        libc::kevent(
            kq,
            changes.as_ptr(),
            changes.len() as i32,
            std::ptr::null_mut(),
            0,
            std::ptr::null(),
        )
    };
    if rc < 0 {
        let err = io::Error::last_os_error();
        unsafe {
            libc::close(kq);
        }
        return Err(err);
    }
    Ok((Strategy::Kqueue, Some(kq)))
}

#[cfg(any(
    target_os = "macos",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly"
))]
fn kevent_read(ident: RawFd, udata: isize) -> libc::kevent {
    libc::kevent {
        ident: ident as usize,
        filter: libc::EVFILT_READ,
        flags: libc::EV_ADD | libc::EV_ENABLE,
        fflags: 0,
        data: 0,
        udata: udata as *mut libc::c_void,
    }
}

#[cfg(not(any(target_os = "linux")))]
fn select_fallback_strategy(fd: RawFd, _pipe_read: RawFd) -> io::Result<(Strategy, Option<RawFd>)> {
    if fd >= libc::FD_SETSIZE as RawFd {
        return Ok((Strategy::FlagOnly, None));
    }
    Ok((Strategy::Select, None))
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "macos",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly"
)))]
fn select_strategy(
    fd: RawFd,
    pipe_read: RawFd,
    _is_dev_tty: bool,
) -> io::Result<(Strategy, Option<RawFd>)> {
    select_fallback_strategy(fd, pipe_read)
}

impl UnixReader {
    fn wait(&self) -> io::Result<WaitOutcome> {
        match self.strategy {
            #[cfg(target_os = "linux")]
            Strategy::Epoll => self.wait_epoll(),
            #[cfg(any(
                target_os = "macos",
                target_os = "freebsd",
                target_os = "netbsd",
                target_os = "openbsd",
                target_os = "dragonfly"
            ))]
            Strategy::Kqueue => self.wait_kqueue(),
            Strategy::Select => self.wait_select(),
            Strategy::FlagOnly => Ok(WaitOutcome::TtyReady),
        }
    }

    #[cfg(target_os = "linux")]
    fn wait_epoll(&self) -> io::Result<WaitOutcome> {
        let epfd = self.poll_fd.expect("epoll strategy always has a poll_fd");
        let mut events: [libc::epoll_event; 2] = unsafe { std::mem::zeroed() };
        loop {
            let rc = unsafe { libc::epoll_wait(epfd, events.as_mut_ptr(), 2, -1) };
            if rc < 0 {
                let err = io::Error::last_os_error();
                if err.raw_os_error() == Some(libc::EINTR) {
                    continue;
                }
                return Err(err);
            }
            let mut tty_ready = false;
            for ev in &events[..rc as usize] {
                if ev.u64 == 0 {
                    tty_ready = true;
                }
            }
            return Ok(if tty_ready {
                WaitOutcome::TtyReady
            } else {
                WaitOutcome::PipeOnly
            });
        }
    }

    #[cfg(any(
        target_os = "macos",
        target_os = "freebsd",
        target_os = "netbsd",
        target_os = "openbsd",
        target_os = "dragonfly"
    ))]
    fn wait_kqueue(&self) -> io::Result<WaitOutcome> {
        let kq = self.poll_fd.expect("kqueue strategy always has a poll_fd");
        let mut events: [libc::kevent; 2] = unsafe { std::mem::zeroed() };
        loop {
            let rc = unsafe {
                libc::kevent(
                    kq,
                    std::ptr::null(),
                    0,
                    events.as_mut_ptr(),
                    2,
                    std::ptr::null(),
                )
            };
            if rc < 0 {
                let err = io::Error::last_os_error();
                if err.raw_os_error() == Some(libc::EINTR) {
                    continue;
                }
                return Err(err);
            }
            let mut tty_ready = false;
            for ev in &events[..rc as usize] {
                if (ev.udata as isize) == 0 {
                    tty_ready = true;
                }
            }
            return Ok(if tty_ready {
                WaitOutcome::TtyReady
            } else {
                WaitOutcome::PipeOnly
            });
        }
    }

    fn wait_select(&self) -> io::Result<WaitOutcome> {
        let tty_fd = self.fd;
        let pipe_fd = self.pipe.read_fd;
        let max_fd = tty_fd.max(pipe_fd) + 1;
        loop {
            let mut read_set: libc::fd_set = unsafe { std::mem::zeroed() };
            unsafe {
                libc::FD_ZERO(&mut read_set);
                libc::FD_SET(tty_fd, &mut read_set);
                libc::FD_SET(pipe_fd, &mut read_set);
            }
            let rc = unsafe {
                libc::select(
                    max_fd,
                    &mut read_set,
                    std::ptr::null_mut(),
                    std::ptr::null_mut(),
                    std::ptr::null_mut(),
                )
            };
            if rc < 0 {
                let err = io::Error::last_os_error();
                if err.raw_os_error() == Some(libc::EINTR) {
                    continue;
                }
                return Err(err);
            }
            let tty_ready = unsafe { libc::FD_ISSET(tty_fd, &read_set) };
            return Ok(if tty_ready {
                WaitOutcome::TtyReady
            } else {
                WaitOutcome::PipeOnly
            });
        }
    }

    fn drain_pipe(&self) {
        let mut buf = [0u8; 64];
        loop {
            let n = unsafe {
                libc::read(self.pipe.read_fd, buf.as_mut_ptr().cast(), buf.len())
            };
            if n <= 0 {
                break;
            }
        }
    }
}

impl CancelableRead for UnixReader {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        loop {
            if self.canceled.load(Ordering::SeqCst) {
                self.drain_pipe();
                return Err(Error::Cancel);
            }

            match self.wait() {
                Ok(WaitOutcome::PipeOnly) => {
                    if self.canceled.load(Ordering::SeqCst) {
                        self.drain_pipe();
                        return Err(Error::Cancel);
                    }
                    // Spurious wake with no cancel observed yet; wait again.
                    continue;
                }
                Ok(WaitOutcome::TtyReady) => {}
                Err(err) => return Err(Error::Io(err)),
            }

            if self.canceled.load(Ordering::SeqCst) {
                self.drain_pipe();
                return Err(Error::Cancel);
            }

            let n = unsafe { libc::read(self.fd, buf.as_mut_ptr().cast(), buf.len()) };
            if n > 0 {
                return Ok(n as usize);
            }
            if n == 0 {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "terminal input closed",
                )));
            }
            let err = io::Error::last_os_error();
            match err.raw_os_error() {
                Some(libc::EINTR) | Some(libc::EAGAIN) => continue,
                _ => return Err(Error::Io(err)),
            }
        }
    }

    fn close(mut self: Box<Self>) -> Result<()> {
        let mut errors = Vec::new();
        if let Some(poll_fd) = self.poll_fd.take() {
            if unsafe { libc::close(poll_fd) } != 0 {
                errors.push(io::Error::last_os_error());
            }
        }
        errors.extend(self.pipe.close_once());
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Close(CloseErrors(errors)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_reader_over_a_pipe() -> (RawFd, UnixReader, Canceler) {
        // `write_fd` is intentionally never closed here so the read end
        // never observes EOF while the reader under test is alive.
        let (read_fd, _write_fd) = make_pipe().expect("pipe");
        let (reader, canceler) = open(read_fd, false).expect("open reader");
        (read_fd, reader, canceler)
    }

    #[test]
    fn close_reports_no_errors_for_a_healthy_reader() {
        let (_fd, reader, _canceler) = open_reader_over_a_pipe();
        let reader: Box<dyn CancelableRead> = Box::new(reader);
        assert!(reader.close().is_ok());
    }

    #[test]
    fn pipe_close_once_is_idempotent() {
        let pipe = PipeFds {
            read_fd: -1,
            write_fd: -1,
            closed: AtomicBool::new(false),
        };
        let first = pipe.close_once();
        let second = pipe.close_once();
        assert!(!first.is_empty());
        assert!(second.is_empty());
    }

    #[test]
    fn explicit_close_leaves_drop_with_nothing_left_to_do() {
        let (_fd, reader, canceler) = open_reader_over_a_pipe();
        let reader: Box<dyn CancelableRead> = Box::new(reader);
        assert!(reader.close().is_ok());
        // The canceler still holds a clone of the (now closed) pipe Arc;
        // dropping it must not double-close or panic.
        drop(canceler);
    }
}
