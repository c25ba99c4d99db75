//! Windows console cancelable reader, using `CancelIoEx` to interrupt
//! a pending `ReadConsoleInputW`/`ReadFile` call from another thread.

use std::os::windows::io::RawHandle;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use windows_sys::Win32::Foundation::HANDLE;
use windows_sys::Win32::Storage::FileSystem::ReadFile;
use windows_sys::Win32::System::IO::{CancelIoEx, OVERLAPPED};

use wisp_core::{Error, Result};

use crate::{Cancel, CancelableRead};

/// A cancelable reader over a Windows console input handle.
///
/// `handle` is borrowed from the terminal controller, which owns its
/// lifetime; this reader never closes it.
pub struct WindowsReader {
    handle: HANDLE,
    canceled: Arc<AtomicBool>,
    /// `false` when `CancelIoEx` is unavailable for this handle (a
    /// non-console input); reads still short-circuit on future calls
    /// after cancellation, matching the best-effort fallback.
    can_interrupt: bool,
}

unsafe impl Send for WindowsReader {}

/// A handle that interrupts a blocked [`WindowsReader::read`].
#[derive(Clone)]
pub struct Canceler {
    handle: HANDLE,
    canceled: Arc<AtomicBool>,
    can_interrupt: bool,
}

unsafe impl Send for Canceler {}
unsafe impl Sync for Canceler {}

impl Cancel for Canceler {
    fn cancel(&self) -> bool {
        self.canceled.store(true, Ordering::SeqCst);
        #[cfg(feature = "tracing")]
        tracing::debug!(can_interrupt = self.can_interrupt, "reader cancel requested");
        if self.can_interrupt {
            unsafe {
                CancelIoEx(self.handle, std::ptr::null());
            }
        }
        self.can_interrupt
    }
}

/// Open a cancelable reader over a raw console input handle.
///
/// `can_interrupt` should be `true` for a real console input handle
/// (where `CancelIoEx` reliably interrupts a pending read) and
/// `false` for a redirected, non-console input, where cancellation
/// can only set the best-effort flag.
pub fn open(handle: RawHandle, can_interrupt: bool) -> std::io::Result<(WindowsReader, Canceler)> {
    let handle = handle as HANDLE;
    let canceled = Arc::new(AtomicBool::new(false));
    let reader = WindowsReader {
        handle,
        canceled: Arc::clone(&canceled),
        can_interrupt,
    };
    let canceler = Canceler {
        handle,
        canceled,
        can_interrupt,
    };
    Ok((reader, canceler))
}

impl CancelableRead for WindowsReader {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.canceled.load(Ordering::SeqCst) {
            return Err(Error::Cancel);
        }

        let mut overlapped: OVERLAPPED = unsafe { std::mem::zeroed() };
        let mut read = 0u32;
        let ok = unsafe {
            ReadFile(
                self.handle,
                buf.as_mut_ptr(),
                buf.len() as u32,
                &mut read,
                &mut overlapped,
            )
        };

        if self.canceled.load(Ordering::SeqCst) {
            return Err(Error::Cancel);
        }

        if ok == 0 {
            let err = std::io::Error::last_os_error();
            // ERROR_OPERATION_ABORTED: CancelIoEx interrupted us.
            if err.raw_os_error() == Some(995) {
                return Err(Error::Cancel);
            }
            return Err(Error::Io(err));
        }

        Ok(read as usize)
    }

    fn close(self: Box<Self>) -> Result<()> {
        // `handle` is borrowed from the terminal controller; this
        // reader never owned it and so has nothing to close.
        Ok(())
    }
}
