//! Fatal paths and async-signal-safe output.
//!
//! Inside a fault handler only async-signal-safe functions may be called:
//! no `tracing`, no `println!`, no allocation. Text is formatted into a
//! fixed [`StackBuffer`] with `core::fmt` and written with `write(2)`.

use std::fmt::{self, Write as _};

use tracing::error;

use crate::error::FaultError;

/// Fixed-capacity formatting buffer on the stack
///
/// Output past the capacity is dropped rather than reported as an error, so a
/// long line is truncated instead of cut off at the first oversized argument.
pub(crate) struct StackBuffer<const N: usize>
{
    buf: [u8; N],
    len: usize,
}

impl<const N: usize> StackBuffer<N>
{
    pub(crate) const fn new() -> Self
    {
        Self { buf: [0; N], len: 0 }
    }

    pub(crate) fn as_bytes(&self) -> &[u8]
    {
        &self.buf[..self.len]
    }
}

impl<const N: usize> fmt::Write for StackBuffer<N>
{
    fn write_str(&mut self, s: &str) -> fmt::Result
    {
        let room = N - self.len;
        let take = s.len().min(room);
        self.buf[self.len..self.len + take].copy_from_slice(&s.as_bytes()[..take]);
        self.len += take;
        Ok(())
    }
}

/// Write all of `bytes` to stderr with `write(2)`, ignoring errors.
pub(crate) fn write_stderr(mut bytes: &[u8])
{
    while !bytes.is_empty() {
        // SAFETY: `bytes` is a valid readable buffer of the given length.
        let written = unsafe { libc::write(libc::STDERR_FILENO, bytes.as_ptr().cast(), bytes.len()) };
        if written <= 0 {
            if written < 0 && std::io::Error::last_os_error().kind() == std::io::ErrorKind::Interrupted {
                continue;
            }
            return;
        }
        bytes = &bytes[written as usize..];
    }
}

/// Abort from inside a fault handler.
///
/// Only async-signal-safe operations: format into a stack buffer, `write(2)`,
/// `abort(3)`.
pub(crate) fn signal_abort(args: fmt::Arguments<'_>) -> !
{
    let mut line = StackBuffer::<256>::new();
    let _ = line.write_str("faultline: fatal: ");
    let _ = line.write_fmt(args);
    let _ = line.write_str("\n");
    write_stderr(line.as_bytes());
    // SAFETY: abort is async-signal-safe and never returns.
    unsafe { libc::abort() }
}

/// Abort after a violated registration invariant, outside of dispatch.
pub(crate) fn abort_on(err: &FaultError) -> !
{
    error!(error = %err, "fault handler invariant violated, aborting");
    eprintln!("faultline: fatal: {err}");
    std::process::abort()
}
