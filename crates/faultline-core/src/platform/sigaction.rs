//! # `sigaction(2)` Backend
//!
//! [`SignalBackend`] implementation that talks to the kernel.
//!
//! ## References
//!
//! - [sigaction(2) man page](https://man7.org/linux/man-pages/man2/sigaction.2.html)

use std::mem::MaybeUninit;
use std::ptr;

use libc::c_int;
use tracing::trace;

use crate::error::{FaultError, FaultResult};
use crate::registry::SignalBackend;
use crate::types::SignalAction;

/// Process-wide signal dispositions via `sigaction(2)`
#[derive(Debug, Default, Clone, Copy)]
pub struct PosixSignals;

impl PosixSignals
{
    fn raw_action(action: &SignalAction) -> libc::sigaction
    {
        // SAFETY: `sigaction` is plain old data; all-zero is a valid value
        // (SIG_DFL, empty flags) on every supported platform.
        let mut raw: libc::sigaction = unsafe { std::mem::zeroed() };
        raw.sa_sigaction = action.handler;
        raw.sa_flags = action.flags;
        // SAFETY: sa_mask is a valid, owned sigset_t.
        unsafe {
            libc::sigemptyset(&mut raw.sa_mask);
        }
        raw
    }

    fn from_raw(raw: &libc::sigaction) -> SignalAction
    {
        SignalAction {
            handler: raw.sa_sigaction,
            flags: raw.sa_flags,
        }
    }
}

impl SignalBackend for PosixSignals
{
    fn query(&self, signal: c_int) -> FaultResult<SignalAction>
    {
        let mut old = MaybeUninit::<libc::sigaction>::zeroed();
        // SAFETY: a null `act` only queries; `old` is writable.
        let rc = unsafe { libc::sigaction(signal, ptr::null(), old.as_mut_ptr()) };
        if rc == -1 {
            return Err(FaultError::last_os_error("sigaction", signal));
        }
        // SAFETY: the kernel filled `old` on success.
        let old = unsafe { old.assume_init() };
        Ok(Self::from_raw(&old))
    }

    fn swap(&self, signal: c_int, action: &SignalAction) -> FaultResult<SignalAction>
    {
        let new = Self::raw_action(action);
        let mut old = MaybeUninit::<libc::sigaction>::zeroed();
        // SAFETY: both pointers reference live sigaction values.
        let rc = unsafe { libc::sigaction(signal, &new, old.as_mut_ptr()) };
        if rc == -1 {
            return Err(FaultError::last_os_error("sigaction", signal));
        }
        // SAFETY: the kernel filled `old` on success.
        let old = unsafe { old.assume_init() };
        let previous = Self::from_raw(&old);
        trace!(signal, %previous, installed = %action, "sigaction swap");
        Ok(previous)
    }
}
