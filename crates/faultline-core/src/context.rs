//! # Fault Context Access
//!
//! Narrow, borrow-checked access to the OS-owned state handed to a fault
//! handler:
//!
//! - [`read_faulting_address`] / [`read_fault_metadata`] read `siginfo_t`.
//! - [`ExecutionContext`] wraps the saved `ucontext_t` for one dispatch.
//! - [`InstructionPointerView`] is the only way to touch the saved program
//!   counter. It borrows the context mutably, so there is exactly one view at
//!   a time, and its write consumes it, so there is at most one write per view.
//!
//! Nothing here allocates, locks or logs: all of it runs inside the signal
//! handler.

use std::ffi::c_void;
use std::fmt;
use std::marker::PhantomData;

use libc::c_int;

use crate::constants;
use crate::platform;
use crate::types::{Address, FaultKind, FaultMetadata};

/// Read the faulting address from `info`.
///
/// Always `Some` for address-bearing signals, including when the kernel
/// reported the null address.
///
/// # Panics
///
/// Panics if `signal` is not address-bearing (see
/// [`constants::is_address_bearing`]). Asking for `si_addr` of such a signal
/// is a bug in the caller, not a runtime condition.
pub fn read_faulting_address(signal: c_int, info: &libc::siginfo_t) -> Option<Address>
{
    assert!(
        constants::is_address_bearing(signal),
        "si_addr is only defined for SIGILL, SIGFPE, SIGSEGV, SIGBUS and SIGTRAP (got signal {signal})"
    );
    // SAFETY: the assertion above guarantees si_addr is the active member.
    let raw = unsafe { platform::fault_address(info) };
    Some(Address::from_ptr(raw))
}

/// Build the immutable metadata record for one fault.
///
/// Returns `None` if `signal` is not one of the [`FaultKind`] signals.
pub fn read_fault_metadata(signal: c_int, info: &libc::siginfo_t) -> Option<FaultMetadata>
{
    let kind = FaultKind::from_signal(signal)?;
    let faulting_address = if kind.carries_address() {
        read_faulting_address(signal, info)
    } else {
        None
    };

    Some(FaultMetadata {
        kind,
        signal,
        faulting_address,
        cause_code: info.si_code,
        errno: info.si_errno,
    })
}

/// Borrowed view of the saved execution context of a faulting thread
///
/// The lifetime ties the wrapper to the dispatch that delivered the context;
/// it can neither be stored nor outlive the handler call.
pub struct ExecutionContext<'a>
{
    raw: *mut libc::ucontext_t,
    _context: PhantomData<&'a mut libc::ucontext_t>,
}

impl<'a> ExecutionContext<'a>
{
    /// Wrap the third argument of an `SA_SIGINFO` handler.
    ///
    /// Returns `None` for a null pointer.
    ///
    /// # Safety
    ///
    /// `ucontext` must be the context delivered for the current dispatch (or
    /// an equivalently initialized `ucontext_t`), valid and writable for `'a`.
    pub unsafe fn from_raw(ucontext: *mut c_void) -> Option<Self>
    {
        if ucontext.is_null() {
            return None;
        }
        Some(Self {
            raw: ucontext.cast::<libc::ucontext_t>(),
            _context: PhantomData,
        })
    }

    /// Wrap a `ucontext_t` reference.
    ///
    /// # Safety
    ///
    /// On macOS, `uc_mcontext` must point to a live machine context.
    pub unsafe fn new(context: &'a mut libc::ucontext_t) -> Self
    {
        Self {
            raw: context,
            _context: PhantomData,
        }
    }

    /// Take the exclusive view of the saved instruction pointer.
    pub fn instruction_pointer(&mut self) -> InstructionPointerView<'_>
    {
        // SAFETY: `raw` is valid and writable for 'a per the constructors,
        // and the returned borrow of `self` keeps the slot exclusive.
        let slot = unsafe { &mut *platform::program_counter_slot(self.raw) };
        InstructionPointerView { slot }
    }
}

impl fmt::Debug for ExecutionContext<'_>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("ExecutionContext").field("raw", &self.raw).finish()
    }
}

/// Exclusive handle on the saved program counter
///
/// Whatever is written through the view before the handler returns is the
/// address the OS resumes the thread at.
#[derive(Debug)]
pub struct InstructionPointerView<'ctx>
{
    slot: &'ctx mut u64,
}

impl InstructionPointerView<'_>
{
    /// Current saved instruction pointer
    pub fn get(&self) -> Address
    {
        Address::new(*self.slot)
    }

    /// Store `address` as the resume point. Returns the written value.
    pub fn write(self, address: Address) -> Address
    {
        *self.slot = address.value();
        address
    }

    /// Add `delta` bytes to the saved instruction pointer. Returns the new value.
    pub fn advance(self, delta: i64) -> Address
    {
        let next = self.get().wrapping_offset(delta);
        self.write(next)
    }
}

#[cfg(all(test, target_os = "linux"))]
mod tests
{
    use super::*;

    fn zeroed_context() -> Box<libc::ucontext_t>
    {
        // SAFETY: ucontext_t is plain old data on Linux.
        Box::new(unsafe { std::mem::zeroed() })
    }

    #[test]
    fn test_view_reads_and_writes_the_pc_slot()
    {
        let mut uc = zeroed_context();
        // SAFETY: the slot belongs to `uc`.
        unsafe { *platform::program_counter_slot(&mut *uc) = 0x4000 };

        // SAFETY: Linux contexts embed the machine context.
        let mut context = unsafe { ExecutionContext::new(&mut uc) };
        assert_eq!(context.instruction_pointer().get(), Address::new(0x4000));
        assert_eq!(context.instruction_pointer().advance(1), Address::new(0x4001));
        assert_eq!(context.instruction_pointer().get(), Address::new(0x4001));
    }

    #[test]
    fn test_advance_is_signed()
    {
        let mut uc = zeroed_context();
        // SAFETY: Linux contexts embed the machine context.
        let mut context = unsafe { ExecutionContext::new(&mut uc) };
        context.instruction_pointer().write(Address::new(0x10));
        assert_eq!(context.instruction_pointer().advance(-4), Address::new(0xc));
    }

    #[test]
    fn test_null_context_is_rejected()
    {
        // SAFETY: null is explicitly handled.
        assert!(unsafe { ExecutionContext::from_raw(std::ptr::null_mut()) }.is_none());
    }
}
