//! Linux `ucontext_t` / `siginfo_t` access.
//!
//! The kernel writes the interrupted register file into the signal frame as
//! part of `ucontext_t`. On `rt_sigreturn` it reloads every register from
//! that frame, so a store into the saved program counter before the handler
//! returns decides where the thread resumes.

use std::ffi::c_void;
#[cfg(target_arch = "x86_64")]
use std::mem::{offset_of, size_of};
#[cfg(target_arch = "aarch64")]
use std::mem::offset_of;
use std::ptr::addr_of_mut;

use super::ProgramCounterLayout;

#[cfg(target_arch = "x86_64")]
pub(crate) const PROGRAM_COUNTER: ProgramCounterLayout = ProgramCounterLayout {
    register: "rip",
    location: "uc_mcontext.gregs[REG_RIP]",
};

#[cfg(target_arch = "aarch64")]
pub(crate) const PROGRAM_COUNTER: ProgramCounterLayout = ProgramCounterLayout {
    register: "pc",
    location: "uc_mcontext.pc",
};

/// Offset of the saved RIP from the start of the signal frame's `ucontext_t`
/// (`struct ucontext` + `struct sigcontext` in the x86_64 kernel ABI).
#[cfg(target_arch = "x86_64")]
const SAVED_RIP_OFFSET: usize = 0xa8;

#[cfg(target_arch = "x86_64")]
const _: () = {
    assert!(size_of::<libc::greg_t>() == size_of::<u64>());
    assert!(
        offset_of!(libc::ucontext_t, uc_mcontext)
            + offset_of!(libc::mcontext_t, gregs)
            + libc::REG_RIP as usize * size_of::<libc::greg_t>()
            == SAVED_RIP_OFFSET
    );
};

// fault_address, regs[31], sp, then pc
#[cfg(target_arch = "aarch64")]
const _: () = assert!(offset_of!(libc::mcontext_t, pc) == 8 + 31 * 8 + 8);

/// Pointer to the saved program counter inside `uc`.
///
/// # Safety
///
/// `uc` must point to a live, writable `ucontext_t`.
#[cfg(target_arch = "x86_64")]
pub(crate) unsafe fn program_counter_slot(uc: *mut libc::ucontext_t) -> *mut u64
{
    // SAFETY: caller guarantees `uc` is valid; REG_RIP is in bounds of gregs.
    unsafe { addr_of_mut!((*uc).uc_mcontext.gregs[libc::REG_RIP as usize]).cast::<u64>() }
}

/// Pointer to the saved program counter inside `uc`.
///
/// # Safety
///
/// `uc` must point to a live, writable `ucontext_t`.
#[cfg(target_arch = "aarch64")]
pub(crate) unsafe fn program_counter_slot(uc: *mut libc::ucontext_t) -> *mut u64
{
    // SAFETY: caller guarantees `uc` is valid.
    unsafe { addr_of_mut!((*uc).uc_mcontext.pc).cast::<u64>() }
}

/// Raw `si_addr` of `info`.
///
/// # Safety
///
/// `info` must describe an address-bearing signal, otherwise the union member
/// read here is unrelated data.
pub(crate) unsafe fn fault_address(info: &libc::siginfo_t) -> *mut c_void
{
    // SAFETY: forwarded to the caller.
    unsafe { info.si_addr() }
}
