//! Deliberate hardware faults for `faultline run`.
//!
//! Each stimulus is a short inline assembly sequence that faults and is
//! arranged so that resuming one byte past the faulting instruction decodes
//! into something harmless. They are only meaningful with the default
//! one-byte skip and only exist on x86_64.

use clap::ValueEnum;
use faultline_core::error::{FaultError, FaultResult};
use faultline_core::types::FaultKind;
use faultline_utils::debug;

/// Fault to raise on the current thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Stimulus
{
    /// Write `0xdeadbeef` to address `0x42`
    UnmappedWrite,
    /// Execute `cli` from user mode
    Privileged,
    /// Execute `ud2`
    Undefined,
    /// All of the above, in order
    All,
}

impl Stimulus
{
    /// Single stimuli this expands to
    pub fn expand(self) -> &'static [Stimulus]
    {
        match self {
            Stimulus::UnmappedWrite => &[Stimulus::UnmappedWrite],
            Stimulus::Privileged => &[Stimulus::Privileged],
            Stimulus::Undefined => &[Stimulus::Undefined],
            Stimulus::All => &[Stimulus::UnmappedWrite, Stimulus::Privileged, Stimulus::Undefined],
        }
    }

    /// Kinds that must have a handler before this stimulus is raised
    pub fn required_kinds(self) -> Vec<FaultKind>
    {
        let mut kinds: Vec<FaultKind> = self.expand().iter().filter_map(|s| s.raises()).collect();
        kinds.sort();
        kinds.dedup();
        kinds
    }

    /// Fault kind the OS delivers for a single stimulus
    ///
    /// `cli` raises a general protection fault, which the kernel reports as
    /// `SIGSEGV` rather than `SIGILL`.
    const fn raises(self) -> Option<FaultKind>
    {
        match self {
            Stimulus::UnmappedWrite | Stimulus::Privileged => Some(FaultKind::InvalidMemoryAccess),
            Stimulus::Undefined => Some(FaultKind::IllegalInstruction),
            Stimulus::All => None,
        }
    }
}

/// Raise `stimulus` on the current thread.
///
/// The handlers for [`Stimulus::required_kinds`] must already be installed,
/// or the process dies with the default action.
///
/// ## Errors
///
/// Returns `InvalidArgument` on architectures without stimuli.
pub fn trigger(stimulus: Stimulus) -> FaultResult<()>
{
    if !cfg!(target_arch = "x86_64") {
        return Err(FaultError::InvalidArgument(format!(
            "stimuli are only available on x86_64, not {}",
            std::env::consts::ARCH
        )));
    }
    for &single in stimulus.expand() {
        debug!(stimulus = ?single, "raising fault");
        raise(single);
    }
    Ok(())
}

#[cfg(target_arch = "x86_64")]
fn raise(stimulus: Stimulus)
{
    use std::arch::asm;

    // SAFETY: the caller installed a dispatcher for every fault raised here,
    // and every register the resumed byte streams touch is saved or declared.
    match stimulus {
        // c7 00 ef be ad de: resuming at 00 ef gives `add %ch,%bh`, then
        // be .. .. 90 90 is a mov into esi that swallows two nops
        Stimulus::UnmappedWrite => unsafe {
            asm!(
                "push rbx",
                "mov dword ptr [rax], 0xdeadbeef",
                "nop", "nop", "nop", "nop", "nop", "nop", "nop", "nop",
                "pop rbx",
                inout("rax") 0x42usize => _,
                out("rsi") _,
            );
        },
        Stimulus::Privileged => unsafe {
            asm!("cli", "nop", "nop", "nop", "nop");
        },
        // 0f 0b c0: resuming at 0b c0 gives `or %eax,%eax`
        Stimulus::Undefined => unsafe {
            asm!("ud2", ".byte 0xc0", out("rax") _);
        },
        Stimulus::All => {
            for &single in Stimulus::All.expand() {
                raise(single);
            }
        }
    }
}

#[cfg(not(target_arch = "x86_64"))]
fn raise(_stimulus: Stimulus) {}
