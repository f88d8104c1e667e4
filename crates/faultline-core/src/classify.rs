//! # Fault Classification
//!
//! Turns [`FaultMetadata`] into a [`Diagnosis`].
//!
//! Classification is one lookup in a per-kind cause table. It never fails:
//! `si_code` values vary across kernel versions and cannot be validated
//! exhaustively, so an unrecognized code degrades to a generic diagnosis with
//! the raw code preserved.
//!
//! Every string here is `'static`, so a diagnosis can be produced inside a
//! signal handler without allocating.

use std::fmt;

use libc::c_int;

use crate::constants::{self, *};
use crate::types::{Address, FaultKind, FaultMetadata};

/// Description used for codes missing from a cause table
pub const UNKNOWN_CAUSE: &str = "unknown cause";

/// Note attached to a null-address `SIGSEGV` carrying the kernel marker
pub const MISREPORTED_PRIVILEGED_NOTE: &str = "possible misreported privileged-instruction fault: the kernel raised \
                                               SIGSEGV for a general protection fault, e.g. a privileged instruction \
                                               executed in user mode";

/// One known `si_code` and its description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CauseEntry
{
    /// Raw `si_code`
    pub code: c_int,
    /// Human-readable description
    pub description: &'static str,
}

const fn cause(code: c_int, description: &'static str) -> CauseEntry
{
    CauseEntry { code, description }
}

const SEGV_CAUSES: &[CauseEntry] = &[
    cause(SEGV_MAPERR, "address not mapped to any object"),
    cause(SEGV_ACCERR, "invalid permissions for mapped object"),
];

const ILL_CAUSES: &[CauseEntry] = &[
    cause(ILL_ILLOPC, "illegal opcode"),
    cause(ILL_ILLOPN, "illegal operand"),
    cause(ILL_ILLADR, "illegal addressing mode"),
    cause(ILL_ILLTRP, "illegal trap"),
    cause(ILL_PRVOPC, "privileged opcode"),
    cause(ILL_PRVREG, "privileged register"),
    cause(ILL_COPROC, "coprocessor error"),
    cause(ILL_BADSTK, "invalid stack"),
];

const BUS_CAUSES: &[CauseEntry] = &[
    cause(BUS_ADRALN, "invalid address alignment"),
    cause(BUS_ADRERR, "nonexistent physical address"),
    cause(BUS_OBJERR, "object-specific hardware error"),
];

const FPE_CAUSES: &[CauseEntry] = &[
    cause(FPE_INTDIV, "integer divide by zero"),
    cause(FPE_INTOVF, "integer overflow"),
    cause(FPE_FLTDIV, "floating-point divide by zero"),
    cause(FPE_FLTOVF, "floating-point overflow"),
    cause(FPE_FLTUND, "floating-point underflow"),
    cause(FPE_FLTRES, "floating-point inexact result"),
    cause(FPE_FLTINV, "invalid floating-point operation"),
    cause(FPE_FLTSUB, "subscript out of range"),
];

/// Known causes for `kind`
pub const fn cause_table(kind: FaultKind) -> &'static [CauseEntry]
{
    match kind {
        FaultKind::InvalidMemoryAccess => SEGV_CAUSES,
        FaultKind::IllegalInstruction => ILL_CAUSES,
        FaultKind::BusError => BUS_CAUSES,
        FaultKind::ArithmeticError => FPE_CAUSES,
    }
}

/// Structured result of classifying one fault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Diagnosis
{
    /// Fault kind
    pub kind: FaultKind,
    /// Raw `si_code`
    pub cause_code: c_int,
    /// Description of the cause, [`UNKNOWN_CAUSE`] if not in the table
    pub cause_description: &'static str,
    /// Whether `cause_code` is in the cause table for `kind`
    pub is_known_cause: bool,
    /// Faulting address, if the signal carries one
    pub faulting_address: Option<Address>,
    /// Whether `cause_code` is the kernel-internal marker (`SI_KERNEL`)
    pub matches_kernel_marker: bool,
    /// Extra heuristic remark for the operator
    pub note: Option<&'static str>,
}

impl fmt::Display for Diagnosis
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        if self.is_known_cause {
            f.write_str(self.cause_description)?;
        } else {
            write!(f, "{}, raw code = {:#x}", self.cause_description, self.cause_code)?;
            if self.matches_kernel_marker {
                f.write_str(" (matches SI_KERNEL)")?;
            }
        }
        if let Some(note) = self.note {
            write!(f, "; {note}")?;
        }
        Ok(())
    }
}

/// Classify one fault occurrence.
///
/// ```rust
/// use faultline_core::classify::classify;
/// use faultline_core::constants::SEGV_MAPERR;
/// use faultline_core::types::{Address, FaultKind, FaultMetadata};
///
/// let metadata = FaultMetadata::new(FaultKind::InvalidMemoryAccess, SEGV_MAPERR).with_address(Address::from(0x42));
/// let diagnosis = classify(&metadata);
/// assert!(diagnosis.is_known_cause);
/// assert_eq!(diagnosis.cause_description, "address not mapped to any object");
/// ```
pub fn classify(metadata: &FaultMetadata) -> Diagnosis
{
    let known = cause_table(metadata.kind)
        .iter()
        .find(|entry| entry.code == metadata.cause_code);
    let matches_kernel_marker = constants::is_kernel_marker(metadata.cause_code);

    let note = match (metadata.kind, known) {
        (FaultKind::InvalidMemoryAccess, None)
            if matches_kernel_marker && metadata.faulting_address.is_some_and(Address::is_null) =>
        {
            Some(MISREPORTED_PRIVILEGED_NOTE)
        }
        _ => None,
    };

    Diagnosis {
        kind: metadata.kind,
        cause_code: metadata.cause_code,
        cause_description: known.map_or(UNKNOWN_CAUSE, |entry| entry.description),
        is_known_cause: known.is_some(),
        faulting_address: metadata.faulting_address,
        matches_kernel_marker,
        note,
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_cause_tables_have_unique_codes()
    {
        for kind in FaultKind::ALL {
            let table = cause_table(kind);
            for (i, entry) in table.iter().enumerate() {
                assert!(
                    table[i + 1..].iter().all(|other| other.code != entry.code),
                    "duplicate code {} for {kind}",
                    entry.code
                );
            }
        }
    }

    #[test]
    fn test_unknown_display_surfaces_raw_code()
    {
        let diagnosis = classify(&FaultMetadata::new(FaultKind::IllegalInstruction, 0x7f));
        assert_eq!(diagnosis.to_string(), "unknown cause, raw code = 0x7f");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_kernel_marker_display()
    {
        let diagnosis = classify(&FaultMetadata::new(FaultKind::IllegalInstruction, 0x80));
        assert!(diagnosis.matches_kernel_marker);
        assert!(diagnosis.note.is_none());
        assert!(diagnosis.to_string().ends_with("(matches SI_KERNEL)"));
    }
}
