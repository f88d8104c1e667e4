//! Human-readable fault reports.
//!
//! The same formatter serves the in-handler echo (through a stack buffer) and
//! the post-resume report (through `Display`), so it must not allocate.

use std::fmt;

use crate::classify::Diagnosis;
use crate::journal::FaultRecord;
use crate::types::FaultKind;

/// Line-oriented description of one dispatch
///
/// ```text
/// Handling SIGSEGV. Invalid memory access to 0x42 (instruction pointer at 0x55d0c0de1234)
///     si_errno 0
///     Address not mapped to any object.
///     Continuing execution at 0x55d0c0de1235
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FaultReport<'a>
{
    record: &'a FaultRecord,
    diagnosis: Diagnosis,
}

impl<'a> FaultReport<'a>
{
    /// Report for `record`
    pub fn new(record: &'a FaultRecord) -> Self
    {
        Self {
            record,
            diagnosis: record.diagnosis(),
        }
    }

    /// Diagnosis the report is based on
    pub fn diagnosis(&self) -> &Diagnosis
    {
        &self.diagnosis
    }

    /// Write the report, one line per fact, each terminated by `\n`.
    pub fn write_to<W: fmt::Write>(&self, out: &mut W) -> fmt::Result
    {
        let metadata = &self.record.metadata;
        let diagnosis = &self.diagnosis;

        write!(out, "Handling {}. ", metadata.kind.signal_name())?;
        write_capitalized(out, metadata.kind.description())?;
        // A data address is accessed "to"; an instruction address faults "at"
        let preposition = match metadata.kind {
            FaultKind::InvalidMemoryAccess | FaultKind::BusError => "to",
            FaultKind::IllegalInstruction | FaultKind::ArithmeticError => "at",
        };
        match metadata.faulting_address {
            Some(address) => write!(out, " {preposition} {address}")?,
            None => write!(out, " {preposition} unknown address")?,
        }
        writeln!(out, " (instruction pointer at {})", self.record.instruction_pointer)?;
        writeln!(out, "\tsi_errno {}", metadata.errno)?;

        out.write_str("\t")?;
        if diagnosis.is_known_cause {
            write_capitalized(out, diagnosis.cause_description)?;
            out.write_str(".\n")?;
        } else {
            write!(out, "Unknown si_code {:#x}", diagnosis.cause_code)?;
            if diagnosis.matches_kernel_marker {
                out.write_str(" (matches SI_KERNEL)")?;
            }
            out.write_str("\n")?;
        }
        if let Some(note) = diagnosis.note {
            writeln!(out, "\t\tNote: {note}")?;
        }

        writeln!(out, "\tContinuing execution at {}", self.record.resumed_at)
    }
}

impl fmt::Display for FaultReport<'_>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        self.write_to(f)
    }
}

fn write_capitalized<W: fmt::Write>(out: &mut W, text: &str) -> fmt::Result
{
    let mut chars = text.chars();
    if let Some(first) = chars.next() {
        out.write_char(first.to_ascii_uppercase())?;
        out.write_str(chars.as_str())?;
    }
    Ok(())
}
