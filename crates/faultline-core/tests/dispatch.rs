//! Tests for the dispatcher core on synthetic execution contexts
#![cfg(target_os = "linux")]

use faultline_core::constants::{ILL_PRVOPC, SEGV_MAPERR};
use faultline_core::context::ExecutionContext;
use faultline_core::dispatcher::{check_kind, dispatch, DispatchState};
use faultline_core::journal::FaultRecord;
use faultline_core::prelude::*;

/// Zeroed Linux `ucontext_t` with its program counter set to `ip`.
fn context_at(ip: u64) -> Box<libc::ucontext_t>
{
    // SAFETY: ucontext_t is plain old data on Linux.
    let mut uc: Box<libc::ucontext_t> = Box::new(unsafe { std::mem::zeroed() });
    // SAFETY: Linux contexts embed the machine context.
    let mut context = unsafe { ExecutionContext::new(&mut uc) };
    context.instruction_pointer().write(Address::new(ip));
    uc
}

fn saved_ip(uc: &mut libc::ucontext_t) -> Address
{
    // SAFETY: Linux contexts embed the machine context.
    let mut context = unsafe { ExecutionContext::new(uc) };
    context.instruction_pointer().get()
}

#[test]
fn test_unmapped_write_resumes_one_byte_later()
{
    let mut uc = context_at(0x5555_0000_1000);
    let metadata = FaultMetadata::new(FaultKind::InvalidMemoryAccess, SEGV_MAPERR).with_address(Address::new(0x42));

    // SAFETY: Linux contexts embed the machine context.
    let mut context = unsafe { ExecutionContext::new(&mut uc) };
    let outcome = dispatch(
        FaultKind::InvalidMemoryAccess,
        &metadata,
        &mut context,
        RecoveryPolicy::default(),
    );

    assert_eq!(outcome.diagnosis.kind, FaultKind::InvalidMemoryAccess);
    assert_eq!(outcome.diagnosis.faulting_address, Some(Address::new(0x42)));
    assert_eq!(outcome.diagnosis.cause_description, "address not mapped to any object");
    assert_eq!(outcome.instruction_pointer, Address::new(0x5555_0000_1000));
    assert_eq!(outcome.resumed_at, Address::new(0x5555_0000_1001));
    assert_eq!(saved_ip(&mut uc), Address::new(0x5555_0000_1001));
}

#[test]
fn test_privileged_opcode_resumes_one_byte_later()
{
    let mut uc = context_at(0x4000);
    let metadata = FaultMetadata::new(FaultKind::IllegalInstruction, ILL_PRVOPC).with_address(Address::new(0x4000));

    // SAFETY: Linux contexts embed the machine context.
    let mut context = unsafe { ExecutionContext::new(&mut uc) };
    let outcome = dispatch(
        FaultKind::IllegalInstruction,
        &metadata,
        &mut context,
        RecoveryPolicy::default(),
    );

    assert!(outcome.diagnosis.is_known_cause);
    assert_eq!(outcome.diagnosis.cause_description, "privileged opcode");
    assert_eq!(outcome.resumed_at.offset_from(outcome.instruction_pointer), 1);
    assert_eq!(saved_ip(&mut uc), Address::new(0x4001));
}

#[test]
fn test_unknown_cause_is_still_skipped()
{
    let mut uc = context_at(0x7000);
    let metadata = FaultMetadata::new(FaultKind::BusError, 0x55);

    // SAFETY: Linux contexts embed the machine context.
    let mut context = unsafe { ExecutionContext::new(&mut uc) };
    let outcome = dispatch(FaultKind::BusError, &metadata, &mut context, RecoveryPolicy::default());

    assert!(!outcome.diagnosis.is_known_cause);
    assert_eq!(saved_ip(&mut uc), Address::new(0x7001));
}

#[test]
fn test_configured_skip_width()
{
    let mut uc = context_at(0x8000);
    let metadata = FaultMetadata::new(FaultKind::IllegalInstruction, 0);

    // SAFETY: Linux contexts embed the machine context.
    let mut context = unsafe { ExecutionContext::new(&mut uc) };
    let outcome = dispatch(FaultKind::IllegalInstruction, &metadata, &mut context, RecoveryPolicy::skip(4));

    assert_eq!(outcome.resumed_at, Address::new(0x8004));
    assert_eq!(saved_ip(&mut uc), Address::new(0x8004));
}

#[test]
fn test_check_kind_rejects_mismatch()
{
    assert!(check_kind(FaultKind::IllegalInstruction, FaultKind::IllegalInstruction).is_ok());
    let mismatch = check_kind(FaultKind::IllegalInstruction, FaultKind::InvalidMemoryAccess).unwrap_err();
    assert_eq!(mismatch.registered, FaultKind::IllegalInstruction);
    assert_eq!(mismatch.incoming, FaultKind::InvalidMemoryAccess);
}

#[test]
fn test_dispatch_state_is_idle_outside_handlers()
{
    assert_eq!(faultline_core::dispatcher::dispatch_state(), DispatchState::Idle);
}

#[test]
fn test_report_for_dispatch_outcome()
{
    let mut uc = context_at(0x1000);
    let metadata = FaultMetadata::new(FaultKind::InvalidMemoryAccess, SEGV_MAPERR).with_address(Address::new(0x42));
    // SAFETY: Linux contexts embed the machine context.
    let mut context = unsafe { ExecutionContext::new(&mut uc) };
    let outcome = dispatch(
        FaultKind::InvalidMemoryAccess,
        &metadata,
        &mut context,
        RecoveryPolicy::default(),
    );

    let record = FaultRecord {
        metadata,
        instruction_pointer: outcome.instruction_pointer,
        resumed_at: outcome.resumed_at,
    };
    let report = FaultReport::new(&record);
    assert_eq!(report.diagnosis(), &outcome.diagnosis);

    let text = report.to_string();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "Handling SIGSEGV. Invalid memory access to 0x42 (instruction pointer at 0x1000)");
    assert_eq!(lines[1], "\tsi_errno 0");
    assert_eq!(lines[2], "\tAddress not mapped to any object.");
    assert_eq!(lines[3], "\tContinuing execution at 0x1001");
}

#[test]
fn test_report_with_note()
{
    let record = FaultRecord {
        metadata: FaultMetadata::new(FaultKind::InvalidMemoryAccess, 0x80).with_address(Address::ZERO),
        instruction_pointer: Address::new(0x2000),
        resumed_at: Address::new(0x2001),
    };
    let text = FaultReport::new(&record).to_string();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "Handling SIGSEGV. Invalid memory access to 0x0 (instruction pointer at 0x2000)");
    assert_eq!(lines[2], "\tUnknown si_code 0x80 (matches SI_KERNEL)");
    assert!(lines[3].starts_with("\t\tNote: possible misreported privileged-instruction fault"));
    assert_eq!(lines[4], "\tContinuing execution at 0x2001");
}
