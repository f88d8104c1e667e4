//! Violated invariants must abort the process.
//!
//! An abort cannot be observed in-process, so each test re-executes its own
//! binary with [`CHILD_ENV`] naming the test, and inspects how the child died.

use std::env;
use std::ffi::c_void;
use std::os::unix::process::ExitStatusExt;
use std::process::{Command, Output};

use faultline_core::prelude::*;

const CHILD_ENV: &str = "FAULTLINE_ABORT_CHILD";

extern "C" fn first_callback(_signal: libc::c_int, _info: *mut libc::siginfo_t, _context: *mut c_void)
{
    std::hint::black_box(1);
}

extern "C" fn second_callback(_signal: libc::c_int, _info: *mut libc::siginfo_t, _context: *mut c_void)
{
    std::hint::black_box(2);
}

/// Backend that accepts every swap but never changes anything.
struct LossySignals;

impl SignalBackend for LossySignals
{
    fn query(&self, _signal: libc::c_int) -> FaultResult<SignalAction>
    {
        Ok(SignalAction::DEFAULT)
    }

    fn swap(&self, _signal: libc::c_int, _action: &SignalAction) -> FaultResult<SignalAction>
    {
        Ok(SignalAction::DEFAULT)
    }
}

/// Whether this process is the child spawned for `test`.
fn is_child(test: &str) -> bool
{
    env::var(CHILD_ENV).is_ok_and(|name| name == test)
}

/// Run `test` alone in a child process and return its output.
fn run_child(test: &str) -> Output
{
    let exe = env::current_exe().unwrap();
    Command::new(exe)
        .args(["--exact", test, "--nocapture", "--test-threads=1"])
        .env(CHILD_ENV, test)
        .output()
        .unwrap()
}

fn assert_aborted(output: &Output, message: &str)
{
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.signal(), Some(libc::SIGABRT), "child stderr:\n{stderr}");
    assert!(stderr.contains(message), "child stderr:\n{stderr}");
}

#[test]
fn test_second_install_aborts()
{
    if is_child("test_second_install_aborts") {
        let mut registry = HandlerRegistry::new();
        registry.reset(FaultKind::IllegalInstruction).unwrap();
        registry.install(FaultKind::IllegalInstruction, first_callback).unwrap();
        let _ = registry.install(FaultKind::IllegalInstruction, second_callback);
        std::process::exit(0);
    }

    let output = run_child("test_second_install_aborts");
    assert_aborted(
        &output,
        "faultline: fatal: Refusing to replace existing illegal instruction (SIGILL)",
    );
}

#[test]
fn test_unverified_install_aborts()
{
    if is_child("test_unverified_install_aborts") {
        let mut registry = HandlerRegistry::with_backend(LossySignals);
        let _ = registry.install(FaultKind::BusError, first_callback);
        std::process::exit(0);
    }

    let output = run_child("test_unverified_install_aborts");
    assert_aborted(&output, "faultline: fatal: Registration check failed for bus error (SIGBUS)");
}

#[cfg(target_os = "linux")]
#[test]
fn test_dispatch_kind_mismatch_aborts()
{
    use faultline_core::constants::SEGV_MAPERR;
    use faultline_core::context::ExecutionContext;
    use faultline_core::dispatcher::dispatch;

    if is_child("test_dispatch_kind_mismatch_aborts") {
        // SAFETY: ucontext_t is plain old data on Linux.
        let mut uc: Box<libc::ucontext_t> = Box::new(unsafe { std::mem::zeroed() });
        // SAFETY: Linux contexts embed the machine context.
        let mut context = unsafe { ExecutionContext::new(&mut uc) };
        let metadata = FaultMetadata::new(FaultKind::InvalidMemoryAccess, SEGV_MAPERR).with_address(Address::new(0x42));
        let _ = dispatch(
            FaultKind::IllegalInstruction,
            &metadata,
            &mut context,
            RecoveryPolicy::default(),
        );
        std::process::exit(0);
    }

    let output = run_child("test_dispatch_kind_mismatch_aborts");
    assert_aborted(
        &output,
        "faultline: fatal: callback registered for illegal instruction (SIGILL) received invalid memory access (SIGSEGV)",
    );
}
