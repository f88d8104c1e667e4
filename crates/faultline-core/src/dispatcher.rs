//! # Fault Dispatcher
//!
//! The callback the OS invokes when a registered fault is delivered.
//!
//! Each [`FaultKind`] gets its own `extern "C"` trampoline, monomorphized over
//! the kind's discriminant, so the callback knows which kind it was registered
//! under without consulting any shared state. Per-kind configuration
//! ([`DispatchOptions`]) lives in atomics in a static table and is read, never
//! written, during dispatch.
//!
//! ## Dispatch
//!
//! 1. Validate the delivery: non-null `siginfo_t` and context, `si_signo`
//!    equal to the signal argument, and the signal mapping to the registered
//!    kind. Any violation aborts the process.
//! 2. Classify the fault and compute the resume point.
//! 3. Take the one instruction pointer view and issue the one write.
//! 4. Append a [`FaultRecord`] to [`JOURNAL`] and, if enabled, echo the report
//!    to stderr.
//!
//! Only step 1 can terminate the process. An unknown cause is still skipped.

use std::ffi::c_void;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use libc::c_int;
use thiserror::Error;

use crate::classify::{classify, Diagnosis};
use crate::context::{self, ExecutionContext};
use crate::fatal::{self, StackBuffer};
use crate::journal::{FaultRecord, JOURNAL};
use crate::recovery::{RecoveryPolicy, DEFAULT_SKIP_BYTES};
use crate::report::FaultReport;
use crate::types::{Address, FaultCallback, FaultKind, FaultMetadata};

/// Per-kind dispatcher configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchOptions
{
    /// Where the faulting thread resumes
    pub policy: RecoveryPolicy,
    /// Write the report to stderr from inside the handler
    pub echo: bool,
}

/// Whether a dispatch is currently running on any thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState
{
    /// No handler is executing
    Idle,
    /// At least one handler is executing
    Dispatching,
}

/// What one dispatch did to the saved context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome
{
    /// Classification of the fault
    pub diagnosis: Diagnosis,
    /// Saved instruction pointer before the write
    pub instruction_pointer: Address,
    /// Instruction pointer written back
    pub resumed_at: Address,
}

/// A fault was delivered to the callback registered for another kind
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("callback registered for {registered} received {incoming}")]
pub struct KindMismatch
{
    /// Kind the callback was registered under
    pub registered: FaultKind,
    /// Kind of the delivered fault
    pub incoming: FaultKind,
}

struct DispatchSlot
{
    skip_bytes: AtomicU64,
    echo: AtomicBool,
    count: AtomicU64,
}

impl DispatchSlot
{
    const EMPTY: DispatchSlot = DispatchSlot {
        skip_bytes: AtomicU64::new(DEFAULT_SKIP_BYTES),
        echo: AtomicBool::new(false),
        count: AtomicU64::new(0),
    };

    fn options(&self) -> DispatchOptions
    {
        DispatchOptions {
            policy: RecoveryPolicy::skip(self.skip_bytes.load(Ordering::Acquire)),
            echo: self.echo.load(Ordering::Acquire),
        }
    }
}

static SLOTS: [DispatchSlot; FaultKind::COUNT] = [DispatchSlot::EMPTY; FaultKind::COUNT];

static IN_FLIGHT: AtomicUsize = AtomicUsize::new(0);

/// Marks a dispatch in flight for as long as it lives.
struct DispatchGuard;

impl DispatchGuard
{
    fn enter() -> Self
    {
        IN_FLIGHT.fetch_add(1, Ordering::AcqRel);
        DispatchGuard
    }
}

impl Drop for DispatchGuard
{
    fn drop(&mut self)
    {
        IN_FLIGHT.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Set the options the dispatcher for `kind` uses from now on.
pub fn configure(kind: FaultKind, options: DispatchOptions)
{
    let slot = &SLOTS[kind.index()];
    slot.skip_bytes
        .store(options.policy.skip_bytes(), Ordering::Release);
    slot.echo.store(options.echo, Ordering::Release);
}

/// Options currently configured for `kind`
pub fn options(kind: FaultKind) -> DispatchOptions
{
    SLOTS[kind.index()].options()
}

/// Number of faults of `kind` dispatched so far
pub fn dispatch_count(kind: FaultKind) -> u64
{
    SLOTS[kind.index()].count.load(Ordering::Acquire)
}

/// Current dispatch state
pub fn dispatch_state() -> DispatchState
{
    if IN_FLIGHT.load(Ordering::Acquire) == 0 {
        DispatchState::Idle
    } else {
        DispatchState::Dispatching
    }
}

/// Callback to install for `kind`
pub fn callback_for(kind: FaultKind) -> FaultCallback
{
    match kind {
        FaultKind::InvalidMemoryAccess => on_fault::<{ FaultKind::InvalidMemoryAccess as u8 }>,
        FaultKind::IllegalInstruction => on_fault::<{ FaultKind::IllegalInstruction as u8 }>,
        FaultKind::BusError => on_fault::<{ FaultKind::BusError as u8 }>,
        FaultKind::ArithmeticError => on_fault::<{ FaultKind::ArithmeticError as u8 }>,
    }
}

/// Check that a fault of kind `incoming` may be handled by the callback
/// registered for `registered`.
///
/// ## Errors
///
/// Returns [`KindMismatch`] when the kinds differ.
pub fn check_kind(registered: FaultKind, incoming: FaultKind) -> Result<(), KindMismatch>
{
    if registered == incoming {
        Ok(())
    } else {
        Err(KindMismatch { registered, incoming })
    }
}

/// Classify a fault and move the saved instruction pointer to the resume
/// point.
///
/// Takes exactly one instruction pointer view and writes it exactly once.
/// Aborts the process if `metadata` is not of the `registered` kind.
pub fn dispatch(
    registered: FaultKind,
    metadata: &FaultMetadata,
    context: &mut ExecutionContext<'_>,
    policy: RecoveryPolicy,
) -> DispatchOutcome
{
    if let Err(mismatch) = check_kind(registered, metadata.kind) {
        fatal::signal_abort(format_args!("{mismatch}"));
    }

    let diagnosis = classify(metadata);
    let view = context.instruction_pointer();
    let instruction_pointer = view.get();
    let resumed_at = view.write(policy.compute_resume_point(instruction_pointer, &diagnosis));

    DispatchOutcome {
        diagnosis,
        instruction_pointer,
        resumed_at,
    }
}

extern "C" fn on_fault<const KIND: u8>(signal: c_int, info: *mut libc::siginfo_t, ucontext: *mut c_void)
{
    let _guard = DispatchGuard::enter();

    let Some(registered) = FaultKind::from_repr(KIND) else {
        fatal::signal_abort(format_args!("fault callback built for unknown kind {KIND}"));
    };
    // SAFETY: for SA_SIGINFO handlers the OS passes a valid siginfo_t or null.
    let Some(info) = (unsafe { info.as_ref() }) else {
        fatal::signal_abort(format_args!("{registered}: no siginfo_t delivered"));
    };
    if info.si_signo != signal {
        fatal::signal_abort(format_args!(
            "{registered}: si_signo {} does not match signal {signal}",
            info.si_signo
        ));
    }
    let Some(metadata) = context::read_fault_metadata(signal, info) else {
        fatal::signal_abort(format_args!("{registered}: received unexpected signal {signal}"));
    };
    // SAFETY: the third SA_SIGINFO argument is the saved context of this
    // thread, valid until the handler returns.
    let Some(mut context) = (unsafe { ExecutionContext::from_raw(ucontext) }) else {
        fatal::signal_abort(format_args!("{registered}: no execution context delivered"));
    };

    let slot = &SLOTS[registered.index()];
    let options = slot.options();
    let outcome = dispatch(registered, &metadata, &mut context, options.policy);

    let record = FaultRecord {
        metadata,
        instruction_pointer: outcome.instruction_pointer,
        resumed_at: outcome.resumed_at,
    };
    JOURNAL.record(&record);
    slot.count.fetch_add(1, Ordering::AcqRel);

    if options.echo {
        let mut text = StackBuffer::<512>::new();
        let _ = FaultReport::new(&record).write_to(&mut text);
        fatal::write_stderr(text.as_bytes());
    }
}
