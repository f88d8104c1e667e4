//! Tests for the handler registry against in-memory signal backends

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::ffi::c_void;
use std::io;

use faultline_core::error::{FaultError, FaultResult};
use faultline_core::registry::{has_handler, HandlerRegistry, SignalBackend};
use faultline_core::types::{DispatchMode, FaultKind, SignalAction};

extern "C" fn first_callback(_signal: libc::c_int, _info: *mut libc::siginfo_t, _context: *mut c_void)
{
    std::hint::black_box(1);
}

extern "C" fn second_callback(_signal: libc::c_int, _info: *mut libc::siginfo_t, _context: *mut c_void)
{
    std::hint::black_box(2);
}

/// Signal table kept in memory; every signal starts at the default action.
#[derive(Debug, Default)]
struct FakeSignals
{
    actions: RefCell<HashMap<libc::c_int, SignalAction>>,
    swaps: Cell<usize>,
}

impl FakeSignals
{
    fn with_action(signal: libc::c_int, action: SignalAction) -> Self
    {
        let backend = Self::default();
        backend.actions.borrow_mut().insert(signal, action);
        backend
    }

    fn action(&self, signal: libc::c_int) -> SignalAction
    {
        self.actions.borrow().get(&signal).copied().unwrap_or_default()
    }
}

impl SignalBackend for FakeSignals
{
    fn query(&self, signal: libc::c_int) -> FaultResult<SignalAction>
    {
        Ok(self.action(signal))
    }

    fn swap(&self, signal: libc::c_int, action: &SignalAction) -> FaultResult<SignalAction>
    {
        self.swaps.set(self.swaps.get() + 1);
        Ok(self
            .actions
            .borrow_mut()
            .insert(signal, *action)
            .unwrap_or_default())
    }
}

/// Backend that accepts every swap but never changes anything.
#[derive(Debug, Default)]
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

/// Backend whose every call fails with `EINVAL`.
#[derive(Debug, Default)]
struct FailingSignals;

impl SignalBackend for FailingSignals
{
    fn query(&self, signal: libc::c_int) -> FaultResult<SignalAction>
    {
        Err(FaultError::Os {
            call: "sigaction",
            signal,
            source: io::Error::from_raw_os_error(libc::EINVAL),
        })
    }

    fn swap(&self, signal: libc::c_int, _action: &SignalAction) -> FaultResult<SignalAction>
    {
        self.query(signal)
    }
}

#[test]
fn test_install_round_trip_per_kind()
{
    for kind in FaultKind::ALL {
        let mut registry = HandlerRegistry::with_backend(FakeSignals::default());
        let registration = *registry.try_install(kind, first_callback).unwrap();

        assert_eq!(registration.kind, kind);
        assert!(registration.action.matches(first_callback));
        assert_eq!(registration.previous, SignalAction::DEFAULT);
        assert_eq!(registration.mode, DispatchMode::Detailed);

        let current = registry.current_action(kind).unwrap();
        assert_eq!(current, SignalAction::detailed(first_callback));
        assert!(has_handler(&current));
        assert_eq!(registry.registration(kind), Some(&registration));
    }
}

#[test]
fn test_install_reports_success()
{
    let mut registry = HandlerRegistry::with_backend(FakeSignals::default());
    registry.install(FaultKind::InvalidMemoryAccess, first_callback).unwrap();
    registry.install(FaultKind::IllegalInstruction, second_callback).unwrap();
    assert_eq!(registry.registrations().count(), 2);
}

#[test]
fn test_existing_handler_is_refused_before_mutation()
{
    let backend = FakeSignals::with_action(libc::SIGSEGV, SignalAction::detailed(first_callback));
    let mut registry = HandlerRegistry::with_backend(backend);

    let err = registry
        .try_install(FaultKind::InvalidMemoryAccess, second_callback)
        .unwrap_err();
    assert!(err.is_fatal());
    match err {
        FaultError::HandlerAlreadyInstalled { kind, existing } => {
            assert_eq!(kind, FaultKind::InvalidMemoryAccess);
            assert!(existing.matches(first_callback));
        }
        other => panic!("Expected HandlerAlreadyInstalled, got {other:?}"),
    }

    let backend = registry.backend();
    assert_eq!(backend.swaps.get(), 0);
    assert!(backend.action(libc::SIGSEGV).matches(first_callback));
    for kind in FaultKind::ALL.into_iter().skip(1) {
        assert_eq!(backend.action(kind.signal()), SignalAction::DEFAULT);
    }
    assert!(registry.registration(FaultKind::InvalidMemoryAccess).is_none());
}

#[test]
fn test_double_install_is_refused()
{
    let mut registry = HandlerRegistry::with_backend(FakeSignals::default());
    registry
        .try_install(FaultKind::IllegalInstruction, first_callback)
        .unwrap();
    let err = registry
        .try_install(FaultKind::IllegalInstruction, second_callback)
        .unwrap_err();
    assert!(matches!(err, FaultError::HandlerAlreadyInstalled { .. }));
    assert!(registry
        .current_action(FaultKind::IllegalInstruction)
        .unwrap()
        .matches(first_callback));
}

#[test]
fn test_ignore_counts_as_handler()
{
    assert!(has_handler(&SignalAction::IGNORE));
    assert!(!has_handler(&SignalAction::DEFAULT));

    let backend = FakeSignals::with_action(libc::SIGBUS, SignalAction::IGNORE);
    let mut registry = HandlerRegistry::with_backend(backend);
    let err = registry.try_install(FaultKind::BusError, first_callback).unwrap_err();
    assert!(matches!(
        err,
        FaultError::HandlerAlreadyInstalled { existing, .. } if existing.is_ignore()
    ));
}

#[test]
fn test_lossy_backend_fails_postcondition()
{
    let mut registry = HandlerRegistry::with_backend(LossySignals);
    let err = registry
        .try_install(FaultKind::ArithmeticError, first_callback)
        .unwrap_err();
    assert!(err.is_fatal());
    match err {
        FaultError::RegistrationMismatch { kind, expected, found } => {
            assert_eq!(kind, FaultKind::ArithmeticError);
            assert_eq!(expected, first_callback as usize);
            assert_eq!(found, SignalAction::DEFAULT);
        }
        other => panic!("Expected RegistrationMismatch, got {other:?}"),
    }
    assert!(registry.registration(FaultKind::ArithmeticError).is_none());
}

#[test]
fn test_os_errors_are_returned()
{
    let mut registry = HandlerRegistry::with_backend(FailingSignals);
    let err = registry
        .install(FaultKind::InvalidMemoryAccess, first_callback)
        .unwrap_err();
    assert!(!err.is_fatal());
    assert_eq!(err.os_code(), Some(libc::EINVAL));

    assert!(registry.reset(FaultKind::InvalidMemoryAccess).is_err());
}

#[test]
fn test_reset_restores_default_and_allows_reinstall()
{
    let mut registry = HandlerRegistry::with_backend(FakeSignals::default());
    registry
        .try_install(FaultKind::InvalidMemoryAccess, first_callback)
        .unwrap();

    let discarded = registry.reset(FaultKind::InvalidMemoryAccess).unwrap();
    assert!(discarded.matches(first_callback));
    assert!(registry.registration(FaultKind::InvalidMemoryAccess).is_none());
    assert_eq!(
        registry.current_action(FaultKind::InvalidMemoryAccess).unwrap(),
        SignalAction::DEFAULT
    );

    let registration = registry
        .try_install(FaultKind::InvalidMemoryAccess, second_callback)
        .unwrap();
    assert!(registration.action.matches(second_callback));
    assert!(registration.previous.is_default());
}

#[test]
fn test_reset_of_default_is_a_no_op()
{
    let mut registry = HandlerRegistry::with_backend(FakeSignals::default());
    let discarded = registry.reset(FaultKind::BusError).unwrap();
    assert_eq!(discarded, SignalAction::DEFAULT);
}

#[test]
fn test_registration_display()
{
    let mut registry = HandlerRegistry::with_backend(FakeSignals::default());
    let registration = registry
        .try_install(FaultKind::IllegalInstruction, first_callback)
        .unwrap();
    let text = registration.to_string();
    assert!(text.starts_with("illegal instruction (SIGILL): sa_sigaction at 0x"));
    assert!(text.ends_with("(replaced default)"));
}
