//! Tests for error handling

use std::io;

use faultline_core::error::{FaultError, FaultResult};
use faultline_core::types::{FaultKind, SignalAction};

#[test]
fn test_handler_already_installed_display()
{
    let error = FaultError::HandlerAlreadyInstalled {
        kind: FaultKind::InvalidMemoryAccess,
        existing: SignalAction::IGNORE,
    };
    let message = format!("{}", error);
    assert!(message.contains("Refusing to replace"));
    assert!(message.contains("SIGSEGV"));
    assert!(message.contains("ignore"));
}

#[test]
fn test_registration_mismatch_display()
{
    let error = FaultError::RegistrationMismatch {
        kind: FaultKind::IllegalInstruction,
        expected: 0x1234,
        found: SignalAction::DEFAULT,
    };
    let message = format!("{}", error);
    assert!(message.contains("0x1234"));
    assert!(message.contains("SIGILL"));
    assert!(message.contains("default"));
}

#[test]
fn test_fatal_classification()
{
    let fatal = [
        FaultError::HandlerAlreadyInstalled {
            kind: FaultKind::BusError,
            existing: SignalAction::IGNORE,
        },
        FaultError::RegistrationMismatch {
            kind: FaultKind::BusError,
            expected: 1,
            found: SignalAction::DEFAULT,
        },
    ];
    for error in &fatal {
        assert!(error.is_fatal(), "{error} should be fatal");
    }

    let recoverable = [
        FaultError::Os {
            call: "sigaction",
            signal: libc::SIGSEGV,
            source: io::Error::from_raw_os_error(libc::EINVAL),
        },
        FaultError::UnknownKind("trap".to_string()),
        FaultError::InvalidArgument("skip".to_string()),
    ];
    for error in &recoverable {
        assert!(!error.is_fatal(), "{error} should not be fatal");
    }
}

#[test]
fn test_os_code_is_preserved()
{
    let error = FaultError::Os {
        call: "sigaction",
        signal: libc::SIGILL,
        source: io::Error::from_raw_os_error(libc::EINVAL),
    };
    assert_eq!(error.os_code(), Some(libc::EINVAL));
    let message = format!("{}", error);
    assert!(message.starts_with("sigaction failed for signal"));

    assert_eq!(FaultError::UnknownKind("x".into()).os_code(), None);
}
