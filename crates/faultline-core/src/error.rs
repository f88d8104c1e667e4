//! # Error Types
//!
//! Error handling for fault handler registration.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.
//!
//! There are only two tiers here. A fault itself is never an error: the
//! dispatcher always recovers in place. Everything in [`FaultError`] happens
//! outside of dispatch, while handlers are being registered or inspected.

use std::io;

use libc::c_int;
use thiserror::Error;

use crate::types::{FaultKind, SignalAction};

/// Main error type for registration operations
///
/// ## Error Categories
///
/// 1. **Invariant violations** (fatal): HandlerAlreadyInstalled, RegistrationMismatch
/// 2. **OS errors**: Os (a `sigaction` call reported failure)
/// 3. **Usage errors**: UnknownKind, InvalidArgument
///
/// [`HandlerRegistry::install`](crate::registry::HandlerRegistry::install) aborts
/// the process on invariant violations; see [`FaultError::is_fatal`].
#[derive(Error, Debug)]
pub enum FaultError
{
    /// An OS call failed while registering or querying a handler
    ///
    /// The wrapped `io::Error` carries the raw `errno`, available through
    /// [`FaultError::os_code`].
    #[error("{call} failed for signal {signal}: {source}")]
    Os
    {
        /// Name of the failing system call
        call: &'static str,
        /// Signal number the call was made for
        signal: c_int,
        /// Error reported by the OS
        source: io::Error,
    },

    /// A non-default action was already installed for this fault kind
    ///
    /// Replacing it would silently discard another component's fault handler,
    /// including the one the Rust runtime installs for stack overflow detection.
    /// Call [`HandlerRegistry::reset`](crate::registry::HandlerRegistry::reset)
    /// first if taking over the signal is intended.
    #[error("Refusing to replace existing {kind} action: {existing}")]
    HandlerAlreadyInstalled
    {
        /// Fault kind being installed
        kind: FaultKind,
        /// Action found in place
        existing: SignalAction,
    },

    /// The OS reports a different action than the one just installed
    #[error("Registration check failed for {kind}: expected handler 0x{expected:x}, found {found}")]
    RegistrationMismatch
    {
        /// Fault kind being installed
        kind: FaultKind,
        /// Address of the callback that should be installed
        expected: usize,
        /// Action the OS reported afterwards
        found: SignalAction,
    },

    /// A fault kind name could not be parsed
    #[error("Unknown fault kind: {0}")]
    UnknownKind(String),

    /// Invalid argument passed to a faultline function
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl FaultError
{
    /// Build an [`FaultError::Os`] from the current `errno`.
    pub(crate) fn last_os_error(call: &'static str, signal: c_int) -> Self
    {
        FaultError::Os {
            call,
            signal,
            source: io::Error::last_os_error(),
        }
    }

    /// Whether this error means the mechanism's own safety preconditions are
    /// violated. Such errors must not be masked.
    #[must_use]
    pub fn is_fatal(&self) -> bool
    {
        matches!(
            self,
            FaultError::HandlerAlreadyInstalled { .. } | FaultError::RegistrationMismatch { .. }
        )
    }

    /// Raw OS error code, if this error came from the OS.
    #[must_use]
    pub fn os_code(&self) -> Option<i32>
    {
        match self {
            FaultError::Os { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }
}

/// Convenience type alias for `Result<T, FaultError>`
///
/// ```rust
/// use faultline_core::error::FaultResult;
/// fn foo() -> FaultResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type FaultResult<T> = std::result::Result<T, FaultError>;
