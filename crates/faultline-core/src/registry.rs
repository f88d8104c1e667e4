//! # Handler Registry
//!
//! Owns the mapping from [`FaultKind`] to the installed fault callback.
//!
//! The registry is an explicit value rather than ambient global state: create
//! one during startup, install handlers through it, and keep it around for
//! queries and resets. The OS is reached through the [`SignalBackend`] trait,
//! so the whole registration protocol can be exercised against an in-memory
//! backend.
//!
//! ## Installation protocol
//!
//! 1. Query the current action. A non-default action is refused before
//!    anything changes.
//! 2. Swap in the callback (`SA_SIGINFO`), capturing the previous action.
//! 3. Re-check the captured action (it may have changed since step 1).
//! 4. Re-query the OS and verify the callback is what is now installed.
//!
//! [`HandlerRegistry::install`] treats a failure in 1, 3 or 4 as fatal and
//! aborts the process. [`HandlerRegistry::try_install`] reports them instead.
//!
//! ## Concurrency
//!
//! Registration is meant for single-threaded startup. The registry is not
//! `Sync`-guarded against concurrent installs of the same kind through two
//! registries; callers must serialize those.

use std::fmt;

use libc::c_int;
use tracing::{debug, info, warn};

use crate::dispatcher::{self, DispatchOptions};
use crate::error::{FaultError, FaultResult};
use crate::fatal;
use crate::platform::PosixSignals;
use crate::types::{DispatchMode, FaultCallback, FaultKind, SignalAction};

/// OS seam for reading and replacing signal actions
///
/// Implementations must behave like `sigaction(2)`: `swap` installs the new
/// action and returns the one it replaced, atomically.
pub trait SignalBackend
{
    /// Action currently installed for `signal`
    fn query(&self, signal: c_int) -> FaultResult<SignalAction>;

    /// Install `action` for `signal`, returning the previous action
    fn swap(&self, signal: c_int, action: &SignalAction) -> FaultResult<SignalAction>;
}

/// Whether `action` is anything other than the default disposition
///
/// `sa_handler` and `sa_sigaction` share storage, so the check is the same in
/// both dispatch modes. `SIG_IGN` counts: ignoring a synchronous fault is a
/// deliberate choice made by someone else.
pub fn has_handler(action: &SignalAction) -> bool
{
    !action.is_default()
}

/// Record of one installed fault handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalRegistration
{
    /// Fault kind
    pub kind: FaultKind,
    /// Action verified to be installed
    pub action: SignalAction,
    /// Action that was replaced
    pub previous: SignalAction,
    /// Whether metadata and context are delivered
    pub mode: DispatchMode,
}

impl fmt::Display for SignalRegistration
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}: {} (replaced {})", self.kind, self.action, self.previous)
    }
}

/// Process-scoped fault handler registry
pub struct HandlerRegistry<B: SignalBackend = PosixSignals>
{
    backend: B,
    registrations: [Option<SignalRegistration>; FaultKind::COUNT],
}

impl HandlerRegistry<PosixSignals>
{
    /// Registry backed by `sigaction(2)`
    pub fn new() -> Self
    {
        Self::with_backend(PosixSignals)
    }
}

impl Default for HandlerRegistry<PosixSignals>
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl<B: SignalBackend> HandlerRegistry<B>
{
    /// Registry over an arbitrary backend
    pub fn with_backend(backend: B) -> Self
    {
        Self {
            backend,
            registrations: [None; FaultKind::COUNT],
        }
    }

    /// The backend this registry talks to
    pub fn backend(&self) -> &B
    {
        &self.backend
    }

    /// Registration recorded for `kind`, if any
    pub fn registration(&self, kind: FaultKind) -> Option<&SignalRegistration>
    {
        self.registrations[kind.index()].as_ref()
    }

    /// All recorded registrations
    pub fn registrations(&self) -> impl Iterator<Item = &SignalRegistration>
    {
        self.registrations.iter().flatten()
    }

    /// Action the OS currently has installed for `kind`
    pub fn current_action(&self, kind: FaultKind) -> FaultResult<SignalAction>
    {
        self.backend.query(kind.signal())
    }

    /// Install `callback` for `kind`, reporting every failure.
    ///
    /// On `HandlerAlreadyInstalled` from the initial query nothing has been
    /// changed, for this kind or any other.
    ///
    /// ## Errors
    ///
    /// - `HandlerAlreadyInstalled`: a non-default action is in place
    /// - `RegistrationMismatch`: the OS does not report `callback` afterwards
    /// - `Os`: a `sigaction` call failed
    pub fn try_install(&mut self, kind: FaultKind, callback: FaultCallback) -> FaultResult<&SignalRegistration>
    {
        let signal = kind.signal();

        let existing = self.backend.query(signal)?;
        if has_handler(&existing) {
            return Err(FaultError::HandlerAlreadyInstalled { kind, existing });
        }

        let action = SignalAction::detailed(callback);
        let previous = self.backend.swap(signal, &action)?;
        if has_handler(&previous) {
            return Err(FaultError::HandlerAlreadyInstalled {
                kind,
                existing: previous,
            });
        }

        let installed = self.backend.query(signal)?;
        if !has_handler(&installed) || !installed.matches(callback) {
            return Err(FaultError::RegistrationMismatch {
                kind,
                expected: callback as usize,
                found: installed,
            });
        }

        let registration = SignalRegistration {
            kind,
            action: installed,
            previous,
            mode: installed.mode(),
        };
        debug!(%registration, "fault handler verified");
        let registration = &*self.registrations[kind.index()].insert(registration);
        Ok(registration)
    }

    /// Install `callback` for `kind`.
    ///
    /// A pre-existing handler or a failed postcondition check aborts the
    /// process: a mis-registered fault handler is not something to continue
    /// past.
    ///
    /// ## Errors
    ///
    /// Only `Os` is returned. The caller is expected to report
    /// [`FaultError::os_code`] and terminate.
    pub fn install(&mut self, kind: FaultKind, callback: FaultCallback) -> FaultResult<()>
    {
        match self.try_install(kind, callback) {
            Ok(registration) => {
                info!(kind = %registration.kind, action = %registration.action, "installed fault handler");
                Ok(())
            }
            Err(err) if err.is_fatal() => fatal::abort_on(&err),
            Err(err) => Err(err),
        }
    }

    /// Configure the built-in dispatcher for `kind` and install it.
    ///
    /// ## Errors
    ///
    /// Same as [`HandlerRegistry::install`].
    pub fn install_dispatcher(&mut self, kind: FaultKind, options: DispatchOptions) -> FaultResult<()>
    {
        dispatcher::configure(kind, options);
        self.install(kind, dispatcher::callback_for(kind))
    }

    /// Re-register the default action for `kind`.
    ///
    /// Returns the action that was discarded. The Rust runtime installs its
    /// own `SIGSEGV`/`SIGBUS` handler for stack overflow detection; a host that
    /// takes over those signals resets them here first, knowing it loses that
    /// report.
    ///
    /// ## Errors
    ///
    /// - `Os`: the `sigaction` call failed
    pub fn reset(&mut self, kind: FaultKind) -> FaultResult<SignalAction>
    {
        let discarded = self.backend.swap(kind.signal(), &SignalAction::DEFAULT)?;
        self.registrations[kind.index()] = None;
        if has_handler(&discarded) {
            warn!(%kind, %discarded, "reset fault action to default");
        }
        Ok(discarded)
    }
}

impl<B: SignalBackend + fmt::Debug> fmt::Debug for HandlerRegistry<B>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("HandlerRegistry")
            .field("backend", &self.backend)
            .field("registrations", &self.registrations)
            .finish()
    }
}
