//! Signal actions as seen by the registry.

use std::ffi::c_void;
use std::fmt;

use libc::c_int;

/// Signature of a fault callback installed with `SA_SIGINFO`.
///
/// Arguments are the signal number, the `siginfo_t` describing the fault and
/// the saved `ucontext_t`. Both pointers are only valid for the duration of
/// the call.
pub type FaultCallback = extern "C" fn(c_int, *mut libc::siginfo_t, *mut c_void);

/// How the OS delivers a signal to the installed handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode
{
    /// `sa_handler`: the handler only receives the signal number
    Bare,
    /// `sa_sigaction` with `SA_SIGINFO`: metadata and context are delivered
    Detailed,
}

impl DispatchMode
{
    /// Dispatch mode encoded in raw `sa_flags`
    pub const fn from_flags(flags: c_int) -> Self
    {
        if flags & libc::SA_SIGINFO != 0 {
            DispatchMode::Detailed
        } else {
            DispatchMode::Bare
        }
    }
}

/// Platform-agnostic snapshot of a `struct sigaction`
///
/// Only the parts the registry reasons about are kept: the handler slot
/// (which doubles as `SIG_DFL`/`SIG_IGN`) and the flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalAction
{
    /// Raw handler value (`sa_sigaction` / `sa_handler`)
    pub handler: usize,
    /// Raw `sa_flags`
    pub flags: c_int,
}

impl SignalAction
{
    /// The default action (`SIG_DFL`, no flags)
    pub const DEFAULT: Self = Self {
        handler: libc::SIG_DFL,
        flags: 0,
    };

    /// The ignore action (`SIG_IGN`)
    pub const IGNORE: Self = Self {
        handler: libc::SIG_IGN,
        flags: 0,
    };

    /// Action that delivers metadata and context to `callback`
    pub fn detailed(callback: FaultCallback) -> Self
    {
        Self {
            handler: callback as usize,
            flags: libc::SA_SIGINFO,
        }
    }

    /// Dispatch mode of this action
    pub const fn mode(&self) -> DispatchMode
    {
        DispatchMode::from_flags(self.flags)
    }

    /// Whether this is `SIG_DFL`
    pub const fn is_default(&self) -> bool
    {
        self.handler == libc::SIG_DFL
    }

    /// Whether this is `SIG_IGN`
    pub const fn is_ignore(&self) -> bool
    {
        self.handler == libc::SIG_IGN
    }

    /// Whether this action delivers to exactly `callback` in detailed mode
    pub fn matches(&self, callback: FaultCallback) -> bool
    {
        matches!(self.mode(), DispatchMode::Detailed) && self.handler == callback as usize
    }
}

impl Default for SignalAction
{
    fn default() -> Self
    {
        Self::DEFAULT
    }
}

impl fmt::Display for SignalAction
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        if self.is_default() {
            return f.write_str("default");
        }
        if self.is_ignore() {
            return f.write_str("ignore");
        }
        match self.mode() {
            DispatchMode::Detailed => write!(f, "sa_sigaction at {:#x}", self.handler),
            DispatchMode::Bare => write!(f, "sa_handler at {:#x}", self.handler),
        }
    }
}
