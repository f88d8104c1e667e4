//! Fault kinds and per-occurrence fault metadata.

use std::fmt;
use std::str::FromStr;

use libc::c_int;

use super::Address;
use crate::error::FaultError;

/// Hardware fault kinds the dispatcher can recover from
///
/// Each kind corresponds to exactly one synchronous POSIX signal:
///
/// | Kind                  | Signal    |
/// |-----------------------|-----------|
/// | `InvalidMemoryAccess` | `SIGSEGV` |
/// | `IllegalInstruction`  | `SIGILL`  |
/// | `BusError`            | `SIGBUS`  |
/// | `ArithmeticError`     | `SIGFPE`  |
///
/// The discriminant doubles as the index into per-kind tables (dispatcher
/// slots, registrations), so it must stay dense and start at zero.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FaultKind
{
    /// Invalid memory access (`SIGSEGV`)
    InvalidMemoryAccess = 0,
    /// Illegal instruction (`SIGILL`)
    IllegalInstruction = 1,
    /// Bus error (`SIGBUS`)
    BusError = 2,
    /// Arithmetic error (`SIGFPE`)
    ArithmeticError = 3,
}

impl FaultKind
{
    /// Number of fault kinds
    pub const COUNT: usize = 4;

    /// Every fault kind, in discriminant order
    pub const ALL: [FaultKind; Self::COUNT] = [
        FaultKind::InvalidMemoryAccess,
        FaultKind::IllegalInstruction,
        FaultKind::BusError,
        FaultKind::ArithmeticError,
    ];

    /// Signal number delivered for this kind
    pub const fn signal(self) -> c_int
    {
        match self {
            FaultKind::InvalidMemoryAccess => libc::SIGSEGV,
            FaultKind::IllegalInstruction => libc::SIGILL,
            FaultKind::BusError => libc::SIGBUS,
            FaultKind::ArithmeticError => libc::SIGFPE,
        }
    }

    /// Map a signal number back to its fault kind
    pub const fn from_signal(signal: c_int) -> Option<Self>
    {
        match signal {
            libc::SIGSEGV => Some(FaultKind::InvalidMemoryAccess),
            libc::SIGILL => Some(FaultKind::IllegalInstruction),
            libc::SIGBUS => Some(FaultKind::BusError),
            libc::SIGFPE => Some(FaultKind::ArithmeticError),
            _ => None,
        }
    }

    /// Map a discriminant back to its fault kind
    pub const fn from_repr(repr: u8) -> Option<Self>
    {
        match repr {
            0 => Some(FaultKind::InvalidMemoryAccess),
            1 => Some(FaultKind::IllegalInstruction),
            2 => Some(FaultKind::BusError),
            3 => Some(FaultKind::ArithmeticError),
            _ => None,
        }
    }

    /// Dense index of this kind
    pub const fn index(self) -> usize
    {
        self as usize
    }

    /// Conventional signal name, e.g. `"SIGSEGV"`
    pub const fn signal_name(self) -> &'static str
    {
        match self {
            FaultKind::InvalidMemoryAccess => "SIGSEGV",
            FaultKind::IllegalInstruction => "SIGILL",
            FaultKind::BusError => "SIGBUS",
            FaultKind::ArithmeticError => "SIGFPE",
        }
    }

    /// Human-readable name, e.g. `"invalid memory access"`
    pub const fn description(self) -> &'static str
    {
        match self {
            FaultKind::InvalidMemoryAccess => "invalid memory access",
            FaultKind::IllegalInstruction => "illegal instruction",
            FaultKind::BusError => "bus error",
            FaultKind::ArithmeticError => "arithmetic error",
        }
    }

    /// Whether the kernel fills `si_addr` for this kind.
    pub const fn carries_address(self) -> bool
    {
        crate::constants::is_address_bearing(self.signal())
    }
}

impl fmt::Display for FaultKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{} ({})", self.description(), self.signal_name())
    }
}

impl FromStr for FaultKind
{
    type Err = FaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.trim().to_ascii_lowercase().as_str() {
            "segv" | "sigsegv" | "invalid-memory-access" => Ok(FaultKind::InvalidMemoryAccess),
            "ill" | "sigill" | "illegal-instruction" => Ok(FaultKind::IllegalInstruction),
            "bus" | "sigbus" | "bus-error" => Ok(FaultKind::BusError),
            "fpe" | "sigfpe" | "arithmetic-error" => Ok(FaultKind::ArithmeticError),
            _ => Err(FaultError::UnknownKind(s.to_string())),
        }
    }
}

/// Immutable record of one fault occurrence
///
/// Built from the `siginfo_t` the OS hands to the handler (see
/// [`read_fault_metadata`](crate::context::read_fault_metadata)), or directly
/// with the builder methods when classifying offline or in tests.
///
/// ```rust
/// use faultline_core::constants::SEGV_MAPERR;
/// use faultline_core::types::{Address, FaultKind, FaultMetadata};
///
/// let metadata = FaultMetadata::new(FaultKind::InvalidMemoryAccess, SEGV_MAPERR).with_address(Address::from(0x42));
/// assert_eq!(metadata.signal, libc::SIGSEGV);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultMetadata
{
    /// Fault kind
    pub kind: FaultKind,
    /// Signal number as delivered
    pub signal: c_int,
    /// Faulting address (`si_addr`), present for address-bearing signals
    pub faulting_address: Option<Address>,
    /// Platform cause code (`si_code`)
    pub cause_code: c_int,
    /// Auxiliary errno (`si_errno`)
    pub errno: c_int,
}

impl FaultMetadata
{
    /// Metadata for `kind` with the given cause code and no address
    pub const fn new(kind: FaultKind, cause_code: c_int) -> Self
    {
        Self {
            kind,
            signal: kind.signal(),
            faulting_address: None,
            cause_code,
            errno: 0,
        }
    }

    /// Attach a faulting address
    #[must_use]
    pub const fn with_address(mut self, address: Address) -> Self
    {
        self.faulting_address = Some(address);
        self
    }

    /// Attach an auxiliary errno
    #[must_use]
    pub const fn with_errno(mut self, errno: c_int) -> Self
    {
        self.errno = errno;
        self
    }
}
