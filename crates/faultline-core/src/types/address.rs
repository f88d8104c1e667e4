//! Machine address type.

use std::fmt;
use std::ops::{Add, Sub};

/// Strongly typed machine address
///
/// Used for both faulting data addresses (`si_addr`) and instruction pointer
/// values read from a saved execution context. Keeping them apart from plain
/// `u64` values avoids mixing an address with a skip width or a cause code.
///
/// Arithmetic wraps: the recovery policy must stay total, even for an
/// instruction pointer at the very top of the address space.
///
/// ## Example
///
/// ```rust
/// use faultline_core::types::Address;
///
/// let ip = Address::from(0x1000);
/// assert_eq!((ip + 1).value(), 0x1001);
/// assert!(Address::ZERO.is_null());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(u64);

impl Address
{
    /// The null address (0x0)
    ///
    /// The kernel reports this as the faulting address for faults that have
    /// no meaningful data address, such as a general protection fault.
    pub const ZERO: Self = Address(0);

    /// Create a new address from a `u64` value
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Get the raw `u64` value of this address
    pub const fn value(self) -> u64
    {
        self.0
    }

    /// Whether this is the null address
    pub const fn is_null(self) -> bool
    {
        self.0 == 0
    }

    /// Build an address from a raw pointer
    pub fn from_ptr<T>(ptr: *const T) -> Self
    {
        Address(ptr as usize as u64)
    }

    /// Add an offset to this address, checking for overflow
    ///
    /// ```rust
    /// use faultline_core::types::Address;
    ///
    /// assert_eq!(Address::from(0x1000).checked_add(0x100), Some(Address::from(0x1100)));
    /// assert_eq!(Address::new(u64::MAX).checked_add(1), None);
    /// ```
    pub fn checked_add(self, offset: u64) -> Option<Self>
    {
        self.0.checked_add(offset).map(Address)
    }

    /// Move this address by a signed byte delta, wrapping at the ends of the
    /// address space
    pub const fn wrapping_offset(self, delta: i64) -> Self
    {
        Address(self.0.wrapping_add_signed(delta))
    }

    /// Signed distance from `origin` to this address
    pub fn offset_from(self, origin: Address) -> i64
    {
        self.0.wrapping_sub(origin.0) as i64
    }
}

impl From<u64> for Address
{
    fn from(value: u64) -> Self
    {
        Address(value)
    }
}

impl From<Address> for u64
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::LowerHex for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl Add<u64> for Address
{
    type Output = Address;

    fn add(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_add(rhs))
    }
}

impl Sub<u64> for Address
{
    type Output = Address;

    fn sub(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_sub(rhs))
    }
}
