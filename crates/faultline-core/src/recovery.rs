//! # Recovery Policy
//!
//! Decides where a faulting thread resumes.
//!
//! The policy does not decode the faulting instruction. It skips a fixed
//! number of bytes, one by default. For a multi-byte instruction that lands
//! mid-instruction: `movl $0xdeadbeef,(%rax)` is `c7 00 ef be ad de`, so a
//! one-byte skip resumes at `00 ef` (`add %ch,%bh`) and whatever the
//! remaining bytes decode to. That may fault again or silently corrupt
//! registers. An exact resume point would need an instruction-length decoder.
//!
//! The skip width is configurable because the right value is architecture
//! specific (aarch64 instructions are always 4 bytes).

use crate::classify::Diagnosis;
use crate::types::Address;

/// Default number of bytes skipped past the faulting instruction pointer
pub const DEFAULT_SKIP_BYTES: u64 = 1;

/// Fixed-width skip past the faulting instruction pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryPolicy
{
    skip_bytes: u64,
}

impl RecoveryPolicy
{
    /// Policy that skips `bytes` bytes
    pub const fn skip(bytes: u64) -> Self
    {
        Self { skip_bytes: bytes }
    }

    /// Number of bytes skipped
    pub const fn skip_bytes(&self) -> u64
    {
        self.skip_bytes
    }

    /// Address the thread should resume at.
    ///
    /// Pure and total: the diagnosis is advisory and never changes the result,
    /// and the addition wraps.
    ///
    /// ```rust
    /// use faultline_core::classify::classify;
    /// use faultline_core::recovery::RecoveryPolicy;
    /// use faultline_core::types::{Address, FaultKind, FaultMetadata};
    ///
    /// let diagnosis = classify(&FaultMetadata::new(FaultKind::IllegalInstruction, 0));
    /// let ip = Address::from(0x5555_0000);
    /// assert_eq!(RecoveryPolicy::default().compute_resume_point(ip, &diagnosis), ip + 1);
    /// ```
    pub fn compute_resume_point(&self, current: Address, _diagnosis: &Diagnosis) -> Address
    {
        current + self.skip_bytes
    }
}

impl Default for RecoveryPolicy
{
    fn default() -> Self
    {
        Self::skip(DEFAULT_SKIP_BYTES)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::classify::classify;
    use crate::constants::SEGV_MAPERR;
    use crate::types::{FaultKind, FaultMetadata};

    #[test]
    fn test_default_skips_one_byte()
    {
        let policy = RecoveryPolicy::default();
        for kind in FaultKind::ALL {
            for code in [-1, 0, 1, 5, 0x80] {
                let diagnosis = classify(&FaultMetadata::new(kind, code));
                for ip in [0, 1, 0x42, 0x7fff_ffff_f000, u64::MAX - 1] {
                    let ip = Address::new(ip);
                    assert_eq!(policy.compute_resume_point(ip, &diagnosis), ip + 1);
                }
            }
        }
    }

    #[test]
    fn test_wraps_at_top_of_address_space()
    {
        let diagnosis = classify(&FaultMetadata::new(FaultKind::InvalidMemoryAccess, SEGV_MAPERR));
        let resumed = RecoveryPolicy::default().compute_resume_point(Address::new(u64::MAX), &diagnosis);
        assert_eq!(resumed, Address::ZERO);
    }

    #[test]
    fn test_configured_width()
    {
        let diagnosis = classify(&FaultMetadata::new(FaultKind::IllegalInstruction, 0));
        let policy = RecoveryPolicy::skip(4);
        assert_eq!(policy.skip_bytes(), 4);
        assert_eq!(
            policy.compute_resume_point(Address::new(0x1000), &diagnosis),
            Address::new(0x1004)
        );
    }
}
