//! # Types
//!
//! Platform-agnostic types used throughout faultline.
//!
//! These types keep raw `siginfo_t` / `sigaction` details out of the
//! classifier, the recovery policy and the registry bookkeeping.

pub mod action;
pub mod address;
pub mod fault;

// Re-export all public types
pub use action::{DispatchMode, FaultCallback, SignalAction};
pub use address::Address;
pub use fault::{FaultKind, FaultMetadata};
