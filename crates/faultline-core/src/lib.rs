//! # faultline-core
//!
//! Intercept synchronous hardware faults, classify them and resume the
//! faulting thread a fixed number of bytes past the faulting instruction.
//!
//! This crate provides:
//! - Fault handler registration with verified postconditions ([`registry`])
//! - Typed access to `siginfo_t` and the saved instruction pointer ([`context`])
//! - Cause classification for `SIGSEGV`, `SIGILL`, `SIGBUS` and `SIGFPE` ([`classify`])
//! - The recovery policy and the built-in dispatcher ([`recovery`], [`dispatcher`])
//! - A lock-free journal for reporting after the thread has resumed ([`journal`])
//!
//! ## Platform Support
//!
//! - **Linux**: x86_64 and aarch64, via `sigaction(2)` and `ucontext_t`
//! - **macOS**: x86_64 and arm64, via `sigaction(2)` and `__darwin_mcontext64`
//!
//! ## Why unsafe code is needed
//!
//! Fault handlers receive raw pointers to kernel-owned structures, and the
//! only way to change where a thread resumes is to write into the saved
//! machine context. The unsafe code is confined to [`platform`] and
//! [`context`]; everything above works on safe views.
//!
//! ## Example
//!
//! ```rust,no_run
//! use faultline_core::prelude::*;
//!
//! let mut registry = HandlerRegistry::new();
//! registry.reset(FaultKind::InvalidMemoryAccess)?;
//! registry.install_dispatcher(FaultKind::InvalidMemoryAccess, DispatchOptions::default())?;
//!
//! // ... code that may fault ...
//!
//! for record in JOURNAL.drain() {
//!     print!("{}", FaultReport::new(&record));
//! }
//! # Ok::<(), FaultError>(())
//! ```

#![allow(unsafe_code)] // Required for siginfo_t / ucontext_t access

pub mod classify;
pub mod constants;
pub mod context;
pub mod dispatcher;
pub mod error;
mod fatal;
pub mod journal;
pub mod platform;
pub mod prelude;
pub mod recovery;
pub mod registry;
pub mod report;
pub mod types;

// Re-export commonly used types
pub use classify::{classify, Diagnosis};
pub use dispatcher::{DispatchOptions, DispatchOutcome};
pub use error::{FaultError, FaultResult};
pub use journal::{FaultRecord, JOURNAL};
pub use recovery::RecoveryPolicy;
pub use registry::HandlerRegistry;
pub use report::FaultReport;
pub use types::{Address, FaultKind, FaultMetadata};
