//! # faultline Utilities
//!
//! Shared logging and config helpers for faultline.
//!
//! Everything here runs in normal thread context. Code reachable from a
//! fault handler lives in `faultline-core` and does not depend on this crate.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{init_logging, init_logging_to_dir, init_logging_with_level, LogFormat, LogLevel, LoggingError};
pub use tracing::{debug, error, info, trace, warn};
