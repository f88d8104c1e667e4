//! Common module for library exports

pub use crate::classify::{classify, Diagnosis};
pub use crate::context::ExecutionContext;
pub use crate::dispatcher::{DispatchOptions, DispatchOutcome, DispatchState};
pub use crate::error::{FaultError, FaultResult};
pub use crate::journal::{FaultRecord, JOURNAL};
pub use crate::recovery::RecoveryPolicy;
pub use crate::registry::{HandlerRegistry, SignalBackend, SignalRegistration};
pub use crate::report::FaultReport;
pub use crate::types::{Address, DispatchMode, FaultCallback, FaultKind, FaultMetadata, SignalAction};
