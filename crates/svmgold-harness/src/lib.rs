#![forbid(unsafe_code)]

//! Golden-master orchestration for symbolic exploration runs.
//!
//! A [`RunSession`] walks a [`TestRegistry`], asks an [`Explorer`] for each
//! method's outcome, compares it with the recorded gold value through the
//! [`Orchestrator`], and aggregates engine faults into a
//! [`StatisticsReport`].

pub mod config;
pub mod error;
pub mod explorer;
pub mod fixtures;
pub mod jsonl;
pub mod orchestrator;
pub mod registry;
pub mod run;
pub mod statistics;

pub use config::HarnessConfig;
pub use error::{HarnessError, Result};
pub use explorer::{CommandExplorer, Explorer, Fault, FnExplorer, StackFrame};
pub use jsonl::EventLog;
pub use orchestrator::{HostOutcome, MethodState, Orchestrator, SKIP_REASON, TestReport};
pub use registry::{RegisteredMethod, TestGroup, TestRegistry};
pub use run::{RunSession, RunSummary};
pub use statistics::{ExceptionAggregator, ExceptionInfo, SharedAggregator, StatisticsReport};
