//! ---
//! pb_section: "04-execution-harness"
//! pb_subsection: "module"
//! pb_type: "source"
//! pb_scope: "code"
//! pb_description: "Configuration errors raised before any unit is launched."
//! pb_version: "v0.1.0"
//! pb_owner: "tbd"
//! ---
use parbench_workloads::{WorkloadError, WorkloadKind};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HarnessError>;

/// Errors the harness reports before launching anything. Failures of
/// individual units never surface here; they are recorded per unit.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("number of units must be at least {minimum} (provided: {requested})")]
    UnitCountTooSmall { requested: i64, minimum: usize },
    #[error("invalid number of units '{0}'")]
    MalformedUnitCount(String),
    #[error("invalid worker type '{0}' (expected cpu, mem or io)")]
    UnrecognizedKind(String),
    #[error("fault injection targets unit {index} but only {count} units are launched")]
    FaultOutOfRange { index: usize, count: usize },
    #[error("fault injection targets unit {index} but '{kind}' workers acquire no resource")]
    FaultWithoutAcquisition { index: usize, kind: WorkloadKind },
    #[error("isolated strategy requires a worker executable")]
    MissingWorkerCommand,
    #[error("invalid workload configuration: {0}")]
    Workload(#[from] WorkloadError),
    #[error("worker payload error: {0}")]
    Payload(#[from] serde_json::Error),
}
