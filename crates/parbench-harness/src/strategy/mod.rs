//! ---
//! pb_section: "04-execution-harness"
//! pb_subsection: "module"
//! pb_type: "source"
//! pb_scope: "code"
//! pb_description: "Execution strategies hosting units as processes or threads."
//! pb_version: "v0.1.0"
//! pb_owner: "tbd"
//! ---
//! Strategies decide what an execution unit *is*. The harness only launches
//! units through [`ExecutionStrategy::launch`] and later joins the returned
//! [`LaunchedUnit`]s; it never inspects how they are hosted.

mod isolated;
mod shared;

use std::io;
use std::sync::Arc;

use parbench_common::StrategyKind;
use parbench_workloads::{ProgressReporter, WorkloadSettings};

use crate::error::{HarnessError, Result};
use crate::unit::{RunResult, UnitAssignment};

pub use isolated::{IsolatedStrategy, WorkerCommand};
pub use shared::SharedStrategy;

/// Which units a fatal fault can take down.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FaultDomain {
    /// Every unit is its own fault domain.
    PerUnit,
    /// All units share the harness process as one fault domain.
    HostProcess,
}

impl FaultDomain {
    pub fn describe(&self) -> &'static str {
        match self {
            FaultDomain::PerUnit => {
                "each unit owns its address space; a fatal fault terminates only that unit"
            }
            FaultDomain::HostProcess => {
                "units share one address space; panics are contained per unit, but an abort \
                 or OOM kill in any unit terminates every unit and the harness"
            }
        }
    }
}

/// Hosts execution units of one kind.
pub trait ExecutionStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    fn fault_domain(&self) -> FaultDomain;

    /// Start one unit without waiting for it.
    fn launch(&self, assignment: UnitAssignment) -> io::Result<Box<dyn LaunchedUnit>>;
}

/// A running unit owned by the harness until it is joined.
pub trait LaunchedUnit: Send {
    fn index(&self) -> usize;

    /// Opaque platform handle, for diagnostics.
    fn handle(&self) -> String;

    /// Block until the unit terminates and classify its outcome.
    fn join(self: Box<Self>) -> RunResult;
}

/// Build the strategy selected by `kind`. The isolated strategy needs the
/// command that re-enters this program in worker mode.
pub fn build_strategy(
    kind: StrategyKind,
    settings: WorkloadSettings,
    reporter: Arc<dyn ProgressReporter>,
    worker: Option<WorkerCommand>,
) -> Result<Box<dyn ExecutionStrategy>> {
    settings.validate()?;
    match kind {
        StrategyKind::Isolated => {
            let worker = worker.ok_or(HarnessError::MissingWorkerCommand)?;
            Ok(Box::new(IsolatedStrategy::new(worker, settings)))
        }
        StrategyKind::Shared => Ok(Box::new(SharedStrategy::new(settings, reporter))),
    }
}
