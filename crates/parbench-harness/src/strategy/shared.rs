//! ---
//! pb_section: "04-execution-harness"
//! pb_subsection: "module"
//! pb_type: "source"
//! pb_scope: "code"
//! pb_description: "Thread-per-unit execution strategy."
//! pb_version: "v0.1.0"
//! pb_owner: "tbd"
//! ---
use std::any::Any;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parbench_common::StrategyKind;
use parbench_workloads::{
    run_workload, ProgressReporter, UnitContext, UnitIdentity, WorkloadReport, WorkloadSettings,
};
use tracing::{debug, error};

use super::{ExecutionStrategy, FaultDomain, LaunchedUnit};
use crate::unit::{RunResult, UnitAssignment, UnitErrorKind};

/// Each unit is a named OS thread inside the harness process.
pub struct SharedStrategy {
    settings: Arc<WorkloadSettings>,
    reporter: Arc<dyn ProgressReporter>,
}

impl SharedStrategy {
    pub fn new(settings: WorkloadSettings, reporter: Arc<dyn ProgressReporter>) -> Self {
        Self {
            settings: Arc::new(settings),
            reporter,
        }
    }
}

impl ExecutionStrategy for SharedStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Shared
    }

    fn fault_domain(&self) -> FaultDomain {
        FaultDomain::HostProcess
    }

    fn launch(&self, assignment: UnitAssignment) -> io::Result<Box<dyn LaunchedUnit>> {
        let name = format!("unit-{}", assignment.index);
        let settings = Arc::clone(&self.settings);
        let reporter = Arc::clone(&self.reporter);
        let handle = thread::Builder::new().name(name.clone()).spawn(move || {
            let ctx = UnitContext::new(
                assignment.index,
                UnitIdentity::thread(assignment.index),
                &settings,
                reporter.as_ref(),
            )
            .with_fault(assignment.fault);
            run_workload(assignment.spec, &ctx).inspect_err(|err| {
                error!(unit = assignment.index, "{}", err);
            })
        })?;
        debug!(unit = assignment.index, thread = %name, "worker thread spawned");
        Ok(Box::new(ThreadUnit {
            index: assignment.index,
            name,
            handle,
        }))
    }
}

struct ThreadUnit {
    index: usize,
    name: String,
    handle: JoinHandle<parbench_workloads::Result<WorkloadReport>>,
}

impl LaunchedUnit for ThreadUnit {
    fn index(&self) -> usize {
        self.index
    }

    fn handle(&self) -> String {
        self.name.clone()
    }

    fn join(self: Box<Self>) -> RunResult {
        let ThreadUnit {
            index,
            name,
            handle,
        } = *self;
        match handle.join() {
            Ok(Ok(_report)) => RunResult::succeeded(index, Some(name)),
            Ok(Err(err)) => {
                RunResult::failed(index, Some(name), UnitErrorKind::from_workload_error(&err))
            }
            Err(panic) => RunResult::failed(
                index,
                Some(name),
                UnitErrorKind::Panicked {
                    message: panic_message(panic.as_ref()),
                },
            ),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
