//! ---
//! pb_section: "04-execution-harness"
//! pb_subsection: "module"
//! pb_type: "source"
//! pb_scope: "code"
//! pb_description: "Process-per-unit execution strategy."
//! pb_version: "v0.1.0"
//! pb_owner: "tbd"
//! ---
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};

use parbench_common::StrategyKind;
use parbench_workloads::WorkloadSettings;
use tracing::debug;

use super::{ExecutionStrategy, FaultDomain, LaunchedUnit};
use crate::unit::{RunResult, UnitAssignment, UnitErrorKind};
use crate::worker::{error_for_exit_code, WorkerPayload};

/// Program and leading arguments that start a worker; the payload flag is
/// appended per unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Re-enter the running executable through its `worker` subcommand.
    pub fn current_exe() -> io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?).arg("worker"))
    }
}

/// Each unit is a child process with its own address space and limits.
#[derive(Debug)]
pub struct IsolatedStrategy {
    worker: WorkerCommand,
    settings: WorkloadSettings,
}

impl IsolatedStrategy {
    pub fn new(worker: WorkerCommand, settings: WorkloadSettings) -> Self {
        Self { worker, settings }
    }
}

impl ExecutionStrategy for IsolatedStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Isolated
    }

    fn fault_domain(&self) -> FaultDomain {
        FaultDomain::PerUnit
    }

    fn launch(&self, assignment: UnitAssignment) -> io::Result<Box<dyn LaunchedUnit>> {
        let payload = WorkerPayload::from_assignment(&assignment, &self.settings)
            .encode()
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
        let child = Command::new(&self.worker.program)
            .args(&self.worker.args)
            .arg("--payload")
            .arg(payload)
            .stdin(Stdio::null())
            .spawn()?;
        debug!(unit = assignment.index, pid = child.id(), "worker process spawned");
        Ok(Box::new(ChildUnit {
            index: assignment.index,
            child,
        }))
    }
}

struct ChildUnit {
    index: usize,
    child: Child,
}

impl LaunchedUnit for ChildUnit {
    fn index(&self) -> usize {
        self.index
    }

    fn handle(&self) -> String {
        format!("pid {}", self.child.id())
    }

    fn join(mut self: Box<Self>) -> RunResult {
        let handle = Some(self.handle());
        match self.child.wait() {
            Ok(status) => match classify_exit(status) {
                None => RunResult::succeeded(self.index, handle),
                Some(error) => RunResult::failed(self.index, handle, error),
            },
            Err(err) => RunResult::failed(
                self.index,
                handle,
                UnitErrorKind::JoinFailed {
                    reason: err.to_string(),
                },
            ),
        }
    }
}

fn classify_exit(status: ExitStatus) -> Option<UnitErrorKind> {
    if let Some(code) = status.code() {
        return error_for_exit_code(code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Some(UnitErrorKind::Signaled { signal });
        }
    }
    Some(UnitErrorKind::ExitStatus { code: -1 })
}
