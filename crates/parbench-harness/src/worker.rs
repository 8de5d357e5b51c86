//! ---
//! pb_section: "04-execution-harness"
//! pb_subsection: "module"
//! pb_type: "source"
//! pb_scope: "code"
//! pb_description: "Worker-process side of the isolated strategy."
//! pb_version: "v0.1.0"
//! pb_owner: "tbd"
//! ---
//! A child process receives its assignment as a JSON payload on the command
//! line, runs the workload once and reports the outcome through its exit
//! status. The exit code table below is the only channel back to the harness.

use parbench_workloads::{
    run_workload, InjectedFault, ProgressReporter, Resource, UnitContext, UnitIdentity,
    WorkloadKind, WorkloadReport, WorkloadSettings, WorkloadSpec,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::Result;
use crate::unit::{UnitAssignment, UnitErrorKind};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_MEMORY_ACQUISITION: i32 = 10;
pub const EXIT_FILE_ACQUISITION: i32 = 11;
pub const EXIT_UNRECOGNIZED_KIND: i32 = 12;
pub const EXIT_WRITE_FAILURE: i32 = 13;
pub const EXIT_INVALID_SETTINGS: i32 = 14;

/// Exit status a worker uses to report `error`.
pub fn exit_code_for(error: &UnitErrorKind) -> i32 {
    match error {
        UnitErrorKind::ResourceAcquisition {
            resource: Resource::Memory,
        } => EXIT_MEMORY_ACQUISITION,
        UnitErrorKind::ResourceAcquisition {
            resource: Resource::File,
        } => EXIT_FILE_ACQUISITION,
        UnitErrorKind::UnrecognizedWorkloadKind => EXIT_UNRECOGNIZED_KIND,
        UnitErrorKind::WriteFailure => EXIT_WRITE_FAILURE,
        UnitErrorKind::InvalidSettings => EXIT_INVALID_SETTINGS,
        _ => EXIT_FAILURE,
    }
}

/// Inverse of [`exit_code_for`]; `None` for a successful exit.
pub fn error_for_exit_code(code: i32) -> Option<UnitErrorKind> {
    match code {
        EXIT_SUCCESS => None,
        EXIT_MEMORY_ACQUISITION => Some(UnitErrorKind::ResourceAcquisition {
            resource: Resource::Memory,
        }),
        EXIT_FILE_ACQUISITION => Some(UnitErrorKind::ResourceAcquisition {
            resource: Resource::File,
        }),
        EXIT_UNRECOGNIZED_KIND => Some(UnitErrorKind::UnrecognizedWorkloadKind),
        EXIT_WRITE_FAILURE => Some(UnitErrorKind::WriteFailure),
        EXIT_INVALID_SETTINGS => Some(UnitErrorKind::InvalidSettings),
        code => Some(UnitErrorKind::ExitStatus { code }),
    }
}

/// Everything a worker process needs; the kind travels as its wire token so a
/// worker can reject tokens it does not know.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerPayload {
    pub index: usize,
    pub kind: String,
    pub iterations: u64,
    #[serde(default)]
    pub fault: Option<InjectedFault>,
    pub settings: WorkloadSettings,
}

impl WorkerPayload {
    pub fn from_assignment(assignment: &UnitAssignment, settings: &WorkloadSettings) -> Self {
        Self {
            index: assignment.index,
            kind: assignment.spec.kind.token().to_owned(),
            iterations: assignment.spec.iterations,
            fault: assignment.fault,
            settings: settings.clone(),
        }
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Run the payload's workload in the current process.
pub fn run_worker(
    payload: &WorkerPayload,
    reporter: &dyn ProgressReporter,
) -> std::result::Result<WorkloadReport, UnitErrorKind> {
    let identity = UnitIdentity::current_process();
    let kind = payload.kind.parse::<WorkloadKind>().map_err(|err| {
        error!(unit = payload.index, %identity, "{}", err);
        UnitErrorKind::from_workload_error(&err)
    })?;
    let spec = WorkloadSpec::new(kind, payload.iterations)
        .and_then(|spec| payload.settings.validate().map(|()| spec))
        .map_err(|err| {
            error!(unit = payload.index, %identity, "{}", err);
            UnitErrorKind::from_workload_error(&err)
        })?;

    let ctx = UnitContext::new(payload.index, identity, &payload.settings, reporter)
        .with_fault(payload.fault);
    run_workload(spec, &ctx).map_err(|err| {
        error!(unit = payload.index, %identity, "{}", err);
        UnitErrorKind::from_workload_error(&err)
    })
}
