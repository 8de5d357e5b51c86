//! ---
//! pb_section: "02-workloads"
//! pb_subsection: "module"
//! pb_type: "source"
//! pb_scope: "code"
//! pb_description: "Synthetic workload library entry points."
//! pb_version: "v0.1.0"
//! pb_owner: "tbd"
//! ---
//! Synthetic workloads used to compare execution strategies.
//!
//! Each workload stresses exactly one resource: the ALU ([`compute`]),
//! main-memory bandwidth ([`memory`]) or durable storage writes ([`io`]).
//! Workloads run to completion or fail with a [`WorkloadError`]; progress is
//! pushed through the [`ProgressReporter`] supplied in the [`UnitContext`].

pub mod compute;
pub mod error;
pub mod io;
pub mod kind;
pub mod memory;
pub mod progress;
pub mod settings;
pub mod unit;

pub use error::{Resource, Result, WorkloadError};
pub use kind::{WorkloadKind, WorkloadSpec};
pub use progress::{
    Checkpoint, NullReporter, ProgressReporter, ReportDetail, TracingReporter, WorkloadReport,
};
pub use settings::{
    ComputeSettings, FlushPolicy, IoSettings, MemorySettings, WorkloadSettings, MAX_BLOCK_BYTES,
};
pub use unit::{InjectedFault, UnitContext, UnitIdentity};

/// Run the workload selected by `spec` inside the given unit.
pub fn run_workload(spec: WorkloadSpec, ctx: &UnitContext<'_>) -> Result<WorkloadReport> {
    match spec.kind {
        WorkloadKind::Compute => compute::run(spec.iterations, ctx),
        WorkloadKind::Memory => memory::run(spec.iterations, ctx),
        WorkloadKind::Io => io::run(spec.iterations, ctx),
    }
}

/// Bytes per mebibyte, used for human-readable sizes in log output.
pub const MIB: u64 = 1024 * 1024;
