//! ---
//! pb_section: "02-workloads"
//! pb_subsection: "module"
//! pb_type: "source"
//! pb_scope: "code"
//! pb_description: "ALU-bound arithmetic workload."
//! pb_version: "v0.1.0"
//! pb_owner: "tbd"
//! ---
//! Pure arithmetic accumulation with no memory or I/O traffic beyond
//! registers. Scales with the number of cores available to the units.

use std::hint::black_box;

use tracing::info;

use crate::error::Result;
use crate::kind::WorkloadKind;
use crate::progress::{Progress, ReportDetail, WorkloadReport};
use crate::unit::UnitContext;

pub fn run(iterations: u64, ctx: &UnitContext<'_>) -> Result<WorkloadReport> {
    let inner_steps = ctx.settings.compute.inner_steps;
    info!(unit = ctx.index, identity = %ctx.identity, iterations, "starting CPU-intensive workload");

    let mut progress = Progress::new(ctx, WorkloadKind::Compute, iterations);
    let mut accumulator = 0u64;
    for i in 1..=iterations {
        accumulator = accumulator.wrapping_add(square_sum(inner_steps));
        progress.tick(i);
    }
    let accumulator = black_box(accumulator);

    let report = WorkloadReport {
        kind: WorkloadKind::Compute,
        iterations,
        checkpoints: progress.emitted(),
        detail: ReportDetail::Compute { accumulator },
    };
    ctx.reporter.finished(ctx.index, &report);
    Ok(report)
}

/// Sum of `j * j` for `j` in `0..steps`; every partial sum passes through
/// `black_box` so the loop survives optimisation.
fn square_sum(steps: u64) -> u64 {
    let mut sum = 0u64;
    for j in 0..steps {
        sum = black_box(sum.wrapping_add(j.wrapping_mul(j)));
    }
    sum
}
