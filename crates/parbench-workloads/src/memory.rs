//! ---
//! pb_section: "02-workloads"
//! pb_subsection: "module"
//! pb_type: "source"
//! pb_scope: "code"
//! pb_description: "Main-memory bandwidth workload."
//! pb_version: "v0.1.0"
//! pb_owner: "tbd"
//! ---
//! Strided writes over a buffer much larger than the last-level cache. One
//! byte per cache line is written so nearly every store misses the cache;
//! concurrent units contend for memory channels rather than cores.
//!
//! The buffer is zero-filled once when allocated. That fill faults in every
//! page before the first pass, so the counted passes measure steady-state
//! bandwidth; the fill itself is not counted as a pass and emits no progress.

use std::hint::black_box;

use tracing::{error, info};

use crate::error::{Resource, Result, WorkloadError};
use crate::kind::WorkloadKind;
use crate::progress::{Progress, ReportDetail, WorkloadReport};
use crate::unit::UnitContext;
use crate::MIB;

pub fn run(passes: u64, ctx: &UnitContext<'_>) -> Result<WorkloadReport> {
    let settings = &ctx.settings.memory;
    info!(unit = ctx.index, identity = %ctx.identity, "starting memory-intensive workload");
    info!(
        unit = ctx.index,
        buffer_mb = settings.buffer_bytes / MIB,
        "allocating {} MB of memory",
        settings.buffer_bytes / MIB
    );

    ctx.acquire(Resource::Memory)?;
    let mut store = allocate(settings.buffer_bytes, 0, ctx.index).inspect_err(|_| {
        error!(unit = ctx.index, identity = %ctx.identity, bytes = settings.buffer_bytes, "memory allocation failed");
    })?;
    info!(unit = ctx.index, passes, "memory allocated; starting passes");

    // Validated settings guarantee stride fits in usize.
    let stride = settings.stride as usize;
    let mut progress = Progress::new(ctx, WorkloadKind::Memory, passes);
    for pass in 1..=passes {
        stride_pass(&mut store, stride);
        black_box(store.as_mut_slice());
        progress.tick(pass);
    }
    drop(store);

    let report = WorkloadReport {
        kind: WorkloadKind::Memory,
        iterations: passes,
        checkpoints: progress.emitted(),
        detail: ReportDetail::Memory {
            buffer_bytes: settings.buffer_bytes,
            stride: settings.stride,
        },
    };
    ctx.reporter.finished(ctx.index, &report);
    Ok(report)
}

/// Buffer of `bytes` set to `fill`, reporting allocator refusal instead of
/// aborting.
pub(crate) fn allocate(bytes: u64, fill: u8, unit: usize) -> Result<Vec<u8>> {
    let failed = || WorkloadError::MemoryAllocation { unit, bytes };
    let len = usize::try_from(bytes).map_err(|_| failed())?;
    let mut store = Vec::new();
    store.try_reserve_exact(len).map_err(|_| failed())?;
    store.resize(len, fill);
    Ok(store)
}

/// One pass over `buf`: every `stride`-th byte receives its offset mod 256.
pub fn stride_pass(buf: &mut [u8], stride: usize) {
    for offset in (0..buf.len()).step_by(stride) {
        buf[offset] = offset as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NullReporter;
    use crate::settings::WorkloadSettings;
    use crate::unit::{InjectedFault, UnitIdentity};

    #[test]
    fn one_pass_writes_offset_mod_256_on_cache_line_boundaries() {
        let mut buf = vec![0u8; 64 * 1024];
        stride_pass(&mut buf, 64);
        for (offset, byte) in buf.iter().enumerate() {
            if offset % 64 == 0 {
                assert_eq!(*byte as usize, offset % 256, "offset {}", offset);
            } else {
                assert_eq!(*byte, 0, "offset {} should be untouched", offset);
            }
        }
    }

    #[test]
    fn small_buffer_run_completes() {
        let mut settings = WorkloadSettings::default();
        settings.memory.buffer_bytes = 4096;
        let ctx = UnitContext::new(2, UnitIdentity::thread(2), &settings, &NullReporter);
        let report = run(1000, &ctx).unwrap();
        assert_eq!(report.checkpoints, 2);
        assert_eq!(report.iterations, 1000);
    }

    #[test]
    fn oversized_allocation_is_reported_not_aborted() {
        let err = allocate(u64::MAX, 0, 4).unwrap_err();
        assert!(matches!(
            err,
            WorkloadError::MemoryAllocation {
                unit: 4,
                bytes: u64::MAX
            }
        ));
        assert_eq!(allocate(8, b'A', 0).unwrap(), vec![b'A'; 8]);
    }

    #[test]
    fn injected_fault_fails_before_allocation() {
        let settings = WorkloadSettings::default();
        let ctx = UnitContext::new(1, UnitIdentity::thread(1), &settings, &NullReporter)
            .with_fault(Some(InjectedFault::ResourceAcquisition));
        let err = run(1, &ctx).unwrap_err();
        assert_eq!(err.acquisition_resource(), Some(Resource::Memory));
    }
}
