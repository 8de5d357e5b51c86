//! ---
//! pb_section: "02-workloads"
//! pb_subsection: "module"
//! pb_type: "source"
//! pb_scope: "code"
//! pb_description: "Durable block-write workload."
//! pb_version: "v0.1.0"
//! pb_owner: "tbd"
//! ---
//! Writes fixed-size blocks to a unit-private file and flushes each block
//! before writing the next, so throughput is bounded by the storage stack
//! serialising synchronous writes from all units.

use std::fs::File;
use std::io::Write;

use tracing::{error, info};

use crate::error::{Resource, Result, WorkloadError};
use crate::kind::WorkloadKind;
use crate::memory::allocate;
use crate::progress::{Progress, ReportDetail, WorkloadReport};
use crate::unit::UnitContext;

const FILL_BYTE: u8 = b'A';

pub fn run(blocks: u64, ctx: &UnitContext<'_>) -> Result<WorkloadReport> {
    let settings = &ctx.settings.io;
    let path = settings.output_dir.join(ctx.identity.io_file_name());
    info!(unit = ctx.index, identity = %ctx.identity, "starting I/O-intensive workload");
    info!(unit = ctx.index, path = %path.display(), "creating file");

    ctx.acquire(Resource::File)?;
    // The block is allocated before the file exists so a refused allocation
    // leaves no artifact behind.
    let block = allocate(settings.block_bytes, FILL_BYTE, ctx.index).inspect_err(|_| {
        error!(unit = ctx.index, identity = %ctx.identity, bytes = settings.block_bytes, "block allocation failed");
    })?;
    let mut file = File::create(&path).map_err(|source| {
        error!(unit = ctx.index, identity = %ctx.identity, path = %path.display(), error = %source, "file creation failed");
        WorkloadError::FileCreation {
            unit: ctx.index,
            path: path.clone(),
            source,
        }
    })?;

    info!(
        unit = ctx.index,
        blocks,
        block_bytes = settings.block_bytes,
        flush = ?settings.flush,
        "writing {} blocks",
        blocks
    );

    let mut progress = Progress::new(ctx, WorkloadKind::Io, blocks);
    for i in 1..=blocks {
        file.write_all(&block)
            .and_then(|()| settings.flush.apply(&mut file))
            .map_err(|source| WorkloadError::Write {
                unit: ctx.index,
                path: path.clone(),
                source,
            })?;
        progress.tick(i);
    }
    drop(file);

    let report = WorkloadReport {
        kind: WorkloadKind::Io,
        iterations: blocks,
        checkpoints: progress.emitted(),
        detail: ReportDetail::Io {
            path,
            bytes_written: blocks.saturating_mul(settings.block_bytes),
        },
    };
    ctx.reporter.finished(ctx.index, &report);
    Ok(report)
}
