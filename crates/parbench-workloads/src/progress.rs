//! ---
//! pb_section: "02-workloads"
//! pb_subsection: "module"
//! pb_type: "source"
//! pb_scope: "code"
//! pb_description: "Progress reporting and workload completion reports."
//! pb_version: "v0.1.0"
//! pb_owner: "tbd"
//! ---
use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use crate::kind::WorkloadKind;
use crate::unit::UnitContext;
use crate::MIB;

/// Periodic progress notification emitted by a running unit.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    pub unit: usize,
    pub kind: WorkloadKind,
    pub current: u64,
    pub total: u64,
}

/// Sink for unit progress. Implementations must tolerate concurrent calls
/// from every unit of a shared-strategy run.
pub trait ProgressReporter: Send + Sync {
    fn checkpoint(&self, checkpoint: &Checkpoint);

    fn finished(&self, _unit: usize, _report: &WorkloadReport) {}
}

/// Forwards progress to `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn checkpoint(&self, checkpoint: &Checkpoint) {
        info!(
            unit = checkpoint.unit,
            kind = %checkpoint.kind,
            current = checkpoint.current,
            total = checkpoint.total,
            "{} worker progress: {}/{}",
            checkpoint.kind,
            checkpoint.current,
            checkpoint.total
        );
    }

    fn finished(&self, unit: usize, report: &WorkloadReport) {
        match &report.detail {
            ReportDetail::Compute { .. } => {
                info!(unit, kind = %report.kind, "CPU worker completed successfully");
            }
            ReportDetail::Memory { buffer_bytes, .. } => {
                info!(unit, kind = %report.kind, buffer_mb = buffer_bytes / MIB, "memory worker completed successfully");
            }
            ReportDetail::Io {
                path,
                bytes_written,
            } => {
                info!(
                    unit,
                    kind = %report.kind,
                    path = %path.display(),
                    bytes_written,
                    "I/O worker completed! Total written: {:.2} MB",
                    *bytes_written as f64 / MIB as f64
                );
            }
        }
    }
}

/// Discards all progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn checkpoint(&self, _checkpoint: &Checkpoint) {}
}

/// Summary returned by a workload that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkloadReport {
    pub kind: WorkloadKind,
    pub iterations: u64,
    pub checkpoints: u64,
    pub detail: ReportDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReportDetail {
    /// `accumulator` is the observable sink for the arithmetic loop.
    Compute { accumulator: u64 },
    Memory { buffer_bytes: u64, stride: u64 },
    Io { path: PathBuf, bytes_written: u64 },
}

/// Cadence tracker that emits a checkpoint every `interval` iterations.
pub(crate) struct Progress<'c> {
    reporter: &'c dyn ProgressReporter,
    unit: usize,
    kind: WorkloadKind,
    total: u64,
    interval: u64,
    emitted: u64,
}

impl<'c> Progress<'c> {
    pub(crate) fn new(ctx: &'c UnitContext<'_>, kind: WorkloadKind, total: u64) -> Self {
        Self {
            reporter: ctx.reporter,
            unit: ctx.index,
            kind,
            total,
            interval: ctx.settings.progress_interval.max(1),
            emitted: 0,
        }
    }

    /// Record that iteration `current` (1-based) completed.
    pub(crate) fn tick(&mut self, current: u64) {
        if current % self.interval == 0 {
            self.emitted += 1;
            self.reporter.checkpoint(&Checkpoint {
                unit: self.unit,
                kind: self.kind,
                current,
                total: self.total,
            });
        }
    }

    pub(crate) fn emitted(&self) -> u64 {
        self.emitted
    }
}
