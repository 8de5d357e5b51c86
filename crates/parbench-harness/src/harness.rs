//! ---
//! pb_section: "04-execution-harness"
//! pb_subsection: "module"
//! pb_type: "source"
//! pb_scope: "code"
//! pb_description: "Fan-out/join driver and run report."
//! pb_version: "v0.1.0"
//! pb_owner: "tbd"
//! ---
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use chrono::{DateTime, Utc};
use parbench_common::{log_unit_event, StrategyKind, UnitEventOutcome, UnitLogContext};
use parbench_metrics::HarnessMetrics;
use parbench_workloads::{InjectedFault, WorkloadSpec};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{HarnessError, Result};
use crate::strategy::{ExecutionStrategy, FaultDomain, LaunchedUnit};
use crate::unit::{RunResult, UnitAssignment, UnitCount, UnitErrorKind, UnitState};

/// Launches every unit up front, then joins every unit unconditionally.
pub struct Harness {
    strategy: Box<dyn ExecutionStrategy>,
    faults: BTreeSet<usize>,
    metrics: Option<HarnessMetrics>,
}

impl Harness {
    pub fn new(strategy: Box<dyn ExecutionStrategy>) -> Self {
        Self {
            strategy,
            faults: BTreeSet::new(),
            metrics: None,
        }
    }

    /// Force a resource acquisition failure in the listed units.
    pub fn with_faults(mut self, units: impl IntoIterator<Item = usize>) -> Self {
        self.faults.extend(units);
        self
    }

    pub fn with_metrics(mut self, metrics: HarnessMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn strategy(&self) -> StrategyKind {
        self.strategy.kind()
    }

    /// Run `count` units of `spec` and return one result per unit, ordered
    /// by index. Only configuration problems are returned as errors; they
    /// are detected before the first unit is launched.
    pub fn run(&self, spec: WorkloadSpec, count: UnitCount) -> Result<RunReport> {
        let count_value = count.get();
        if let Some(&index) = self.faults.iter().find(|&&index| index >= count_value) {
            return Err(HarnessError::FaultOutOfRange {
                index,
                count: count_value,
            });
        }
        if spec.kind.acquired_resource().is_none() {
            if let Some(&index) = self.faults.iter().next() {
                return Err(HarnessError::FaultWithoutAcquisition {
                    index,
                    kind: spec.kind,
                });
            }
        }

        let strategy = self.strategy.kind();
        let strategy_label = strategy.as_str();
        let kind_label = spec.kind.token();
        if self.strategy.fault_domain() == FaultDomain::HostProcess {
            warn!(strategy = strategy_label, "{}", FaultDomain::HostProcess.describe());
        }
        info!(
            strategy = strategy_label,
            kind = kind_label,
            units = count_value,
            iterations = spec.iterations,
            "creating {} units with '{}' worker",
            count_value,
            kind_label
        );

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let clock = Instant::now();

        // Launch phase: every unit starts before any join.
        let mut results: Vec<Option<RunResult>> = vec![None; count_value];
        let mut launched: Vec<(Box<dyn LaunchedUnit>, UnitState)> = Vec::with_capacity(count_value);
        for index in 0..count_value {
            let assignment = UnitAssignment {
                index,
                spec,
                fault: self
                    .faults
                    .contains(&index)
                    .then_some(InjectedFault::ResourceAcquisition),
            };
            let ctx = UnitLogContext::new()
                .with_unit(index)
                .with_kind(kind_label)
                .with_strategy(strategy_label);
            match self.strategy.launch(assignment) {
                Ok(unit) => {
                    let handle = unit.handle();
                    log_unit_event(
                        &ctx.with_handle(&handle),
                        "unit.launched",
                        "unit launched",
                        UnitEventOutcome::Success,
                    );
                    if let Some(metrics) = &self.metrics {
                        metrics.inc_launched(strategy_label, kind_label);
                    }
                    // Launch returns only once the unit is executing.
                    let state = advance(index, UnitState::Launched, UnitState::Running);
                    launched.push((unit, state));
                }
                Err(err) => {
                    let message = format!("unit {} could not be launched: {}", index, err);
                    log_unit_event(&ctx, "unit.launch_failed", &message, UnitEventOutcome::Fault);
                    if let Some(metrics) = &self.metrics {
                        metrics.inc_finished(strategy_label, kind_label, false);
                    }
                    results[index] = Some(RunResult::failed(
                        index,
                        None,
                        UnitErrorKind::LaunchFailed {
                            reason: err.to_string(),
                        },
                    ));
                }
            }
        }

        // Join phase: block on every launched unit, in launch order.
        for (unit, state) in launched {
            let index = unit.index();
            let result = unit.join();
            advance(index, state, result.state);

            let handle = result.handle.clone().unwrap_or_default();
            let ctx = UnitLogContext::new()
                .with_unit(index)
                .with_kind(kind_label)
                .with_strategy(strategy_label)
                .with_handle(&handle);
            match &result.error {
                None => log_unit_event(&ctx, "unit.finished", "unit succeeded", UnitEventOutcome::Success),
                Some(error) => log_unit_event(
                    &ctx,
                    "unit.finished",
                    &format!("unit {} failed: {}", index, error),
                    UnitEventOutcome::Fault,
                ),
            }
            if let Some(metrics) = &self.metrics {
                metrics.inc_finished(strategy_label, kind_label, result.success);
            }
            results[index] = Some(result);
        }

        let elapsed = clock.elapsed();
        if let Some(metrics) = &self.metrics {
            metrics.observe_run(strategy_label, kind_label, elapsed.as_secs_f64());
        }

        let results: Vec<RunResult> = results
            .into_iter()
            .enumerate()
            .map(|(index, result)| {
                result.unwrap_or_else(|| {
                    RunResult::failed(
                        index,
                        None,
                        UnitErrorKind::JoinFailed {
                            reason: "unit was never joined".to_owned(),
                        },
                    )
                })
            })
            .collect();

        let report = RunReport {
            run_id,
            strategy,
            spec,
            units: count_value,
            started_at,
            elapsed_seconds: elapsed.as_secs_f64(),
            results,
        };
        info!(
            strategy = strategy_label,
            kind = kind_label,
            succeeded = report.succeeded(),
            failed = report.failed(),
            elapsed_seconds = report.elapsed_seconds,
            "all units joined"
        );
        Ok(report)
    }
}

/// Apply a lifecycle transition, logging instead of failing on a violation.
fn advance(index: usize, state: UnitState, next: UnitState) -> UnitState {
    match state.transition(next) {
        Ok(next) => next,
        Err(err) => {
            warn!(unit = index, "{}", err);
            next
        }
    }
}

/// Outcome of one run: a result for every requested unit.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub strategy: StrategyKind,
    pub spec: WorkloadSpec,
    pub units: usize,
    pub started_at: DateTime<Utc>,
    pub elapsed_seconds: f64,
    pub results: Vec<RunResult>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    /// True iff every unit succeeded.
    pub fn is_success(&self) -> bool {
        self.results.iter().all(|r| r.success)
    }

    pub fn write_json(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_vec_pretty(self).context("failed to serialise run report")?;
        fs::write(path, json)
            .with_context(|| format!("failed to write run report {}", path.display()))?;
        info!(path = %path.display(), "run report written");
        Ok(())
    }
}
