//! ---
//! pb_section: "02-workloads"
//! pb_subsection: "tests"
//! pb_type: "source"
//! pb_scope: "code"
//! pb_description: "Progress cadence and concurrency behaviour of the workloads."
//! pb_version: "v0.1.0"
//! pb_owner: "tbd"
//! ---
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use parbench_workloads::{
    run_workload, Checkpoint, ProgressReporter, UnitContext, UnitIdentity, WorkloadKind,
    WorkloadReport, WorkloadSettings, WorkloadSpec,
};

#[derive(Default)]
struct Collecting {
    checkpoints: Mutex<Vec<Checkpoint>>,
    finished: Mutex<Vec<usize>>,
}

impl ProgressReporter for Collecting {
    fn checkpoint(&self, checkpoint: &Checkpoint) {
        self.checkpoints.lock().push(*checkpoint);
    }

    fn finished(&self, unit: usize, _report: &WorkloadReport) {
        self.finished.lock().push(unit);
    }
}

fn fast_settings() -> WorkloadSettings {
    let mut settings = WorkloadSettings::default();
    settings.compute.inner_steps = 10;
    settings
}

#[test]
fn compute_checkpoints_are_floor_of_iterations_over_interval() {
    let settings = fast_settings();
    for iterations in [1u64, 499, 500, 1499, 3000] {
        let reporter = Collecting::default();
        let ctx = UnitContext::new(0, UnitIdentity::thread(0), &settings, &reporter);
        let spec = WorkloadSpec::new(WorkloadKind::Compute, iterations).unwrap();
        let report = run_workload(spec, &ctx).unwrap();
        assert_eq!(report.checkpoints, iterations / 500, "iterations {}", iterations);
        assert_eq!(reporter.checkpoints.lock().len() as u64, iterations / 500);
    }
}

#[test]
fn compute_checkpoints_repeat_identically() {
    let settings = fast_settings();
    let spec = WorkloadSpec::new(WorkloadKind::Compute, 3000).unwrap();
    let mut runs = Vec::new();
    for _ in 0..2 {
        let reporter = Collecting::default();
        let ctx = UnitContext::new(0, UnitIdentity::thread(0), &settings, &reporter);
        run_workload(spec, &ctx).unwrap();
        let currents: Vec<u64> = reporter.checkpoints.lock().iter().map(|c| c.current).collect();
        runs.push(currents);
    }
    assert_eq!(runs[0], vec![500, 1000, 1500, 2000, 2500, 3000]);
    assert_eq!(runs[0], runs[1]);
}

#[test]
fn concurrent_units_each_report_their_own_checkpoints() {
    let settings = Arc::new(fast_settings());
    let reporter = Arc::new(Collecting::default());
    let spec = WorkloadSpec::new(WorkloadKind::Compute, 1000).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|index| {
            let settings = Arc::clone(&settings);
            let reporter = Arc::clone(&reporter);
            thread::spawn(move || {
                let ctx = UnitContext::new(
                    index,
                    UnitIdentity::thread(index),
                    &settings,
                    reporter.as_ref(),
                );
                run_workload(spec, &ctx).unwrap()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap().checkpoints, 2);
    }

    let checkpoints = reporter.checkpoints.lock();
    for unit in 0..4 {
        let mine = checkpoints.iter().filter(|c| c.unit == unit).count();
        assert_eq!(mine, 2, "unit {}", unit);
    }
    let mut finished = reporter.finished.lock().clone();
    finished.sort_unstable();
    assert_eq!(finished, vec![0, 1, 2, 3]);
}
