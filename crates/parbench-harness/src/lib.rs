//! ---
//! pb_section: "04-execution-harness"
//! pb_subsection: "module"
//! pb_type: "source"
//! pb_scope: "code"
//! pb_description: "Fan-out/join execution harness entry points."
//! pb_version: "v0.1.0"
//! pb_owner: "tbd"
//! ---
//! Launches N concurrent execution units of one workload and joins them all.
//!
//! A unit is either a child process ([`strategy::IsolatedStrategy`]) or a
//! named thread ([`strategy::SharedStrategy`]). Either way the [`Harness`]
//! launches every unit before waiting on any, then blocks until each one has
//! terminated and records a [`RunResult`] per unit. Unit failures are data,
//! not errors: [`Harness::run`] only fails on configuration problems.

pub mod error;
pub mod harness;
pub mod strategy;
pub mod unit;
pub mod worker;

pub use error::{HarnessError, Result};
pub use harness::{Harness, RunReport};
pub use strategy::{
    build_strategy, ExecutionStrategy, FaultDomain, IsolatedStrategy, LaunchedUnit,
    SharedStrategy, WorkerCommand,
};
pub use unit::{RunResult, UnitAssignment, UnitCount, UnitErrorKind, UnitState, MIN_UNITS};
pub use worker::{exit_code_for, run_worker, WorkerPayload};
