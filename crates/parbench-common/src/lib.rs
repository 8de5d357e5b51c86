//! ---
//! pb_section: "01-core-functionality"
//! pb_subsection: "module"
//! pb_type: "source"
//! pb_scope: "code"
//! pb_description: "Shared configuration and logging primitives."
//! pb_version: "v0.1.0"
//! pb_owner: "tbd"
//! ---
//! Shared primitives for the parbench workspace: configuration loading and
//! the tracing stack used by both the harness and its worker processes.

pub mod config;
pub mod logging;

pub use config::{
    BenchConfig, HarnessConfig, LoadedBenchConfig, LoggingConfig, MetricsConfig, StrategyKind,
};
pub use logging::{init_tracing, log_unit_event, LogFormat, UnitEventOutcome, UnitLogContext};
