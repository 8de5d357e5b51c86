//! ---
//! pb_section: "04-execution-harness"
//! pb_subsection: "module"
//! pb_type: "source"
//! pb_scope: "code"
//! pb_description: "Unit counts, lifecycle states and per-unit results."
//! pb_version: "v0.1.0"
//! pb_owner: "tbd"
//! ---
use std::fmt;
use std::str::FromStr;

use parbench_workloads::{InjectedFault, Resource, WorkloadError, WorkloadSpec};
use serde::{Deserialize, Serialize};

use crate::error::HarnessError;

/// Smallest number of units a run may launch.
pub const MIN_UNITS: usize = 2;

/// Validated number of units for a run. Holding one proves the count passed
/// configuration checks, so the harness never sees fewer than [`MIN_UNITS`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct UnitCount(usize);

impl UnitCount {
    pub fn new(count: usize) -> Result<Self, HarnessError> {
        if count < MIN_UNITS {
            return Err(HarnessError::UnitCountTooSmall {
                requested: count as i64,
                minimum: MIN_UNITS,
            });
        }
        Ok(Self(count))
    }

    pub fn get(&self) -> usize {
        self.0
    }
}

impl FromStr for UnitCount {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let requested: i64 = trimmed
            .parse()
            .map_err(|_| HarnessError::MalformedUnitCount(trimmed.to_owned()))?;
        if requested < MIN_UNITS as i64 {
            return Err(HarnessError::UnitCountTooSmall {
                requested,
                minimum: MIN_UNITS,
            });
        }
        let count = usize::try_from(requested)
            .map_err(|_| HarnessError::MalformedUnitCount(trimmed.to_owned()))?;
        Ok(Self(count))
    }
}

impl fmt::Display for UnitCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of one unit: `Launched → Running → {Succeeded | Failed}`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitState {
    Launched,
    Running,
    Succeeded,
    Failed,
}

impl UnitState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UnitState::Succeeded | UnitState::Failed)
    }

    /// Move to `next`, rejecting anything but the forward transitions.
    pub fn transition(self, next: UnitState) -> Result<UnitState, InvalidTransition> {
        let allowed = matches!(
            (self, next),
            (UnitState::Launched, UnitState::Running)
                | (UnitState::Running, UnitState::Succeeded)
                | (UnitState::Running, UnitState::Failed)
        );
        if allowed {
            Ok(next)
        } else {
            Err(InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid unit state transition {from:?} -> {to:?}")]
pub struct InvalidTransition {
    pub from: UnitState,
    pub to: UnitState,
}

/// Why a unit failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UnitErrorKind {
    ResourceAcquisition { resource: Resource },
    UnrecognizedWorkloadKind,
    WriteFailure,
    InvalidSettings,
    Panicked { message: String },
    Signaled { signal: i32 },
    ExitStatus { code: i32 },
    LaunchFailed { reason: String },
    JoinFailed { reason: String },
}

impl UnitErrorKind {
    pub fn from_workload_error(err: &WorkloadError) -> Self {
        if let Some(resource) = err.acquisition_resource() {
            return UnitErrorKind::ResourceAcquisition { resource };
        }
        match err {
            WorkloadError::UnrecognizedKind(_) => UnitErrorKind::UnrecognizedWorkloadKind,
            WorkloadError::Write { .. } => UnitErrorKind::WriteFailure,
            _ => UnitErrorKind::InvalidSettings,
        }
    }
}

impl fmt::Display for UnitErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitErrorKind::ResourceAcquisition { resource } => {
                write!(f, "{} acquisition failed", resource)
            }
            UnitErrorKind::UnrecognizedWorkloadKind => f.write_str("unrecognized workload kind"),
            UnitErrorKind::WriteFailure => f.write_str("write failed"),
            UnitErrorKind::InvalidSettings => f.write_str("invalid workload settings"),
            UnitErrorKind::Panicked { message } => write!(f, "panicked: {}", message),
            UnitErrorKind::Signaled { signal } => write!(f, "killed by signal {}", signal),
            UnitErrorKind::ExitStatus { code } => write!(f, "exited with status {}", code),
            UnitErrorKind::LaunchFailed { reason } => write!(f, "launch failed: {}", reason),
            UnitErrorKind::JoinFailed { reason } => write!(f, "join failed: {}", reason),
        }
    }
}

/// What the harness hands to a strategy for each unit.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct UnitAssignment {
    pub index: usize,
    pub spec: WorkloadSpec,
    pub fault: Option<InjectedFault>,
}

/// Terminal outcome of one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub index: usize,
    pub success: bool,
    pub state: UnitState,
    pub error: Option<UnitErrorKind>,
    /// Platform handle the unit ran under (`pid 123`, `unit-3`).
    pub handle: Option<String>,
}

impl RunResult {
    pub fn succeeded(index: usize, handle: Option<String>) -> Self {
        Self {
            index,
            success: true,
            state: UnitState::Succeeded,
            error: None,
            handle,
        }
    }

    pub fn failed(index: usize, handle: Option<String>, error: UnitErrorKind) -> Self {
        Self {
            index,
            success: false,
            state: UnitState::Failed,
            error: Some(error),
            handle,
        }
    }
}
