//! ---
//! pb_section: "02-workloads"
//! pb_subsection: "module"
//! pb_type: "source"
//! pb_scope: "code"
//! pb_description: "Workload selector and immutable per-run workload description."
//! pb_version: "v0.1.0"
//! pb_owner: "tbd"
//! ---
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Resource, Result, WorkloadError};
use crate::settings::WorkloadSettings;

/// Resource-pressure family a unit runs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkloadKind {
    #[serde(rename = "cpu")]
    Compute,
    #[serde(rename = "mem")]
    Memory,
    #[serde(rename = "io")]
    Io,
}

impl WorkloadKind {
    pub const ALL: [WorkloadKind; 3] = [
        WorkloadKind::Compute,
        WorkloadKind::Memory,
        WorkloadKind::Io,
    ];

    /// Command-line token for the kind.
    pub fn token(&self) -> &'static str {
        match self {
            WorkloadKind::Compute => "cpu",
            WorkloadKind::Memory => "mem",
            WorkloadKind::Io => "io",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            WorkloadKind::Compute => "CPU-intensive workload",
            WorkloadKind::Memory => "Memory-intensive workload",
            WorkloadKind::Io => "I/O-intensive workload",
        }
    }

    /// Resource the workload acquires before its first iteration. Compute
    /// acquires nothing, so an injected fault has nowhere to fire.
    pub fn acquired_resource(&self) -> Option<Resource> {
        match self {
            WorkloadKind::Compute => None,
            WorkloadKind::Memory => Some(Resource::Memory),
            WorkloadKind::Io => Some(Resource::File),
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for WorkloadKind {
    type Err = WorkloadError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "cpu" => Ok(WorkloadKind::Compute),
            "mem" => Ok(WorkloadKind::Memory),
            "io" => Ok(WorkloadKind::Io),
            other => Err(WorkloadError::UnrecognizedKind(other.to_owned())),
        }
    }
}

/// Immutable description of what every unit in a run executes.
///
/// `Copy`, so each unit captures its own value at spawn time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadSpec {
    pub kind: WorkloadKind,
    pub iterations: u64,
}

impl WorkloadSpec {
    pub fn new(kind: WorkloadKind, iterations: u64) -> Result<Self> {
        if iterations == 0 {
            return Err(WorkloadError::InvalidSettings(format!(
                "{} workload requires a positive iteration count",
                kind
            )));
        }
        Ok(Self { kind, iterations })
    }

    /// Iterations for `kind` come from the configured base and multiplier.
    pub fn from_settings(kind: WorkloadKind, settings: &WorkloadSettings) -> Result<Self> {
        Self::new(kind, settings.iterations_for(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_parse_back_to_kinds() {
        for kind in WorkloadKind::ALL {
            assert_eq!(kind.token().parse::<WorkloadKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_token_is_rejected() {
        let err = "gpu".parse::<WorkloadKind>().unwrap_err();
        assert!(matches!(err, WorkloadError::UnrecognizedKind(ref token) if token == "gpu"));
    }

    #[test]
    fn default_settings_yield_three_thousand_iterations() {
        let settings = WorkloadSettings::default();
        for kind in WorkloadKind::ALL {
            let spec = WorkloadSpec::from_settings(kind, &settings).unwrap();
            assert_eq!(spec.iterations, 3000);
        }
    }

    #[test]
    fn only_compute_has_no_acquisition_point() {
        assert_eq!(WorkloadKind::Compute.acquired_resource(), None);
        assert_eq!(WorkloadKind::Memory.acquired_resource(), Some(Resource::Memory));
        assert_eq!(WorkloadKind::Io.acquired_resource(), Some(Resource::File));
    }

    #[test]
    fn zero_iterations_rejected() {
        assert!(WorkloadSpec::new(WorkloadKind::Io, 0).is_err());
    }
}
