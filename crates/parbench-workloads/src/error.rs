//! ---
//! pb_section: "02-workloads"
//! pb_subsection: "module"
//! pb_type: "source"
//! pb_scope: "code"
//! pb_description: "Error taxonomy for workload execution."
//! pb_version: "v0.1.0"
//! pb_owner: "tbd"
//! ---
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, WorkloadError>;

/// Resource a unit acquires privately before it starts its main loop.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Memory,
    File,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Memory => f.write_str("memory"),
            Resource::File => f.write_str("file"),
        }
    }
}

#[derive(Debug, Error)]
pub enum WorkloadError {
    #[error("unit {unit}: memory allocation of {bytes} bytes failed")]
    MemoryAllocation { unit: usize, bytes: u64 },
    #[error("unit {unit}: file creation failed for {}: {source}", path.display())]
    FileCreation {
        unit: usize,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unit {unit}: injected {resource} acquisition failure")]
    InjectedFault { unit: usize, resource: Resource },
    #[error("unit {unit}: write to {} failed: {source}", path.display())]
    Write {
        unit: usize,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unrecognized workload kind '{0}'")]
    UnrecognizedKind(String),
    #[error("invalid workload settings: {0}")]
    InvalidSettings(String),
}

impl WorkloadError {
    /// Resource whose acquisition failed, if this is an acquisition failure.
    pub fn acquisition_resource(&self) -> Option<Resource> {
        match self {
            WorkloadError::MemoryAllocation { .. } => Some(Resource::Memory),
            WorkloadError::FileCreation { .. } => Some(Resource::File),
            WorkloadError::InjectedFault { resource, .. } => Some(*resource),
            _ => None,
        }
    }
}
