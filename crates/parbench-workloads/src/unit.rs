//! ---
//! pb_section: "02-workloads"
//! pb_subsection: "module"
//! pb_type: "source"
//! pb_scope: "code"
//! pb_description: "Per-unit execution context handed to every workload."
//! pb_version: "v0.1.0"
//! pb_owner: "tbd"
//! ---
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Resource, Result, WorkloadError};
use crate::progress::ProgressReporter;
use crate::settings::WorkloadSettings;

/// Runtime identity of the unit, used to derive unit-unique artifact names.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum UnitIdentity {
    Process { pid: u32 },
    Thread { pid: u32, index: usize },
}

impl UnitIdentity {
    pub fn current_process() -> Self {
        UnitIdentity::Process {
            pid: std::process::id(),
        }
    }

    /// Identity of the thread running unit `index` inside this process.
    pub fn thread(index: usize) -> Self {
        UnitIdentity::Thread {
            pid: std::process::id(),
            index,
        }
    }

    /// File name for the I/O workload; distinct for every live unit.
    pub fn io_file_name(&self) -> String {
        match self {
            UnitIdentity::Process { pid } => format!("io_{}.dat", pid),
            UnitIdentity::Thread { pid, index } => format!("io_{}_t{}.dat", pid, index),
        }
    }
}

impl fmt::Display for UnitIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitIdentity::Process { pid } => write!(f, "pid {}", pid),
            UnitIdentity::Thread { pid, index } => write!(f, "pid {} thread unit-{}", pid, index),
        }
    }
}

/// Fault forced into a unit for isolation experiments.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectedFault {
    /// The unit's first resource acquisition fails as if the OS refused it.
    ResourceAcquisition,
}

/// Everything a workload needs to know about the unit it runs in.
pub struct UnitContext<'a> {
    pub index: usize,
    pub identity: UnitIdentity,
    pub settings: &'a WorkloadSettings,
    pub reporter: &'a dyn ProgressReporter,
    pub fault: Option<InjectedFault>,
}

impl<'a> UnitContext<'a> {
    pub fn new(
        index: usize,
        identity: UnitIdentity,
        settings: &'a WorkloadSettings,
        reporter: &'a dyn ProgressReporter,
    ) -> Self {
        Self {
            index,
            identity,
            settings,
            reporter,
            fault: None,
        }
    }

    pub fn with_fault(mut self, fault: Option<InjectedFault>) -> Self {
        self.fault = fault;
        self
    }

    /// Gate in front of every private resource acquisition.
    pub(crate) fn acquire(&self, resource: Resource) -> Result<()> {
        match self.fault {
            Some(InjectedFault::ResourceAcquisition) => {
                warn!(unit = self.index, identity = %self.identity, %resource, "injecting resource acquisition failure");
                Err(WorkloadError::InjectedFault {
                    unit: self.index,
                    resource,
                })
            }
            None => Ok(()),
        }
    }
}

impl fmt::Debug for UnitContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitContext")
            .field("index", &self.index)
            .field("identity", &self.identity)
            .field("fault", &self.fault)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_file_names_differ_per_index() {
        let a = UnitIdentity::thread(0).io_file_name();
        let b = UnitIdentity::thread(1).io_file_name();
        assert_ne!(a, b);
        assert!(a.starts_with(&format!("io_{}_", std::process::id())));
    }

    #[test]
    fn process_file_name_uses_pid() {
        let identity = UnitIdentity::Process { pid: 4242 };
        assert_eq!(identity.io_file_name(), "io_4242.dat");
    }
}
