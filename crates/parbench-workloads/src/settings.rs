//! ---
//! pb_section: "02-workloads"
//! pb_subsection: "module"
//! pb_type: "source"
//! pb_scope: "code"
//! pb_description: "Tunable workload parameters with benchmark defaults."
//! pb_version: "v0.1.0"
//! pb_owner: "tbd"
//! ---
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkloadError};
use crate::kind::WorkloadKind;
use crate::MIB;

/// Largest I/O block a unit may write in one call.
pub const MAX_BLOCK_BYTES: u64 = 64 * MIB;

fn default_base_iterations() -> u64 {
    1000
}

fn default_multiplier() -> u64 {
    3
}

fn default_progress_interval() -> u64 {
    500
}

fn default_inner_steps() -> u64 {
    10_000
}

fn default_buffer_bytes() -> u64 {
    // Well above any last-level cache so passes hit main memory.
    256 * 1024 * 1024
}

fn default_stride() -> u64 {
    64
}

fn default_block_bytes() -> u64 {
    4096
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Parameters shared by every unit of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadSettings {
    #[serde(default = "default_base_iterations")]
    pub base_iterations: u64,
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
    #[serde(default)]
    pub compute: ComputeSettings,
    #[serde(default)]
    pub memory: MemorySettings,
    #[serde(default)]
    pub io: IoSettings,
}

impl Default for WorkloadSettings {
    fn default() -> Self {
        Self {
            base_iterations: default_base_iterations(),
            progress_interval: default_progress_interval(),
            compute: ComputeSettings::default(),
            memory: MemorySettings::default(),
            io: IoSettings::default(),
        }
    }
}

impl WorkloadSettings {
    /// Iteration count for `kind`: the base scaled by the kind's multiplier.
    pub fn iterations_for(&self, kind: WorkloadKind) -> u64 {
        let multiplier = match kind {
            WorkloadKind::Compute => self.compute.multiplier,
            WorkloadKind::Memory => self.memory.multiplier,
            WorkloadKind::Io => self.io.multiplier,
        };
        self.base_iterations.saturating_mul(multiplier)
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_iterations == 0 {
            return Err(invalid("base_iterations must be positive"));
        }
        if self.progress_interval == 0 {
            return Err(invalid("progress_interval must be positive"));
        }
        if self.compute.multiplier == 0 || self.memory.multiplier == 0 || self.io.multiplier == 0
        {
            return Err(invalid("workload multipliers must be positive"));
        }
        if self.compute.inner_steps == 0 {
            return Err(invalid("compute.inner_steps must be positive"));
        }
        if self.memory.stride == 0 {
            return Err(invalid("memory.stride must be positive"));
        }
        if self.memory.buffer_bytes < self.memory.stride {
            return Err(invalid(&format!(
                "memory.buffer_bytes ({}) must be at least one stride ({})",
                self.memory.buffer_bytes, self.memory.stride
            )));
        }
        if usize::try_from(self.memory.buffer_bytes).is_err() {
            return Err(invalid("memory.buffer_bytes exceeds the address space"));
        }
        if self.io.block_bytes == 0 {
            return Err(invalid("io.block_bytes must be positive"));
        }
        if self.io.block_bytes > MAX_BLOCK_BYTES || usize::try_from(self.io.block_bytes).is_err() {
            return Err(invalid(&format!(
                "io.block_bytes ({}) exceeds the {} byte limit",
                self.io.block_bytes, MAX_BLOCK_BYTES
            )));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> WorkloadError {
    WorkloadError::InvalidSettings(message.to_owned())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeSettings {
    #[serde(default = "default_multiplier")]
    pub multiplier: u64,
    #[serde(default = "default_inner_steps")]
    pub inner_steps: u64,
}

impl Default for ComputeSettings {
    fn default() -> Self {
        Self {
            multiplier: default_multiplier(),
            inner_steps: default_inner_steps(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySettings {
    #[serde(default = "default_multiplier")]
    pub multiplier: u64,
    #[serde(default = "default_buffer_bytes")]
    pub buffer_bytes: u64,
    /// Distance between written bytes; 64 matches a cache line.
    #[serde(default = "default_stride")]
    pub stride: u64,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            multiplier: default_multiplier(),
            buffer_bytes: default_buffer_bytes(),
            stride: default_stride(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoSettings {
    #[serde(default = "default_multiplier")]
    pub multiplier: u64,
    #[serde(default = "default_block_bytes")]
    pub block_bytes: u64,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub flush: FlushPolicy,
}

impl Default for IoSettings {
    fn default() -> Self {
        Self {
            multiplier: default_multiplier(),
            block_bytes: default_block_bytes(),
            output_dir: default_output_dir(),
            flush: FlushPolicy::default(),
        }
    }
}

/// How far each I/O block is pushed before the next one is written.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FlushPolicy {
    /// `fdatasync` after every block: the block is on the device.
    #[default]
    Data,
    /// Hand the block to the kernel only; the page cache may absorb it.
    Kernel,
}

impl FlushPolicy {
    pub(crate) fn apply(&self, file: &mut File) -> std::io::Result<()> {
        match self {
            FlushPolicy::Data => file.sync_data(),
            FlushPolicy::Kernel => file.flush(),
        }
    }
}

impl std::str::FromStr for FlushPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "data" => Ok(FlushPolicy::Data),
            "kernel" => Ok(FlushPolicy::Kernel),
            other => Err(format!("unknown flush policy: {}", other)),
        }
    }
}
