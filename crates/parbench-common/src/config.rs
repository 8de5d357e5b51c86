//! ---
//! pb_section: "01-core-functionality"
//! pb_subsection: "module"
//! pb_type: "source"
//! pb_scope: "code"
//! pb_description: "Benchmark configuration model and loader."
//! pb_version: "v0.1.0"
//! pb_owner: "tbd"
//! ---
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use parbench_workloads::WorkloadSettings;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::logging::LogFormat;

fn default_strategy() -> StrategyKind {
    StrategyKind::Isolated
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

/// Primary configuration object for a benchmark run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BenchConfig {
    #[serde(default)]
    pub workload: WorkloadSettings,
    #[serde(default)]
    pub harness: HarnessConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Metadata describing where a [`BenchConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedBenchConfig {
    pub config: BenchConfig,
    /// `None` when no file was found and built-in defaults apply.
    pub source: Option<PathBuf>,
}

impl BenchConfig {
    pub const ENV_CONFIG_PATH: &'static str = "PARBENCH_CONFIG";

    /// Load configuration, respecting the `PARBENCH_CONFIG` override, together
    /// with the effective source path.
    ///
    /// An explicitly named file (environment override) must exist; missing
    /// candidates are skipped and defaults are used when none exist.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedBenchConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedBenchConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedBenchConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        debug!("no configuration file found; using defaults");
        Ok(LoadedBenchConfig {
            config: BenchConfig::default(),
            source: None,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<BenchConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.workload
            .validate()
            .map_err(|err| anyhow!("{}", err))?;
        Ok(())
    }
}

impl std::str::FromStr for BenchConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: BenchConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Execution strategy used to host units.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// One child process per unit.
    #[default]
    Isolated,
    /// One OS thread per unit inside the harness process.
    Shared,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Isolated => "isolated",
            StrategyKind::Shared => "shared",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "isolated" | "process" => Ok(StrategyKind::Isolated),
            "shared" | "thread" => Ok(StrategyKind::Shared),
            other => Err(format!("unknown strategy: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    #[serde(default = "default_strategy")]
    pub strategy: StrategyKind,
    /// Exit non-zero when any unit failed. Off by default: a complete join
    /// is a successful run.
    #[serde(default)]
    pub fail_on_unit_error: bool,
    /// Unit indices whose resource acquisition is forced to fail.
    #[serde(default)]
    pub inject_faults: Vec<usize>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            fail_on_unit_error: false,
            inject_faults: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    /// Directory for a daily rolling JSON log; stderr only when unset.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
            directory: None,
            file_prefix: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Write the JSON run report here after the join completes.
    #[serde(default)]
    pub report_path: Option<PathBuf>,
    /// Write the Prometheus text exposition here after the join completes.
    #[serde(default)]
    pub prometheus_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use parbench_workloads::FlushPolicy;

    #[test]
    fn empty_document_yields_defaults() {
        let config: BenchConfig = "".parse().unwrap();
        assert_eq!(config.harness.strategy, StrategyKind::Isolated);
        assert!(!config.harness.fail_on_unit_error);
        assert_eq!(config.workload, WorkloadSettings::default());
    }

    #[test]
    fn nested_workload_sections_parse() {
        let config: BenchConfig = r#"
            [workload]
            base_iterations = 10
            progress_interval = 5

            [workload.memory]
            buffer_bytes = 8192

            [workload.io]
            output_dir = "/tmp/bench"
            flush = "kernel"

            [harness]
            strategy = "shared"
            inject_faults = [1]
        "#
        .parse()
        .unwrap();
        assert_eq!(config.workload.base_iterations, 10);
        assert_eq!(config.workload.memory.buffer_bytes, 8192);
        assert_eq!(config.workload.memory.stride, 64);
        assert_eq!(config.workload.io.flush, FlushPolicy::Kernel);
        assert_eq!(config.harness.strategy, StrategyKind::Shared);
        assert_eq!(config.harness.inject_faults, vec![1]);
    }

    #[test]
    fn invalid_workload_settings_rejected() {
        let err = "[workload]\nprogress_interval = 0\n"
            .parse::<BenchConfig>()
            .unwrap_err();
        assert!(err.to_string().contains("progress_interval"));
    }

    #[test]
    fn strategy_aliases_parse() {
        assert_eq!("thread".parse::<StrategyKind>().unwrap(), StrategyKind::Shared);
        assert_eq!("PROCESS".parse::<StrategyKind>().unwrap(), StrategyKind::Isolated);
        assert!("fiber".parse::<StrategyKind>().is_err());
    }
}
