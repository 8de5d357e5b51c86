//! ---
//! pb_section: "01-core-functionality"
//! pb_subsection: "module"
//! pb_type: "source"
//! pb_scope: "code"
//! pb_description: "Tracing subscriber setup and unit lifecycle events."
//! pb_version: "v0.1.0"
//! pb_owner: "tbd"
//! ---
use anyhow::Result;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::debug;
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "PARBENCH_LOG";

static FILE_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

/// Available formats for the stderr log stream.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    StructuredJson,
    #[default]
    Pretty,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::StructuredJson => "structured-json",
            LogFormat::Pretty => "pretty",
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "structured-json" | "json" => Ok(LogFormat::StructuredJson),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(format!("unknown log format: {}", other)),
        }
    }
}

/// Initialize the tracing subscriber based on configuration and environment variables.
///
/// * `PARBENCH_LOG` overrides the filter (e.g. `info`, `debug,parbench_harness=trace`).
///   When unset `RUST_LOG` is honoured, finally defaulting to `info`.
/// * Events go to stderr synchronously so a failing unit is visible while its
///   siblings are still running. A daily rolling JSON file is added when
///   `directory` is configured.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<()> {
    let filter = match std::env::var(LOG_ENV) {
        Ok(directive) => EnvFilter::try_new(directive).unwrap_or_else(|err| {
            eprintln!(
                "invalid {} directive ({}); defaulting to info logging",
                LOG_ENV, err
            );
            EnvFilter::new("info")
        }),
        Err(_) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let stderr_layer = match config.format {
        LogFormat::StructuredJson => fmt::layer()
            .with_target(false)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .json()
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(false)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(std::io::stderr)
            .boxed(),
    };

    let file_layer = match &config.directory {
        Some(directory) => {
            std::fs::create_dir_all(directory)?;
            let prefix = config
                .file_prefix
                .clone()
                .unwrap_or_else(|| "parbench".to_owned());
            let appender = daily(directory, format!("{}-{}.log", prefix, service_name));
            let (file_writer, file_guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(file_guard);
            Some(
                fmt::layer()
                    .with_target(true)
                    .with_timer(fmt::time::UtcTime::rfc_3339())
                    .json()
                    .with_writer(file_writer)
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .ok();

    debug!(service = %service_name, format = ?config.format, log_dir = ?config.directory, "tracing initialised");
    Ok(())
}

/// Structured fields attached to every unit lifecycle event.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnitLogContext<'a> {
    pub unit: Option<usize>,
    pub kind: Option<&'a str>,
    pub strategy: Option<&'a str>,
    pub handle: Option<&'a str>,
}

impl<'a> UnitLogContext<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unit(mut self, unit: usize) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn with_kind(mut self, kind: &'a str) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_strategy(mut self, strategy: &'a str) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn with_handle(mut self, handle: &'a str) -> Self {
        self.handle = Some(handle);
        self
    }
}

/// Outcome attached to a lifecycle event; faults are logged at error level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitEventOutcome {
    Success,
    Fault,
}

impl UnitEventOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            UnitEventOutcome::Success => "success",
            UnitEventOutcome::Fault => "fault",
        }
    }
}

/// Emit a standardized unit lifecycle event.
pub fn log_unit_event(
    context: &UnitLogContext<'_>,
    event: &str,
    message: &str,
    outcome: UnitEventOutcome,
) {
    let unit = context.unit.map(|u| u as i64).unwrap_or(-1);
    match outcome {
        UnitEventOutcome::Fault => tracing::error!(
            event,
            outcome = outcome.as_str(),
            unit,
            kind = context.kind.unwrap_or(""),
            strategy = context.strategy.unwrap_or(""),
            handle = context.handle.unwrap_or(""),
            message = %message
        ),
        UnitEventOutcome::Success => tracing::info!(
            event,
            outcome = outcome.as_str(),
            unit,
            kind = context.kind.unwrap_or(""),
            strategy = context.strategy.unwrap_or(""),
            handle = context.handle.unwrap_or(""),
            message = %message
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_tokens_parse() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::StructuredJson);
        assert_eq!("Pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
        for format in [LogFormat::StructuredJson, LogFormat::Pretty] {
            assert_eq!(format.as_str().parse::<LogFormat>().unwrap(), format);
        }
    }

    #[test]
    fn init_with_file_layer_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            directory: Some(dir.path().join("logs")),
            ..LoggingConfig::default()
        };
        init_tracing("unit-test", &config).unwrap();
        assert!(dir.path().join("logs").is_dir());
        let ctx = UnitLogContext::new().with_unit(1).with_kind("cpu");
        log_unit_event(&ctx, "unit.finished", "unit finished", UnitEventOutcome::Success);
        log_unit_event(&ctx, "unit.finished", "unit failed", UnitEventOutcome::Fault);
    }
}
