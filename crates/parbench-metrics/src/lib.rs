//! ---
//! pb_section: "03-metrics-reporting"
//! pb_subsection: "module"
//! pb_type: "source"
//! pb_scope: "code"
//! pb_description: "Metrics collection and export utilities."
//! pb_version: "v0.1.0"
//! pb_owner: "tbd"
//! ---
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::info;

/// Shared registry type used across the harness.
pub type SharedRegistry = Arc<Registry>;

/// Produce a new shared registry.
pub fn new_registry() -> SharedRegistry {
    Arc::new(Registry::new())
}

/// Encode every metric family in the registry in the Prometheus text format.
pub fn render_text(registry: &Registry) -> Result<String> {
    let families = registry.gather();
    TextEncoder::new()
        .encode_to_string(&families)
        .context("failed to encode metrics")
}

/// Write the text exposition to `path`, replacing any previous contents.
pub fn write_text_file(registry: &Registry, path: &Path) -> Result<()> {
    let body = render_text(registry)?;
    fs::write(path, body)
        .with_context(|| format!("failed to write metrics to {}", path.display()))?;
    info!(path = %path.display(), "metrics exposition written");
    Ok(())
}

/// Counters and timings recorded by the execution harness.
#[derive(Clone, Debug)]
pub struct HarnessMetrics {
    registry: SharedRegistry,
    units_launched: IntCounterVec,
    units_finished: IntCounterVec,
    run_seconds: HistogramVec,
}

impl HarnessMetrics {
    pub fn new(registry: SharedRegistry) -> Result<Self> {
        let units_launched = IntCounterVec::new(
            Opts::new(
                "parbench_units_launched_total",
                "Execution units launched by strategy and workload kind",
            ),
            &["strategy", "kind"],
        )?;
        registry.register(Box::new(units_launched.clone()))?;

        let units_finished = IntCounterVec::new(
            Opts::new(
                "parbench_units_finished_total",
                "Execution units that reached a terminal state, by outcome",
            ),
            &["strategy", "kind", "outcome"],
        )?;
        registry.register(Box::new(units_finished.clone()))?;

        let buckets = prometheus::exponential_buckets(0.01, 2.0, 16)
            .context("failed to construct histogram buckets")?;
        let run_seconds = HistogramVec::new(
            HistogramOpts::new(
                "parbench_run_seconds",
                "Wall-clock time from the first launch to the last join",
            )
            .buckets(buckets),
            &["strategy", "kind"],
        )?;
        registry.register(Box::new(run_seconds.clone()))?;

        Ok(Self {
            registry,
            units_launched,
            units_finished,
            run_seconds,
        })
    }

    pub fn registry(&self) -> SharedRegistry {
        self.registry.clone()
    }

    pub fn inc_launched(&self, strategy: &str, kind: &str) {
        self.units_launched
            .with_label_values(&[strategy, kind])
            .inc();
    }

    pub fn inc_finished(&self, strategy: &str, kind: &str, succeeded: bool) {
        let outcome = if succeeded { "succeeded" } else { "failed" };
        self.units_finished
            .with_label_values(&[strategy, kind, outcome])
            .inc();
    }

    pub fn observe_run(&self, strategy: &str, kind: &str, seconds: f64) {
        self.run_seconds
            .with_label_values(&[strategy, kind])
            .observe(seconds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_render_with_labels() {
        let metrics = HarnessMetrics::new(new_registry()).unwrap();
        metrics.inc_launched("shared", "cpu");
        metrics.inc_launched("shared", "cpu");
        metrics.inc_finished("shared", "cpu", true);
        metrics.inc_finished("shared", "cpu", false);
        metrics.observe_run("shared", "cpu", 0.5);

        let text = render_text(&metrics.registry()).unwrap();
        assert!(text.contains(r#"parbench_units_launched_total{kind="cpu",strategy="shared"} 2"#));
        assert!(text.contains(r#"outcome="failed""#));
        assert!(text.contains("parbench_run_seconds_count"));
    }

    #[test]
    fn duplicate_registration_is_an_error() {
        let registry = new_registry();
        HarnessMetrics::new(registry.clone()).unwrap();
        assert!(HarnessMetrics::new(registry).is_err());
    }

    #[test]
    fn text_file_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.prom");
        let metrics = HarnessMetrics::new(new_registry()).unwrap();
        metrics.inc_launched("isolated", "io");
        write_text_file(&metrics.registry(), &path).unwrap();
        let body = std::fs::read_to_string(path).unwrap();
        assert!(body.contains("parbench_units_launched_total"));
    }
}
