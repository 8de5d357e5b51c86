//! ---
//! pb_section: "05-external-interfaces"
//! pb_subsection: "test"
//! pb_type: "source"
//! pb_scope: "code"
//! pb_description: "End-to-end behaviour of the parbench binary."
//! pb_version: "v0.1.0"
//! pb_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

const SMALL_CONFIG: &str = r#"
[workload.compute]
inner_steps = 100

[workload.memory]
buffer_bytes = 65536
"#;

struct Workspace {
    dir: TempDir,
    config: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("parbench.toml");
        fs::write(&config, SMALL_CONFIG).unwrap();
        Self { dir, config }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn parbench(&self) -> Command {
        let mut cmd = Command::cargo_bin("parbench").unwrap();
        cmd.current_dir(self.path())
            .env_remove("PARBENCH_CONFIG")
            .env("PARBENCH_LOG", "warn")
            .arg("--config")
            .arg(&self.config);
        cmd
    }

    fn io_files(&self) -> Vec<(String, u64)> {
        let mut files: Vec<(String, u64)> = fs::read_dir(self.path())
            .unwrap()
            .map(|entry| entry.unwrap())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with("io_"))
            .map(|entry| {
                (
                    entry.file_name().to_string_lossy().into_owned(),
                    entry.metadata().unwrap().len(),
                )
            })
            .collect();
        files.sort();
        files
    }
}

fn stdout_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn single_unit_is_rejected_before_launch() {
    let ws = Workspace::new();
    let output = ws.parbench().args(["io", "1"]).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_of(&output).contains("at least 2 (provided: 1)"));
    assert!(!stdout_of(&output).contains("Creating"));
    assert!(ws.io_files().is_empty());
}

#[test]
fn unknown_kind_is_rejected() {
    let ws = Workspace::new();
    let output = ws.parbench().args(["gpu", "4"]).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_of(&output).contains("invalid worker type 'gpu'"));
}

#[test]
fn malformed_count_is_rejected() {
    let ws = Workspace::new();
    let output = ws.parbench().args(["cpu", "many"]).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_of(&output).contains("invalid number of units 'many'"));
}

#[test]
fn oversized_io_block_is_rejected_before_launch() {
    let ws = Workspace::new();
    fs::write(&ws.config, "[workload.io]\nblock_bytes = 1099511627776\n").unwrap();
    let output = ws
        .parbench()
        .args(["--strategy", "shared", "--iterations", "1", "io", "2"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_of(&output).contains("io.block_bytes"));
    assert!(!stdout_of(&output).contains("Creating"));
    assert!(ws.io_files().is_empty());
}

#[test]
fn wrong_positional_count_prints_usage() {
    let ws = Workspace::new();
    let one = ws.parbench().arg("cpu").output().unwrap();
    assert_eq!(one.status.code(), Some(2));
    assert!(stderr_of(&one).contains("Usage"));

    let three = ws.parbench().args(["cpu", "4", "extra"]).output().unwrap();
    assert_eq!(three.status.code(), Some(2));
    assert!(stderr_of(&three).contains("Usage"));
}

#[test]
fn isolated_compute_run_succeeds_without_files() {
    let ws = Workspace::new();
    let output = ws
        .parbench()
        .args(["--strategy", "isolated", "cpu", "4"])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    let stdout = stdout_of(&output);
    assert!(stdout.contains("Creating 4 units with 'cpu' worker..."));
    assert!(stdout.contains("Succeeded: 4  Failed: 0"));
    assert!(ws.io_files().is_empty());
}

#[test]
fn io_units_leave_one_full_file_each() {
    for strategy in ["isolated", "shared"] {
        let ws = Workspace::new();
        let output = ws
            .parbench()
            .args(["--strategy", strategy, "--flush", "kernel", "io", "2"])
            .output()
            .unwrap();

        assert!(output.status.success(), "stderr: {}", stderr_of(&output));
        let files = ws.io_files();
        assert_eq!(files.len(), 2, "{strategy}: {files:?}");
        assert_ne!(files[0].0, files[1].0);
        for (name, len) in &files {
            assert!(name.ends_with(".dat"));
            assert_eq!(*len, 12_288_000, "{strategy}: {name}");
        }
    }
}

#[test]
fn isolated_fault_fails_only_its_unit() {
    let ws = Workspace::new();
    let report = ws.path().join("report.json");
    let output = ws
        .parbench()
        .args(["--inject-fault", "1", "--report"])
        .arg(&report)
        .args(["mem", "3"])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    assert!(stdout_of(&output).contains("Succeeded: 2  Failed: 1"));

    let value: serde_json::Value = serde_json::from_slice(&fs::read(&report).unwrap()).unwrap();
    let results = value["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["state"], "succeeded");
    assert_eq!(results[1]["state"], "failed");
    assert_eq!(results[1]["error"]["type"], "resource_acquisition");
    assert_eq!(results[2]["state"], "succeeded");
}

#[test]
fn fault_on_compute_workers_is_a_configuration_error() {
    let ws = Workspace::new();
    let output = ws
        .parbench()
        .args(["--inject-fault", "0", "cpu", "2"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_of(&output).contains("acquire no resource"));
    assert!(!stdout_of(&output).contains("Succeeded"));
}

#[test]
fn strict_mode_reports_unit_failures_in_exit_status() {
    let ws = Workspace::new();
    let output = ws
        .parbench()
        .args(["--strict", "--inject-fault", "0", "mem", "2"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(3));
    assert!(stdout_of(&output).contains("Failed: 1"));
}

#[test]
fn interactive_mode_prompts_for_kind_and_count() {
    let ws = Workspace::new();
    let output = ws
        .parbench()
        .args(["--strategy", "shared"])
        .write_stdin("cpu\n2\n")
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    let stdout = stdout_of(&output);
    assert!(stdout.contains("Available worker types"));
    assert!(stdout.contains("Creating 2 units with 'cpu' worker..."));
    assert!(stdout.contains("Succeeded: 2"));
}

#[test]
fn interactive_mode_rejects_invalid_answers() {
    let ws = Workspace::new();
    let output = ws.parbench().write_stdin("cpu\n1\n").output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_of(&output).contains("at least 2"));
}

#[test]
fn metrics_exposition_is_written() {
    let ws = Workspace::new();
    let metrics = ws.path().join("metrics.prom");
    let output = ws
        .parbench()
        .args(["--strategy", "shared", "--metrics-out"])
        .arg(&metrics)
        .args(["cpu", "2"])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    let text = fs::read_to_string(&metrics).unwrap();
    assert!(text.contains(r#"parbench_units_launched_total{kind="cpu",strategy="shared"} 2"#));
}

#[test]
fn worker_rejects_unknown_kind_with_its_exit_code() {
    let payload = r#"{"index":0,"kind":"gpu","iterations":10,"settings":{}}"#;
    let output = Command::cargo_bin("parbench")
        .unwrap()
        .env("PARBENCH_LOG", "off")
        .args(["worker", "--payload", payload])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(12));
}
