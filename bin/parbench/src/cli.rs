//! ---
//! pb_section: "05-external-interfaces"
//! pb_subsection: "binary"
//! pb_type: "source"
//! pb_scope: "code"
//! pb_description: "Workload and unit-count selection from arguments or prompts."
//! pb_version: "v0.1.0"
//! pb_owner: "tbd"
//! ---
use std::io::{BufRead, Write};

use anyhow::{anyhow, Context, Result};
use parbench_harness::{HarnessError, UnitCount, MIN_UNITS};
use parbench_workloads::WorkloadKind;

/// What to run and how many times, as chosen by the operator.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Selection {
    pub kind: WorkloadKind,
    pub count: UnitCount,
}

impl Selection {
    /// Validate raw tokens; nothing is launched when this fails.
    pub fn parse(kind: &str, count: &str) -> Result<Self, HarnessError> {
        let kind = kind
            .trim()
            .parse::<WorkloadKind>()
            .map_err(|_| HarnessError::UnrecognizedKind(kind.trim().to_owned()))?;
        let count = count.parse::<UnitCount>()?;
        Ok(Self { kind, count })
    }
}

pub fn print_banner<W: Write>(output: &mut W) -> Result<()> {
    writeln!(output, "=== parbench: processes vs threads ===")?;
    writeln!(output, "Available worker types:")?;
    for kind in WorkloadKind::ALL {
        writeln!(output, "  {:<4} {}", kind.token(), kind.description())?;
    }
    Ok(())
}

/// Ask for the worker type and the number of units. Invalid answers are
/// errors rather than re-prompts.
pub fn prompt_selection<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> Result<Selection> {
    print_banner(output)?;
    let kind = prompt_line(input, output, "Worker type (cpu|mem|io)")?;
    let count = prompt_line(input, output, &format!("Number of units (minimum {})", MIN_UNITS))?;
    Ok(Selection::parse(&kind, &count)?)
}

fn prompt_line<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    prompt: &str,
) -> Result<String> {
    write!(output, "{prompt}: ")?;
    output.flush().context("failed to flush prompt to stdout")?;

    let mut line = String::new();
    let read = input
        .read_line(&mut line)
        .context("failed to read response from stdin")?;
    if read == 0 {
        return Err(anyhow!("input stream closed"));
    }
    Ok(line.trim().to_owned())
}
