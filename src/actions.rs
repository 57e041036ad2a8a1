//! GitHub Actions runner integration: step outputs and failure status.
//!
//! Outputs are appended to the file named by `$GITHUB_OUTPUT`. Outside a
//! runner that sets it, they fall back to `::set-output` workflow commands on
//! stdout so the values stay visible.

use anyhow::{Context, Result, bail};
use std::io::{self, Write};
use std::path::Path;

use crate::publish::PublishOutcome;

const GITHUB_OUTPUT_ENV_VAR: &str = "GITHUB_OUTPUT";

/// Step outputs for a finished run: `uploaded` always, `url` when uploaded.
pub fn outputs_for(outcome: &PublishOutcome) -> Vec<(&'static str, String)> {
    let mut outputs = vec![(
        "uploaded",
        if outcome.uploaded() { "yes" } else { "no" }.to_string(),
    )];
    if let Some(url) = outcome.url() {
        outputs.push(("url", url.to_string()));
    }
    outputs
}

/// Publish the step outputs for `outcome` to the runner.
pub fn write_outputs(outcome: &PublishOutcome) -> Result<()> {
    let github_output = std::env::var_os(GITHUB_OUTPUT_ENV_VAR).filter(|v| !v.is_empty());
    write_outputs_to(
        &outputs_for(outcome),
        github_output.as_deref().map(Path::new),
        &mut io::stdout(),
    )
}

/// Append `key=value` lines to `github_output`, or emit `::set-output`
/// commands on `stdout` when there is no output file.
pub fn write_outputs_to(
    outputs: &[(&'static str, String)],
    github_output: Option<&Path>,
    stdout: &mut dyn Write,
) -> Result<()> {
    for (key, value) in outputs {
        if value.contains('\n') || value.contains('\r') {
            bail!("Output '{key}' must be a single line");
        }
    }

    match github_output {
        Some(path) => {
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open output file {}", path.display()))?;
            for (key, value) in outputs {
                writeln!(file, "{key}={value}")
                    .with_context(|| format!("failed to write output file {}", path.display()))?;
            }
        }
        None => {
            for (key, value) in outputs {
                writeln!(
                    stdout,
                    "::set-output name={}::{}",
                    escape_property(key),
                    escape_data(value)
                )
                .context("failed to write step output")?;
            }
        }
    }
    Ok(())
}

/// Mark the step as failed with `message` as the visible reason.
pub fn set_failed(message: &str) {
    let _ = set_failed_to(&mut io::stdout(), message);
}

fn set_failed_to(w: &mut dyn Write, message: &str) -> io::Result<()> {
    writeln!(w, "::error::{}", escape_data(message))
}

fn escape_data(s: &str) -> String {
    s.replace('%', "%25").replace('\r', "%0D").replace('\n', "%0A")
}

fn escape_property(s: &str) -> String {
    escape_data(s).replace(':', "%3A").replace(',', "%2C")
}
