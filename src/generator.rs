//! External event log generation
//!
//! The event log is produced by a separate program (a Cairo test run under
//! `scarb`). This module only runs that program, strips the test runner's
//! own output from what it prints, and saves the rest as the log file.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::converters::event_log_to_midi::{ConvertError, Result};

/// Test runner lines that are not part of the log.
const NOISE_MARKERS: [&str; 4] = ["running", "test", "gas usage", "test result"];

/// Command that prints an event log on its standard output.
#[derive(Debug, Clone, PartialEq)]
pub struct LogGenerator {
    pub command: String,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
    pub working_dir: Option<PathBuf>,
}

impl Default for LogGenerator {
    fn default() -> Self {
        Self::scarb()
    }
}

impl LogGenerator {
    pub fn new(command: &str, args: &[&str]) -> Self {
        Self {
            command: command.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            envs: Vec::new(),
            working_dir: None,
        }
    }

    /// `scarb test -- --filter midi_to_cairo_file_output_test`, quiet.
    pub fn scarb() -> Self {
        Self::new("scarb", &["test", "--", "--filter", "midi_to_cairo_file_output_test"])
            .with_env("SCARB_UI_VERBOSITY", "quiet")
    }

    /// Parse a whitespace-separated command line such as `"scarb test"`.
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let command = parts.next()?;
        let args: Vec<&str> = parts.collect();
        Some(Self::new(command, &args))
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.envs.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = Some(dir);
        self
    }

    /// Run the generator and write its filtered output to `output`.
    /// Returns the number of lines written.
    pub fn run(&self, output: &Path) -> Result<usize> {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args);
        for (key, value) in &self.envs {
            cmd.env(key, value);
        }
        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }

        log::debug!("running {} {}", self.command, self.args.join(" "));
        let result = cmd
            .output()
            .map_err(|e| ConvertError::Generator(format!("could not start {}: {}", self.command, e)))?;

        if !result.status.success() {
            return Err(ConvertError::Generator(format!(
                "{} exited with {}: {}",
                self.command,
                result.status,
                String::from_utf8_lossy(&result.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&result.stdout);
        let log_text = strip_runner_noise(&stdout);
        let lines = log_text.lines().count();

        fs::write(output, log_text).map_err(|source| ConvertError::Io {
            path: output.to_path_buf(),
            source,
        })?;

        log::info!("generated {} log lines into {}", lines, output.display());
        Ok(lines)
    }
}

/// Drop the test runner's status lines, keeping everything else in order.
pub fn strip_runner_noise(output: &str) -> String {
    let mut kept = String::with_capacity(output.len());
    for line in output.lines() {
        if NOISE_MARKERS.iter().any(|marker| line.contains(marker)) {
            continue;
        }
        kept.push_str(line);
        kept.push('\n');
    }
    kept
}

/// First `count` lines of a log, and how many lines were left out.
pub fn preview(text: &str, count: usize) -> (Vec<&str>, usize) {
    let lines: Vec<&str> = text.lines().collect();
    let shown = lines.len().min(count);
    (lines[..shown].to_vec(), lines.len() - shown)
}
