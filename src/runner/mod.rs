//! Program Runner
//!
//! Executes an instrumented program with the configured interpreter and
//! captures its output. The run is bounded by a wall-clock timeout; the
//! child is killed when the timeout fires.
//!
//! @module runner

use crate::core::config::RunnerConfig;
use crate::core::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::process::Command;

/// Captured result of one run
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: ExitStatus,
    pub elapsed: Duration,
}

impl RunOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Runs scripts through an external interpreter
#[derive(Debug, Clone)]
pub struct Runner {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl Runner {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(config: &RunnerConfig) -> Self {
        Self::new(
            config.program.clone(),
            config.args.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run `script` to completion
    ///
    /// A non-zero exit is not an error: the output up to the failure is
    /// still returned.
    pub async fn run(&self, script: &Path) -> Result<RunOutput> {
        let started = Instant::now();
        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Runner {
                message: format!("Failed to start {}: {}", self.program, e),
            })?;

        tracing::debug!(program = %self.program, script = %script.display(), "Started program");

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                tracing::warn!(
                    program = %self.program,
                    seconds = self.timeout.as_secs(),
                    "Program timed out"
                );
                return Err(Error::Timeout {
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        let result = RunOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status: output.status,
            elapsed: started.elapsed(),
        };

        tracing::info!(
            program = %self.program,
            status = ?result.status.code(),
            stdout_bytes = result.stdout.len(),
            elapsed_ms = result.elapsed.as_millis() as u64,
            "Program finished"
        );

        Ok(result)
    }

    /// Write `source` to a fresh scratch file and run it
    ///
    /// The scratch file is removed afterwards, whatever the outcome.
    pub async fn run_source(&self, scratch_dir: &Path, source: &str) -> Result<RunOutput> {
        tokio::fs::create_dir_all(scratch_dir).await?;
        let script = scratch_path(scratch_dir);
        tokio::fs::write(&script, source).await?;

        let result = self.run(&script).await;

        if let Err(e) = tokio::fs::remove_file(&script).await {
            tracing::debug!(script = %script.display(), error = %e, "Could not remove scratch file");
        }

        result
    }
}

/// Unique script path inside `dir`
pub fn scratch_path(dir: &Path) -> PathBuf {
    dir.join(format!("{}.js", uuid::Uuid::new_v4()))
}
