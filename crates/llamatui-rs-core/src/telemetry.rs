//! GPU status via the vendor command-line tool.
//!
//! The probe runs the tool once, with a timeout, and turns every outcome
//! into display lines. Failures never propagate past [`TelemetryProbe::lines`].

use log::{debug, warn};
use std::ffi::OsString;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

pub const TELEMETRY_PROGRAM: &str = "nvidia-smi";
pub const TELEMETRY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error(
        "Error: '{program}' command not found. (NVIDIA drivers not installed or not in PATH)"
    )]
    NotFound { program: String },
    #[error("Error executing {program}: {detail}")]
    Failed { program: String, detail: String },
    #[error("Error: '{program}' command timed out.")]
    TimedOut { program: String },
    #[error("An unexpected error occurred: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct TelemetryProbe {
    program: OsString,
    timeout: Duration,
}

impl Default for TelemetryProbe {
    fn default() -> Self {
        Self::new(TELEMETRY_PROGRAM)
    }
}

impl TelemetryProbe {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            timeout: TELEMETRY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    /// Run the tool and return its trimmed stdout split into lines.
    pub async fn run(&self) -> Result<Vec<String>, TelemetryError> {
        let program = self.program_name();
        let mut command = Command::new(&self.program);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let child = match command.spawn() {
            Ok(child) => child,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(TelemetryError::NotFound { program });
            }
            Err(err) => return Err(err.into()),
        };
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => return Err(TelemetryError::TimedOut { program }),
        };
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr)
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join("; ");
            let detail = if stderr.is_empty() {
                output.status.to_string()
            } else {
                stderr
            };
            return Err(TelemetryError::Failed { program, detail });
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let lines: Vec<String> = stdout.trim().lines().map(str::to_string).collect();
        debug!("telemetry collected (program={program}, lines={})", lines.len());
        Ok(lines)
    }

    /// Like [`run`](Self::run) but with failures rendered as a single line.
    pub async fn lines(&self) -> Vec<String> {
        match self.run().await {
            Ok(lines) => lines,
            Err(err) => {
                warn!("telemetry failed (err={err})");
                vec![err.to_string()]
            }
        }
    }
}
