//! Command-line construction for the server binary.

use crate::StartError;
use llamatui_rs_config::Config;
use std::fmt;
use std::path::{Path, PathBuf};

/// File name of the server binary inside the configured directory.
pub const SERVER_BINARY_NAME: &str = "llama-server";

/// Program and arguments for one server launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    /// Path of the server binary.
    pub program: PathBuf,
    /// Arguments after the program.
    pub args: Vec<String>,
}

impl LaunchCommand {
    /// Derive the server command line from the settings and a model path.
    ///
    /// `-ngl` is only emitted for GPU backends with at least one layer;
    /// `-t` and `-c` are emitted whenever their values are positive.
    pub fn build(config: &Config, model_path: &Path) -> Self {
        let mut args = vec![
            "-m".to_string(),
            model_path.display().to_string(),
            "--port".to_string(),
            config.port.to_string(),
            "--host".to_string(),
            config.listen_host().to_string(),
        ];
        if config.backend.offloads_to_gpu() && config.gpu_layers > 0 {
            args.extend(["-ngl".to_string(), config.gpu_layers.to_string()]);
        }
        if config.threads > 0 {
            args.extend(["-t".to_string(), config.threads.to_string()]);
        }
        if config.context_size > 0 {
            args.extend(["-c".to_string(), config.context_size.to_string()]);
        }
        Self {
            program: config.server_dir.join(SERVER_BINARY_NAME),
            args,
        }
    }

    /// Value following `flag`, if the flag is present.
    pub fn flag_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|arg| arg == flag)
            .and_then(|idx| self.args.get(idx + 1))
            .map(String::as_str)
    }
}

impl fmt::Display for LaunchCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Locate the server binary and check it can be executed.
pub fn resolve_server_binary(server_dir: &Path) -> Result<PathBuf, StartError> {
    let path = server_dir.join(SERVER_BINARY_NAME);
    let metadata = match std::fs::metadata(&path) {
        Ok(metadata) if metadata.is_file() => metadata,
        _ => return Err(StartError::BinaryMissing(path)),
    };
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(StartError::NotExecutable(path));
        }
    }
    #[cfg(not(unix))]
    let _ = metadata;
    Ok(path)
}
