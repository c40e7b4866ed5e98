//! Supervisor error types.

use std::path::PathBuf;

/// Errors returned when a server cannot be started.
///
/// No server instance exists after any of these.
#[derive(Debug, thiserror::Error)]
pub enum StartError {
    /// A server is already running.
    #[error("Server already running. Press 'K' first.")]
    AlreadyRunning,
    /// No model file is selected.
    #[error("No models found in current directory.")]
    NoModel,
    /// The server binary does not exist or is not a regular file.
    #[error("Error: '{}' not found or is not a file.", .0.display())]
    BinaryMissing(PathBuf),
    /// The server binary lacks execute permission.
    #[error("Error: '{}' is not executable.", .0.display())]
    NotExecutable(PathBuf),
    /// Spawning the child failed.
    #[error("Error: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Both termination strategies failed; the server is still considered running.
#[derive(Debug, thiserror::Error)]
#[error("Error stopping: {group}; fallback failed: {direct}")]
pub struct StopError {
    /// Why signalling the process group did not confirm exit.
    pub group: String,
    /// Why the direct kill did not confirm exit.
    pub direct: String,
}
