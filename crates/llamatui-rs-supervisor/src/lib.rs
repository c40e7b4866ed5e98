//! Supervision of a single `llama-server` child process.
//!
//! [`ServerSupervisor`] owns at most one running server. Starting it spawns
//! the binary in its own process group with piped output, and a background
//! task drains that output into a bounded [`LogBuffer`]. Stopping signals the
//! whole group and falls back to killing the child directly.

pub mod error;
pub mod launch;
pub mod log_buffer;
pub mod signal;

mod capture;
mod supervisor;

/// Start and stop error types.
pub use error::{StartError, StopError};
/// Command-line construction for the server binary.
pub use launch::{LaunchCommand, SERVER_BINARY_NAME, resolve_server_binary};
/// Bounded log storage shared with the capture task.
pub use log_buffer::{LOG_CAPACITY, LogBuffer};
/// Stop signalling.
pub use signal::{GroupTerminator, Terminator};
/// The supervisor and its reports.
pub use supervisor::{
    DEFAULT_STOP_TIMEOUT, ExitReport, RunningHandle, ServerSupervisor, StoppedReport,
};
