//! Lifecycle of the single supervised server process.

use crate::capture::spawn_log_capture;
use crate::launch::{LaunchCommand, resolve_server_binary};
use crate::log_buffer::{LOG_CAPACITY, LogBuffer};
use crate::signal::{GroupTerminator, Terminator};
use crate::{StartError, StopError};
use llamatui_rs_config::Config;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

/// How long each termination strategy waits for the child to exit.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Identity of a running server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningHandle {
    pub pid: u32,
    /// Process group id; equal to `pid` because the server leads its group.
    pub pgid: i32,
    pub model_path: PathBuf,
    pub command: LaunchCommand,
}

/// Outcome of a stop request that left no server running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoppedReport {
    /// Nothing was running.
    NotRunning,
    /// The process group exited after the termination signal.
    Stopped { pid: u32 },
    /// The child had to be killed directly.
    Forced { pid: u32 },
}

impl StoppedReport {
    /// Status-line text for the outcome.
    pub fn message(&self) -> &'static str {
        match self {
            StoppedReport::NotRunning => "No server running.",
            StoppedReport::Stopped { .. } => "Server stopped and cache cleared.",
            StoppedReport::Forced { .. } => "Server stopped (fallback).",
        }
    }
}

/// A server that exited without being asked to.
#[derive(Debug, Clone)]
pub struct ExitReport {
    pub pid: u32,
    pub status: ExitStatus,
    pub model_path: PathBuf,
}

#[derive(Debug)]
struct ServerInstance {
    child: Child,
    handle: RunningHandle,
    logs: LogBuffer,
    capture: JoinHandle<()>,
}

impl ServerInstance {
    /// Discard the instance; capture ends by itself once the pipes close.
    fn destroy(self) {
        self.logs.close();
        if !self.capture.is_finished() {
            debug!("log capture still draining (pid={})", self.handle.pid);
        }
    }
}

/// Owner of at most one running `llama-server`.
///
/// Requires a tokio runtime: starting spawns the child and its capture task.
#[derive(Debug)]
pub struct ServerSupervisor {
    instance: Option<ServerInstance>,
    stop_timeout: Duration,
    terminator: Arc<dyn Terminator>,
}

impl Default for ServerSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerSupervisor {
    pub fn new() -> Self {
        Self {
            instance: None,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            terminator: Arc::new(GroupTerminator),
        }
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Replace how stop requests reach the server.
    pub fn with_terminator(mut self, terminator: impl Terminator + 'static) -> Self {
        self.terminator = Arc::new(terminator);
        self
    }

    pub fn is_running(&self) -> bool {
        self.instance.is_some()
    }

    pub fn handle(&self) -> Option<&RunningHandle> {
        self.instance.as_ref().map(|instance| &instance.handle)
    }

    /// Log buffer of the running server.
    pub fn logs(&self) -> Option<LogBuffer> {
        self.instance.as_ref().map(|instance| instance.logs.clone())
    }

    pub fn running_model(&self) -> Option<&Path> {
        self.handle().map(|handle| handle.model_path.as_path())
    }

    /// Launch the server for `model` with the current settings.
    ///
    /// No instance exists after an error.
    pub fn start(
        &mut self,
        config: &Config,
        model: Option<&Path>,
    ) -> Result<RunningHandle, StartError> {
        if self.instance.is_some() {
            return Err(StartError::AlreadyRunning);
        }
        let model = model.ok_or(StartError::NoModel)?;
        let program = resolve_server_binary(&config.server_dir)?;
        let model_path = std::fs::canonicalize(model).unwrap_or_else(|_| model.to_path_buf());
        let launch = LaunchCommand::build(config, &model_path);

        let mut command = Command::new(&program);
        command
            .args(&launch.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn()?;
        let pid = child
            .id()
            .ok_or_else(|| std::io::Error::other("server exited during launch"))?;
        let pgid = i32::try_from(pid).map_err(std::io::Error::other)?;

        let logs = LogBuffer::new(LOG_CAPACITY);
        let capture = spawn_log_capture(child.stdout.take(), child.stderr.take(), logs.clone());
        let handle = RunningHandle {
            pid,
            pgid,
            model_path,
            command: launch,
        };
        info!(
            "server started (pid={}, model={}, command={})",
            pid,
            handle.model_path.display(),
            handle.command
        );
        self.instance = Some(ServerInstance {
            child,
            handle: handle.clone(),
            logs,
            capture,
        });
        Ok(handle)
    }

    /// Terminate the running server.
    ///
    /// The whole process group is asked to terminate first; if that fails or
    /// times out the child is killed directly. When both fail the server is
    /// still considered running.
    pub async fn stop(&mut self) -> Result<StoppedReport, StopError> {
        let Some(instance) = self.instance.as_mut() else {
            return Ok(StoppedReport::NotRunning);
        };
        let report = terminate(instance, self.terminator.as_ref(), self.stop_timeout).await?;
        if let Some(instance) = self.instance.take() {
            instance.destroy();
        }
        Ok(report)
    }

    /// Detect a server that exited on its own, without blocking.
    pub fn poll_exit(&mut self) -> Option<ExitReport> {
        let instance = self.instance.as_mut()?;
        match instance.child.try_wait() {
            Ok(Some(status)) => {
                let instance = self.instance.take()?;
                // stray forks of a crashed server would keep the port bound
                let _ = self.terminator.kill_group(instance.handle.pgid);
                warn!(
                    "server exited unexpectedly (pid={}, status={})",
                    instance.handle.pid, status
                );
                let report = ExitReport {
                    pid: instance.handle.pid,
                    status,
                    model_path: instance.handle.model_path.clone(),
                };
                instance.destroy();
                Some(report)
            }
            Ok(None) => None,
            Err(err) => {
                debug!("server wait failed (err={err})");
                None
            }
        }
    }
}

async fn terminate(
    instance: &mut ServerInstance,
    terminator: &dyn Terminator,
    timeout: Duration,
) -> Result<StoppedReport, StopError> {
    let pid = instance.handle.pid;
    let pgid = instance.handle.pgid;
    let group = match terminator.terminate_group(pgid) {
        Ok(()) => match tokio::time::timeout(timeout, instance.child.wait()).await {
            Ok(Ok(status)) => {
                info!("server stopped (pid={pid}, status={status})");
                return Ok(StoppedReport::Stopped { pid });
            }
            Ok(Err(err)) => err.to_string(),
            Err(_) => format!("no exit within {}s", timeout.as_secs_f32()),
        },
        Err(err) => err.to_string(),
    };
    warn!("server group termination failed (pid={pid}, reason={group})");

    let kill_failure = terminator.kill_child(&mut instance.child).err();
    if let Some(err) = &kill_failure {
        debug!("direct kill failed (pid={pid}, err={err})");
    }
    let _ = terminator.kill_group(pgid);
    let direct = match tokio::time::timeout(timeout, instance.child.wait()).await {
        Ok(Ok(status)) => {
            info!("server killed (pid={pid}, status={status})");
            return Ok(StoppedReport::Forced { pid });
        }
        Ok(Err(err)) => err.to_string(),
        Err(_) => match kill_failure {
            Some(err) => err.to_string(),
            None => format!("no exit within {}s", timeout.as_secs_f32()),
        },
    };
    warn!("server still running after stop (pid={pid}, reason={direct})");
    Err(StopError { group, direct })
}

impl Drop for ServerSupervisor {
    fn drop(&mut self) {
        if let Some(instance) = self.instance.take() {
            let _ = self.terminator.kill_group(instance.handle.pgid);
            instance.destroy();
        }
    }
}
