//! Process-group signalling primitives.
//!
//! The server is spawned as the leader of its own process group, so its
//! group id equals its pid and a negative pid addresses every process the
//! server forked.

use std::fmt;
use std::io;
use tokio::process::Child;

/// The signals a supervisor sends to stop its server.
pub trait Terminator: fmt::Debug + Send + Sync {
    /// Polite request to every process in the group.
    fn terminate_group(&self, pgid: i32) -> io::Result<()>;
    /// Unconditional kill of every process in the group.
    fn kill_group(&self, pgid: i32) -> io::Result<()>;
    /// Kill the direct child only.
    fn kill_child(&self, child: &mut Child) -> io::Result<()>;
}

/// Signals the real process group, falling back to the child handle.
#[derive(Debug, Default, Clone, Copy)]
pub struct GroupTerminator;

impl Terminator for GroupTerminator {
    fn terminate_group(&self, pgid: i32) -> io::Result<()> {
        terminate_group(pgid)
    }

    fn kill_group(&self, pgid: i32) -> io::Result<()> {
        kill_group(pgid)
    }

    fn kill_child(&self, child: &mut Child) -> io::Result<()> {
        child.start_kill()
    }
}

/// Ask every process in the group to terminate.
pub fn terminate_group(pgid: i32) -> io::Result<()> {
    send_to_group(pgid, false)
}

/// Kill every process in the group.
pub fn kill_group(pgid: i32) -> io::Result<()> {
    send_to_group(pgid, true)
}

#[cfg(unix)]
fn send_to_group(pgid: i32, force: bool) -> io::Result<()> {
    if pgid <= 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid process group id {pgid}"),
        ));
    }
    let sig = if force { libc::SIGKILL } else { libc::SIGTERM };
    let result = unsafe { libc::kill(-pgid, sig) };
    if result != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(unix))]
fn send_to_group(pgid: i32, force: bool) -> io::Result<()> {
    let _ = (pgid, force);
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "process groups are not supported on this platform",
    ))
}

#[cfg(all(test, unix))]
mod tests {
    use super::{kill_group, terminate_group};
    use pretty_assertions::assert_eq;

    #[test]
    fn rejects_non_positive_group_ids() {
        let err = terminate_group(0).expect_err("pgid 0");
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
        let err = kill_group(-5).expect_err("negative pgid");
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    }

    #[test]
    fn reports_missing_group() {
        // pid_max never reaches i32::MAX, so no such group exists.
        let err = terminate_group(i32::MAX).expect_err("missing group");
        assert_eq!(err.raw_os_error(), Some(libc::ESRCH));
    }
}
