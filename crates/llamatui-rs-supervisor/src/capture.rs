//! Line-oriented capture of a child's output streams.

use crate::LogBuffer;
use log::{debug, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStderr, ChildStdout};
use tokio::task::JoinHandle;

/// Spawn a task appending every non-blank output line to `logs`.
///
/// The task ends once both streams reach end of file. A read error ends the
/// affected stream only.
pub(crate) fn spawn_log_capture(
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
    logs: LogBuffer,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut stdout_reader = stdout.map(BufReader::new);
        let mut stderr_reader = stderr.map(BufReader::new);

        let mut stdout_done = stdout_reader.is_none();
        let mut stderr_done = stderr_reader.is_none();

        // read_until keeps partial lines in these across select! cancellation
        let mut stdout_line = Vec::new();
        let mut stderr_line = Vec::new();

        while !stdout_done || !stderr_done {
            tokio::select! {
                read = async {
                    match stdout_reader.as_mut() {
                        Some(reader) => reader.read_until(b'\n', &mut stdout_line).await,
                        None => Ok(0),
                    }
                }, if !stdout_done => {
                    stdout_done = consume(read, &mut stdout_line, &logs, "stdout");
                }
                read = async {
                    match stderr_reader.as_mut() {
                        Some(reader) => reader.read_until(b'\n', &mut stderr_line).await,
                        None => Ok(0),
                    }
                }, if !stderr_done => {
                    stderr_done = consume(read, &mut stderr_line, &logs, "stderr");
                }
            }
        }
        debug!("log capture finished (lines={})", logs.len());
    })
}

/// Record one completed read; returns true when the stream is finished.
fn consume(
    read: std::io::Result<usize>,
    line: &mut Vec<u8>,
    logs: &LogBuffer,
    stream: &str,
) -> bool {
    match read {
        Ok(0) => {
            flush(line, logs);
            true
        }
        Ok(_) => {
            flush(line, logs);
            false
        }
        Err(err) => {
            warn!("server output read failed (stream={stream}, err={err})");
            flush(line, logs);
            true
        }
    }
}

fn flush(line: &mut Vec<u8>, logs: &LogBuffer) {
    let text = String::from_utf8_lossy(line);
    let text = text.trim();
    if !text.is_empty() {
        logs.push(text);
    }
    line.clear();
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::process::Stdio;
    use tokio::process::Command;

    #[tokio::test]
    async fn captures_both_streams_and_skips_blank_lines() {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg("printf 'out\\n\\n  \\n'; printf 'err\\n' >&2; printf 'tail'")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("spawn sh");
        let logs = LogBuffer::new(16);
        let task = spawn_log_capture(child.stdout.take(), child.stderr.take(), logs.clone());
        task.await.expect("capture task");
        child.wait().await.expect("wait");

        let mut lines = logs.snapshot();
        lines.sort();
        assert_eq!(lines, vec!["err", "out", "tail"]);
    }

    #[tokio::test]
    async fn invalid_utf8_is_decoded_lossily() {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg("printf 'bad \\377 byte\\n' >&2")
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .expect("spawn sh");
        let logs = LogBuffer::new(4);
        spawn_log_capture(None, child.stderr.take(), logs.clone())
            .await
            .expect("capture task");
        child.wait().await.expect("wait");
        assert_eq!(logs.snapshot(), vec!["bad \u{FFFD} byte".to_string()]);
    }

    #[tokio::test]
    async fn no_streams_finishes_immediately() {
        let logs = LogBuffer::new(4);
        spawn_log_capture(None, None, logs.clone())
            .await
            .expect("capture task");
        assert!(logs.is_empty());
    }
}
