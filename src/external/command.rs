//! Bounded-timeout subprocess runner
//!
//! Every external call goes through [`run_with_timeout`] (or
//! [`run_handing_off`] for tools that leave a server behind). The child gets its
//! own process group so a timeout can take down anything it spawned, and
//! stdin/stdout/stderr are serviced on helper threads so a chatty tool can
//! never deadlock against a full pipe.

use std::io::{Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::ToolError;

/// How often the child is polled for exit
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

/// Run `program args...`, optionally feeding `stdin`, and return its stdout.
///
/// The whole call, including draining the output pipes, finishes within
/// `timeout`. Fails with `ToolError::Timeout` otherwise (the process group is
/// killed first, which also takes out anything left holding the pipes), and
/// with `ToolError::Failed` on a non-zero exit.
pub fn run_with_timeout(
    program: &str,
    args: &[&str],
    stdin: Option<&[u8]>,
    timeout: Duration,
) -> Result<Vec<u8>, ToolError> {
    let start = Instant::now();
    let mut child = spawn(program, args, stdin.is_some(), true)?;
    feed_stdin(&mut child, stdin);

    let (tx, rx) = mpsc::channel();
    let mut pending = 0;
    if let Some(pipe) = child.stdout.take() {
        spawn_reader(pipe, Stream::Stdout, tx.clone());
        pending += 1;
    }
    if let Some(pipe) = child.stderr.take() {
        spawn_reader(pipe, Stream::Stderr, tx);
        pending += 1;
    }

    let status = wait_bounded(&mut child, program, start, timeout)?;

    let Some((stdout, stderr)) = collect_output(&rx, pending, start + timeout) else {
        // The child is gone but something it started still holds the pipes
        kill_process_group(&mut child);
        warn!(program, ?timeout, "Output still open after exit, killed group");
        return Err(timeout_error(program, timeout));
    };

    debug!(
        program,
        code = ?status.code(),
        stdout_bytes = stdout.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "External call finished"
    );

    if !status.success() {
        return Err(ToolError::Failed {
            program: program.to_string(),
            code: status.code(),
            stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
        });
    }
    Ok(stdout)
}

/// Run a tool that hands its input to a process it leaves running (as
/// `wl-copy` does to serve the clipboard) and only report how it exited.
///
/// Output is discarded so a lingering server can't hold our pipes, and the
/// process group is left alone once the direct child has exited.
pub fn run_handing_off(
    program: &str,
    args: &[&str],
    stdin: Option<&[u8]>,
    timeout: Duration,
) -> Result<(), ToolError> {
    let start = Instant::now();
    let mut child = spawn(program, args, stdin.is_some(), false)?;
    feed_stdin(&mut child, stdin);

    let status = wait_bounded(&mut child, program, start, timeout)?;
    debug!(
        program,
        code = ?status.code(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "External call handed off"
    );

    if !status.success() {
        return Err(ToolError::Failed {
            program: program.to_string(),
            code: status.code(),
            stderr: String::new(),
        });
    }
    Ok(())
}

fn spawn(
    program: &str,
    args: &[&str],
    with_stdin: bool,
    capture: bool,
) -> Result<Child, ToolError> {
    let output = || {
        if capture {
            Stdio::piped()
        } else {
            Stdio::null()
        }
    };
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(if with_stdin {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(output())
        .stderr(output());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    command.spawn().map_err(|e| spawn_error(program, e))
}

/// Write `input` on a detached thread; the caller never waits on it
fn feed_stdin(child: &mut Child, input: Option<&[u8]>) {
    if let (Some(input), Some(mut pipe)) = (input, child.stdin.take()) {
        let input = input.to_vec();
        // A tool that exits without reading all of stdin closes the pipe;
        // the resulting EPIPE is not our failure.
        thread::spawn(move || {
            let _ = pipe.write_all(&input);
        });
    }
}

/// Poll the direct child until it exits or `timeout` (from `start`) passes
fn wait_bounded(
    child: &mut Child,
    program: &str,
    start: Instant,
    timeout: Duration,
) -> Result<ExitStatus, ToolError> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {
                if start.elapsed() > timeout {
                    kill_process_group(child);
                    warn!(program, ?timeout, "External call timed out, killed");
                    return Err(timeout_error(program, timeout));
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                kill_process_group(child);
                return Err(ToolError::Io {
                    program: program.to_string(),
                    source: e,
                });
            }
        }
    }
}

fn timeout_error(program: &str, timeout: Duration) -> ToolError {
    ToolError::Timeout {
        program: program.to_string(),
        timeout,
    }
}

fn spawn_error(program: &str, e: std::io::Error) -> ToolError {
    if e.kind() == std::io::ErrorKind::NotFound {
        ToolError::NotFound {
            program: program.to_string(),
        }
    } else {
        ToolError::Io {
            program: program.to_string(),
            source: e,
        }
    }
}

fn spawn_reader<R: Read + Send + 'static>(
    mut pipe: R,
    stream: Stream,
    tx: Sender<(Stream, Vec<u8>)>,
) {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send((stream, buf));
    });
}

/// Wait for `pending` readers to hit EOF, giving up at `deadline`
fn collect_output(
    rx: &Receiver<(Stream, Vec<u8>)>,
    pending: usize,
    deadline: Instant,
) -> Option<(Vec<u8>, Vec<u8>)> {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    for _ in 0..pending {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok((Stream::Stdout, buf)) => stdout = buf,
            Ok((Stream::Stderr, buf)) => stderr = buf,
            Err(RecvTimeoutError::Timeout) => return None,
            // A reader thread died without sending; treat its stream as empty
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    Some((stdout, stderr))
}

/// SIGKILL the child's process group, then reap the child.
///
/// Reader threads finish on their own once the pipes close.
fn kill_process_group(child: &mut Child) {
    #[cfg(unix)]
    {
        // Spawned with process_group(0), so the PGID equals the PID.
        // Safety: kill() is a plain syscall; a negative pid targets the group.
        let rc = unsafe { libc::kill(-(child.id() as libc::pid_t), libc::SIGKILL) };
        if rc != 0 {
            let _ = child.kill();
        }
    }
    #[cfg(not(unix))]
    {
        let _ = child.kill();
    }
    let _ = child.wait();
}
