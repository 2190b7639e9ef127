// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Child process capture.
//!
//! stdout and stderr are drained on their own threads while the caller
//! waits, so a child that fills one pipe while we block on the other can't
//! deadlock us.
//!
//! With a timeout the child leads its own process group. On expiry the
//! whole group is killed, since a grandchild (a linker, a shell wrapper, a
//! forked program) would otherwise keep the pipes open. The readers are
//! given a short grace period after that and whatever they collected is kept.

use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{DoctestError, Result};

/// How often a child with a deadline is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long the readers may take to hit EOF once the deadline has passed.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

const READ_CHUNK: usize = 8192;

/// Everything a finished (or killed) child produced.
#[derive(Debug)]
pub(crate) struct Captured {
    /// `None` when the child was killed for running past its timeout.
    pub status: Option<ExitStatus>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Spawn `command` and collect its exit status and both output streams.
///
/// `program` names the executable in the error if it can't be launched.
pub(crate) fn capture(
    command: &mut Command,
    program: &Path,
    timeout: Option<Duration>,
) -> Result<Captured> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if timeout.is_some() {
        own_process_group(command);
    }

    let mut child = command
        .spawn()
        .map_err(|e| DoctestError::spawn(program, e))?;
    let stdout = child.stdout.take().map(Reader::spawn);
    let stderr = child.stderr.take().map(Reader::spawn);

    let collect_failed =
        |e| DoctestError::io(format!("failed to collect output of {}", program.display()), e);
    let deadline = timeout.map(|t| Instant::now() + t);
    let mut status = wait(&mut child, deadline).map_err(collect_failed)?;

    // Readers get until the deadline (or a grace period past it) to finish.
    let drain_by = deadline.map(|d| d.max(Instant::now()) + DRAIN_GRACE);
    let (stdout, out_done) = Reader::finish(stdout, drain_by).map_err(collect_failed)?;
    let (stderr, err_done) = Reader::finish(stderr, drain_by).map_err(collect_failed)?;

    if !(out_done && err_done) {
        warn!(
            program = %program.display(),
            "output still open past the deadline, abandoning it"
        );
        kill_group(&child);
        status = None;
    }

    Ok(Captured {
        status,
        stdout,
        stderr,
    })
}

/// A pipe drained on a background thread into a shared buffer, so partial
/// output survives a reader that never sees EOF.
struct Reader {
    buf: Arc<Mutex<Vec<u8>>>,
    done: mpsc::Receiver<io::Result<()>>,
}

impl Reader {
    fn spawn(mut pipe: impl Read + Send + 'static) -> Self {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let (tx, done) = mpsc::channel();
        let shared = Arc::clone(&buf);
        thread::spawn(move || {
            let mut chunk = [0u8; READ_CHUNK];
            let result = loop {
                match pipe.read(&mut chunk) {
                    Ok(0) => break Ok(()),
                    Ok(n) => lock(&shared).extend_from_slice(&chunk[..n]),
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                    Err(e) => break Err(e),
                }
            };
            let _ = tx.send(result);
        });
        Self { buf, done }
    }

    /// Wait for EOF, up to `deadline` when given. Returns the output and
    /// whether the pipe was fully drained.
    fn finish(reader: Option<Self>, deadline: Option<Instant>) -> io::Result<(Vec<u8>, bool)> {
        let Some(reader) = reader else {
            return Ok((Vec::new(), true));
        };

        let received = match deadline {
            None => reader.done.recv().map_err(|_| RecvTimeoutError::Disconnected),
            Some(deadline) => reader
                .done
                .recv_timeout(deadline.saturating_duration_since(Instant::now())),
        };
        let drained = match received {
            Ok(result) => {
                result?;
                true
            }
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => {
                return Err(io::Error::other("output reader thread panicked"));
            }
        };

        let output = std::mem::take(&mut *lock(&reader.buf));
        Ok((output, drained))
    }
}

fn lock(buf: &Mutex<Vec<u8>>) -> std::sync::MutexGuard<'_, Vec<u8>> {
    buf.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Wait for exit, killing the child's group if it outlives `deadline`.
fn wait(child: &mut Child, deadline: Option<Instant>) -> io::Result<Option<ExitStatus>> {
    let Some(deadline) = deadline else {
        return child.wait().map(Some);
    };

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            debug!(pid = child.id(), "deadline passed, killing child");
            kill_group(child);
            if let Err(e) = child.kill() {
                // Already exited between try_wait and kill.
                debug!(error = %e, "kill after deadline");
            }
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

#[cfg(unix)]
fn own_process_group(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn own_process_group(_command: &mut Command) {}

/// SIGKILL every process in the child's group. The group outlives a reaped
/// leader while any member is alive, so this is safe after `wait`.
#[cfg(unix)]
fn kill_group(child: &Child) {
    let Ok(pgid) = libc::pid_t::try_from(child.id()) else {
        return;
    };
    let ret = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if ret != 0 {
        debug!(error = %io::Error::last_os_error(), pgid, "killing process group");
    }
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) {}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("/bin/sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    fn run(script: &str, timeout: Option<Duration>) -> Captured {
        capture(&mut sh(script), Path::new("sh"), timeout).unwrap()
    }

    #[test]
    fn captures_both_streams_and_status() {
        let out = run("echo out; echo err >&2; exit 3", None);
        assert_eq!(out.stdout, b"out\n");
        assert_eq!(out.stderr, b"err\n");
        assert_eq!(out.status.unwrap().code(), Some(3));
    }

    #[test]
    fn large_output_on_both_pipes_does_not_deadlock() {
        // Each stream is far larger than a pipe buffer, and stderr is written
        // completely before stdout, so sequential reading would hang.
        let script = "head -c 1048576 /dev/zero | tr '\\0' e >&2; \
                      head -c 1048576 /dev/zero | tr '\\0' o";
        let out = run(script, Some(Duration::from_secs(60)));
        assert!(out.status.unwrap().success());
        assert_eq!(out.stderr.len(), 1 << 20);
        assert_eq!(out.stdout.len(), 1 << 20);
    }

    #[test]
    fn timeout_kills_child() {
        let start = Instant::now();
        let out = run("echo started; exec sleep 10", Some(Duration::from_millis(200)));
        assert!(out.status.is_none());
        assert_eq!(out.stdout, b"started\n");
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn timeout_kills_grandchildren_holding_the_pipes() {
        // No exec: the shell forks sleep, which inherits both pipes.
        let start = Instant::now();
        let out = run("echo started; sleep 30; echo late", Some(Duration::from_millis(200)));
        assert!(out.status.is_none());
        assert_eq!(out.stdout, b"started\n");
        assert!(start.elapsed() < Duration::from_secs(5), "{:?}", start.elapsed());
    }

    #[test]
    fn background_process_past_deadline_is_abandoned() {
        // The shell exits at once but leaves a sleeper holding stdout.
        let start = Instant::now();
        let out = run("sleep 30 & echo started", Some(Duration::from_millis(300)));
        assert!(out.status.is_none());
        assert_eq!(out.stdout, b"started\n");
        assert!(start.elapsed() < Duration::from_secs(5), "{:?}", start.elapsed());
    }

    #[test]
    fn fast_child_with_timeout_keeps_its_status() {
        let out = run("echo quick", Some(Duration::from_secs(30)));
        assert!(out.status.unwrap().success());
        assert_eq!(out.stdout, b"quick\n");
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let program = Path::new("/nonexistent/rask-doctest-toolchain");
        let err = capture(&mut Command::new(program), program, None).unwrap_err();
        assert!(matches!(err, DoctestError::Spawn { .. }));
    }
}
