//! Child processes bounded in time and in captured output.
//!
//! On Unix the child leads its own process group, so a timeout takes down
//! anything it spawned (ssh, credential helpers, hooks) along with it.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// How long pipe readers may keep running once the child is gone. A process
/// that escaped the group can hold the pipes open long after that.
const PIPE_DRAIN_GRACE: Duration = Duration::from_secs(2);

/// What a finished (or killed) child left behind.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Bytes read past the capture limit and thrown away.
    pub stdout_dropped: usize,
    pub stderr_dropped: usize,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Stderr as text, with a trailing notice when bytes were dropped.
    pub fn stderr_text(&self) -> String {
        let mut text = String::from_utf8_lossy(&self.stderr).into_owned();
        if self.stderr_dropped > 0 {
            text.push_str(&format!("\n[{} more bytes of stderr dropped]", self.stderr_dropped));
        }
        text
    }
}

#[derive(Debug, Default)]
struct Capture {
    bytes: Vec<u8>,
    dropped: usize,
}

type SharedCapture = Arc<Mutex<Capture>>;

/// Run `cmd` with stdin closed, capturing at most `capture_limit` bytes of
/// each output stream.
///
/// A child still running after `timeout` is killed together with its process
/// group and reported with `timed_out = true`. Output readers get a short
/// grace period after exit; whatever they captured by then is returned even
/// if a leftover process keeps the pipes open.
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs(), capture_limit))]
pub fn run_bounded(
    mut cmd: Command,
    timeout: Duration,
    capture_limit: usize,
) -> Result<CommandOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    own_process_group(&mut cmd);

    let mut child = cmd.spawn().map_err(|err| {
        error!(err = %err, "failed to spawn command");
        anyhow::Error::new(err).context("spawn command")
    })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let (done_tx, done_rx) = mpsc::channel();
    let stdout_capture = spawn_reader(stdout, capture_limit, done_tx.clone());
    let stderr_capture = spawn_reader(stderr, capture_limit, done_tx);

    let (status, timed_out) = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => (status, false),
        None => {
            warn!(timeout_secs = timeout.as_secs(), "command timed out, killing");
            kill_process_group(&mut child)?;
            (child.wait().context("wait command after kill")?, true)
        }
    };

    if !await_readers(&done_rx, 2)? {
        warn!(
            grace_ms = PIPE_DRAIN_GRACE.as_millis() as u64,
            "output pipes still open after exit, keeping partial output"
        );
    }
    let stdout = take_capture(&stdout_capture)?;
    let stderr = take_capture(&stderr_capture)?;

    if stdout.dropped > 0 || stderr.dropped > 0 {
        warn!(
            stdout_dropped = stdout.dropped,
            stderr_dropped = stderr.dropped,
            "output over capture limit"
        );
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CommandOutput {
        status,
        stdout: stdout.bytes,
        stderr: stderr.bytes,
        stdout_dropped: stdout.dropped,
        stderr_dropped: stderr.dropped,
        timed_out,
    })
}

#[cfg(unix)]
fn own_process_group(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(not(unix))]
fn own_process_group(_cmd: &mut Command) {}

/// SIGKILL the child's whole group, then the child itself.
#[cfg(unix)]
fn kill_process_group(child: &mut Child) -> Result<()> {
    let group = format!("-{}", child.id());
    let killed = Command::new("kill")
        .args(["-s", "KILL", "--", &group])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    match killed {
        Ok(status) if status.success() => debug!(group = %group, "process group killed"),
        Ok(status) => warn!(group = %group, exit_code = ?status.code(), "group kill failed"),
        Err(err) => warn!(group = %group, err = %err, "could not run kill"),
    }
    child.kill().context("kill command")
}

#[cfg(not(unix))]
fn kill_process_group(child: &mut Child) -> Result<()> {
    child.kill().context("kill command")
}

fn spawn_reader<R: Read + Send + 'static>(
    reader: R,
    limit: usize,
    done: Sender<Result<()>>,
) -> SharedCapture {
    let capture = SharedCapture::default();
    let sink = Arc::clone(&capture);
    thread::spawn(move || {
        let result = drain_into(reader, limit, &sink);
        // The receiver is gone once the caller stopped waiting.
        let _ = done.send(result);
    });
    capture
}

/// Wait up to [`PIPE_DRAIN_GRACE`] for `readers` threads to hit end of
/// stream. Returns `false` when some were still blocked.
fn await_readers(done: &Receiver<Result<()>>, readers: usize) -> Result<bool> {
    let deadline = Instant::now() + PIPE_DRAIN_GRACE;
    for _ in 0..readers {
        let left = deadline.saturating_duration_since(Instant::now());
        match done.recv_timeout(left) {
            Ok(result) => result.context("capture output")?,
            Err(RecvTimeoutError::Timeout) => return Ok(false),
            Err(RecvTimeoutError::Disconnected) => {
                return Err(anyhow!("output reader thread panicked"));
            }
        }
    }
    Ok(true)
}

fn take_capture(capture: &SharedCapture) -> Result<Capture> {
    let mut guard = capture
        .lock()
        .map_err(|_| anyhow!("output capture lock poisoned"))?;
    Ok(std::mem::take(&mut *guard))
}

/// Read `reader` to the end, keeping the first `limit` bytes in `sink`.
fn drain_into<R: Read>(mut reader: R, limit: usize, sink: &Mutex<Capture>) -> Result<()> {
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            return Ok(());
        }
        let mut capture = sink
            .lock()
            .map_err(|_| anyhow!("output capture lock poisoned"))?;
        let keep = n.min(limit.saturating_sub(capture.bytes.len()));
        capture.bytes.extend_from_slice(&chunk[..keep]);
        capture.dropped += n - keep;
    }
}
