//! Child process execution with separate output capture and cancellation.

use crate::cancel::{CancelReason, CancelToken};
use crate::environment::ComposedEnvironment;
use crate::RuntimeError;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use wait_timeout::ChildExt;

/// How often the wait loop wakes up to check for cancellation and timeout.
pub const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// A fully prepared child process invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Resolved interpreter executable.
    pub program: PathBuf,
    /// Interpreter flags, then the command text, then the explicit arguments.
    pub args: Vec<String>,
    /// Complete child environment; nothing else is inherited.
    pub env: ComposedEnvironment,
    pub cwd: PathBuf,
}

impl Invocation {
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(&self.cwd)
            .env_clear()
            .envs(self.env.iter().map(|e| (e.key.as_str(), e.value.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Own process group so cancellation can take down the whole tree.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        cmd
    }
}

#[derive(Debug)]
pub struct CapturedOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

#[derive(Debug)]
pub enum Completion {
    Exited(CapturedOutput),
    Cancelled(CancelReason),
}

/// Run an invocation to completion, cancellation, or timeout.
///
/// stdout and stderr are drained on their own threads while the child runs so
/// a chatty child cannot block on a full pipe. When `cancel` fires or the
/// timeout elapses the child's process group is killed and reaped before
/// returning. Both are still honoured after the direct child exits while a
/// backgrounded process keeps its output pipes open.
pub fn run_captured(
    invocation: &Invocation,
    cancel: &CancelToken,
    timeout: Option<Duration>,
) -> Result<Completion, RuntimeError> {
    let program = invocation.program.to_string_lossy().into_owned();
    debug!("spawning {program}");
    let mut child = invocation
        .to_command()
        .spawn()
        .map_err(|source| RuntimeError::SpawnFailed {
            program: program.clone(),
            source,
        })?;
    let pid = child.id();

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let stdout_handle = thread::spawn(move || read_stream(stdout));
    let stderr_handle = thread::spawn(move || read_stream(stderr));

    let started = Instant::now();
    let status = loop {
        match child.wait_timeout(POLL_INTERVAL) {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(e) => {
                terminate(&mut child);
                return Err(RuntimeError::Io(e));
            }
        }
        if let Some(reason) = stop_reason(cancel, started, timeout) {
            warn!("{program} (pid {pid}) {reason} after {:?}, killing it", started.elapsed());
            terminate(&mut child);
            return Ok(Completion::Cancelled(reason));
        }
    };

    // The pipes stay open as long as anything in the group holds them.
    while !(stdout_handle.is_finished() && stderr_handle.is_finished()) {
        if let Some(reason) = stop_reason(cancel, started, timeout) {
            warn!(
                "{program} (pid {pid}) exited but its output is still open; {reason} after {:?}, killing its process group",
                started.elapsed()
            );
            #[cfg(unix)]
            kill_process_group(pid);
            return Ok(Completion::Cancelled(reason));
        }
        thread::sleep(POLL_INTERVAL);
    }

    let stdout = join_output(stdout_handle)?;
    let stderr = join_output(stderr_handle)?;
    debug!(
        "{program} exited with {:?} ({} bytes stdout, {} bytes stderr)",
        status.code(),
        stdout.len(),
        stderr.len()
    );
    Ok(Completion::Exited(CapturedOutput {
        status,
        stdout,
        stderr,
    }))
}

fn stop_reason(
    cancel: &CancelToken,
    started: Instant,
    timeout: Option<Duration>,
) -> Option<CancelReason> {
    if cancel.is_cancelled() {
        Some(CancelReason::Requested)
    } else if timeout.is_some_and(|limit| started.elapsed() >= limit) {
        Some(CancelReason::TimedOut)
    } else {
        None
    }
}

fn read_stream<R: Read>(stream: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        stream.read_to_end(&mut buf)?;
    }
    Ok(buf)
}

fn join_output(handle: thread::JoinHandle<std::io::Result<Vec<u8>>>) -> Result<Vec<u8>, RuntimeError> {
    match handle.join() {
        Ok(result) => Ok(result?),
        Err(_) => Err(RuntimeError::Io(std::io::Error::other(
            "output reader thread panicked",
        ))),
    }
}

/// Kill the child's process group (or just the child off Unix) and reap it.
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    kill_process_group(child.id());

    if let Err(e) = child.kill() {
        debug!("kill after group signal: {e}");
    }
    if let Err(e) = child.wait() {
        warn!("failed to reap child {}: {e}", child.id());
    }
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    let Ok(pgid) = i32::try_from(pid) else {
        warn!("pid {pid} exceeds i32 range, cannot signal its process group");
        return;
    };
    // SAFETY: kill() with a negative pid signals the process group whose id is
    // the child's pid (set via process_group(0) at spawn); no memory is touched.
    #[allow(unsafe_code)]
    let ret = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if ret != 0 {
        let errno = std::io::Error::last_os_error();
        if errno.raw_os_error() == Some(libc::ESRCH) {
            debug!("process group {pgid} already gone");
        } else {
            warn!("failed to SIGKILL process group {pgid}: {errno}");
        }
    }
}
