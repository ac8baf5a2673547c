//! exec::runner
//!
//! Process execution.
//!
//! # Overview
//!
//! [`run`] launches a [`CommandSpec`] with stdin closed and both output
//! pipes captured. Pipes are drained concurrently with the wait so a
//! chatty child cannot block on a full pipe.
//!
//! # Cancellation and wait delay
//!
//! If the `CommandSpec` carries a cancellation token and it fires, the child is
//! killed and [`ExecError::Cancelled`] is returned. The wait delay bounds
//! how long we wait, after the child exits or is killed, for the pipe
//! readers to finish and for the child to be reaped. A zero delay waits
//! forever.
//!
//! Once the delay has elapsed after a kill, the runner stops waiting. The
//! OS process is not guaranteed to have been reaped at that point; the
//! child handle is dropped with `kill_on_drop` set and tokio reaps it in
//! the background on a best-effort basis.
//!
//! Readers append into shared buffers as data arrives. When a grandchild
//! keeps a pipe open past the delay, whatever was read up to then is
//! still reported, so a failing command keeps its diagnostics.

use std::future::Future;
use std::io;
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use super::command::CommandSpec;

/// Errors from running a process.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("command exited with {}: {}", describe_exit(.code), .stderr.trim())]
    Exited { code: Option<i32>, stderr: String },

    #[error("command cancelled")]
    Cancelled,

    #[error("output pipes still open {delay:?} after the command exited")]
    WaitDelayExceeded { delay: Duration },

    #[error("i/o error while running command: {0}")]
    Io(#[from] io::Error),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (killed by signal)".to_string(),
    }
}

impl ExecError {
    /// Diagnostic output of a failed command, if it ran.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            ExecError::Exited { stderr, .. } => Some(stderr),
            _ => None,
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExecError::Exited { code, .. } => *code,
            _ => None,
        }
    }
}

/// Captured output of a successful command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Output {
    pub stdout: String,
    pub stderr: String,
}

type SharedBuf = Arc<Mutex<Vec<u8>>>;

/// Copy `pipe` into `buf` chunk by chunk until EOF.
async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>, buf: SharedBuf) -> io::Result<()> {
    let Some(mut pipe) = pipe else {
        return Ok(());
    };
    let mut chunk = [0u8; 4096];
    loop {
        let n = pipe.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(&chunk[..n]);
    }
}

fn take_text(buf: &SharedBuf) -> String {
    let bytes = std::mem::take(&mut *buf.lock().unwrap_or_else(PoisonError::into_inner));
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Await `fut`, giving up after `delay`. A zero delay never gives up.
async fn bounded<F: Future>(delay: Duration, fut: F) -> Option<F::Output> {
    if delay.is_zero() {
        Some(fut.await)
    } else {
        tokio::time::timeout(delay, fut).await.ok()
    }
}

async fn cancelled(spec: &CommandSpec) {
    match spec.cancellation() {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

/// Run `spec` to completion.
///
/// # Errors
///
/// - [`ExecError::Spawn`] if the process cannot be started
/// - [`ExecError::Exited`] on a non-zero exit, with captured stderr
/// - [`ExecError::Cancelled`] if the command's cancellation token fired
/// - [`ExecError::WaitDelayExceeded`] if the command succeeded but its
///   output pipes stayed open past the wait delay
pub async fn run(spec: &CommandSpec) -> Result<Output, ExecError> {
    if spec.cancellation().is_some_and(|t| t.is_cancelled()) {
        return Err(ExecError::Cancelled);
    }

    let mut command = Command::new(spec.program());
    command
        .args(spec.args())
        .envs(spec.env().iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|source| ExecError::Spawn {
        program: spec.program().display().to_string(),
        source,
    })?;
    tracing::trace!(command = %spec, pid = ?child.id(), "spawned");

    let stdout_buf = SharedBuf::default();
    let stderr_buf = SharedBuf::default();
    let stdout = tokio::spawn(drain(child.stdout.take(), Arc::clone(&stdout_buf)));
    let stderr = tokio::spawn(drain(child.stderr.take(), Arc::clone(&stderr_buf)));
    let stdout_abort = stdout.abort_handle();
    let stderr_abort = stderr.abort_handle();
    let delay = spec.wait_delay();

    let status = tokio::select! {
        status = child.wait() => Some(status?),
        () = cancelled(spec) => None,
    };

    let Some(status) = status else {
        if let Err(e) = child.start_kill() {
            tracing::debug!(error = %e, "kill after cancellation failed");
        }
        if bounded(delay, child.wait()).await.is_none() {
            tracing::warn!(command = %spec, ?delay, "gave up waiting for cancelled command");
        }
        stdout_abort.abort();
        stderr_abort.abort();
        return Err(ExecError::Cancelled);
    };

    let pipes = bounded(delay, async { (stdout.await, stderr.await) }).await;
    let Some((stdout, stderr)) = pipes else {
        tracing::warn!(command = %spec, ?delay, "output pipes still open after exit");
        stdout_abort.abort();
        stderr_abort.abort();
        if status.success() {
            return Err(ExecError::WaitDelayExceeded { delay });
        }
        return Err(ExecError::Exited {
            code: status.code(),
            stderr: take_text(&stderr_buf),
        });
    };

    stdout.map_err(io::Error::other)??;
    stderr.map_err(io::Error::other)??;
    let output = Output {
        stdout: take_text(&stdout_buf),
        stderr: take_text(&stderr_buf),
    };

    if !status.success() {
        tracing::debug!(command = %spec, code = ?status.code(), "command failed");
        return Err(ExecError::Exited {
            code: status.code(),
            stderr: output.stderr,
        });
    }

    Ok(output)
}
