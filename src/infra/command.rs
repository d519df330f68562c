//! # Command Execution Module / 命令执行模块
//!
//! Spawns a child process, captures its stdout and stderr concurrently and
//! waits for it under a time budget and a cancellation token. A child that
//! outlives its budget or is cancelled is killed and reaped.
//!
//! 派生子进程，并发捕获其 stdout 和 stderr，并在时间预算和取消令牌的约束下等待它。
//! 超出预算或被取消的子进程会被终止并回收。

use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::models::CapturedOutput;
use crate::infra::t;

/// How long output readers may keep draining after a child exited normally.
const EXIT_DRAIN_GRACE: Duration = Duration::from_secs(5);

/// How long output readers may keep draining after a child was killed.
/// Grandchildren can keep the pipes open, so this is kept short.
const KILL_DRAIN_GRACE: Duration = Duration::from_millis(500);

/// How the wait for a child ended.
/// 等待子进程的结束方式。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessExit {
    /// The child exited on its own.
    Exited(ExitStatus),
    /// The child started but waiting for it failed; it was killed.
    WaitFailed(String),
    /// The time budget elapsed; the child was killed.
    TimedOut,
    /// The cancellation token fired; the child was killed.
    Cancelled,
}

/// Everything observed about one child process.
#[derive(Debug, Clone)]
pub struct CapturedProcess {
    pub exit: ProcessExit,
    pub output: CapturedOutput,
    pub duration: Duration,
}

enum Waited {
    Exited(io::Result<ExitStatus>),
    TimedOut,
    Cancelled,
}

/// Spawns a command and captures its stdout and stderr.
/// The output streams are read concurrently, line by line, into separate
/// buffers. Bytes that are not valid UTF-8 are replaced, never dropped.
///
/// # Arguments
/// * `cmd` - The `tokio::process::Command` to execute.
/// * `timeout` - Maximum time to wait for the child to exit.
/// * `cancel` - Token that, once cancelled, kills the child.
///
/// # Returns
/// `Err` only if the process could not be spawned (missing binary, permission
/// denied, ...). Every other ending, including a failed wait on a started
/// child, is reported through `ProcessExit`.
///
/// 派生一个命令并捕获其 stdout 和 stderr。
/// 输出流被逐行并发读取到各自的缓冲区中。
///
/// # Returns
/// 仅当进程无法派生时（二进制缺失、权限被拒绝等）返回 `Err`。
/// 其他所有结束方式（包括等待已启动的子进程失败）都通过 `ProcessExit` 报告。
pub async fn spawn_and_capture(
    mut cmd: Command,
    timeout: Duration,
    cancel: &CancellationToken,
) -> io::Result<CapturedProcess> {
    let start_time = Instant::now();

    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other(t!("run.capture_stdout_failed").to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::other(t!("run.capture_stderr_failed").to_string()))?;

    let stdout_buf = Arc::new(Mutex::new(String::new()));
    let stderr_buf = Arc::new(Mutex::new(String::new()));
    let stdout_handle = tokio::spawn(drain_lines(stdout, Arc::clone(&stdout_buf)));
    let stderr_handle = tokio::spawn(drain_lines(stderr, Arc::clone(&stderr_buf)));

    let waited = tokio::select! {
        biased;
        _ = cancel.cancelled() => Waited::Cancelled,
        res = tokio::time::timeout(timeout, child.wait()) => match res {
            Ok(status) => Waited::Exited(status),
            Err(_) => Waited::TimedOut,
        },
    };

    let exit = match waited {
        Waited::Exited(Ok(status)) => ProcessExit::Exited(status),
        Waited::Exited(Err(e)) => {
            kill(&mut child).await;
            ProcessExit::WaitFailed(e.to_string())
        }
        Waited::TimedOut => {
            kill(&mut child).await;
            ProcessExit::TimedOut
        }
        Waited::Cancelled => {
            kill(&mut child).await;
            ProcessExit::Cancelled
        }
    };
    let duration = start_time.elapsed();

    let grace = match exit {
        ProcessExit::Exited(_) => EXIT_DRAIN_GRACE,
        _ => KILL_DRAIN_GRACE,
    };
    finish_readers([stdout_handle, stderr_handle], grace).await;

    let output = CapturedOutput {
        stdout: stdout_buf.lock().await.clone(),
        stderr: stderr_buf.lock().await.clone(),
    };

    Ok(CapturedProcess {
        exit,
        output,
        duration,
    })
}

/// Kills and reaps a child. The child may already have exited on its own,
/// in which case the error is irrelevant.
async fn kill(child: &mut Child) {
    let _ = child.kill().await;
}

/// Appends every line of `reader` to `buf` until EOF or a read error.
///
/// Lines are read as raw bytes and decoded lossily. The pipe must stay open
/// until EOF whatever the child prints, or its next write dies with SIGPIPE.
async fn drain_lines<R>(reader: R, buf: Arc<Mutex<String>>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                let mut out = buf.lock().await;
                out.push_str(&String::from_utf8_lossy(&line));
                if !out.ends_with('\n') {
                    out.push('\n');
                }
            }
        }
    }
}

/// Waits up to `grace` for the readers, then abandons whatever is left.
async fn finish_readers(handles: [JoinHandle<()>; 2], grace: Duration) {
    let [stdout_handle, stderr_handle] = handles;
    let stdout_abort = stdout_handle.abort_handle();
    let stderr_abort = stderr_handle.abort_handle();

    let joined = tokio::time::timeout(grace, async {
        let _ = tokio::join!(stdout_handle, stderr_handle);
    })
    .await;

    if joined.is_err() {
        stdout_abort.abort();
        stderr_abort.abort();
    }
}
