//! # Runner Invocation Module / 运行器调用模块
//!
//! Launches the external conformance runner once per work item. The test
//! identifier is the last positional argument, preceded by the verbosity flag;
//! the backend is handed over in an environment variable that is set on the
//! child command only, so the orchestrator's own environment never changes.
//!
//! 每个工作项启动一次外部一致性运行器。测试标识符是最后一个位置参数，前面是详细输出标志；
//! 后端通过仅在子命令上设置的环境变量传递，因此编排器自身的环境永远不会改变。

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        config::CtsMatrix,
        models::{CapturedOutput, ErrorReason, Invocation, InvocationResult, Outcome, WorkItem},
    },
    infra::{
        command::{self, ProcessExit},
        t,
    },
};

/// Runs a single work item and classifies the result.
///
/// The orchestrator only talks to the runner through this trait, which lets
/// the run loop be exercised without spawning processes.
///
/// 运行单个工作项并对结果进行分类。
/// 编排器只通过此 trait 与运行器交互，这使得运行循环可以在不派生进程的情况下被测试。
pub trait Invoker {
    fn invoke(
        &self,
        item: &WorkItem,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Invocation>;
}

/// Invokes the configured runner executable as a child process.
/// 将配置的运行器可执行文件作为子进程调用。
#[derive(Debug, Clone)]
pub struct ProcessInvoker {
    program: String,
    base_args: Vec<String>,
    working_dir: Option<PathBuf>,
    backend_env: String,
    verbosity_flag: Option<String>,
    extra_env: BTreeMap<String, String>,
    timeout: Duration,
}

impl ProcessInvoker {
    /// Builds an invoker from the `[runner]` section and the per-test timeout.
    ///
    /// The command line is expanded (`~`, `$VAR`) and then split with shell
    /// quoting rules.
    pub fn from_config(config: &CtsMatrix) -> Result<Self> {
        let runner = &config.runner;
        let expanded = shellexpand::full(&runner.command)
            .with_context(|| format!("Failed to expand command: {}", runner.command))?
            .to_string();

        let mut parts = shlex::split(&expanded)
            .ok_or_else(|| anyhow::anyhow!("Failed to parse command: {}", expanded))?
            .into_iter();
        let program = parts
            .next()
            .ok_or_else(|| anyhow::anyhow!("Empty command after parsing."))?;

        let verbosity_flag = Some(runner.verbosity_flag.trim())
            .filter(|flag| !flag.is_empty())
            .map(str::to_string);

        Ok(Self {
            program,
            base_args: parts.collect(),
            working_dir: runner.working_dir.clone(),
            backend_env: runner.backend_env.clone(),
            verbosity_flag,
            extra_env: runner.env.clone(),
            timeout: config.timeout(),
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The argument vector passed to the runner for `item`, program excluded.
    /// 为 `item` 传递给运行器的参数向量，不包括程序本身。
    pub fn args_for(&self, item: &WorkItem) -> Vec<String> {
        let mut args = self.base_args.clone();
        if let Some(flag) = &self.verbosity_flag {
            args.push(flag.clone());
        }
        args.push(item.test.to_string());
        args
    }

    /// A printable form of the invocation, used in verbose logs.
    pub fn describe(&self, item: &WorkItem) -> String {
        let mut words = vec![self.program.clone()];
        words.extend(self.args_for(item));
        let command_line = shlex::try_join(words.iter().map(String::as_str))
            .unwrap_or_else(|_| words.join(" "));
        format!("{}={} {}", self.backend_env, item.backend, command_line)
    }

    /// Builds the child command. Environment changes apply to the child only.
    pub fn build_command(&self, item: &WorkItem) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args_for(item))
            .envs(&self.extra_env)
            .env(&self.backend_env, item.backend.as_str())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl Invoker for ProcessInvoker {
    async fn invoke(&self, item: &WorkItem, cancel: &CancellationToken) -> Invocation {
        let cmd = self.build_command(item);

        let captured = match command::spawn_and_capture(cmd, self.timeout, cancel).await {
            Ok(captured) => captured,
            Err(e) => {
                let message = t!(
                    "run.spawn_failed",
                    program = &self.program,
                    error = e.to_string()
                )
                .to_string();
                return Invocation::Completed(InvocationResult {
                    item: item.clone(),
                    outcome: Outcome::Errored(ErrorReason::SpawnFailure),
                    exit_code: None,
                    output: CapturedOutput {
                        stdout: String::new(),
                        stderr: message,
                    },
                    duration: Duration::ZERO,
                });
            }
        };

        let Some((outcome, exit_code)) = classify_exit(&captured.exit) else {
            return Invocation::Cancelled;
        };

        let mut output = captured.output;
        if let ProcessExit::WaitFailed(error) = &captured.exit {
            output.stderr.push_str(
                &t!("run.wait_failed", program = &self.program, error = error).to_string(),
            );
            output.stderr.push('\n');
        }

        Invocation::Completed(InvocationResult {
            item: item.clone(),
            outcome,
            exit_code,
            output,
            duration: captured.duration,
        })
    }
}

/// Maps how a started child ended onto an outcome and its exit code.
/// `None` means the run was cancelled and nothing should be recorded.
fn classify_exit(exit: &ProcessExit) -> Option<(Outcome, Option<i32>)> {
    match exit {
        ProcessExit::Cancelled => None,
        ProcessExit::TimedOut => Some((Outcome::Errored(ErrorReason::Timeout), None)),
        ProcessExit::WaitFailed(_) => Some((Outcome::Errored(ErrorReason::WaitFailure), None)),
        ProcessExit::Exited(status) => {
            Some((Outcome::from_exit_code(status.code()), status.code()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::parse_config;
    use crate::core::models::{Backend, TestId};

    fn invoker(runner_section: &str) -> ProcessInvoker {
        let text = format!("manifest = \"test.lst\"\ntimeout_secs = 5\n\n[runner]\n{runner_section}");
        ProcessInvoker::from_config(&parse_config(&text).unwrap()).unwrap()
    }

    fn item(test: &str) -> WorkItem {
        WorkItem {
            index: 1,
            backend: Backend::Dx12,
            test: TestId::from(test),
        }
    }

    #[test]
    fn test_id_comes_last_after_verbosity_flag() {
        let invoker = invoker(r#"command = "cargo run --manifest-path 'cts runner/Cargo.toml' -- ./tools/run_deno""#);
        assert_eq!(
            invoker.args_for(&item("webgpu:api,*")),
            vec![
                "run",
                "--manifest-path",
                "cts runner/Cargo.toml",
                "--",
                "./tools/run_deno",
                "--verbose",
                "webgpu:api,*"
            ]
        );
        assert_eq!(invoker.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn empty_verbosity_flag_is_omitted() {
        let invoker = invoker("command = \"runner\"\nverbosity_flag = \"\"");
        assert_eq!(invoker.args_for(&item("t1")), vec!["t1"]);
    }

    #[test]
    fn describe_shows_backend_assignment() {
        let invoker = invoker("command = \"runner\"");
        assert_eq!(invoker.describe(&item("t1")), "WGPU_BACKEND=dx12 runner --verbose t1");
    }

    #[test]
    fn wait_failure_is_an_item_error_not_a_spawn_failure() {
        assert_eq!(
            classify_exit(&ProcessExit::WaitFailed("interrupted".into())),
            Some((Outcome::Errored(ErrorReason::WaitFailure), None))
        );
        assert_eq!(
            classify_exit(&ProcessExit::TimedOut),
            Some((Outcome::Errored(ErrorReason::Timeout), None))
        );
        assert_eq!(classify_exit(&ProcessExit::Cancelled), None);
    }

    #[test]
    fn unbalanced_quotes_are_rejected() {
        let config = parse_config("manifest = \"x\"\n[runner]\ncommand = \"runner 'oops\"").unwrap();
        assert!(ProcessInvoker::from_config(&config).is_err());
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use std::fs;
        use tempfile::TempDir;

        /// Writes `body` to a shell script and returns an invoker running it.
        /// The script sees `--verbose` as `$1` and the test id as `$2`.
        fn script_invoker(body: &str) -> (TempDir, ProcessInvoker) {
            let dir = tempfile::tempdir().unwrap();
            let script = dir.path().join("runner.sh");
            fs::write(&script, body).unwrap();
            let invoker = invoker(&format!("command = \"sh {}\"", script.display()));
            (dir, invoker)
        }

        fn completed(invocation: Invocation) -> InvocationResult {
            match invocation {
                Invocation::Completed(result) => result,
                Invocation::Cancelled => panic!("unexpected cancellation"),
            }
        }

        #[tokio::test]
        async fn backend_reaches_child_through_environment_only() {
            let (_dir, invoker) = script_invoker("echo \"$WGPU_BACKEND:$1:$2\"\n");
            let token = CancellationToken::new();
            let result = completed(invoker.invoke(&item("t.env"), &token).await);

            assert_eq!(result.outcome, Outcome::Passed);
            assert_eq!(result.exit_code, Some(0));
            assert_eq!(result.output.stdout.trim(), "dx12:--verbose:t.env");
            assert!(std::env::var("WGPU_BACKEND").map_or(true, |v| v != "dx12"));
        }

        #[tokio::test]
        async fn non_zero_exit_is_failed_with_output_kept() {
            let (_dir, invoker) = script_invoker("echo broken >&2\nexit 3\n");
            let token = CancellationToken::new();
            let result = completed(invoker.invoke(&item("t.fail"), &token).await);

            assert_eq!(result.outcome, Outcome::Failed);
            assert_eq!(result.exit_code, Some(3));
            assert!(result.output.stderr.contains("broken"));
        }

        #[tokio::test]
        async fn hanging_child_times_out() {
            let dir = tempfile::tempdir().unwrap();
            let script = dir.path().join("runner.sh");
            fs::write(&script, "exec sleep 30\n").unwrap();
            let text = format!(
                "manifest = \"x\"\ntimeout_secs = 1\n[runner]\ncommand = \"sh {}\"",
                script.display()
            );
            let invoker = ProcessInvoker::from_config(&parse_config(&text).unwrap()).unwrap();
            let token = CancellationToken::new();
            let result = completed(invoker.invoke(&item("t.hang"), &token).await);

            assert_eq!(result.outcome, Outcome::Errored(ErrorReason::Timeout));
            assert_eq!(result.exit_code, None);
        }

        #[tokio::test]
        async fn cancelled_token_yields_no_result() {
            let (_dir, invoker) = script_invoker("exec sleep 30\n");
            let token = CancellationToken::new();
            token.cancel();
            assert_eq!(invoker.invoke(&item("t1"), &token).await, Invocation::Cancelled);
        }

        #[tokio::test]
        async fn missing_runner_is_spawn_failure() {
            let invoker = invoker(r#"command = "this_command_definitely_does_not_exist_12345""#);
            let token = CancellationToken::new();
            let result = completed(invoker.invoke(&item("t1"), &token).await);

            assert_eq!(result.outcome, Outcome::Errored(ErrorReason::SpawnFailure));
            assert_eq!(result.exit_code, None);
            assert!(!result.output.stderr.is_empty());
        }
    }
}
