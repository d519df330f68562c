//! # Data Models Module / 数据模型模块
//!
//! This module defines the core data structures used throughout the orchestrator:
//! backends, test identifiers, work items and the results of invoking the runner.
//!
//! 此模块定义了整个编排器中使用的核心数据结构：
//! 后端、测试标识符、工作项以及调用运行器的结果。

use crate::infra::t;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// A GPU backend implementation the runner can be pointed at.
/// Exactly one backend is active per runner invocation.
///
/// 运行器可以指向的 GPU 后端实现。
/// 每次运行器调用恰好激活一个后端。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Backend {
    Vulkan,
    Metal,
    Dx12,
    Gl,
    WebGpu,
}

impl Backend {
    /// Every known backend, in the order offered by the `init` wizard.
    pub const ALL: [Backend; 5] = [
        Backend::Vulkan,
        Backend::Metal,
        Backend::Dx12,
        Backend::Gl,
        Backend::WebGpu,
    ];

    /// The canonical token handed to the runner through the environment.
    /// 通过环境变量传递给运行器的规范标记。
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Vulkan => "vulkan",
            Backend::Metal => "metal",
            Backend::Dx12 => "dx12",
            Backend::Gl => "gl",
            Backend::WebGpu => "webgpu",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a backend name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown backend '{0}' (expected one of: vulkan, metal, dx12, gl, webgpu)")]
pub struct UnknownBackend(pub String);

impl FromStr for Backend {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vulkan" | "vk" => Ok(Backend::Vulkan),
            "metal" | "mtl" => Ok(Backend::Metal),
            "dx12" | "d3d12" => Ok(Backend::Dx12),
            "gl" | "gles" | "opengl" => Ok(Backend::Gl),
            "webgpu" => Ok(Backend::WebGpu),
            _ => Err(UnknownBackend(s.to_string())),
        }
    }
}

impl TryFrom<String> for Backend {
    type Error = UnknownBackend;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Backend> for String {
    fn from(backend: Backend) -> Self {
        backend.as_str().to_string()
    }
}

/// An opaque conformance test identifier, taken verbatim from the manifest.
/// 不透明的一致性测试标识符，逐字取自清单。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestId(String);

impl TestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TestId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// The atomic unit of execution: one test on one backend.
///
/// 执行的原子单位：一个后端上的一个测试。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkItem {
    /// 1-based position of this item in the run, used for progress output.
    /// 此项在运行中从 1 开始的位置，用于进度输出。
    pub index: usize,
    pub backend: Backend,
    pub test: TestId,
}

/// Why an invocation could not produce a pass/fail verdict.
/// 调用无法产生通过/失败结论的原因。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorReason {
    /// The child exceeded its time budget and was killed.
    /// 子进程超出了时间预算并被终止。
    Timeout,
    /// The runner executable could not be started at all.
    /// 运行器可执行文件根本无法启动。
    SpawnFailure,
    /// The runner started but waiting for it failed; it was killed.
    /// 运行器已启动，但等待它失败；它已被终止。
    WaitFailure,
}

impl fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorReason::Timeout => f.write_str("timeout"),
            ErrorReason::SpawnFailure => f.write_str("spawn failure"),
            ErrorReason::WaitFailure => f.write_str("wait failure"),
        }
    }
}

/// Classification of one runner invocation.
/// 一次运行器调用的分类。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed,
    Errored(ErrorReason),
}

impl Outcome {
    /// Derives the outcome of a child that exited on its own.
    pub fn from_exit_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => Outcome::Passed,
            _ => Outcome::Failed,
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, Outcome::Passed)
    }

    /// Gets the status of the outcome as a localized string for display.
    /// 以本地化字符串形式获取结果状态以供显示。
    pub fn status_str(&self, locale: &str) -> String {
        match self {
            Outcome::Passed => t!("report.status_passed", locale = locale).to_string(),
            Outcome::Failed => t!("report.status_failed", locale = locale).to_string(),
            Outcome::Errored(ErrorReason::Timeout) => {
                t!("report.status_timeout", locale = locale).to_string()
            }
            Outcome::Errored(ErrorReason::SpawnFailure) => {
                t!("report.status_spawn_failure", locale = locale).to_string()
            }
            Outcome::Errored(ErrorReason::WaitFailure) => {
                t!("report.status_wait_failure", locale = locale).to_string()
            }
        }
    }

    /// Gets the CSS class used by the HTML report.
    pub fn status_class(&self) -> &'static str {
        match self {
            Outcome::Passed => "status-Passed",
            Outcome::Failed => "status-Failed",
            Outcome::Errored(_) => "status-Errored",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Passed => f.write_str("passed"),
            Outcome::Failed => f.write_str("failed"),
            Outcome::Errored(reason) => write!(f, "errored ({reason})"),
        }
    }
}

/// Output captured from a child process, stdout and stderr kept apart.
/// 从子进程捕获的输出，stdout 和 stderr 分开保存。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CapturedOutput {
    pub fn is_empty(&self) -> bool {
        self.stdout.trim().is_empty() && self.stderr.trim().is_empty()
    }

    /// Both streams, stdout first, for diagnostics.
    pub fn combined(&self) -> String {
        let mut text = String::with_capacity(self.stdout.len() + self.stderr.len() + 1);
        text.push_str(self.stdout.trim_end());
        if !self.stdout.trim().is_empty() && !self.stderr.trim().is_empty() {
            text.push('\n');
        }
        text.push_str(self.stderr.trim_end());
        text
    }
}

/// The immutable outcome of running one work item.
///
/// Created by the invoker as soon as the child terminates (or is killed) and
/// moved into the aggregator exactly once.
///
/// 运行一个工作项的不可变结果。
/// 由调用器在子进程终止（或被终止）后立即创建，并且只被移动到汇总器一次。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    pub item: WorkItem,
    pub outcome: Outcome,
    /// Exit code of the child; `None` when it was killed, terminated by a
    /// signal or never started.
    /// 子进程的退出码；当它被终止、被信号终止或从未启动时为 `None`。
    pub exit_code: Option<i32>,
    pub output: CapturedOutput,
    pub duration: Duration,
}

/// What the invoker hands back for one work item.
/// 调用器为一个工作项返回的内容。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// The child ran (or failed to start) and was classified.
    Completed(InvocationResult),
    /// The run was cancelled while this item was in flight; nothing is recorded.
    Cancelled,
}
