//! # Error Types / 错误类型
//!
//! Fatal errors of a conformance run. Per-test problems (a failing test, a
//! timeout) are not errors: they are recorded as outcomes and the run goes on.
//!
//! 一致性运行的致命错误。单个测试的问题（测试失败、超时）不是错误：
//! 它们被记录为结果，运行继续进行。

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Process exit codes of the orchestrator.
/// 编排器的进程退出码。
pub mod exit_code {
    /// Every work item passed (or there was nothing to run).
    pub const SUCCESS: u8 = 0;
    /// At least one work item failed or errored.
    pub const TEST_FAILURES: u8 = 1;
    /// The runner could not be spawned and the run was aborted.
    pub const SPAWN_ABORT: u8 = 3;
    /// The manifest, configuration or plan was unusable.
    pub const SETUP_ERROR: u8 = 4;
    /// The run was cancelled by the operator.
    pub const INTERRUPTED: u8 = 130;
}

/// Errors raised while reading the test manifest.
/// 读取测试清单时引发的错误。
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("cannot open manifest '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot read manifest '{path}' at line {line}: {source}")]
    Read {
        path: PathBuf,
        line: usize,
        #[source]
        source: io::Error,
    },
}

/// Errors that stop a run before any work item executes.
/// 在任何工作项执行之前停止运行的错误。
#[derive(Debug, Error)]
pub enum CtsError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("invalid execution plan: {0}")]
    Plan(String),

    #[error("invalid orchestrator transition from {from} to {to}")]
    Transition { from: String, to: String },
}

impl CtsError {
    /// The process exit code this error maps to.
    pub fn exit_code(&self) -> u8 {
        exit_code::SETUP_ERROR
    }
}
