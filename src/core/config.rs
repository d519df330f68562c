//! # Configuration Module / 配置模块
//!
//! Defines the `CtsMatrix.toml` configuration file: where the manifest lives,
//! which backends to replay it against, and how to launch the runner.
//!
//! 定义 `CtsMatrix.toml` 配置文件：清单的位置、针对哪些后端重放它，以及如何启动运行器。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::models::Backend;
use crate::infra::{fs as infra_fs, t};

/// The default name for the configuration file.
/// 配置文件的默认名称。
pub const CONFIG_FILE_NAME: &str = "CtsMatrix.toml";

/// Environment variable the runner reads to pick its backend.
pub const DEFAULT_BACKEND_ENV: &str = "WGPU_BACKEND";

/// Flag passed to the runner on every invocation.
pub const DEFAULT_VERBOSITY_FLAG: &str = "--verbose";

/// Per-test time budget when the configuration does not set one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// How to launch the external conformance runner.
/// 如何启动外部一致性运行器。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RunnerConfig {
    /// The runner command line, without the test identifier. Supports `~` and
    /// `$VAR` expansion and shell-style quoting.
    /// 运行器命令行，不含测试标识符。支持 `~` 和 `$VAR` 展开以及 shell 风格的引号。
    pub command: String,
    /// Directory the runner is started in. Relative paths are resolved against
    /// the directory containing the configuration file.
    /// 运行器启动的目录。相对路径相对于配置文件所在目录解析。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
    /// Name of the environment variable carrying the backend token.
    #[serde(default = "default_backend_env")]
    pub backend_env: String,
    /// Verbosity flag placed before the test identifier. Empty disables it.
    #[serde(default = "default_verbosity_flag")]
    pub verbosity_flag: String,
    /// Extra environment variables set on the runner process only.
    /// 仅在运行器进程上设置的额外环境变量。
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

/// Backend selection for one operating system.
/// 某个操作系统的后端选择。
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct PlatformConfig {
    pub backends: Vec<Backend>,
}

/// Represents the entire configuration, loaded from a TOML file.
/// 代表从 TOML 文件加载的整个配置。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CtsMatrix {
    /// The language for the runner's output messages (e.g., "en", "zh-CN").
    /// 运行器输出消息的语言（例如 "en", "zh-CN"）。
    #[serde(default = "default_language")]
    pub language: String,

    /// Path of the test list, one identifier per line, `//` comments.
    /// 测试列表的路径，每行一个标识符，`//` 为注释。
    pub manifest: PathBuf,

    /// Backends used when no platform entry matches the current OS.
    /// 当没有与当前操作系统匹配的平台条目时使用的后端。
    #[serde(default)]
    pub backends: Vec<Backend>,

    /// Per-OS backend lists keyed by `std::env::consts::OS` ("linux", "windows", "macos").
    /// 按 `std::env::consts::OS` 键控的每个操作系统的后端列表。
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub platforms: BTreeMap<String, PlatformConfig>,

    /// Time budget for a single test, in seconds.
    /// 单个测试的时间预算（秒）。
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Run different backends concurrently. Tests of one backend always run one at a time.
    /// 并发运行不同的后端。同一后端的测试始终一次运行一个。
    #[serde(default)]
    pub parallel_backends: bool,

    /// Upper bound on concurrently running backends when `parallel_backends` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,

    pub runner: RunnerConfig,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_backend_env() -> String {
    DEFAULT_BACKEND_ENV.to_string()
}

fn default_verbosity_flag() -> String {
    DEFAULT_VERBOSITY_FLAG.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl CtsMatrix {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Checks the values serde cannot check on its own.
    /// 检查 serde 自身无法检查的值。
    pub fn validate(&self) -> Result<()> {
        if self.runner.command.trim().is_empty() {
            anyhow::bail!(t!("config.empty_runner_command").to_string());
        }
        if self.runner.backend_env.trim().is_empty() {
            anyhow::bail!(t!("config.empty_backend_env").to_string());
        }
        if self.timeout_secs == 0 {
            anyhow::bail!(t!("config.zero_timeout").to_string());
        }
        if self.jobs == Some(0) {
            anyhow::bail!(t!("config.zero_jobs").to_string());
        }
        Ok(())
    }

    /// Expands `~`/`$VAR` in the manifest and working directory paths and
    /// anchors relative ones at `base_dir`.
    ///
    /// 展开清单和工作目录路径中的 `~`/`$VAR`，并将相对路径锚定到 `base_dir`。
    pub fn resolve_paths(&mut self, base_dir: &Path) -> Result<()> {
        self.manifest = infra_fs::resolve_against(base_dir, &self.manifest)?;
        if let Some(dir) = &self.runner.working_dir {
            self.runner.working_dir = Some(infra_fs::resolve_against(base_dir, dir)?);
        }
        Ok(())
    }
}

/// Loads, validates and resolves a configuration file.
///
/// # Arguments
/// * `path` - Path to the TOML file
///
/// # Returns
/// The parsed configuration with paths anchored at the file's directory.
pub fn load_config(path: &Path) -> Result<CtsMatrix> {
    let content = fs::read_to_string(path)
        .with_context(|| t!("config.read_failed", path = path.display()).to_string())?;
    let mut config = parse_config(&content)?;

    let base_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    config.resolve_paths(&base_dir)?;
    Ok(config)
}

/// Parses and validates configuration text without touching the file system.
pub fn parse_config(content: &str) -> Result<CtsMatrix> {
    let config: CtsMatrix =
        toml::from_str(content).with_context(|| t!("config.parse_failed").to_string())?;
    config.validate()?;
    Ok(config)
}
