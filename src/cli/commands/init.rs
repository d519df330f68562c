//! # Init Command Module / 初始化命令模块
//!
//! Creates a `CtsMatrix.toml`, either from a commented template or through an
//! interactive wizard that asks for the runner command, the manifest, the
//! backends and the per-test timeout.
//!
//! 创建 `CtsMatrix.toml`，可以来自带注释的模板，也可以通过交互式向导，
//! 向导会询问运行器命令、清单、后端和每个测试的超时时间。
//!
//! ## Features / 功能特性
//!
//! - **Interactive Wizard**: Step-by-step guidance for configuration setup
//! - **Platform Defaults**: Backends preselected for the current operating system
//! - **Overwrite Protection**: Confirmation prompt (or `--force`) before replacing a file
//!
//! - **交互式向导**: 配置设置的分步指导
//! - **平台默认值**: 为当前操作系统预选后端
//! - **覆盖保护**: 替换文件前的确认提示（或 `--force`）

use anyhow::{Context, Result};
use colored::*;
use dialoguer::{Confirm, Input, MultiSelect, theme::ColorfulTheme};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::config::{
    CtsMatrix, DEFAULT_BACKEND_ENV, DEFAULT_TIMEOUT_SECS, DEFAULT_VERBOSITY_FLAG, RunnerConfig,
};
use crate::core::models::Backend;
use crate::infra::{fs as infra_fs, t};

const DEFAULT_RUNNER_COMMAND: &str =
    "cargo run --manifest-path cts_runner/Cargo.toml -- ./tools/run_deno";

const DEFAULT_MANIFEST: &str = "cts_runner/test.lst";

/// Template written by `init --non-interactive`.
pub const DEFAULT_CONFIG: &str = r#"# CTS Matrix Configuration / CTS Matrix 配置

# Language for console output / 控制台输出的语言
language = "en"

# Test list: one identifier per line, lines starting with `//` are comments.
# Relative paths are resolved against this file's directory.
# 测试列表：每行一个标识符，以 `//` 开头的行是注释。相对路径相对于此文件所在目录解析。
manifest = "cts_runner/test.lst"

# Backends used when no [platforms.<os>] entry matches / 没有匹配的 [platforms.<os>] 条目时使用的后端
backends = ["vulkan"]

# Time budget for one test, in seconds / 单个测试的时间预算（秒）
timeout_secs = 600

# Run different backends side by side. Tests of one backend never overlap.
# 并行运行不同的后端。同一后端的测试永远不会重叠。
parallel_backends = false

# Per-OS backend lists, keyed by "windows", "macos", "linux" / 按操作系统的后端列表
[platforms.windows]
backends = ["dx12"]

[platforms.macos]
backends = ["metal"]

[runner]
# Runner command line; the test identifier is appended last / 运行器命令行；测试标识符附加在最后
command = "cargo run --manifest-path cts_runner/Cargo.toml -- ./tools/run_deno"
# Directory the runner starts in / 运行器启动的目录
# working_dir = "."
# Environment variable carrying the backend / 携带后端的环境变量
backend_env = "WGPU_BACKEND"
# Flag placed before the test identifier, "" disables it / 放在测试标识符之前的标志，"" 表示禁用
verbosity_flag = "--verbose"

# Extra environment for the runner only / 仅用于运行器的额外环境变量
[runner.env]
RUST_BACKTRACE = "1"
"#;

/// Backends preselected by the wizard on the current OS.
fn platform_default_backends(os: &str) -> Vec<Backend> {
    match os {
        "windows" => vec![Backend::Dx12],
        "macos" => vec![Backend::Metal],
        _ => vec![Backend::Vulkan],
    }
}

/// Executes the init command.
///
/// # Arguments
/// * `output` - Path for the new configuration file
/// * `force` - Whether to overwrite an existing file without asking
/// * `non_interactive` - Write the template instead of running the wizard
/// * `language` - Locale for prompts and messages
pub fn execute(output: &Path, force: bool, non_interactive: bool, language: &str) -> Result<()> {
    let theme = ColorfulTheme::default();

    if !non_interactive {
        println!("\n{}", t!("init.wizard_welcome", locale = language).cyan().bold());
        println!("{}", t!("init.wizard_description", locale = language));
    }

    if output.exists() && !force {
        if non_interactive {
            println!(
                "{}",
                t!("init.file_exists", locale = language, path = output.display()).red()
            );
            println!("{}", t!("init.use_force", locale = language).yellow());
            return Ok(());
        }
        let confirmation = Confirm::with_theme(&theme)
            .with_prompt(t!("init.overwrite_prompt", locale = language, path = output.display()))
            .default(false)
            .interact()
            .context(t!("init.user_confirmation_failed", locale = language).to_string())?;
        if !confirmation {
            println!("{}", t!("init.aborted", locale = language));
            return Ok(());
        }
    }

    let content = if non_interactive {
        DEFAULT_CONFIG.to_string()
    } else {
        let config = run_wizard(&theme, language)?;
        toml::to_string_pretty(&config)
            .context(t!("init.serialize_failed", locale = language).to_string())?
    };

    write_config(output, &content, language)
}

/// Asks for the values of a new configuration.
fn run_wizard(theme: &ColorfulTheme, language: &str) -> Result<CtsMatrix> {
    let command: String = Input::with_theme(theme)
        .with_prompt(t!("init.runner_command_prompt", locale = language))
        .default(DEFAULT_RUNNER_COMMAND.to_string())
        .interact_text()
        .context(t!("init.user_confirmation_failed", locale = language).to_string())?;

    let manifest: String = Input::with_theme(theme)
        .with_prompt(t!("init.manifest_prompt", locale = language))
        .default(DEFAULT_MANIFEST.to_string())
        .interact_text()
        .context(t!("init.user_confirmation_failed", locale = language).to_string())?;

    let preselected = platform_default_backends(env::consts::OS);
    let defaults: Vec<bool> = Backend::ALL
        .iter()
        .map(|backend| preselected.contains(backend))
        .collect();
    let selections = MultiSelect::with_theme(theme)
        .with_prompt(t!("init.backend_selection_prompt", locale = language))
        .items(&Backend::ALL)
        .defaults(&defaults)
        .interact()
        .context(t!("init.user_confirmation_failed", locale = language).to_string())?;

    let mut backends: Vec<Backend> = selections.into_iter().map(|i| Backend::ALL[i]).collect();
    if backends.is_empty() {
        println!("{}", t!("init.no_backends_selected", locale = language).yellow());
        backends = preselected;
    }

    let timeout_secs: u64 = Input::with_theme(theme)
        .with_prompt(t!("init.timeout_prompt", locale = language))
        .default(DEFAULT_TIMEOUT_SECS)
        .validate_with(|value: &u64| {
            if *value > 0 {
                Ok(())
            } else {
                Err(t!("config.zero_timeout", locale = language).to_string())
            }
        })
        .interact_text()
        .context(t!("init.user_confirmation_failed", locale = language).to_string())?;

    let parallel_backends = Confirm::with_theme(theme)
        .with_prompt(t!("init.parallel_prompt", locale = language))
        .default(false)
        .interact()
        .context(t!("init.user_confirmation_failed", locale = language).to_string())?;

    Ok(CtsMatrix {
        language: language.to_string(),
        manifest: PathBuf::from(manifest),
        backends,
        platforms: BTreeMap::new(),
        timeout_secs,
        parallel_backends,
        jobs: None,
        runner: RunnerConfig {
            command,
            working_dir: None,
            backend_env: DEFAULT_BACKEND_ENV.to_string(),
            verbosity_flag: DEFAULT_VERBOSITY_FLAG.to_string(),
            env: BTreeMap::new(),
        },
    })
}

fn write_config(path: &Path, content: &str, language: &str) -> Result<()> {
    infra_fs::ensure_parent_dir(path)?;
    fs::write(path, content).with_context(|| {
        t!("init.write_failed", locale = language, path = path.display()).to_string()
    })?;

    println!(
        "\n{} {}",
        "✔".green(),
        t!("init.success_created", locale = language, path = path.display()).bold()
    );
    println!("{}", t!("init.usage_hint", locale = language));

    Ok(())
}
