//! # CTS Matrix Library / CTS Matrix 库
//!
//! This library provides the core functionality for the CTS Matrix tool,
//! a configuration-driven orchestrator that replays a manifest of conformance
//! test identifiers against an external runner across a matrix of GPU backends.
//!
//! 此库为 CTS Matrix 工具提供核心功能，
//! 这是一个配置驱动的编排器，它针对外部运行器在 GPU 后端矩阵上重放一致性测试清单。
//!
//! ## Modules / 模块
//!
//! - `core` - Data models, manifest parsing, planning, invocation and orchestration
//! - `infra` - Infrastructure services like subprocess capture and path handling
//! - `reporting` - Console, HTML and JSON reports
//! - `cli` - Command-line interface and commands
//!
//! - `core` - 数据模型、清单解析、计划、调用和编排
//! - `infra` - 基础设施服务，如子进程输出捕获和路径处理
//! - `reporting` - 控制台、HTML 和 JSON 报告
//! - `cli` - 命令行接口和命令

pub mod cli;
pub mod core;
pub mod infra;
pub mod reporting;

// Re-export commonly used items
pub use core::config;
pub use core::error;
pub use core::models;
pub use core::orchestrator;

/// Initializes the application's internationalization (i18n) based on the system locale.
///
/// This function detects the user's system locale and sets the appropriate
/// language for the application's user interface. It attempts to match the full
/// locale (e.g., "zh-CN"), then just the language code (e.g., "en"), and
/// finally falls back to the default language ("en").
///
/// Returns the locale that was selected.
pub fn init() -> String {
    let locale = sys_locale::get_locale().unwrap_or_else(|| "en".to_string());
    resolve_locale(&locale).to_string()
}

/// Maps a requested locale onto one of the bundled locales and activates it.
///
/// 将请求的语言环境映射到内置语言环境之一并激活它。
pub fn resolve_locale(requested: &str) -> &'static str {
    let available_locales = rust_i18n::available_locales!();

    // Try the full locale first (e.g., "zh-CN"), then the language part
    // only (e.g., "en" from "en-US"), and finally fall back to "en".
    let lang = available_locales
        .iter()
        .find(|l| **l == requested)
        .or_else(|| {
            requested
                .split('-')
                .next()
                .and_then(|code| available_locales.iter().find(|l| **l == code))
        })
        .copied()
        .unwrap_or("en");

    rust_i18n::set_locale(lang);
    lang
}

// Initialize i18n
rust_i18n::i18n!("locales", fallback = "en");
