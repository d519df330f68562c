//! # File System Operations Module / 文件系统操作模块
//!
//! This module provides utilities for path handling and report output files.
//!
//! 此模块提供路径处理和报告输出文件的实用功能。

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Expands `~` and environment variables in `path` and, if the result is
/// relative, joins it onto `base`. The path does not need to exist.
///
/// # Arguments
/// * `base` - Directory that relative paths are anchored at
/// * `path` - Path as written by the user
///
/// # Returns
/// The expanded path, or an error if an environment variable is undefined
pub fn resolve_against(base: &Path, path: &Path) -> Result<PathBuf> {
    let raw = path.to_string_lossy();
    let expanded = shellexpand::full(&raw)
        .with_context(|| format!("Failed to expand path: {raw}"))?;
    let expanded = PathBuf::from(expanded.as_ref());

    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        Ok(base.join(expanded))
    }
}

/// Creates the parent directory of `path` if it is missing.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }
    Ok(())
}
