//! # Reporting Module / 报告模块
//!
//! This module handles the display and export of run reports: colored,
//! localized console output while the matrix runs, plus HTML and JSON files
//! written after it finishes.
//!
//! 此模块处理运行报告的显示和导出：矩阵运行时的彩色本地化控制台输出，
//! 以及运行结束后写入的 HTML 和 JSON 文件。

pub mod console;
pub mod html;
pub mod json;

// Re-export common reporting functions
pub use console::{print_failure_details, print_summary};
pub use html::generate_html_report;
pub use json::generate_json_report;
