//! # HTML Reporting Module / HTML 报告模块
//!
//! Renders a run report as a single self-contained HTML page: the verdict,
//! summary counts, one table row per result and the captured output of every
//! failure in a collapsible block.
//!
//! 将运行报告渲染为单个自包含的 HTML 页面：结论、摘要计数、每个结果一行的表格，
//! 以及每个失败项捕获的输出（在可折叠块中）。

use anyhow::{Context, Result};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::fs;
use std::path::Path;

use crate::core::orchestrator::{RunReport, RunVerdict};
use crate::infra::{fs as infra_fs, t};

/// Embedded CSS styles for HTML reports / HTML 报告的嵌入式 CSS 样式
const HTML_STYLE: &str = include_str!("assets/report.css");

fn verdict_line(verdict: &RunVerdict, locale: &str) -> (&'static str, String) {
    match verdict {
        RunVerdict::Passed => (
            "verdict-passed",
            t!("report.verdict_passed", locale = locale).to_string(),
        ),
        RunVerdict::Failed => (
            "verdict-failed",
            t!("report.verdict_failed", locale = locale).to_string(),
        ),
        RunVerdict::Interrupted => (
            "verdict-interrupted",
            t!("report.verdict_interrupted", locale = locale).to_string(),
        ),
        RunVerdict::Aborted(abort) => (
            "verdict-aborted",
            t!(
                "report.spawn_abort",
                locale = locale,
                backend = abort.backend.as_str(),
                test = abort.test.as_str()
            )
            .to_string(),
        ),
    }
}

/// Renders the report page.
/// 渲染报告页面。
pub fn render_html_report(report: &RunReport, locale: &str) -> Markup {
    let summary = &report.summary;
    let (verdict_class, verdict_text) = verdict_line(&report.verdict, locale);
    let started = summary.started_at.format("%Y-%m-%d %H:%M:%S").to_string();
    let elapsed = summary
        .finished_at
        .map(|end| (end - summary.started_at).num_milliseconds() as f64 / 1000.0);

    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { (t!("html_report.title", locale = locale)) }
                style { (PreEscaped(HTML_STYLE)) }
            }
            body {
                h1 { (t!("html_report.main_header", locale = locale)) }
                div class="meta" {
                    (t!("html_report.started_at", locale = locale, time = started))
                    @if let Some(secs) = elapsed {
                        " · " (t!("html_report.elapsed", locale = locale, secs = format!("{secs:.2}")))
                    }
                }
                div class={ "verdict " (verdict_class) } { (verdict_text) }

                div class="summary-container" {
                    (summary_item("", summary.planned, &t!("html_report.summary.planned", locale = locale)))
                    (summary_item("passed-text", summary.passed(), &t!("html_report.summary.passed", locale = locale)))
                    (summary_item("failed-text", summary.failed(), &t!("html_report.summary.failed", locale = locale)))
                    (summary_item("errored-text", summary.errored(), &t!("html_report.summary.errored", locale = locale)))
                }

                table {
                    thead {
                        tr {
                            th { "#" }
                            th { (t!("html_report.table.header.backend", locale = locale)) }
                            th { (t!("html_report.table.header.test", locale = locale)) }
                            th { (t!("html_report.table.header.status", locale = locale)) }
                            th { (t!("html_report.table.header.exit_code", locale = locale)) }
                            th { (t!("html_report.table.header.duration", locale = locale)) }
                        }
                    }
                    tbody {
                        @for record in &summary.records {
                            tr {
                                td class="num" { (record.index) }
                                td { (record.backend.as_str()) }
                                td { code { (record.test.as_str()) } }
                                td {
                                    span class={ "status-cell " (record.outcome.status_class()) } {
                                        (record.outcome.status_str(locale))
                                    }
                                }
                                td class="num" {
                                    @if let Some(code) = record.exit_code { (code) } @else { "-" }
                                }
                                td class="num" { (format!("{:.2}s", record.duration.as_secs_f64())) }
                            }
                        }
                    }
                }

                @if !summary.failures.is_empty() {
                    h2 { (t!("html_report.failures_header", locale = locale)) }
                    @for failure in &summary.failures {
                        details {
                            summary {
                                strong { (failure.backend.as_str()) } " "
                                code { (failure.test.as_str()) } " (" (failure.reason()) ")"
                            }
                            pre class="output-content" {
                                @if failure.output.is_empty() {
                                    (t!("report.no_output", locale = locale))
                                } @else {
                                    (failure.output.combined())
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn summary_item(class: &str, count: usize, label: &str) -> Markup {
    html! {
        div class="summary-item" {
            span class={ "count " (class) } { (count) }
            span class="label" { (label) }
        }
    }
}

/// Writes the HTML report to `output_path`, creating parent directories.
///
/// # Errors / 错误
/// Fails if the directory cannot be created or the file cannot be written.
/// 如果无法创建目录或无法写入文件则失败。
pub fn generate_html_report(report: &RunReport, output_path: &Path, locale: &str) -> Result<()> {
    infra_fs::ensure_parent_dir(output_path)?;
    let markup = render_html_report(report, locale);
    fs::write(output_path, markup.into_string())
        .with_context(|| format!("Failed to write HTML report: {}", output_path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::aggregator::ResultAggregator;
    use crate::core::models::{
        Backend, CapturedOutput, InvocationResult, Outcome, TestId, WorkItem,
    };
    use crate::core::orchestrator::RunState;
    use std::time::Duration;

    fn report() -> RunReport {
        let mut aggregator = ResultAggregator::new(2);
        aggregator.record(InvocationResult {
            item: WorkItem {
                index: 1,
                backend: Backend::Dx12,
                test: TestId::from("webgpu:api,ok"),
            },
            outcome: Outcome::Passed,
            exit_code: Some(0),
            output: CapturedOutput::default(),
            duration: Duration::from_millis(120),
        });
        aggregator.record(InvocationResult {
            item: WorkItem {
                index: 2,
                backend: Backend::Dx12,
                test: TestId::from("webgpu:api,<broken>"),
            },
            outcome: Outcome::Failed,
            exit_code: Some(1),
            output: CapturedOutput {
                stdout: String::new(),
                stderr: "assertion <a & b> failed".to_string(),
            },
            duration: Duration::from_millis(80),
        });
        RunReport {
            summary: aggregator.finish(),
            verdict: RunVerdict::Failed,
            trace: vec![RunState::Idle],
        }
    }

    #[test]
    fn report_lists_results_and_escapes_output() {
        let page = render_html_report(&report(), "en").into_string();
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("webgpu:api,ok"));
        assert!(page.contains("webgpu:api,&lt;broken&gt;"));
        assert!(page.contains("assertion &lt;a &amp; b&gt; failed"));
        assert!(page.contains("status-Failed"));
        assert!(page.contains("<details>"));
    }

    #[test]
    fn report_is_written_into_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("report.html");
        generate_html_report(&report(), &path, "en").unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("verdict-failed"));
    }
}
