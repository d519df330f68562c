//! # JSON Reporting Module / JSON 报告模块
//!
//! Machine-readable run report for CI dashboards.
//! 供 CI 仪表板使用的机器可读运行报告。

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::core::orchestrator::RunReport;
use crate::infra::fs as infra_fs;

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    tool: &'static str,
    version: &'static str,
    generated_at: DateTime<Local>,
    exit_code: u8,
    #[serde(flatten)]
    report: &'a RunReport,
}

/// Serializes the report as pretty-printed JSON.
pub fn render_json_report(report: &RunReport) -> Result<String> {
    let document = JsonReport {
        tool: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        generated_at: Local::now(),
        exit_code: report.exit_code(),
        report,
    };
    serde_json::to_string_pretty(&document).context("Failed to serialize JSON report")
}

/// Writes the JSON report to `output_path`, creating parent directories.
pub fn generate_json_report(report: &RunReport, output_path: &Path) -> Result<()> {
    infra_fs::ensure_parent_dir(output_path)?;
    let json = render_json_report(report)?;
    fs::write(output_path, json)
        .with_context(|| format!("Failed to write JSON report: {}", output_path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::aggregator::ResultAggregator;
    use crate::core::models::{
        Backend, CapturedOutput, ErrorReason, InvocationResult, Outcome, TestId, WorkItem,
    };
    use crate::core::orchestrator::{RunState, RunVerdict, SpawnAbort};
    use std::time::Duration;

    #[test]
    fn aborted_run_carries_cause_counts_and_exit_code() {
        let mut aggregator = ResultAggregator::new(3);
        aggregator.record(InvocationResult {
            item: WorkItem {
                index: 1,
                backend: Backend::Vulkan,
                test: TestId::from("t1"),
            },
            outcome: Outcome::Errored(ErrorReason::SpawnFailure),
            exit_code: None,
            output: CapturedOutput {
                stdout: String::new(),
                stderr: "No such file or directory".to_string(),
            },
            duration: Duration::ZERO,
        });
        let report = RunReport {
            summary: aggregator.finish(),
            verdict: RunVerdict::Aborted(SpawnAbort {
                backend: Backend::Vulkan,
                test: TestId::from("t1"),
                message: "No such file or directory".to_string(),
            }),
            trace: vec![
                RunState::Idle,
                RunState::Parsing,
                RunState::Expanding,
                RunState::Running,
                RunState::Aborted,
            ],
        };

        let value: serde_json::Value =
            serde_json::from_str(&render_json_report(&report).unwrap()).unwrap();
        assert_eq!(value["exit_code"], 3);
        assert_eq!(value["summary"]["counts"]["errored"], 1);
        assert_eq!(value["summary"]["planned"], 3);
        assert_eq!(value["verdict"]["aborted"]["backend"], "vulkan");
        assert_eq!(value["verdict"]["aborted"]["test"], "t1");
        assert_eq!(value["summary"]["failures"][0]["outcome"]["errored"], "spawn_failure");
        assert_eq!(value["trace"][4], "Aborted");
    }
}
