//! # Result Aggregator / 结果汇总器
//!
//! Streaming consumer of invocation results. Every result bumps exactly one
//! counter and is never revisited, so the counters always add up to the number
//! of results seen so far.
//!
//! 调用结果的流式消费者。每个结果恰好增加一个计数器，并且永远不会被重新处理，
//! 因此计数器之和始终等于迄今为止看到的结果数。

use chrono::{DateTime, Local};
use serde::Serialize;
use std::time::Duration;

use crate::core::models::{Backend, CapturedOutput, InvocationResult, Outcome, TestId};

/// Running totals per classification.
/// 每种分类的累计总数。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
}

impl Counts {
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.errored
    }
}

/// A failed or errored work item, kept for the final report.
/// 失败或出错的工作项，保留用于最终报告。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub backend: Backend,
    pub test: TestId,
    pub outcome: Outcome,
    pub exit_code: Option<i32>,
    pub output: CapturedOutput,
}

impl FailureRecord {
    /// Short human-readable reason: the error kind, or the exit code of a failed test.
    /// 简短的可读原因：错误类型，或失败测试的退出码。
    pub fn reason(&self) -> String {
        match (self.outcome, self.exit_code) {
            (Outcome::Errored(reason), _) => reason.to_string(),
            (_, Some(code)) => format!("exit code {code}"),
            (_, None) => "terminated by signal".to_string(),
        }
    }
}

/// One line of the per-result table in reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRecord {
    pub index: usize,
    pub backend: Backend,
    pub test: TestId,
    pub outcome: Outcome,
    pub exit_code: Option<i32>,
    #[serde(serialize_with = "serialize_secs")]
    pub duration: Duration,
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

/// The outcome of a whole run.
/// 整个运行的结果。
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub counts: Counts,
    /// Failed and errored items in the order they were recorded.
    /// 按记录顺序排列的失败和出错项。
    pub failures: Vec<FailureRecord>,
    pub records: Vec<ResultRecord>,
    /// Number of work items the run planned to execute.
    pub planned: usize,
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
}

impl RunSummary {
    pub fn passed(&self) -> usize {
        self.counts.passed
    }

    pub fn failed(&self) -> usize {
        self.counts.failed
    }

    pub fn errored(&self) -> usize {
        self.counts.errored
    }

    /// Number of results recorded.
    pub fn processed(&self) -> usize {
        self.counts.total()
    }

    /// True when nothing failed and nothing errored. An empty run is a success.
    /// 当没有失败也没有出错时为真。空运行视为成功。
    pub fn is_success(&self) -> bool {
        self.counts.failed == 0 && self.counts.errored == 0
    }
}

/// Single owner of the run summary.
/// 运行摘要的唯一所有者。
#[derive(Debug)]
pub struct ResultAggregator {
    summary: RunSummary,
}

impl ResultAggregator {
    pub fn new(planned: usize) -> Self {
        Self {
            summary: RunSummary {
                counts: Counts::default(),
                failures: Vec::new(),
                records: Vec::new(),
                planned,
                started_at: Local::now(),
                finished_at: None,
            },
        }
    }

    /// Consumes one result.
    /// 消费一个结果。
    pub fn record(&mut self, result: InvocationResult) {
        let InvocationResult {
            item,
            outcome,
            exit_code,
            output,
            duration,
        } = result;

        match outcome {
            Outcome::Passed => self.summary.counts.passed += 1,
            Outcome::Failed => self.summary.counts.failed += 1,
            Outcome::Errored(_) => self.summary.counts.errored += 1,
        }

        self.summary.records.push(ResultRecord {
            index: item.index,
            backend: item.backend,
            test: item.test.clone(),
            outcome,
            exit_code,
            duration,
        });

        if !outcome.is_passed() {
            self.summary.failures.push(FailureRecord {
                backend: item.backend,
                test: item.test,
                outcome,
                exit_code,
                output,
            });
        }
    }

    /// Current totals, for progress output.
    pub fn counts(&self) -> Counts {
        self.summary.counts
    }

    pub fn planned(&self) -> usize {
        self.summary.planned
    }

    /// Seals the summary.
    pub fn finish(mut self) -> RunSummary {
        self.summary.finished_at = Some(Local::now());
        self.summary
    }
}
