//! # Console Reporting Module / 控制台报告模块
//!
//! Progress lines while the matrix runs, and the final summary once it is done.
//! Every user-facing string goes through `t!` so the output follows `--lang`.
//!
//! 运行矩阵时的进度行，以及运行结束后的最终摘要。
//! 所有面向用户的字符串都经过 `t!`，因此输出遵循 `--lang`。

use colored::*;
use std::path::Path;

use crate::core::aggregator::{FailureRecord, RunSummary};
use crate::core::models::{InvocationResult, Outcome, WorkItem};
use crate::core::orchestrator::{RunVerdict, SpawnAbort};
use crate::core::planner::{BackendSource, ExecutionPlan};
use crate::infra::t;

fn colored_status(outcome: Outcome, locale: &str) -> ColoredString {
    let status = outcome.status_str(locale);
    match outcome {
        Outcome::Passed => status.green(),
        Outcome::Failed => status.red(),
        Outcome::Errored(_) => status.yellow(),
    }
}

fn backend_list(plan: &ExecutionPlan) -> String {
    plan.backends
        .iter()
        .map(|b| b.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn print_manifest_loaded(path: &Path, count: usize, locale: &str) {
    println!(
        "{}",
        t!(
            "run.manifest_loaded",
            locale = locale,
            count = count,
            path = path.display()
        )
        .cyan()
    );
}

/// Prints what is about to run: the backends, where they came from, and the
/// shard this runner owns.
///
/// 打印即将运行的内容：后端、后端来源以及此运行器负责的分片。
pub fn print_plan(plan: &ExecutionPlan, locale: &str) {
    let source = match &plan.backend_source {
        BackendSource::CommandLine => t!("plan.source_cli", locale = locale),
        BackendSource::Platform(os) => t!("plan.source_platform", locale = locale, os = os),
        BackendSource::Default => t!("plan.source_default", locale = locale),
    };

    if plan.backends.is_empty() {
        println!("{}", t!("plan.no_backends", locale = locale).yellow());
    } else {
        println!(
            "{}",
            t!(
                "plan.backends",
                locale = locale,
                backends = backend_list(plan),
                source = source
            )
            .cyan()
        );
    }

    if let Some(shard) = plan.shard {
        println!(
            "{}",
            t!(
                "plan.shard",
                locale = locale,
                index = shard.index,
                total = shard.total,
                count = plan.items.len(),
                all = plan.unsharded_count
            )
            .cyan()
        );
    }

    if plan.is_empty() {
        println!("{}", t!("plan.nothing_to_run", locale = locale).yellow());
    } else {
        println!(
            "\n{}",
            t!("plan.running_items", locale = locale, count = plan.items.len()).bold()
        );
    }
}

/// Lists every work item with the exact command that would run it.
///
/// `describe` renders one invocation, e.g. `WGPU_BACKEND=dx12 cts_runner --verbose webgpu:api,*`.
pub fn print_dry_run(plan: &ExecutionPlan, describe: impl Fn(&WorkItem) -> String, locale: &str) {
    println!("\n{}", t!("plan.dry_run_banner", locale = locale).bold());
    let width = plan.items.len().to_string().len();
    for item in &plan.items {
        println!(
            "  [{:>width$}] {}",
            item.index,
            describe(item).dimmed(),
            width = width
        );
    }
    println!(
        "\n{}",
        t!("plan.dry_run_total", locale = locale, count = plan.items.len()).green()
    );
}

/// One line per finished work item: `[k/N] backend test STATUS (duration)`.
///
/// 每个完成的工作项一行：`[k/N] 后端 测试 状态 (耗时)`。
pub fn print_progress(result: &InvocationResult, position: usize, planned: usize, locale: &str) {
    let width = planned.to_string().len();
    println!(
        "[{:>width$}/{}] {:<7} {} {} ({:.2?})",
        position,
        planned,
        result.item.backend.as_str().bold(),
        result.item.test.as_str(),
        colored_status(result.outcome, locale),
        result.duration,
        width = width
    );
}

/// Prints the final counts and the failing `(backend, test, reason)` pairs.
/// With `verbose`, the captured output of each failure follows.
///
/// 打印最终计数和失败的 `(后端, 测试, 原因)` 对。启用 `verbose` 时，随后打印每个失败项捕获的输出。
///
/// # Output Format / 输出格式
/// ```text
/// --- Summary ---
///   Passed: 10   Failed: 1   Errored: 1   (12/12)
///
/// --- Failures ---
///   - dx12     | webgpu:api,operation,buffers,* | exit code 1
///   - vulkan   | webgpu:shader,execution,*      | timeout
/// ```
pub fn print_summary(summary: &RunSummary, verbose: bool, locale: &str) {
    println!("\n{}", t!("report.summary_banner", locale = locale).bold());
    println!(
        "  {}   {}   {}   ({}/{})",
        t!("report.count_passed", locale = locale, count = summary.passed()).green(),
        t!("report.count_failed", locale = locale, count = summary.failed()).red(),
        t!("report.count_errored", locale = locale, count = summary.errored()).yellow(),
        summary.processed(),
        summary.planned
    );

    if summary.failures.is_empty() {
        return;
    }

    println!("\n{}", t!("report.failures_banner", locale = locale).red().bold());
    let test_width = summary
        .failures
        .iter()
        .map(|f| f.test.as_str().len())
        .max()
        .unwrap_or(0);
    for failure in &summary.failures {
        println!(
            "  - {:<8} | {:<test_width$} | {}",
            failure.backend.as_str(),
            failure.test.as_str(),
            failure.reason(),
            test_width = test_width
        );
    }

    if verbose {
        print_failure_details(&summary.failures, locale);
    }
}

/// Prints the captured output of every failure.
/// 打印每个失败项捕获的输出。
pub fn print_failure_details(failures: &[FailureRecord], locale: &str) {
    if failures.is_empty() {
        return;
    }

    println!("\n{}", t!("report.details_banner", locale = locale).red().bold());
    println!("{}", "-".repeat(80));

    for (i, failure) in failures.iter().enumerate() {
        println!(
            "[{}/{}] {} '{}' ({})",
            i + 1,
            failures.len(),
            failure.backend.as_str().bold(),
            failure.test.as_str().cyan(),
            failure.reason()
        );
        if failure.output.is_empty() {
            println!("{}", t!("report.no_output", locale = locale).dimmed());
        } else {
            println!("\n--- {} ---\n", t!("report.runner_log", locale = locale).yellow());
            println!("{}", failure.output.combined());
        }
        println!("\n{}", "-".repeat(80));
    }
}

pub fn print_verdict(verdict: &RunVerdict, locale: &str) {
    let line = match verdict {
        RunVerdict::Passed => t!("report.verdict_passed", locale = locale).green().bold(),
        RunVerdict::Failed => t!("report.verdict_failed", locale = locale).red().bold(),
        RunVerdict::Interrupted => t!("report.verdict_interrupted", locale = locale).yellow().bold(),
        RunVerdict::Aborted(_) => t!("report.verdict_aborted", locale = locale).red().bold(),
    };
    println!("\n{line}");
}

/// Explains why the run stopped early. Goes to stderr.
/// 解释运行为何提前停止。输出到 stderr。
pub fn print_spawn_abort(abort: &SpawnAbort, locale: &str) {
    eprintln!(
        "\n{}",
        t!(
            "report.spawn_abort",
            locale = locale,
            backend = abort.backend.as_str(),
            test = abort.test.as_str()
        )
        .red()
        .bold()
    );
    if !abort.message.is_empty() {
        eprintln!("  {}", abort.message);
    }
}
