//! # Orchestrator / 编排器
//!
//! Sequences a run: parse the manifest once, expand the matrix, drive every
//! work item through the invoker, aggregate, report.
//!
//! ```text
//! Idle -> Parsing -> Expanding -> Running -> Reporting -> Done
//!            |                       |
//!            +------> Aborted <------+
//! ```
//!
//! A manifest error aborts from `Parsing`; a runner that cannot be spawned
//! aborts from `Running`. Failing and timed-out tests never abort.
//!
//! By default items run strictly one at a time. With `parallel_backends` each
//! backend gets its own lane; lanes may run side by side but the items of one
//! lane never overlap. All results flow through one channel into a single
//! aggregator.
//!
//! 按顺序执行一次运行：解析清单一次，展开矩阵，通过调用器驱动每个工作项，汇总并报告。
//! 清单错误从 `Parsing` 中止；无法派生的运行器从 `Running` 中止。失败和超时的测试永远不会中止运行。
//! 默认情况下工作项严格逐个运行。启用 `parallel_backends` 时每个后端拥有自己的通道；
//! 通道之间可以并行，但同一通道内的工作项永远不会重叠。所有结果通过一个通道流入单一的汇总器。

use futures::{StreamExt, stream};
use serde::Serialize;
use std::fmt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        aggregator::{ResultAggregator, RunSummary},
        config::CtsMatrix,
        error::{CtsError, exit_code},
        execution::Invoker,
        manifest::parse_manifest,
        models::{Backend, ErrorReason, Invocation, InvocationResult, Outcome, TestId, WorkItem},
        planner::{self, Shard},
    },
    reporting::console,
};

/// Lifecycle of a run.
/// 运行的生命周期。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    Idle,
    Parsing,
    Expanding,
    Running,
    Reporting,
    Done,
    Aborted,
}

impl RunState {
    /// Whether `self -> next` is a legal step.
    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Idle, Parsing)
                | (Parsing, Expanding)
                | (Parsing, Aborted)
                | (Expanding, Running)
                | (Running, Reporting)
                | (Running, Aborted)
                | (Reporting, Done)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Done | RunState::Aborted)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The work item whose runner could not be started.
/// 其运行器无法启动的工作项。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpawnAbort {
    pub backend: Backend,
    pub test: TestId,
    pub message: String,
}

/// Final verdict of a run.
/// 运行的最终结论。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunVerdict {
    /// Nothing failed or errored.
    Passed,
    /// At least one item failed or errored.
    Failed,
    /// The runner could not be spawned; remaining items were not issued.
    Aborted(SpawnAbort),
    /// The operator cancelled the run.
    Interrupted,
}

/// Everything a finished (or aborted) run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub summary: RunSummary,
    pub verdict: RunVerdict,
    /// The states the orchestrator went through, in order.
    pub trace: Vec<RunState>,
}

impl RunReport {
    /// Process exit code for this report.
    /// 此报告对应的进程退出码。
    pub fn exit_code(&self) -> u8 {
        match self.verdict {
            RunVerdict::Passed => exit_code::SUCCESS,
            RunVerdict::Failed => exit_code::TEST_FAILURES,
            RunVerdict::Aborted(_) => exit_code::SPAWN_ABORT,
            RunVerdict::Interrupted => exit_code::INTERRUPTED,
        }
    }
}

/// Per-run knobs that do not live in the configuration file.
/// 不在配置文件中的每次运行参数。
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Backends from the command line; empty means "use the configuration".
    pub cli_backends: Vec<Backend>,
    pub shard: Option<Shard>,
    /// Print captured output of every failure in the final report.
    pub verbose: bool,
    pub locale: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            cli_backends: Vec::new(),
            shard: None,
            verbose: false,
            locale: "en".to_string(),
        }
    }
}

/// Why a lane stopped issuing work items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LaneStop {
    Exhausted,
    Cancelled,
    SpawnFailure,
}

/// Drives one run from manifest to verdict.
/// 驱动一次从清单到结论的运行。
pub struct Orchestrator<I> {
    config: CtsMatrix,
    options: RunOptions,
    invoker: I,
    cancel: CancellationToken,
    state: RunState,
    trace: Vec<RunState>,
}

impl<I: Invoker> Orchestrator<I> {
    /// Creates an idle orchestrator. Cancelling `cancel` stops the run: the
    /// running child is killed and no further items are issued.
    pub fn new(config: CtsMatrix, options: RunOptions, invoker: I, cancel: CancellationToken) -> Self {
        Self {
            config,
            options,
            invoker,
            cancel,
            state: RunState::Idle,
            trace: vec![RunState::Idle],
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn trace(&self) -> &[RunState] {
        &self.trace
    }

    fn transition(&mut self, next: RunState) -> Result<(), CtsError> {
        if !self.state.can_transition_to(next) {
            return Err(CtsError::Transition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        self.state = next;
        self.trace.push(next);
        Ok(())
    }

    /// Executes the whole run.
    ///
    /// # Returns
    /// * `Ok(RunReport)` for completed, failed, interrupted and spawn-aborted runs
    /// * `Err(CtsError::Manifest)` if the manifest could not be read; nothing ran
    ///
    /// 执行整个运行。
    /// 对于完成、失败、中断和因派生失败而中止的运行返回 `Ok(RunReport)`；
    /// 如果无法读取清单则返回 `Err(CtsError::Manifest)`，此时没有任何工作项运行。
    pub async fn run(&mut self) -> Result<RunReport, CtsError> {
        let locale = self.options.locale.clone();

        self.transition(RunState::Parsing)?;
        let tests = match parse_manifest(&self.config.manifest) {
            Ok(tests) => tests,
            Err(e) => {
                self.transition(RunState::Aborted)?;
                return Err(e.into());
            }
        };
        console::print_manifest_loaded(&self.config.manifest, tests.len(), &locale);

        self.transition(RunState::Expanding)?;
        let plan = planner::plan_execution(
            &self.config,
            &tests,
            &self.options.cli_backends,
            self.options.shard,
        );
        console::print_plan(&plan, &locale);

        self.transition(RunState::Running)?;
        let jobs = if self.config.parallel_backends {
            self.config.jobs.unwrap_or_else(num_cpus::get).max(1)
        } else {
            1
        };
        let mut aggregator = ResultAggregator::new(plan.items.len());
        let (stop, abort) = self.run_lanes(plan.lanes(), jobs, &mut aggregator).await;
        let summary = aggregator.finish();

        if let Some(abort) = abort {
            self.transition(RunState::Aborted)?;
            console::print_summary(&summary, self.options.verbose, &locale);
            console::print_spawn_abort(&abort, &locale);
            return Ok(RunReport {
                summary,
                verdict: RunVerdict::Aborted(abort),
                trace: self.trace.clone(),
            });
        }

        self.transition(RunState::Reporting)?;
        let verdict = if stop == LaneStop::Cancelled {
            RunVerdict::Interrupted
        } else if summary.is_success() {
            RunVerdict::Passed
        } else {
            RunVerdict::Failed
        };
        console::print_summary(&summary, self.options.verbose, &locale);
        console::print_verdict(&verdict, &locale);
        self.transition(RunState::Done)?;

        Ok(RunReport {
            summary,
            verdict,
            trace: self.trace.clone(),
        })
    }

    /// Runs the lanes with at most `jobs` at a time and feeds every result to
    /// the aggregator. Returns how the run stopped and, if the runner could not
    /// be spawned, the offending item.
    async fn run_lanes(
        &self,
        lanes: Vec<(Backend, Vec<WorkItem>)>,
        jobs: usize,
        aggregator: &mut ResultAggregator,
    ) -> (LaneStop, Option<SpawnAbort>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<InvocationResult>();
        let lane_cancel = self.cancel.child_token();
        let locale = self.options.locale.as_str();

        let lane_runs: Vec<_> = lanes
            .into_iter()
            .map(|(_, items)| run_lane(&self.invoker, items, tx.clone(), lane_cancel.clone()))
            .collect();
        drop(tx);

        let lanes_done = stream::iter(lane_runs)
            .buffer_unordered(jobs)
            .collect::<Vec<LaneStop>>();

        let consume = async {
            let mut abort = None;
            while let Some(result) = rx.recv().await {
                if abort.is_none() && result.outcome == Outcome::Errored(ErrorReason::SpawnFailure) {
                    abort = Some(SpawnAbort {
                        backend: result.item.backend,
                        test: result.item.test.clone(),
                        message: result.output.stderr.trim().to_string(),
                    });
                    lane_cancel.cancel();
                }
                let position = aggregator.counts().total() + 1;
                console::print_progress(&result, position, aggregator.planned(), locale);
                aggregator.record(result);
            }
            abort
        };

        let (stops, abort) = tokio::join!(lanes_done, consume);

        let stop = if stops.contains(&LaneStop::SpawnFailure) {
            LaneStop::SpawnFailure
        } else if stops.contains(&LaneStop::Cancelled) {
            LaneStop::Cancelled
        } else {
            LaneStop::Exhausted
        };
        (stop, abort)
    }
}

/// Runs the items of one lane strictly in order, one child at a time.
async fn run_lane<I: Invoker>(
    invoker: &I,
    items: Vec<WorkItem>,
    tx: mpsc::UnboundedSender<InvocationResult>,
    cancel: CancellationToken,
) -> LaneStop {
    for item in &items {
        if cancel.is_cancelled() {
            return LaneStop::Cancelled;
        }
        match invoker.invoke(item, &cancel).await {
            Invocation::Cancelled => return LaneStop::Cancelled,
            Invocation::Completed(result) => {
                let spawn_failed = result.outcome == Outcome::Errored(ErrorReason::SpawnFailure);
                if tx.send(result).is_err() {
                    return LaneStop::Cancelled;
                }
                if spawn_failed {
                    // Stop the other lanes before the consumer sees the result.
                    cancel.cancel();
                    return LaneStop::SpawnFailure;
                }
            }
        }
    }
    LaneStop::Exhausted
}
