//! # Execution Planner / 执行计划器
//!
//! Turns the manifest and the configured backends into the ordered list of work
//! items: backend-major, manifest order within each backend. Grouping by
//! backend keeps backend switches to one per backend.
//!
//! 将清单和配置的后端转换为有序的工作项列表：以后端为主序，每个后端内部保持清单顺序。
//! 按后端分组使后端切换次数保持为每个后端一次。

use std::env;

use crate::core::config::CtsMatrix;
use crate::core::error::CtsError;
use crate::core::models::{Backend, TestId, WorkItem};

/// Where the active backend list came from.
/// 当前后端列表的来源。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendSource {
    /// `--backend` flags on the command line.
    CommandLine,
    /// A `[platforms.<os>]` entry matching the current OS.
    Platform(String),
    /// The top-level `backends` list.
    Default,
}

/// A CI split: this process runs every `total`-th item starting at `index`.
/// CI 拆分：此进程从 `index` 开始每隔 `total` 个运行一个项。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shard {
    pub total: usize,
    pub index: usize,
}

impl Shard {
    /// Builds a shard from the optional CLI pair. Both must be present or both absent.
    pub fn from_args(
        total_runners: Option<usize>,
        runner_index: Option<usize>,
    ) -> Result<Option<Self>, CtsError> {
        match (total_runners, runner_index) {
            (Some(total), Some(index)) => {
                if total == 0 {
                    return Err(CtsError::Plan("total runners must be at least 1".into()));
                }
                if index >= total {
                    return Err(CtsError::Plan(
                        "runner index must be less than total runners".into(),
                    ));
                }
                Ok(Some(Shard { total, index }))
            }
            (None, None) => Ok(None),
            _ => Err(CtsError::Plan(
                "both --total-runners and --runner-index must be provided".into(),
            )),
        }
    }
}

/// The full, ordered set of work for one run.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    pub backends: Vec<Backend>,
    pub backend_source: BackendSource,
    pub items: Vec<WorkItem>,
    /// Number of items before sharding.
    pub unsharded_count: usize,
    pub shard: Option<Shard>,
}

impl ExecutionPlan {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Splits the plan into per-backend lanes, preserving order inside each lane.
    /// 将计划拆分为每个后端的通道，保持每个通道内的顺序。
    pub fn lanes(&self) -> Vec<(Backend, Vec<WorkItem>)> {
        let mut lanes: Vec<(Backend, Vec<WorkItem>)> = Vec::new();
        for item in &self.items {
            let same_lane = lanes
                .last()
                .is_some_and(|(backend, _)| *backend == item.backend);
            if same_lane {
                if let Some((_, lane)) = lanes.last_mut() {
                    lane.push(item.clone());
                }
            } else {
                lanes.push((item.backend, vec![item.clone()]));
            }
        }
        lanes
    }
}

/// Expands backends × tests into work items, backend-major.
///
/// An empty backend list or an empty manifest yields an empty plan.
///
/// 将后端 × 测试展开为工作项，以后端为主序。空的后端列表或空清单会产生空计划。
pub fn expand(backends: &[Backend], tests: &[TestId]) -> Vec<WorkItem> {
    backends
        .iter()
        .flat_map(|backend| tests.iter().map(move |test| (*backend, test.clone())))
        .enumerate()
        .map(|(i, (backend, test))| WorkItem {
            index: i + 1,
            backend,
            test,
        })
        .collect()
}

/// Picks the backends for this run: command line, then the entry for `os`,
/// then the configured default. Duplicates keep their first position.
pub fn resolve_backends(
    config: &CtsMatrix,
    cli_backends: &[Backend],
    os: &str,
) -> (Vec<Backend>, BackendSource) {
    let (chosen, source) = if !cli_backends.is_empty() {
        (cli_backends.to_vec(), BackendSource::CommandLine)
    } else if let Some(platform) = config.platforms.get(os) {
        (
            platform.backends.clone(),
            BackendSource::Platform(os.to_string()),
        )
    } else {
        (config.backends.clone(), BackendSource::Default)
    };

    let mut unique = Vec::with_capacity(chosen.len());
    for backend in chosen {
        if !unique.contains(&backend) {
            unique.push(backend);
        }
    }
    (unique, source)
}

/// Builds the execution plan for the current platform.
///
/// # Arguments
/// * `config` - The loaded configuration
/// * `tests` - The realized manifest
/// * `cli_backends` - Backends given with `--backend`, overriding the configuration
/// * `shard` - Optional CI split
pub fn plan_execution(
    config: &CtsMatrix,
    tests: &[TestId],
    cli_backends: &[Backend],
    shard: Option<Shard>,
) -> ExecutionPlan {
    let (backends, backend_source) = resolve_backends(config, cli_backends, env::consts::OS);
    let all_items = expand(&backends, tests);
    let unsharded_count = all_items.len();

    let items = match shard {
        Some(Shard { total, index }) => all_items
            .into_iter()
            .enumerate()
            .filter(|(i, _)| i % total == index)
            .map(|(_, item)| item)
            .collect(),
        None => all_items,
    };

    ExecutionPlan {
        backends,
        backend_source,
        items,
        unsharded_count,
        shard,
    }
}
