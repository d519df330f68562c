//! # Core Module / 核心模块
//!
//! This module contains the core functionality of CTS Matrix,
//! including data models, configuration, manifest parsing, planning,
//! runner invocation, result aggregation and orchestration.
//!
//! 此模块包含 CTS Matrix 的核心功能，
//! 包括数据模型、配置、清单解析、计划、运行器调用、结果汇总和编排。

pub mod aggregator;
pub mod config;
pub mod error;
pub mod execution;
pub mod manifest;
pub mod models;
pub mod orchestrator;
pub mod planner;

// Re-exports
pub use aggregator::{ResultAggregator, RunSummary};
pub use config::CtsMatrix;
pub use execution::{Invoker, ProcessInvoker};
pub use models::{Backend, InvocationResult, Outcome, TestId, WorkItem};
pub use orchestrator::{Orchestrator, RunReport, RunVerdict};
