//! # Run Command Module / 运行命令模块
//!
//! This module implements the `run` command: load `CtsMatrix.toml`, apply the
//! command-line overrides, replay the manifest across the backend matrix and
//! turn the verdict into the process exit code.
//!
//! 此模块实现 `run` 命令：加载 `CtsMatrix.toml`，应用命令行覆盖，
//! 在后端矩阵上重放清单，并将结论转换为进程退出码。

use anyhow::{Context, Result};
use colored::*;
use std::{env, path::PathBuf, process::ExitCode};
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        config::{self, CtsMatrix},
        error::exit_code,
        execution::ProcessInvoker,
        manifest::parse_manifest,
        models::Backend,
        orchestrator::{Orchestrator, RunOptions, RunReport},
        planner::{self, Shard},
    },
    infra::{fs as infra_fs, t},
    reporting::{console, html::generate_html_report, json::generate_json_report},
};

/// Everything the `run` subcommand accepts.
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub config: PathBuf,
    pub manifest: Option<PathBuf>,
    pub backends: Vec<Backend>,
    pub timeout_secs: Option<u64>,
    pub runner: Option<String>,
    pub parallel_backends: bool,
    pub jobs: Option<usize>,
    pub total_runners: Option<usize>,
    pub runner_index: Option<usize>,
    pub html: Option<PathBuf>,
    pub json: Option<PathBuf>,
    pub dry_run: bool,
    pub verbose: bool,
    /// `--lang`, which wins over the `language` key of the configuration.
    pub lang: Option<String>,
}

/// Executes the run command with the provided arguments.
///
/// # Returns
/// The exit code derived from the run verdict, or an error if the
/// configuration, manifest or command line was unusable.
pub async fn execute(args: RunArgs) -> Result<ExitCode> {
    let config = load_with_overrides(&args)?;
    let locale = crate::resolve_locale(args.lang.as_deref().unwrap_or(&config.language)).to_string();

    println!(
        "{}",
        t!("run.loading_config", locale = &locale, path = args.config.display())
    );
    println!(
        "{}",
        t!("run.current_os", locale = &locale, os = env::consts::OS).cyan()
    );

    let shard = Shard::from_args(args.total_runners, args.runner_index)?;
    let invoker = ProcessInvoker::from_config(&config)?;

    if args.dry_run {
        let tests = parse_manifest(&config.manifest)?;
        console::print_manifest_loaded(&config.manifest, tests.len(), &locale);
        let plan = planner::plan_execution(&config, &tests, &args.backends, shard);
        console::print_plan(&plan, &locale);
        console::print_dry_run(&plan, |item| invoker.describe(item), &locale);
        return Ok(ExitCode::from(exit_code::SUCCESS));
    }

    let cancel = setup_signal_handler(&locale);
    let options = RunOptions {
        cli_backends: args.backends.clone(),
        shard,
        verbose: args.verbose,
        locale: locale.clone(),
    };
    let mut orchestrator = Orchestrator::new(config, options, invoker, cancel);
    let report = orchestrator.run().await?;

    write_reports(&report, &args, &locale);

    Ok(ExitCode::from(report.exit_code()))
}

/// Loads the configuration and applies the command-line overrides on top.
/// A `--manifest` path is taken relative to the current directory.
fn load_with_overrides(args: &RunArgs) -> Result<CtsMatrix> {
    let mut config = config::load_config(&args.config)?;

    if let Some(manifest) = &args.manifest {
        let cwd = env::current_dir().context("Failed to read the current directory")?;
        config.manifest = infra_fs::resolve_against(&cwd, manifest)?;
    }
    if let Some(secs) = args.timeout_secs {
        config.timeout_secs = secs;
    }
    if let Some(runner) = &args.runner {
        config.runner.command = runner.clone();
    }
    if args.parallel_backends {
        config.parallel_backends = true;
    }
    if args.jobs.is_some() {
        config.jobs = args.jobs;
    }

    config.validate()?;
    Ok(config)
}

/// Writes the requested report files. A report that cannot be written is
/// reported but does not change the verdict.
fn write_reports(report: &RunReport, args: &RunArgs, locale: &str) {
    if let Some(path) = &args.html {
        println!(
            "\n{}",
            t!("run.generating_html", locale = locale, path = path.display())
        );
        if let Err(e) = generate_html_report(report, path, locale) {
            eprintln!(
                "{} {:#}",
                t!("run.report_failed", locale = locale).red(),
                e
            );
        }
    }
    if let Some(path) = &args.json {
        println!(
            "{}",
            t!("run.generating_json", locale = locale, path = path.display())
        );
        if let Err(e) = generate_json_report(report, path) {
            eprintln!(
                "{} {:#}",
                t!("run.report_failed", locale = locale).red(),
                e
            );
        }
    }
}

/// Sets up a signal handler for graceful shutdown.
/// The returned token is cancelled on the first Ctrl-C.
fn setup_signal_handler(locale: &str) -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();
    let locale = locale.to_string();

    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                eprintln!("\n{}", t!("run.shutdown_signal", locale = &locale).yellow());
                token_clone.cancel();
            }
            Err(e) => {
                eprintln!(
                    "{}",
                    t!("run.signal_listen_failed", locale = &locale, error = e.to_string()).yellow()
                );
            }
        }
    });

    token
}
