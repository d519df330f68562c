//! # Command-Line Interface / 命令行接口
//!
//! Builds the `cts-matrix` command with its `run` and `init` subcommands and
//! dispatches to them. Help texts are localized, so the language is picked
//! before the parser is built.
//!
//! 构建带有 `run` 和 `init` 子命令的 `cts-matrix` 命令并分派到它们。
//! 帮助文本是本地化的，因此在构建解析器之前选择语言。

pub mod commands;

use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use colored::*;
use std::{env, path::PathBuf, process::ExitCode};

use crate::core::config::CONFIG_FILE_NAME;
use crate::core::error::{CtsError, exit_code};
use crate::core::models::Backend;
use crate::infra::t;

/// Pre-parses the command line arguments to find the language setting.
/// This allows i18n to be initialized before the full CLI is built.
/// It looks for `--lang <VALUE>` or `--lang=<VALUE>`.
fn pre_parse_language() -> Option<String> {
    let args: Vec<String> = env::args().collect();
    if let Some(value) = args.iter().find_map(|arg| arg.strip_prefix("--lang=")) {
        return Some(value.to_string());
    }
    let pos = args.iter().position(|arg| arg == "--lang")?;
    args.get(pos + 1).cloned()
}

fn parse_backend(value: &str) -> Result<Backend, String> {
    value.parse::<Backend>().map_err(|e| e.to_string())
}

/// Builds the clap command tree with help texts in `locale`.
pub fn build_cli(locale: &str) -> Command {
    Command::new("cts-matrix")
        .author(env!("CARGO_PKG_AUTHORS"))
        .version(env!("CARGO_PKG_VERSION"))
        .about(t!("cli.about", locale = locale).to_string())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("lang")
                .long("lang")
                .help(t!("cli.lang", locale = locale).to_string())
                .value_name("LANGUAGE")
                .global(true)
                .action(ArgAction::Set),
        )
        .subcommand(
            Command::new("run")
                .about(t!("cli.run_about", locale = locale).to_string())
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .help(t!("cli.arg_config", locale = locale).to_string())
                        .value_name("CONFIG")
                        .default_value(CONFIG_FILE_NAME)
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("manifest")
                        .short('m')
                        .long("manifest")
                        .help(t!("cli.arg_manifest", locale = locale).to_string())
                        .value_name("MANIFEST")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("backend")
                        .short('b')
                        .long("backend")
                        .help(t!("cli.arg_backend", locale = locale).to_string())
                        .value_name("BACKEND")
                        .value_parser(parse_backend)
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("timeout")
                        .short('t')
                        .long("timeout")
                        .help(t!("cli.arg_timeout", locale = locale).to_string())
                        .value_name("SECONDS")
                        .value_parser(clap::value_parser!(u64).range(1..))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("runner")
                        .long("runner")
                        .help(t!("cli.arg_runner", locale = locale).to_string())
                        .value_name("COMMAND")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("parallel-backends")
                        .long("parallel-backends")
                        .help(t!("cli.arg_parallel_backends", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("jobs")
                        .short('j')
                        .long("jobs")
                        .help(t!("cli.arg_jobs", locale = locale).to_string())
                        .value_name("JOBS")
                        .value_parser(clap::value_parser!(usize))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("total-runners")
                        .long("total-runners")
                        .help(t!("cli.arg_total_runners", locale = locale).to_string())
                        .value_name("TOTAL_RUNNERS")
                        .value_parser(clap::value_parser!(usize))
                        .action(ArgAction::Set)
                        .requires("runner-index"),
                )
                .arg(
                    Arg::new("runner-index")
                        .long("runner-index")
                        .help(t!("cli.arg_runner_index", locale = locale).to_string())
                        .value_name("RUNNER_INDEX")
                        .value_parser(clap::value_parser!(usize))
                        .action(ArgAction::Set)
                        .requires("total-runners"),
                )
                .arg(
                    Arg::new("html")
                        .long("html")
                        .help(t!("cli.arg_html", locale = locale).to_string())
                        .value_name("HTML")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help(t!("cli.arg_json", locale = locale).to_string())
                        .value_name("JSON")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .help(t!("cli.arg_dry_run", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("verbose")
                        .short('v')
                        .long("verbose")
                        .help(t!("cli.arg_verbose", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("init")
                .about(t!("cli.init_about", locale = locale).to_string())
                .arg(
                    Arg::new("non-interactive")
                        .long("non-interactive")
                        .help(t!("cli.arg_non_interactive", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("force")
                        .short('f')
                        .long("force")
                        .help(t!("cli.arg_force", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help(t!("cli.arg_output", locale = locale).to_string())
                        .value_name("PATH")
                        .default_value(CONFIG_FILE_NAME)
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                ),
        )
}

fn run_args(matches: &ArgMatches, lang: Option<String>) -> commands::run::RunArgs {
    commands::run::RunArgs {
        config: matches
            .get_one::<PathBuf>("config")
            .cloned()
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME)),
        manifest: matches.get_one::<PathBuf>("manifest").cloned(),
        backends: matches
            .get_many::<Backend>("backend")
            .map(|values| values.copied().collect())
            .unwrap_or_default(),
        timeout_secs: matches.get_one::<u64>("timeout").copied(),
        runner: matches.get_one::<String>("runner").cloned(),
        parallel_backends: matches.get_flag("parallel-backends"),
        jobs: matches.get_one::<usize>("jobs").copied(),
        total_runners: matches.get_one::<usize>("total-runners").copied(),
        runner_index: matches.get_one::<usize>("runner-index").copied(),
        html: matches.get_one::<PathBuf>("html").cloned(),
        json: matches.get_one::<PathBuf>("json").cloned(),
        dry_run: matches.get_flag("dry-run"),
        verbose: matches.get_flag("verbose"),
        lang,
    }
}

/// Parses the command line and runs the selected subcommand.
///
/// # Returns
/// The process exit code of the subcommand. Errors are left to the caller,
/// which reports them and exits with the setup-error code.
pub async fn run() -> Result<ExitCode> {
    // Pre-parse language and initialize i18n first.
    let requested = pre_parse_language();
    let language = match &requested {
        Some(lang) => crate::resolve_locale(lang).to_string(),
        None => crate::init(),
    };

    let matches = build_cli(&language).get_matches();

    match matches.subcommand() {
        Some(("run", run_matches)) => commands::run::execute(run_args(run_matches, requested)).await,
        Some(("init", init_matches)) => {
            let non_interactive = init_matches.get_flag("non-interactive");
            let force = init_matches.get_flag("force");
            let output = init_matches
                .get_one::<PathBuf>("output")
                .cloned()
                .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));

            if requested.is_none() && !non_interactive {
                println!(
                    "{}",
                    t!("init.system_language_detected", locale = &language, lang = &language)
                );
            }
            commands::init::execute(&output, force, non_interactive, &language)?;
            Ok(ExitCode::SUCCESS)
        }
        _ => Ok(ExitCode::SUCCESS),
    }
}

/// Prints a fatal error on stderr and maps it to an exit code.
///
/// Every error that escapes a subcommand happened before or around the run
/// itself (configuration, manifest, command line), so all of them map to the
/// setup-error code.
pub fn report_error(err: &anyhow::Error) -> ExitCode {
    eprintln!("{} {:#}", t!("error_prefix").red().bold(), err);
    let code = err
        .downcast_ref::<CtsError>()
        .map(CtsError::exit_code)
        .unwrap_or(exit_code::SETUP_ERROR);
    ExitCode::from(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        build_cli("en").debug_assert();
    }

    #[test]
    fn repeated_backend_flags_are_collected_in_order() {
        let matches = build_cli("en")
            .try_get_matches_from([
                "cts-matrix",
                "run",
                "--backend",
                "dx12",
                "-b",
                "vk",
                "--dry-run",
            ])
            .unwrap();
        let (_, run) = matches.subcommand().unwrap();
        let args = run_args(run, None);
        assert_eq!(args.backends, vec![Backend::Dx12, Backend::Vulkan]);
        assert!(args.dry_run);
        assert_eq!(args.config, PathBuf::from(CONFIG_FILE_NAME));
    }

    #[test]
    fn unknown_backend_is_a_usage_error() {
        let result =
            build_cli("en").try_get_matches_from(["cts-matrix", "run", "--backend", "glide"]);
        assert!(result.is_err());
    }

    #[test]
    fn shard_flags_must_come_together() {
        let result =
            build_cli("en").try_get_matches_from(["cts-matrix", "run", "--total-runners", "2"]);
        assert!(result.is_err());
    }
}
