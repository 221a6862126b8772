use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;
use tracing::warn;

use crate::engine::{Engine, Feature, LiteralFormat, SnapshotTarget};

/// Hard cap on positional script arguments.
pub const MAX_INPUT_FILES: usize = 64;

/// Hard cap on `--exec-snapshot` arguments.
pub const MAX_EXEC_SNAPSHOTS: usize = 64;

/// Command-line surface of the jonquil shell.
#[derive(Debug, Parser)]
#[command(
    name = "jonquil",
    version,
    about = "Jonquil script shell",
    arg_required_else_help = false
)]
pub struct Args {
    /// Collect engine memory statistics
    #[arg(long)]
    pub mem_stats: bool,

    /// Collect memory statistics broken out per subsystem
    #[arg(long)]
    pub mem_stats_separate: bool,

    /// Parse the input files without executing them
    #[arg(long)]
    pub parse_only: bool,

    /// Dump the parsed form of every script
    #[arg(long)]
    pub show_opcodes: bool,

    /// Dump compiled regular expressions
    #[arg(long)]
    pub show_regexp_opcodes: bool,

    /// Start the remote debug server
    #[arg(long)]
    pub start_debug_server: bool,

    /// Serialize the script as a snapshot with global semantics
    #[arg(long, value_name = "FILE")]
    pub save_snapshot_for_global: Option<PathBuf>,

    /// Serialize the script as a snapshot with eval semantics
    #[arg(long, value_name = "FILE")]
    pub save_snapshot_for_eval: Option<PathBuf>,

    /// Execute a previously saved snapshot (repeatable)
    #[arg(long, value_name = "FILE")]
    pub exec_snapshot: Vec<PathBuf>,

    /// Dump the script's literal table as a plain listing
    #[arg(long, value_name = "FILE")]
    pub save_literals_list_format: Option<PathBuf>,

    /// Dump the script's literal table as C source
    #[arg(long, value_name = "FILE")]
    pub save_literals_c_format: Option<PathBuf>,

    /// Log verbosity, 0 (errors only) to 3 (trace)
    #[arg(long, value_name = "LEVEL", default_value_t = 1,
          value_parser = clap::value_parser!(u8).range(0..=3))]
    pub log_level: u8,

    /// Abort instead of exiting cleanly on an assertion failure
    #[arg(long)]
    pub abort_on_fail: bool,

    /// Suppress the interactive prompt
    #[arg(long)]
    pub no_prompt: bool,

    /// Script files to run; `-` reads from stdin
    #[arg(value_name = "FILE")]
    pub files: Vec<String>,
}

/// Malformed or conflicting command-line input. Reported before the engine
/// is initialized; the process exits with failure status.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct UsageError(pub String);

#[derive(Debug, Clone)]
pub enum Mode {
    Run,
    SaveSnapshot {
        target: SnapshotTarget,
        output: PathBuf,
    },
    ExecSnapshot,
    SaveLiterals {
        format: LiteralFormat,
        output: PathBuf,
    },
    Repl,
}

/// Validated, immutable run configuration.
#[derive(Debug)]
pub struct Config {
    pub mode: Mode,
    pub files: Vec<String>,
    pub exec_snapshots: Vec<PathBuf>,
    pub parse_only: bool,
    pub show_opcodes: bool,
    pub abort_on_fail: bool,
    pub no_prompt: bool,
    pub log_level: u8,
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self, UsageError> {
        if args.mem_stats {
            feature_check(Feature::MemStats, "--mem-stats");
        }
        if args.mem_stats_separate {
            feature_check(Feature::MemStats, "--mem-stats-separate");
        }
        if args.show_regexp_opcodes {
            feature_check(Feature::RegexpDump, "--show-regexp-opcodes");
        }
        if args.start_debug_server {
            feature_check(Feature::Debugger, "--start-debug-server");
        }
        let show_opcodes = args.show_opcodes && feature_check(Feature::ParserDump, "--show-opcodes");

        let save_snapshot = match (args.save_snapshot_for_global, args.save_snapshot_for_eval) {
            (Some(_), Some(_)) => {
                return Err(UsageError("snapshot file name already specified".into()));
            }
            (Some(output), None) => feature_check(Feature::SnapshotSave, "--save-snapshot-for-global")
                .then_some((SnapshotTarget::Global, output)),
            (None, Some(output)) => feature_check(Feature::SnapshotSave, "--save-snapshot-for-eval")
                .then_some((SnapshotTarget::Eval, output)),
            (None, None) => None,
        };

        let save_literals = match (args.save_literals_list_format, args.save_literals_c_format) {
            (Some(_), Some(_)) => {
                return Err(UsageError("literal file name already specified".into()));
            }
            (Some(output), None) => {
                feature_check(Feature::SnapshotSave, "--save-literals-list-format")
                    .then_some((LiteralFormat::List, output))
            }
            (None, Some(output)) => {
                feature_check(Feature::SnapshotSave, "--save-literals-c-format")
                    .then_some((LiteralFormat::CSource, output))
            }
            (None, None) => None,
        };

        let exec_snapshots = if args.exec_snapshot.is_empty()
            || !feature_check(Feature::SnapshotExec, "--exec-snapshot")
        {
            Vec::new()
        } else {
            args.exec_snapshot
        };

        if args.files.len() > MAX_INPUT_FILES {
            return Err(UsageError(format!(
                "too many input files: {} (maximum is {MAX_INPUT_FILES})",
                args.files.len()
            )));
        }
        if exec_snapshots.len() > MAX_EXEC_SNAPSHOTS {
            return Err(UsageError(format!(
                "too many snapshot files: {} (maximum is {MAX_EXEC_SNAPSHOTS})",
                exec_snapshots.len()
            )));
        }

        if save_snapshot.is_some() && save_literals.is_some() {
            return Err(UsageError(
                "--save-snapshot-* and --save-literals-* options can't be passed simultaneously"
                    .into(),
            ));
        }
        if save_snapshot.is_some() {
            if args.files.len() != 1 {
                return Err(UsageError(
                    "--save-snapshot-* options work with exactly one script".into(),
                ));
            }
            if !exec_snapshots.is_empty() {
                return Err(UsageError(
                    "--save-snapshot-* and --exec-snapshot options can't be passed simultaneously"
                        .into(),
                ));
            }
        }
        if save_literals.is_some() && args.files.len() != 1 {
            return Err(UsageError(
                "--save-literals-* options work with exactly one script".into(),
            ));
        }

        let mode = if let Some((target, output)) = save_snapshot {
            Mode::SaveSnapshot { target, output }
        } else if let Some((format, output)) = save_literals {
            Mode::SaveLiterals { format, output }
        } else if args.files.is_empty() && exec_snapshots.is_empty() {
            Mode::Repl
        } else if args.files.is_empty() {
            Mode::ExecSnapshot
        } else {
            Mode::Run
        };

        Ok(Config {
            mode,
            files: args.files,
            exec_snapshots,
            parse_only: args.parse_only,
            show_opcodes,
            abort_on_fail: args.abort_on_fail,
            no_prompt: args.no_prompt,
            log_level: args.log_level,
        })
    }
}

/// Log level the subscriber should run at, before validation has produced a
/// `Config`. `--show-opcodes` implies DEBUG so the dump is visible.
pub fn effective_log_level(args: &Args) -> u8 {
    if args.show_opcodes && Engine::has_feature(Feature::ParserDump) {
        args.log_level.max(2)
    } else {
        args.log_level
    }
}

pub fn tracing_level(log_level: u8) -> tracing::Level {
    match log_level {
        0 => tracing::Level::ERROR,
        1 => tracing::Level::WARN,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    }
}

fn feature_check(feature: Feature, option: &str) -> bool {
    if Engine::has_feature(feature) {
        true
    } else {
        warn!("Ignoring '{option}' option because this feature is disabled!");
        false
    }
}
