//! The execution host: dispatches the configured mode over the engine,
//! drains deferred jobs after every unit of top-level evaluation, and turns
//! the whole run into a single exit code.

use std::{fs, process::ExitCode};

use tracing::error;

use crate::{
    cli::{Config, Mode},
    engine::{value::ErrorValue, Engine, InitFlags},
    error::HostError,
    natives, repl, report,
    source::SourceBuffer,
};

pub fn run(config: &Config) -> ExitCode {
    let mut engine = Engine::init(InitFlags {
        show_opcodes: config.show_opcodes,
    });
    natives::install(&mut engine);
    let mut buffer = SourceBuffer::new();

    let mut failed = false;

    if let Err(err) = run_batch(&mut engine, &mut buffer, config) {
        failed = true;
        if report_failure(&err, &buffer) {
            return fail(config);
        }
    }

    if matches!(config.mode, Mode::Repl) {
        if let Err(err) = repl::run(&mut engine, &mut buffer, config) {
            failed = true;
            if report_failure(&err, &buffer) {
                return fail(config);
            }
        }
    }

    // pending reactions are flushed once more before teardown
    if let Err(err) = drain_jobs(&mut engine) {
        let fatal = err.is_fatal();
        report::report_unhandled(&err, &buffer);
        failed = true;
        if fatal {
            return fail(config);
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Execute snapshots, then input files, in the order given, stopping at the
/// first error. Each unit drains the job queue before the next begins.
fn run_batch(
    engine: &mut Engine,
    buffer: &mut SourceBuffer,
    config: &Config,
) -> Result<(), HostError> {
    for path in &config.exec_snapshots {
        let blob = buffer.load_blob(path)?;
        engine.exec_snapshot(blob).map_err(HostError::Script)?;
        drain_jobs(engine).map_err(HostError::Script)?;
    }
    for name in &config.files {
        run_source_file(engine, buffer, config, name)?;
    }
    Ok(())
}

fn run_source_file(
    engine: &mut Engine,
    buffer: &mut SourceBuffer,
    config: &Config,
    name: &str,
) -> Result<(), HostError> {
    let source = buffer.load_script(name)?;
    match &config.mode {
        Mode::SaveSnapshot { target, output } => {
            let blob = engine
                .save_snapshot(source, *target)
                .map_err(HostError::Script)?;
            if blob.is_empty() {
                return Err(HostError::SnapshotSave);
            }
            fs::write(output, &blob).map_err(|source| HostError::Write {
                path: output.display().to_string(),
                source,
            })?;
            Ok(())
        }
        Mode::SaveLiterals { format, output } => {
            let blob = engine
                .save_literals(source, *format)
                .map_err(HostError::Script)?;
            if blob.is_empty() {
                return Err(HostError::LiteralSave);
            }
            fs::write(output, &blob).map_err(|source| HostError::Write {
                path: output.display().to_string(),
                source,
            })?;
            Ok(())
        }
        _ => {
            let script = engine.parse(source).map_err(HostError::Script)?;
            if !config.parse_only {
                engine.run(&script).map_err(HostError::Script)?;
            }
            drain_jobs(engine).map_err(HostError::Script)?;
            Ok(())
        }
    }
}

/// Run deferred reactions until the queue reports empty, in FIFO order.
pub(crate) fn drain_jobs(engine: &mut Engine) -> Result<(), ErrorValue> {
    while let Some(result) = engine.run_pending_job() {
        result?;
    }
    Ok(())
}

/// Report a failure and say whether it was fatal (assertion failure).
fn report_failure(err: &HostError, buffer: &SourceBuffer) -> bool {
    match err {
        HostError::Script(value) => {
            report::report_unhandled(value, buffer);
            value.is_fatal()
        }
        HostError::SnapshotSave | HostError::LiteralSave => {
            report::report_unhandled(&ErrorValue::plain(err.to_string()), buffer);
            false
        }
        other => {
            error!("{other}");
            false
        }
    }
}

fn fail(config: &Config) -> ExitCode {
    if config.abort_on_fail {
        std::process::abort();
    }
    ExitCode::FAILURE
}
