use std::io;

use rustyline::{error::ReadlineError, DefaultEditor};
use tracing::error;

use crate::{
    cli::Config, engine::Engine, error::HostError, natives, report, shell::drain_jobs,
    source::SourceBuffer,
};

const PROMPT: &str = "jonquil> ";

/// Interactive line-at-a-time evaluation. Errors are local to the offending
/// line; only a fatal assertion failure ends the loop with an error.
pub fn run(
    engine: &mut Engine,
    buffer: &mut SourceBuffer,
    config: &Config,
) -> Result<(), HostError> {
    let prompt = if config.no_prompt { "" } else { PROMPT };
    let mut editor = DefaultEditor::new()
        .map_err(|err| HostError::from(io::Error::new(io::ErrorKind::Other, err)))?;

    loop {
        match editor.readline(prompt) {
            Ok(line) => {
                if line.is_empty() {
                    continue;
                }
                editor.add_history_entry(&line).ok();
                let source = match buffer.load_line(&line) {
                    Ok(source) => source,
                    Err(err) => {
                        error!("{err}");
                        continue;
                    }
                };
                match engine.eval(source) {
                    Ok(value) => {
                        natives::print_values(&[value]);
                        if let Err(err) = drain_jobs(engine) {
                            if err.is_fatal() {
                                return Err(HostError::Script(err));
                            }
                            report::report_unhandled(&err, buffer);
                        }
                    }
                    Err(err) => {
                        if err.is_fatal() {
                            return Err(HostError::Script(err));
                        }
                        report::report_unhandled(&err, buffer);
                    }
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                return Err(HostError::from(io::Error::new(io::ErrorKind::Other, err)));
            }
        }
    }
    Ok(())
}
