use std::process::ExitCode;

use clap::Parser;

use jonquil::{
    cli::{self, Args, Config},
    shell,
};

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // help and version are successful exits; everything else is a
            // usage failure
            use clap::error::ErrorKind;
            if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                let _ = err.print();
                return ExitCode::SUCCESS;
            }
            let _ = err.print();
            return ExitCode::FAILURE;
        }
    };

    init_tracing(cli::effective_log_level(&args));

    let config = match Config::from_args(args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err}");
            eprintln!("Try 'jonquil --help' for more information.");
            return ExitCode::FAILURE;
        }
    };

    shell::run(&config)
}

fn init_tracing(log_level: u8) {
    tracing_subscriber::fmt()
        .with_max_level(cli::tracing_level(log_level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
