//! pyvet CLI entry point
//!
//! Handles thread-pool configuration, argument parsing, command dispatch,
//! and exit-code mapping. Command implementations live in `commands`.

use anyhow::Result;
use clap::Parser;
use pyvet::cli::{configure_thread_pool, worker_count, Cli, Commands};
use pyvet::commands::{self, analyze::AnalyzeArgs, check::CheckArgs, EXIT_ANALYSIS_ERROR};
use pyvet::observability::init_tracing;

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    configure_thread_pool(worker_count(cli.command.jobs()));

    let exit_code = match dispatch(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!("hint: {}", e.recovery_hint());
            EXIT_ANALYSIS_ERROR
        }
    };
    std::process::exit(exit_code);
}

fn dispatch(cli: Cli) -> pyvet::Result<i32> {
    match cli.command {
        command @ Commands::Analyze { .. } => {
            let args = AnalyzeArgs::from_command(&command, cli.config)
                .expect("analyze command carries analyze args");
            commands::handle_analyze(args)
        }
        Commands::Check {
            paths,
            include,
            exclude,
            ..
        } => commands::handle_check(CheckArgs {
            paths,
            include,
            exclude,
            config_path: cli.config,
        }),
        Commands::Init { force } => commands::handle_init(force),
    }
}
