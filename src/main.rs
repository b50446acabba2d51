//! sindex CLI - persistent semantic index for C source code.
//!
//! Usage: sindex [options] <command> [arguments]

mod add_cmd;
mod cli;
mod rm_cmd;
mod search_cmd;

use std::process::ExitCode;

use cli::Command;

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let parsed = match cli::parse_args(&args) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("sindex: {:#}", e);
            eprintln!("Try 'sindex --help' for more information.");
            return ExitCode::from(1);
        }
    };

    init_tracing(parsed.config.verbose);

    let (name, result) = match parsed.command {
        Command::Help => {
            cli::print_usage();
            return ExitCode::SUCCESS;
        }
        Command::Version => {
            println!("{}", sindex::version::version());
            return ExitCode::SUCCESS;
        }
        Command::Add {
            include_local_syms,
            tail,
        } => (
            "add",
            add_cmd::run_add(&parsed.config, include_local_syms, &tail),
        ),
        Command::Rm { patterns } => ("rm", rm_cmd::run_rm(&parsed.config, &patterns)),
        Command::Search { format, options } => (
            "search",
            search_cmd::run_search(&parsed.config, &format, &options),
        ),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("sindex: {}: {:#}", name, e);
            ExitCode::from(1)
        }
    }
}
