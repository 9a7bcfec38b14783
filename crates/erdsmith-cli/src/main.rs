//! erdsmith CLI - ERD-to-schema compiler.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Check {
            file,
            json,
            reserved,
        } => commands::check::run(file, json, reserved, config, cli.verbose),

        Commands::Fix {
            file,
            output,
            reserved,
        } => commands::fix::run(file, output, reserved, config, cli.verbose),

        Commands::Match {
            file,
            catalog,
            json,
        } => commands::matches::run(file, catalog, json, config, cli.verbose),

        Commands::Export {
            file,
            output,
            format,
            choices,
            reserved,
        } => commands::export::run(file, output, format, choices, reserved, config, cli.verbose),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Log to stderr; `RUST_LOG` wins over the default level.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
