use clap::CommandFactory;
use std::process;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use triage::issues::{FileSystemIssueStore, IssueService};
use triage::{Config, IssueApi};
use triage_cli::cli::Cli;
use triage_cli::error::handle_cli_result;
use triage_cli::exit_codes::{EXIT_FAILURE, EXIT_SUCCESS};
use triage_cli::issue;

#[tokio::main]
async fn main() {
    let mut cli = Cli::parse_args();

    let Some(command) = cli.command.take() else {
        let code = match Cli::command().print_help() {
            Ok(()) => EXIT_SUCCESS,
            Err(_) => EXIT_FAILURE,
        };
        process::exit(code);
    };

    init_logging(&cli);

    let mut config = Config::load();
    if let Some(data_dir) = cli.data_dir.take() {
        config.data_dir = data_dir;
    }
    tracing::debug!("Using issue document {}", config.issues_file().display());

    let color = Cli::should_use_color();
    if !color {
        colored::control::set_override(false);
    }

    let store = Arc::new(FileSystemIssueStore::from_config(&config));
    let api = IssueApi::new(IssueService::new(store, config));

    let exit_code = handle_cli_result(issue::run_command(&api, command, color).await);
    process::exit(exit_code);
}

/// Send logs to stderr. `RUST_LOG` wins over the verbosity flags when set.
fn init_logging(cli: &Cli) {
    let log_level = if cli.quiet {
        Level::ERROR
    } else if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_lowercase()));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
