use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use autostaker::cli::{self, NetworkArgs};
use autostaker::run::RunConfig;
use autostaker::{query, run, schema, validate};

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = cli::Cli::parse();

    match cli.command {
        cli::Command::Schema => schema::run(),
        cli::Command::Validate { config } => validate::run(&config),
        cli::Command::Query { config, network } => {
            query::run(&config, &read_only(network))
        }
        cli::Command::Plan {
            config,
            network,
            json,
        } => run::plan(&config, &read_only(network), json),
        cli::Command::Run {
            config,
            network,
            state_file,
            dry_run,
            once,
            interval,
            max_retries,
            retry_delay,
            confirmation_timeout,
        } => run::run(&config, &RunConfig {
            operator: network.operator,
            rpc_url: network.rpc_url,
            subgraph_url: network.subgraph_url,
            state_file,
            dry_run,
            once,
            cycle_interval_secs: interval,
            max_retries,
            retry_delay_secs: retry_delay,
            confirmation_timeout_secs: confirmation_timeout,
        }),
        cli::Command::Collect {
            config,
            network,
            state_file,
            dry_run,
        } => run::collect(&config, &RunConfig {
            state_file,
            dry_run,
            ..read_only(network)
        }),
    }
}

/// Runtime settings for commands that never send transactions.
fn read_only(network: NetworkArgs) -> RunConfig {
    RunConfig {
        operator: network.operator,
        rpc_url: network.rpc_url,
        subgraph_url: network.subgraph_url,
        state_file: PathBuf::from("state.json"),
        dry_run: true,
        once: true,
        cycle_interval_secs: 3600,
        max_retries: 5,
        retry_delay_secs: 10,
        confirmation_timeout_secs: 120,
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,autostaker=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
