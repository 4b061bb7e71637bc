use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Operator autostaker: allocate an operator's stake across sponsorships
/// and keep it converged on-chain.
#[derive(Parser)]
#[command(name = "autostaker", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Output the JSON schema for the operator config
    Schema,

    /// Validate an operator config file
    Validate {
        /// Path to the operator config JSON file
        config: PathBuf,
    },

    /// Print the current operator state and candidate sponsorships as JSON
    Query {
        /// Path to the operator config JSON file
        config: PathBuf,

        #[command(flatten)]
        network: NetworkArgs,
    },

    /// Print the actions the next cycle would take, without sending anything
    Plan {
        /// Path to the operator config JSON file
        config: PathBuf,

        #[command(flatten)]
        network: NetworkArgs,

        /// Print the actions as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the autostaker with on-chain execution
    Run {
        /// Path to the operator config JSON file
        config: PathBuf,

        #[command(flatten)]
        network: NetworkArgs,

        /// Path to state file for persistence across restarts
        #[arg(long, default_value = "state.json")]
        state_file: PathBuf,

        /// Log actions without executing
        #[arg(long)]
        dry_run: bool,

        /// Execute one cycle then exit (for external cron)
        #[arg(long)]
        once: bool,

        /// Seconds between cycles in daemon mode
        #[arg(long, default_value = "3600")]
        interval: u64,

        /// Recalculations allowed per cycle after stale-state failures (at most 5)
        #[arg(long, default_value = "5")]
        max_retries: u32,

        /// Seconds to wait before recalculating
        #[arg(long, default_value = "10")]
        retry_delay: u64,

        /// Seconds to wait for a transaction receipt
        #[arg(long, default_value = "120")]
        confirmation_timeout: u64,
    },

    /// Withdraw earnings from every staked sponsorship now
    Collect {
        /// Path to the operator config JSON file
        config: PathBuf,

        #[command(flatten)]
        network: NetworkArgs,

        /// Path to state file for persistence across restarts
        #[arg(long, default_value = "state.json")]
        state_file: PathBuf,

        /// Log the withdrawal without executing
        #[arg(long)]
        dry_run: bool,
    },
}

/// Where to find the operator and the network.
#[derive(Args)]
pub struct NetworkArgs {
    /// Operator contract address
    #[arg(long)]
    pub operator: String,

    /// JSON-RPC endpoint of the chain the operator contract lives on
    #[arg(long, default_value = "https://polygon-rpc.com")]
    pub rpc_url: String,

    /// GraphQL endpoint of the network subgraph
    #[arg(long)]
    pub subgraph_url: String,
}
