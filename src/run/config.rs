use std::path::PathBuf;
use std::time::Duration;

use alloy::primitives::Address;
use anyhow::{bail, Context, Result};

use super::orchestrator::{RetryPolicy, MAX_RETRY_ATTEMPTS};
use crate::ledger::evm;

pub const PRIVATE_KEY_ENV: &str = "AUTOSTAKER_PRIVATE_KEY";
pub const PRIVATE_KEY_FILE_ENV: &str = "AUTOSTAKER_PRIVATE_KEY_FILE";

/// Runtime configuration for the `run`, `plan`, `query` and `collect` commands.
pub struct RuntimeConfig {
    pub operator: Address,
    pub rpc_url: String,
    pub subgraph_url: String,
    /// Owner key of the operator contract. Optional for read-only commands
    /// and dry runs.
    pub private_key: Option<String>,
    pub wallet_address: Option<Address>,
    pub state_file: PathBuf,
    pub dry_run: bool,
    pub once: bool,
    pub cycle_interval: Duration,
    pub retry: RetryPolicy,
    pub confirmation_timeout: Duration,
}

impl RuntimeConfig {
    /// Build from CLI arguments plus the environment.
    ///
    /// `require_signer` makes a missing private key an error unless
    /// `dry_run` is set.
    pub fn from_cli(cli: &crate::run::RunConfig, require_signer: bool) -> Result<Self> {
        let operator: Address = cli
            .operator
            .parse()
            .with_context(|| format!("invalid operator address '{}'", cli.operator))?;

        let private_key = resolve_private_key()?;
        if require_signer && !cli.dry_run && private_key.is_none() {
            bail!(
                "{PRIVATE_KEY_ENV} or {PRIVATE_KEY_FILE_ENV} must be set to send transactions \
                 (or pass --dry-run)."
            );
        }
        let wallet_address = private_key.as_deref().map(evm::address_of).transpose()?;

        if cli.cycle_interval_secs == 0 {
            bail!("--interval must be positive");
        }
        if cli.max_retries > MAX_RETRY_ATTEMPTS {
            bail!(
                "--max-retries {} exceeds the limit of {MAX_RETRY_ATTEMPTS} per run",
                cli.max_retries
            );
        }

        Ok(RuntimeConfig {
            operator,
            rpc_url: cli.rpc_url.clone(),
            subgraph_url: cli.subgraph_url.clone(),
            private_key,
            wallet_address,
            state_file: cli.state_file.clone(),
            dry_run: cli.dry_run,
            once: cli.once,
            cycle_interval: Duration::from_secs(cli.cycle_interval_secs),
            retry: RetryPolicy {
                max_attempts: cli.max_retries,
                delay: Duration::from_secs(cli.retry_delay_secs),
            },
            confirmation_timeout: Duration::from_secs(cli.confirmation_timeout_secs),
        })
    }
}

fn resolve_private_key() -> Result<Option<String>> {
    if let Ok(pk) = std::env::var(PRIVATE_KEY_ENV) {
        return Ok(Some(pk.trim().to_string()));
    }
    if let Ok(path) = std::env::var(PRIVATE_KEY_FILE_ENV) {
        let key = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read private key from {path}"))?;
        return Ok(Some(key.trim().to_string()));
    }
    Ok(None)
}
