use std::path::Path;

use anyhow::{Context, Result};
use serde_json::json;

use crate::engine::live_candidates;
use crate::ledger::{StakingQuery, SubgraphQuery};
use crate::model::amount::format_tokens;
use crate::run::config::RuntimeConfig;
use crate::run::RunConfig;

/// Entry point for the `query` command.
/// Reads the operator snapshot from the indexer and prints it as JSON,
/// together with the ids of the sponsorships that pass the liveness filter.
pub fn run(config_path: &Path, cli_config: &RunConfig) -> Result<()> {
    let config = crate::validate::load_or_bail(config_path)?;
    let runtime = RuntimeConfig::from_cli(cli_config, false)?;

    let rt = tokio::runtime::Runtime::new().context("creating tokio runtime")?;
    rt.block_on(async {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
        let query = SubgraphQuery::new(&runtime.subgraph_url, runtime.operator);
        let snapshot = query.snapshot().await.context("reading operator state")?;

        let candidates = live_candidates(&snapshot.pools, &snapshot.stakes, &config, snapshot.timestamp);
        let candidate_ids: Vec<String> = candidates.iter().map(|p| p.id.to_string()).collect();

        let result = json!({
            "snapshot": snapshot,
            "total_value": format_tokens(snapshot.total_value()),
            "candidates": candidate_ids,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
        Ok(())
    })
}
