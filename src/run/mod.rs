pub mod collect;
pub mod config;
pub mod errors;
pub mod orchestrator;
pub mod report;
pub mod state;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::engine::{plan_cycle, CyclePlan, DrainOutcome, PlanKind};
use crate::ledger::{evm, Ledger, OperatorContract, StakingQuery, SubgraphQuery};
use crate::model::amount::format_tokens;
use crate::model::{OperatorConfig, PoolId};

use config::RuntimeConfig;
use orchestrator::{CancelFlag, Orchestrator, RetryPolicy};
use report::ExecutionReport;
use state::RunState;

/// CLI-facing config struct (before env var resolution).
pub struct RunConfig {
    pub operator: String,
    pub rpc_url: String,
    pub subgraph_url: String,
    pub state_file: PathBuf,
    pub dry_run: bool,
    pub once: bool,
    pub cycle_interval_secs: u64,
    pub max_retries: u32,
    pub retry_delay_secs: u64,
    pub confirmation_timeout_secs: u64,
}

/// Entry point for the `run` command.
pub fn run(config_path: &Path, cli_config: &RunConfig) -> Result<()> {
    let config = crate::validate::load_or_bail(config_path)?;
    let runtime = RuntimeConfig::from_cli(cli_config, true)?;

    info!("=== autostaker run ===");
    info!("Operator: {}", runtime.operator);
    info!("Wallet:   {:?}", runtime.wallet_address);
    info!("Dry run:  {}", runtime.dry_run);
    info!("Once:     {}", runtime.once);
    info!(
        "Config:   max_pool_count={}, min_transaction_amount={}, max_min_operators={}",
        config.max_pool_count, config.min_transaction_amount, config.max_acceptable_min_operator_count
    );

    let rt = tokio::runtime::Runtime::new().context("creating tokio runtime")?;
    rt.block_on(run_async(config_path, config, runtime))
}

async fn run_async(config_path: &Path, mut config: OperatorConfig, runtime: RuntimeConfig) -> Result<()> {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let ledger = build_ledger(&runtime);
    let query = SubgraphQuery::new(&runtime.subgraph_url, runtime.operator);
    let mut state = RunState::load_or_new(&runtime.state_file)?;

    let cancel = CancelFlag::default();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, stopping after the current action");
                cancel.cancel();
            }
        });
    }

    loop {
        match run_cycle(&ledger, &query, &config, runtime.retry, &cancel, &mut state).await {
            Ok(report) => {
                for line in report.summary_lines() {
                    info!("{line}");
                }
                info!("cycle outcome: {:?}", report.outcome());
            }
            Err(e) => error!("cycle failed: {e:#}"),
        }
        state.save(&runtime.state_file)?;

        if runtime.once || cancel.is_cancelled() {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(runtime.cycle_interval) => {}
            _ = wait_cancelled(&cancel) => break,
        }

        // the config is re-read every cycle so edits apply without restart
        match crate::validate::load_or_bail(config_path) {
            Ok(fresh) => config = fresh,
            Err(e) => warn!("keeping previous config, reload failed: {e:#}"),
        }
    }

    info!("State saved. Exiting.");
    Ok(())
}

async fn wait_cancelled(cancel: &CancelFlag) {
    while !cancel.is_cancelled() {
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    }
}

/// One full cycle: snapshot, optional earnings collection, plan, execute.
///
/// A failed snapshot aborts the cycle before anything is submitted.
pub async fn run_cycle(
    ledger: &dyn Ledger,
    query: &dyn StakingQuery,
    config: &OperatorConfig,
    retry: RetryPolicy,
    cancel: &CancelFlag,
    state: &mut RunState,
) -> Result<ExecutionReport> {
    let snapshot = query.snapshot().await.context("reading operator state")?;
    let now = snapshot.timestamp;

    if collect::is_due(&config.auto_collect, state.last_collect, now) {
        let pools: Vec<PoolId> = snapshot.stakes.keys().copied().collect();
        if collect::collect_earnings(ledger, &pools).await {
            state.last_collect = now;
        }
    }

    let plan = plan_cycle(&snapshot, config);
    log_plan(&plan);
    let CyclePlan { actions, drain, .. } = plan;

    let mut report = Orchestrator::new(ledger, query, config)
        .with_retry(retry)
        .with_cancel(cancel.clone())
        .execute(actions)
        .await;
    if let Some(DrainOutcome::CannotPay { shortfall }) = drain {
        report.unpayable_queue = Some(shortfall);
    }

    state.last_cycle = now;
    state.cycles += 1;
    state.last_outcome = Some(report.outcome());
    Ok(report)
}

fn log_plan(plan: &CyclePlan) {
    match (&plan.kind, &plan.drain) {
        (PlanKind::Drain, Some(DrainOutcome::CannotPay { shortfall })) => {
            warn!(
                "undelegation queue short by {} and no sponsorship has stake above the minimum",
                format_tokens(*shortfall)
            );
        }
        (PlanKind::Drain, Some(DrainOutcome::Partial { uncovered, .. })) => {
            warn!(
                "draining undelegation queue partially, {} still uncovered",
                format_tokens(*uncovered)
            );
        }
        (PlanKind::Drain, _) => info!("draining undelegation queue"),
        (PlanKind::Rebalance, _) => {
            info!(targets = plan.targets.len(), actions = plan.actions.len(), "rebalance planned")
        }
    }
    for action in &plan.actions {
        info!("  planned: {action}");
    }
}

fn build_ledger(runtime: &RuntimeConfig) -> OperatorContract {
    OperatorContract::new(
        runtime.operator,
        &runtime.rpc_url,
        runtime.private_key.clone(),
        runtime.dry_run,
        runtime.confirmation_timeout,
    )
}

// ── plan / collect commands ──────────────────────────────────────────

/// Entry point for the `plan` command: print the actions a cycle would
/// take, without sending anything.
pub fn plan(config_path: &Path, cli_config: &RunConfig, json: bool) -> Result<()> {
    let config = crate::validate::load_or_bail(config_path)?;
    let runtime = RuntimeConfig::from_cli(cli_config, false)?;

    let rt = tokio::runtime::Runtime::new().context("creating tokio runtime")?;
    rt.block_on(async {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
        let query = SubgraphQuery::new(&runtime.subgraph_url, runtime.operator);
        let snapshot = query.snapshot().await.context("reading operator state")?;
        let plan = plan_cycle(&snapshot, &config);

        if json {
            println!("{}", serde_json::to_string_pretty(&plan.actions)?);
            return Ok(());
        }

        println!(
            "Operator {}: {} staked in {} sponsorships, {} free, {} queued",
            evm::short_addr(&snapshot.operator),
            format_tokens(snapshot.total_value() - snapshot.free_balance),
            snapshot.stakes.len(),
            format_tokens(snapshot.free_balance),
            format_tokens(snapshot.undelegation_queue),
        );
        if plan.is_empty() {
            println!("Nothing to do.");
        }
        for (i, action) in plan.actions.iter().enumerate() {
            println!("  {}. {}", i + 1, action);
        }
        Ok(())
    })
}

/// Entry point for the `collect` command: withdraw earnings from every
/// staked sponsorship now.
pub fn collect(config_path: &Path, cli_config: &RunConfig) -> Result<()> {
    crate::validate::load_or_bail(config_path)?;
    let runtime = RuntimeConfig::from_cli(cli_config, true)?;

    let rt = tokio::runtime::Runtime::new().context("creating tokio runtime")?;
    rt.block_on(async {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
        let ledger = build_ledger(&runtime);
        let query = SubgraphQuery::new(&runtime.subgraph_url, runtime.operator);
        let snapshot = query.snapshot().await.context("reading operator state")?;
        let pools: Vec<PoolId> = snapshot.stakes.keys().copied().collect();

        if !collect::collect_earnings(&ledger, &pools).await {
            anyhow::bail!("earnings withdrawal failed");
        }
        let mut state = RunState::load_or_new(&runtime.state_file)?;
        state.last_collect = snapshot.timestamp;
        state.save(&runtime.state_file)?;
        println!("Collected earnings from {} sponsorships.", pools.len());
        Ok(())
    })
}
