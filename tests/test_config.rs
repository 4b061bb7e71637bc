mod mock_chain;

use alloy::primitives::U256;

use autostaker::ledger::subgraph::unix_seconds;
use autostaker::model::amount::{format_tokens, parse_amount, tokens_to_wei, WEI_PER_TOKEN};
use autostaker::model::{Action, OperatorConfig};
use autostaker::run::config::RuntimeConfig;
use autostaker::run::orchestrator::MAX_RETRY_ATTEMPTS;
use autostaker::run::report::RunOutcome;
use autostaker::run::RunConfig;
use autostaker::run::state::RunState;
use autostaker::validate::{self, ValidationError};

use mock_chain::addr;

// ── Operator config ─────────────────────────────────────────────────

#[test]
fn empty_config_uses_defaults() {
    let config: OperatorConfig = serde_json::from_str("{}").unwrap();

    assert_eq!(config, OperatorConfig::default());
    assert_eq!(config.max_pool_count, 20);
    assert_eq!(config.min_transaction_amount, 1000);
    assert_eq!(config.max_acceptable_min_operator_count, 100);
    assert!(!config.auto_collect.enabled);
    assert_eq!(config.auto_collect.interval_secs, 86_400);
    assert_eq!(config.min_transaction_wei(), tokens_to_wei(1000));
}

#[test]
fn partial_config_keeps_other_defaults() {
    let config: OperatorConfig = serde_json::from_str(
        r#"{ "max_pool_count": 3, "auto_collect": { "enabled": true } }"#,
    )
    .unwrap();

    assert_eq!(config.max_pool_count, 3);
    assert_eq!(config.min_transaction_amount, 1000);
    assert!(config.auto_collect.enabled);
    assert_eq!(config.auto_collect.interval_secs, 86_400);
}

#[test]
fn default_config_is_valid() {
    assert!(validate::validate(&OperatorConfig::default()).is_ok());
}

#[test]
fn invalid_config_reports_every_error() {
    let mut config = OperatorConfig {
        max_pool_count: 0,
        min_transaction_amount: u64::MAX,
        ..OperatorConfig::default()
    };
    config.auto_collect.enabled = true;
    config.auto_collect.interval_secs = 0;

    let errors = validate::validate(&config).unwrap_err();

    assert_eq!(errors.len(), 3);
    assert!(matches!(errors[0], ValidationError::ZeroPoolCount));
    assert!(matches!(errors[1], ValidationError::MinTransactionTooLarge { .. }));
    assert!(matches!(errors[2], ValidationError::ZeroCollectInterval));
}

#[test]
fn disabled_collect_ignores_interval() {
    let mut config = OperatorConfig::default();
    config.auto_collect.interval_secs = 0;

    assert!(validate::validate(&config).is_ok());
}

#[test]
fn load_reports_bad_json() {
    let path = std::env::temp_dir().join(format!("autostaker-bad-{}.json", std::process::id()));
    std::fs::write(&path, "{ not json").unwrap();

    let errors = validate::load_and_validate(&path).unwrap_err();
    std::fs::remove_file(&path).ok();

    assert!(matches!(errors[0], ValidationError::Json(_)));
}

#[test]
fn schema_describes_config_fields() {
    let schema = schemars::schema_for!(OperatorConfig);
    let json = serde_json::to_value(&schema).unwrap();

    let props = &json["properties"];
    assert!(props.get("max_pool_count").is_some());
    assert!(props.get("min_transaction_amount").is_some());
    assert!(props.get("auto_collect").is_some());
}

// ── Runtime config ──────────────────────────────────────────────────

fn run_args(max_retries: u32) -> RunConfig {
    RunConfig {
        operator: addr(0x42).to_string(),
        rpc_url: "http://localhost:8545".into(),
        subgraph_url: "http://localhost:8000/subgraphs/name/network".into(),
        state_file: std::env::temp_dir().join("autostaker-args-state.json"),
        dry_run: true,
        once: true,
        cycle_interval_secs: 3600,
        max_retries,
        retry_delay_secs: 10,
        confirmation_timeout_secs: 120,
    }
}

#[test]
fn retry_limit_is_capped() {
    let Err(err) = RuntimeConfig::from_cli(&run_args(50), false) else {
        panic!("50 retries accepted");
    };
    assert!(err.to_string().contains("--max-retries"));

    let runtime = RuntimeConfig::from_cli(&run_args(MAX_RETRY_ATTEMPTS), false).unwrap();
    assert_eq!(runtime.retry.max_attempts, 5);
    assert!(RuntimeConfig::from_cli(&run_args(0), false).is_ok());
}

// ── Amounts ─────────────────────────────────────────────────────────

#[test]
fn parses_indexer_amounts() {
    assert_eq!(
        parse_amount("5000000000000000000000").unwrap(),
        tokens_to_wei(5_000)
    );
    assert_eq!(parse_amount(" 42 ").unwrap(), U256::from(42u64));
    assert!(parse_amount("1.5").is_err());
}

#[test]
fn formats_token_amounts() {
    assert_eq!(format_tokens(U256::ZERO), "0");
    assert_eq!(format_tokens(tokens_to_wei(1_234)), "1,234");
    assert_eq!(format_tokens(tokens_to_wei(1_234_567)), "1,234,567");
    assert_eq!(
        format_tokens(tokens_to_wei(1_234) + WEI_PER_TOKEN / U256::from(2u64)),
        "1,234.50"
    );
    assert_eq!(
        format_tokens(WEI_PER_TOKEN / U256::from(20u64)),
        "0.05"
    );
}

#[test]
fn clock_before_epoch_reads_as_zero() {
    assert_eq!(unix_seconds(1_700_000_000), 1_700_000_000);
    assert_eq!(unix_seconds(0), 0);
    assert_eq!(unix_seconds(-5), 0);
    assert_eq!(unix_seconds(i64::MIN), 0);
}

#[test]
fn actions_describe_themselves() {
    let stake = Action::Stake {
        pool: addr(0x12),
        amount: tokens_to_wei(1_500),
        target: tokens_to_wei(1_500),
        current: U256::ZERO,
    };
    let unstake = Action::Unstake {
        pool: addr(0x12),
        amount: tokens_to_wei(200),
        target: tokens_to_wei(800),
        current: tokens_to_wei(1_000),
        pays_queue: true,
    };

    assert_eq!(stake.describe(), "Stake 1,500 DATA → 0x1212...1212");
    assert_eq!(
        unstake.to_string(),
        "Unstake 200 DATA ← 0x1212...1212, leaving 800 (undelegation queue)"
    );

    let json = serde_json::to_value(&unstake).unwrap();
    assert_eq!(json["type"], "unstake");
    assert_eq!(json["amount"], "200000000000000000000");
    assert_eq!(json["pays_queue"], true);
}

// ── Run state ───────────────────────────────────────────────────────

#[test]
fn run_state_survives_restart() {
    let path = std::env::temp_dir().join(format!("autostaker-state-{}.json", std::process::id()));
    std::fs::remove_file(&path).ok();

    let fresh = RunState::load_or_new(&path).unwrap();
    assert_eq!(fresh.cycles, 0);
    assert!(fresh.last_outcome.is_none());

    let state = RunState {
        last_collect: 100,
        last_cycle: 200,
        cycles: 3,
        last_outcome: Some(RunOutcome::PartialSuccess),
    };
    state.save(&path).unwrap();
    let loaded = RunState::load_or_new(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded.last_collect, 100);
    assert_eq!(loaded.last_cycle, 200);
    assert_eq!(loaded.cycles, 3);
    assert_eq!(loaded.last_outcome, Some(RunOutcome::PartialSuccess));
}
