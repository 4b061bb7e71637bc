use std::path::Path;

use thiserror::Error;

use crate::model::OperatorConfig;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("`max_pool_count` must be at least 1")]
    ZeroPoolCount,

    #[error("`min_transaction_amount` {value} is larger than the token supply allows")]
    MinTransactionTooLarge { value: u64 },

    #[error("`auto_collect.interval_secs` must be positive when auto-collect is enabled")]
    ZeroCollectInterval,
}

/// Upper bound on `min_transaction_amount` in whole tokens. The network's
/// total supply is far below this; anything larger is a unit mistake.
const MAX_MIN_TRANSACTION_TOKENS: u64 = 10_000_000_000;

/// Load and fully validate an operator config from a JSON file.
pub fn load_and_validate(path: &Path) -> Result<OperatorConfig, Vec<ValidationError>> {
    let contents = std::fs::read_to_string(path).map_err(|e| vec![ValidationError::Io(e)])?;
    let config: OperatorConfig =
        serde_json::from_str(&contents).map_err(|e| vec![ValidationError::Json(e)])?;
    validate(&config)?;
    Ok(config)
}

/// Validate a config, collecting all errors.
pub fn validate(config: &OperatorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.max_pool_count == 0 {
        errors.push(ValidationError::ZeroPoolCount);
    }
    if config.min_transaction_amount > MAX_MIN_TRANSACTION_TOKENS {
        errors.push(ValidationError::MinTransactionTooLarge {
            value: config.min_transaction_amount,
        });
    }
    if config.auto_collect.enabled && config.auto_collect.interval_secs == 0 {
        errors.push(ValidationError::ZeroCollectInterval);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Load a config or fail with every validation error in the message.
pub fn load_or_bail(path: &Path) -> anyhow::Result<OperatorConfig> {
    load_and_validate(path).map_err(|errors| {
        let msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        anyhow::anyhow!("Config validation failed:\n  {}", msgs.join("\n  "))
    })
}

/// CLI entry point for the `validate` subcommand.
pub fn run(path: &Path) -> anyhow::Result<()> {
    match load_and_validate(path) {
        Ok(config) => {
            println!(
                "Config is valid. max_pool_count={}, min_transaction_amount={}, auto_collect={}.",
                config.max_pool_count,
                config.min_transaction_amount,
                config.auto_collect.enabled
            );
            Ok(())
        }
        Err(errors) => {
            eprintln!("Validation failed with {} error(s):", errors.len());
            for (i, e) in errors.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, e);
            }
            std::process::exit(1);
        }
    }
}
