use alloy::primitives::U256;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::amount::tokens_to_wei;

/// Per-operator autostaking settings.
///
/// Read once at the start of every cycle and never written by the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OperatorConfig {
    /// Maximum number of sponsorships to hold at the same time.
    #[serde(default = "default_max_pool_count")]
    pub max_pool_count: usize,

    /// Smallest stake change worth a transaction, in whole tokens.
    /// Smaller adjustments are skipped unless the sponsorship has expired.
    #[serde(default = "default_min_transaction_amount")]
    pub min_transaction_amount: u64,

    /// Sponsorships whose `minOperators` exceeds this are never joined.
    #[serde(default = "default_max_acceptable_min_operator_count")]
    pub max_acceptable_min_operator_count: u32,

    /// Periodic withdrawal of earnings from staked sponsorships.
    #[serde(default)]
    pub auto_collect: AutoCollectConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AutoCollectConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Seconds between collections. Default: one day.
    #[serde(default = "default_collect_interval")]
    pub interval_secs: u64,
}

impl OperatorConfig {
    /// `min_transaction_amount` converted to wei.
    pub fn min_transaction_wei(&self) -> U256 {
        tokens_to_wei(self.min_transaction_amount)
    }
}

impl Default for OperatorConfig {
    fn default() -> Self {
        OperatorConfig {
            max_pool_count: default_max_pool_count(),
            min_transaction_amount: default_min_transaction_amount(),
            max_acceptable_min_operator_count: default_max_acceptable_min_operator_count(),
            auto_collect: AutoCollectConfig::default(),
        }
    }
}

impl Default for AutoCollectConfig {
    fn default() -> Self {
        AutoCollectConfig {
            enabled: false,
            interval_secs: default_collect_interval(),
        }
    }
}

fn default_max_pool_count() -> usize {
    20
}
fn default_min_transaction_amount() -> u64 {
    1000
}
fn default_max_acceptable_min_operator_count() -> u32 {
    100
}
fn default_collect_interval() -> u64 {
    86_400
}
