pub mod evm;
pub mod operator;
pub mod subgraph;

use std::time::Duration;

use alloy::primitives::{TxHash, U256};
use async_trait::async_trait;
use thiserror::Error;

use crate::model::{OperatorSnapshot, PoolId};

pub use operator::OperatorContract;
pub use subgraph::SubgraphQuery;

// ── Errors ──────────────────────────────────────────────────────────

/// Failure of a single ledger call.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The transaction was mined but reverted, or gas estimation hit a revert.
    #[error("{call} reverted: {reason}")]
    Reverted { call: String, reason: String },

    /// The RPC node or signer refused the call.
    #[error("{call} failed: {message}")]
    Rpc { call: String, message: String },

    /// The transaction was sent but no receipt arrived in time.
    #[error("{call} not confirmed within {timeout:?}")]
    Timeout { call: String, timeout: Duration },

    /// The agent refused to submit the call.
    #[error("{0}")]
    Rejected(String),
}

impl LedgerError {
    pub fn rpc(call: &str, err: impl std::fmt::Display) -> Self {
        LedgerError::Rpc {
            call: call.to_string(),
            message: format!("{err:#}"),
        }
    }
}

// ── Ledger (transactions + per-sponsorship reads) ───────────────────

/// Transaction-signing interface to the operator contract.
///
/// Mutating calls resolve only once the transaction is confirmed and return
/// its hash, or `None` when nothing was sent (dry run).
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn stake(&self, pool: PoolId, amount: U256) -> Result<Option<TxHash>, LedgerError>;

    async fn reduce_stake_to(
        &self,
        pool: PoolId,
        target: U256,
    ) -> Result<Option<TxHash>, LedgerError>;

    async fn pay_out_queue(&self, max_iterations: u32) -> Result<Option<TxHash>, LedgerError>;

    async fn withdraw_earnings(&self, pools: &[PoolId]) -> Result<Option<TxHash>, LedgerError>;

    /// Operator's current on-chain stake in `pool`.
    async fn staked_into(&self, pool: PoolId) -> Result<U256, LedgerError>;

    /// Smallest stake the sponsorship allows the operator to keep.
    async fn minimum_stake_of(&self, pool: PoolId) -> Result<U256, LedgerError>;

    /// Stake locked by pending flags, which cannot be withdrawn.
    async fn locked_stake(&self, pool: PoolId) -> Result<U256, LedgerError>;

    async fn queue_is_empty(&self) -> Result<bool, LedgerError>;
}

// ── Query adapter ───────────────────────────────────────────────────

/// Point-in-time read of everything the planner needs.
#[async_trait]
pub trait StakingQuery: Send + Sync {
    async fn snapshot(&self) -> anyhow::Result<OperatorSnapshot>;
}
