use std::fmt;

use alloy::primitives::U256;
use serde::Serialize;

use super::amount::{format_tokens, ser_amount};
use super::pool::PoolId;
use crate::ledger::evm;

/// A single stake or unstake instruction. Actions are the only unit of
/// mutation ever sent to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Add `amount` to the stake in `pool`.
    Stake {
        pool: PoolId,
        #[serde(serialize_with = "ser_amount")]
        amount: U256,
        /// Stake after the action lands (`current + amount`).
        #[serde(serialize_with = "ser_amount")]
        target: U256,
        #[serde(serialize_with = "ser_amount")]
        current: U256,
    },
    /// Reduce the stake in `pool` down to `target`.
    Unstake {
        pool: PoolId,
        #[serde(serialize_with = "ser_amount")]
        amount: U256,
        #[serde(serialize_with = "ser_amount")]
        target: U256,
        #[serde(serialize_with = "ser_amount")]
        current: U256,
        /// Set when the freed funds are meant for the undelegation queue.
        pays_queue: bool,
    },
}

impl Action {
    pub fn pool(&self) -> PoolId {
        match self {
            Action::Stake { pool, .. } | Action::Unstake { pool, .. } => *pool,
        }
    }

    pub fn amount(&self) -> U256 {
        match self {
            Action::Stake { amount, .. } | Action::Unstake { amount, .. } => *amount,
        }
    }

    pub fn target(&self) -> U256 {
        match self {
            Action::Stake { target, .. } | Action::Unstake { target, .. } => *target,
        }
    }

    pub fn current(&self) -> U256 {
        match self {
            Action::Stake { current, .. } | Action::Unstake { current, .. } => *current,
        }
    }

    pub fn is_stake(&self) -> bool {
        matches!(self, Action::Stake { .. })
    }

    pub fn is_unstake(&self) -> bool {
        matches!(self, Action::Unstake { .. })
    }

    pub fn pays_queue(&self) -> bool {
        matches!(self, Action::Unstake { pays_queue: true, .. })
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Action::Stake { .. } => "Stake",
            Action::Unstake { .. } => "Unstake",
        }
    }

    /// One-line description, e.g. `Stake 1,234 DATA → 0x12ab...cdef`.
    pub fn describe(&self) -> String {
        let pool = evm::short_addr(&self.pool());
        match self {
            Action::Stake { amount, .. } => {
                format!("Stake {} DATA → {pool}", format_tokens(*amount))
            }
            Action::Unstake {
                amount,
                target,
                pays_queue,
                ..
            } => {
                let suffix = if *pays_queue { " (undelegation queue)" } else { "" };
                format!(
                    "Unstake {} DATA ← {pool}, leaving {}{suffix}",
                    format_tokens(*amount),
                    format_tokens(*target),
                )
            }
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}
