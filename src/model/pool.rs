use alloy::primitives::{Address, U256};
use serde::Serialize;

use super::amount::ser_amount;

/// Pools are identified by their sponsorship contract address.
pub type PoolId = Address;

/// A reward-bearing sponsorship as seen by the indexer at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pool {
    pub id: PoolId,
    /// Total payout to all staked operators, wei per second.
    #[serde(serialize_with = "ser_amount")]
    pub payout_per_second: U256,
    pub operator_count: u32,
    /// `None` means the sponsorship accepts any number of operators.
    pub max_operators: Option<u32>,
    pub min_operators: u32,
    #[serde(serialize_with = "ser_amount")]
    pub remaining_balance: U256,
    /// Unix time at which the sponsorship runs out of funds, if known.
    pub projected_insolvency: Option<u64>,
    pub min_staking_period_secs: u64,
}

impl Pool {
    /// A sponsorship is expired once its funds are gone.
    pub fn is_expired(&self, now: u64) -> bool {
        self.remaining_balance.is_zero()
            || self.projected_insolvency.is_some_and(|t| t <= now)
    }

    /// True when another operator could still join.
    pub fn has_capacity(&self) -> bool {
        self.max_operators
            .is_none_or(|max| self.operator_count < max)
    }

    /// Liveness predicate used to build the candidate set.
    ///
    /// `already_staked` lifts the capacity check: a full sponsorship never
    /// pushes out an operator that is already in it.
    pub fn is_live(&self, now: u64, already_staked: bool, max_min_operator_count: u32) -> bool {
        !self.is_expired(now)
            && self.min_staking_period_secs == 0
            && (already_staked || self.has_capacity())
            && self.min_operators <= max_min_operator_count
    }
}
