use std::collections::BTreeMap;

use alloy::primitives::U256;

use super::pool::PoolId;

/// An operator's current stakes, keyed by pool. Amounts are in wei.
///
/// A `BTreeMap` keeps iteration order fixed, which the action compiler
/// relies on for deterministic output.
pub type StakeMap = BTreeMap<PoolId, U256>;

/// Desired stake per pool for one cycle. Covers every currently staked pool
/// and every newly selected one; dropped pools carry an explicit zero.
pub type TargetAllocation = BTreeMap<PoolId, U256>;

/// Stake currently held in `pool`, zero when absent.
pub fn staked(stakes: &StakeMap, pool: &PoolId) -> U256 {
    stakes.get(pool).copied().unwrap_or(U256::ZERO)
}
