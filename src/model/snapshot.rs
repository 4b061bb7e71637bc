use alloy::primitives::{Address, U256};
use serde::Serialize;

use super::amount::{ser_amount, sum};
use super::pool::Pool;
use super::stake::StakeMap;

/// Everything the engine needs to know about one operator, read from the
/// query adapter at a single point in time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorSnapshot {
    pub operator: Address,
    #[serde(serialize_with = "ser_stakes")]
    pub stakes: StakeMap,
    #[serde(serialize_with = "ser_amount")]
    pub free_balance: U256,
    /// Every sponsorship the indexer returned, before liveness filtering.
    pub pools: Vec<Pool>,
    #[serde(serialize_with = "ser_amount")]
    pub undelegation_queue: U256,
    /// Protocol-wide minimum stake per sponsorship.
    #[serde(serialize_with = "ser_amount")]
    pub min_stake_per_pool: U256,
    /// Unix time the snapshot was taken.
    pub timestamp: u64,
}

impl OperatorSnapshot {
    /// Total operator value: staked plus free.
    pub fn total_value(&self) -> U256 {
        sum(self.stakes.values()) + self.free_balance
    }
}

fn ser_stakes<S>(stakes: &StakeMap, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use serde::ser::SerializeMap;
    let mut map = serializer.serialize_map(Some(stakes.len()))?;
    for (pool, amount) in stakes {
        map.serialize_entry(&pool.to_string(), &amount.to_string())?;
    }
    map.end()
}
