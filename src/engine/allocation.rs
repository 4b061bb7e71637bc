use std::cmp::Ordering;

use alloy::primitives::{keccak256, Address, B256, U256};

use crate::model::amount::sum;
use crate::model::stake::staked;
use crate::model::{OperatorConfig, Pool, PoolId, StakeMap, TargetAllocation};

/// Inputs to the target computation. Everything is borrowed; the
/// computation is a pure function of these values.
pub struct AllocationInput<'a> {
    pub operator: Address,
    pub current_stakes: &'a StakeMap,
    pub free_balance: U256,
    /// Live candidates only (see [`live_candidates`]).
    pub candidates: &'a [Pool],
    pub undelegation_queue: U256,
    pub min_stake_per_pool: U256,
    pub max_pool_count: usize,
}

/// Filter indexer results down to sponsorships the operator may hold.
pub fn live_candidates(
    pools: &[Pool],
    current_stakes: &StakeMap,
    config: &OperatorConfig,
    now: u64,
) -> Vec<Pool> {
    pools
        .iter()
        .filter(|p| {
            let already_staked = !staked(current_stakes, &p.id).is_zero();
            p.is_live(now, already_staked, config.max_acceptable_min_operator_count)
        })
        .cloned()
        .collect()
}

/// Capital that may be spread over sponsorships this cycle.
///
/// Clamped at zero here, once: a queue larger than everything the operator
/// owns simply leaves nothing to stake.
pub fn total_stakeable(current_stakes: &StakeMap, free_balance: U256, queue: U256) -> U256 {
    (sum(current_stakes.values()) + free_balance).saturating_sub(queue)
}

/// Compute the per-pool target stakes.
///
/// Kept sponsorships (already staked) are always retained ahead of new
/// ones, new ones are ranked by payout rate with a per-operator hash as
/// the tie-break, and the stake beyond the per-pool minimum is split in
/// proportion to payout rate. Rounding remainders stay unallocated.
pub fn compute_targets(input: &AllocationInput<'_>) -> TargetAllocation {
    let total = total_stakeable(input.current_stakes, input.free_balance, input.undelegation_queue);
    let count = selection_count(input, total);

    let mut targets: TargetAllocation = input
        .current_stakes
        .keys()
        .map(|pool| (*pool, U256::ZERO))
        .collect();

    if count == 0 {
        return targets;
    }

    let (mut kept, mut potential): (Vec<&Pool>, Vec<&Pool>) = input
        .candidates
        .iter()
        .partition(|p| !staked(input.current_stakes, &p.id).is_zero());
    kept.sort_by(|a, b| rank(input.operator, a, b));
    potential.sort_by(|a, b| rank(input.operator, a, b));

    let selected: Vec<&Pool> = kept
        .into_iter()
        .chain(potential)
        .take(count)
        .collect();

    let min_stake = input.min_stake_per_pool;
    let reserved = min_stake * U256::from(selected.len());
    let proportional = total.saturating_sub(reserved);
    let rate_sum = sum(selected.iter().map(|p| &p.payout_per_second));

    for pool in &selected {
        let share = if rate_sum.is_zero() {
            U256::ZERO
        } else {
            proportional * pool.payout_per_second / rate_sum
        };
        targets.insert(pool.id, min_stake + share);
    }

    targets
}

/// `min(|candidates|, max_pool_count, floor(total / min_stake))`.
fn selection_count(input: &AllocationInput<'_>, total: U256) -> usize {
    let mut count = input.candidates.len().min(input.max_pool_count);
    if !input.min_stake_per_pool.is_zero() {
        let affordable = total / input.min_stake_per_pool;
        if affordable < U256::from(count) {
            count = affordable.to::<usize>();
        }
    }
    count
}

/// Ranking order: payout rate descending, then tie-break hash ascending.
fn rank(operator: Address, a: &Pool, b: &Pool) -> Ordering {
    b.payout_per_second
        .cmp(&a.payout_per_second)
        .then_with(|| tie_break(operator, &a.id).cmp(&tie_break(operator, &b.id)))
}

/// Stable per-operator tie-break: `keccak256(operator ++ pool)`.
///
/// Seeding by operator spreads operators over equally paying sponsorships
/// instead of having all of them pick the same one.
pub fn tie_break(operator: Address, pool: &PoolId) -> B256 {
    let mut buf = [0u8; 40];
    buf[..20].copy_from_slice(operator.as_slice());
    buf[20..].copy_from_slice(pool.as_slice());
    keccak256(buf)
}
