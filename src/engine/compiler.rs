use std::collections::BTreeSet;

use alloy::primitives::U256;

use crate::model::stake::staked;
use crate::model::{Action, PoolId, StakeMap, TargetAllocation};

/// Inputs to the action compiler.
pub struct CompileInput<'a> {
    pub current_stakes: &'a StakeMap,
    pub targets: &'a TargetAllocation,
    /// Ids of sponsorships that passed the liveness filter this cycle.
    /// Staked pools missing from this set are expired.
    pub live_pools: &'a BTreeSet<PoolId>,
    pub free_balance: U256,
    pub undelegation_queue: U256,
    pub min_transaction_amount: U256,
    pub min_stake_per_pool: U256,
}

/// Signed stake change for one pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Adjustment {
    Increase(U256),
    Decrease(U256),
}

impl Adjustment {
    fn magnitude(&self) -> U256 {
        match self {
            Adjustment::Increase(a) | Adjustment::Decrease(a) => *a,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Delta {
    pool: PoolId,
    current: U256,
    adjustment: Adjustment,
}

/// Turn current → target differences into an ordered action list.
///
/// The plan never stakes more than is, or will be, available: when the
/// stakes exceed what the unstakes plus free balance (minus the queue)
/// provide, stake actions are trimmed, and if trimming cannot cover the
/// excess the smallest stake is dropped and the check repeats.
///
/// Unstakes come first, then stakes; within each group pool-id order.
pub fn compile_actions(input: &CompileInput<'_>) -> Vec<Action> {
    let mut deltas: Vec<Delta> = input
        .targets
        .iter()
        .filter_map(|(pool, target)| {
            let current = staked(input.current_stakes, pool);
            let adjustment = if *target > current {
                Adjustment::Increase(*target - current)
            } else if *target < current {
                Adjustment::Decrease(current - *target)
            } else {
                return None;
            };
            Some(Delta {
                pool: *pool,
                current,
                adjustment,
            })
        })
        .filter(|d| {
            let expired = !input.live_pools.contains(&d.pool);
            expired || d.adjustment.magnitude() >= input.min_transaction_amount
        })
        .collect();

    reduce_excess(&mut deltas, input);

    let (unstakes, stakes): (Vec<Action>, Vec<Action>) = deltas
        .iter()
        .filter_map(to_action)
        .partition(Action::is_unstake);

    unstakes.into_iter().chain(stakes).collect()
}

/// Capital that stake actions may draw on: freed stake plus free balance,
/// less what the undelegation queue is owed.
fn available_sum(deltas: &[Delta], input: &CompileInput<'_>) -> U256 {
    let freed = deltas
        .iter()
        .filter_map(|d| match d.adjustment {
            Adjustment::Decrease(a) => Some(a),
            Adjustment::Increase(_) => None,
        })
        .fold(U256::ZERO, |acc, a| acc + a);
    (freed + input.free_balance).saturating_sub(input.undelegation_queue)
}

fn staking_sum(deltas: &[Delta]) -> U256 {
    deltas
        .iter()
        .filter_map(|d| match d.adjustment {
            Adjustment::Increase(a) => Some(a),
            Adjustment::Decrease(_) => None,
        })
        .fold(U256::ZERO, |acc, a| acc + a)
}

/// How far a stake increase may shrink while staying a worthwhile
/// transaction and, for a new pool, reaching the protocol minimum.
fn reduction_allowance(delta: &Delta, input: &CompileInput<'_>) -> U256 {
    let Adjustment::Increase(amount) = delta.adjustment else {
        return U256::ZERO;
    };
    let floor_for_pool = if delta.current.is_zero() {
        input.min_stake_per_pool
    } else {
        U256::ZERO
    };
    amount.saturating_sub(input.min_transaction_amount.max(floor_for_pool))
}

fn reduce_excess(deltas: &mut Vec<Delta>, input: &CompileInput<'_>) {
    loop {
        let staking = staking_sum(deltas);
        let available = available_sum(deltas, input);
        if staking <= available {
            return;
        }
        let excess = staking - available;

        let total_allowance = deltas
            .iter()
            .map(|d| reduction_allowance(d, input))
            .fold(U256::ZERO, |acc, a| acc + a);

        if total_allowance < excess {
            let smallest = deltas
                .iter()
                .enumerate()
                .filter(|(_, d)| matches!(d.adjustment, Adjustment::Increase(_)))
                .min_by_key(|(_, d)| d.adjustment.magnitude())
                .map(|(i, _)| i);
            match smallest {
                Some(i) => {
                    deltas.remove(i);
                    continue;
                }
                None => return,
            }
        }

        let mut remaining = excess;
        for delta in deltas.iter_mut() {
            if remaining.is_zero() {
                break;
            }
            let allowance = reduction_allowance(delta, input);
            if allowance.is_zero() {
                continue;
            }
            let cut = allowance.min(remaining);
            if let Adjustment::Increase(amount) = delta.adjustment {
                delta.adjustment = Adjustment::Increase(amount - cut);
            }
            remaining -= cut;
        }
        return;
    }
}

fn to_action(delta: &Delta) -> Option<Action> {
    match delta.adjustment {
        Adjustment::Increase(amount) if !amount.is_zero() => Some(Action::Stake {
            pool: delta.pool,
            amount,
            target: delta.current + amount,
            current: delta.current,
        }),
        Adjustment::Decrease(amount) => {
            // never ask for more than the known stake
            let amount = amount.min(delta.current);
            if amount.is_zero() {
                return None;
            }
            Some(Action::Unstake {
                pool: delta.pool,
                amount,
                target: delta.current - amount,
                current: delta.current,
                pays_queue: false,
            })
        }
        Adjustment::Increase(_) => None,
    }
}
