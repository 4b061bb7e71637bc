use alloy::primitives::U256;

use crate::model::{Action, PoolId, StakeMap};

/// Result of trying to fund the undelegation queue from stake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Free balance already covers the queue.
    NotNeeded,
    /// The unstake frees the whole shortfall (plus buffer).
    Full(Action),
    /// The best pool can only cover part of the shortfall; run again next
    /// cycle to keep draining.
    Partial { action: Action, uncovered: U256 },
    /// No staked pool holds anything above the protocol minimum.
    CannotPay { shortfall: U256 },
}

impl DrainOutcome {
    pub fn action(&self) -> Option<&Action> {
        match self {
            DrainOutcome::Full(action) | DrainOutcome::Partial { action, .. } => Some(action),
            DrainOutcome::NotNeeded | DrainOutcome::CannotPay { .. } => None,
        }
    }
}

/// Pick one over-minimum pool to partially unstake so the undelegation
/// queue can be paid out.
///
/// The pool with the largest surplus (`stake - min_stake`) is chosen, first
/// pool id wins ties. A 1% buffer is added on top of the shortfall, capped
/// at the surplus.
pub fn drain_queue(
    current_stakes: &StakeMap,
    free_balance: U256,
    undelegation_queue: U256,
    min_stake_per_pool: U256,
) -> DrainOutcome {
    if free_balance >= undelegation_queue {
        return DrainOutcome::NotNeeded;
    }
    let shortfall = undelegation_queue - free_balance;

    let mut best: Option<(PoolId, U256, U256)> = None;
    for (pool, stake) in current_stakes {
        if *stake <= min_stake_per_pool {
            continue;
        }
        let surplus = *stake - min_stake_per_pool;
        if best.is_none_or(|(_, _, s)| surplus > s) {
            best = Some((*pool, *stake, surplus));
        }
    }

    let Some((pool, stake, surplus)) = best else {
        return DrainOutcome::CannotPay { shortfall };
    };

    let unstake = |amount: U256| Action::Unstake {
        pool,
        amount,
        target: stake - amount,
        current: stake,
        pays_queue: true,
    };

    if surplus >= shortfall {
        let buffered = shortfall + shortfall / U256::from(100u64);
        DrainOutcome::Full(unstake(buffered.min(surplus)))
    } else {
        DrainOutcome::Partial {
            action: unstake(surplus),
            uncovered: shortfall - surplus,
        }
    }
}
