pub mod allocation;
pub mod compiler;
pub mod drain;

use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::{Action, OperatorConfig, OperatorSnapshot, TargetAllocation};

pub use allocation::{compute_targets, live_candidates, AllocationInput};
pub use compiler::{compile_actions, CompileInput};
pub use drain::{drain_queue, DrainOutcome};

/// Which path produced a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanKind {
    /// Free balance cannot cover the undelegation queue; the plan is at
    /// most one unstake that frees funds for it.
    Drain,
    /// Normal target allocation and action compilation.
    Rebalance,
}

/// Output of one planning pass.
#[derive(Debug, Clone)]
pub struct CyclePlan {
    pub kind: PlanKind,
    pub actions: Vec<Action>,
    /// Targets computed by the rebalance path (empty for a drain).
    pub targets: TargetAllocation,
    /// Set on the drain path.
    pub drain: Option<DrainOutcome>,
}

impl CyclePlan {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Plan one cycle from a snapshot.
///
/// Pure: no I/O, and identical inputs always yield identical plans. The
/// execution orchestrator calls this again on fresh snapshots when it
/// recalculates after a stale-state failure.
pub fn plan_cycle(snapshot: &OperatorSnapshot, config: &OperatorConfig) -> CyclePlan {
    if snapshot.free_balance < snapshot.undelegation_queue {
        let outcome = drain_queue(
            &snapshot.stakes,
            snapshot.free_balance,
            snapshot.undelegation_queue,
            snapshot.min_stake_per_pool,
        );
        return CyclePlan {
            kind: PlanKind::Drain,
            actions: outcome.action().cloned().into_iter().collect(),
            targets: TargetAllocation::new(),
            drain: Some(outcome),
        };
    }

    let candidates = live_candidates(&snapshot.pools, &snapshot.stakes, config, snapshot.timestamp);
    let live_pools: BTreeSet<_> = candidates.iter().map(|p| p.id).collect();

    let targets = compute_targets(&AllocationInput {
        operator: snapshot.operator,
        current_stakes: &snapshot.stakes,
        free_balance: snapshot.free_balance,
        candidates: &candidates,
        undelegation_queue: snapshot.undelegation_queue,
        min_stake_per_pool: snapshot.min_stake_per_pool,
        max_pool_count: config.max_pool_count,
    });

    let actions = compile_actions(&CompileInput {
        current_stakes: &snapshot.stakes,
        targets: &targets,
        live_pools: &live_pools,
        free_balance: snapshot.free_balance,
        undelegation_queue: snapshot.undelegation_queue,
        min_transaction_amount: config.min_transaction_wei(),
        min_stake_per_pool: snapshot.min_stake_per_pool,
    });

    CyclePlan {
        kind: PlanKind::Rebalance,
        actions,
        targets,
        drain: None,
    }
}
