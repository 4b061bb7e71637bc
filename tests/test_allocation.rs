mod mock_chain;

use alloy::primitives::U256;

use autostaker::engine::allocation::{tie_break, total_stakeable};
use autostaker::engine::{compute_targets, live_candidates, AllocationInput};
use autostaker::model::{OperatorConfig, Pool, StakeMap, TargetAllocation};

use mock_chain::{addr, pool, stakes, wei, OPERATOR};

// ── Helpers ─────────────────────────────────────────────────────────

struct Setup {
    current: StakeMap,
    free: u64,
    queue: u64,
    min_stake: u64,
    max_pool_count: usize,
    candidates: Vec<Pool>,
}

impl Setup {
    fn new(candidates: Vec<Pool>) -> Self {
        Setup {
            current: StakeMap::new(),
            free: 0,
            queue: 0,
            min_stake: 100,
            max_pool_count: 20,
            candidates,
        }
    }

    fn targets(&self) -> TargetAllocation {
        compute_targets(&AllocationInput {
            operator: addr(OPERATOR),
            current_stakes: &self.current,
            free_balance: wei(self.free),
            candidates: &self.candidates,
            undelegation_queue: wei(self.queue),
            min_stake_per_pool: wei(self.min_stake),
            max_pool_count: self.max_pool_count,
        })
    }
}

fn total(targets: &TargetAllocation) -> U256 {
    targets.values().fold(U256::ZERO, |acc, a| acc + *a)
}

// ── Target computation ──────────────────────────────────────────────

#[test]
fn single_pool_receives_all_free_funds() {
    let mut s = Setup::new(vec![pool(1, 10)]);
    s.free = 1000;

    let targets = s.targets();

    assert_eq!(targets.len(), 1);
    assert_eq!(targets[&addr(1)], wei(1000));
}

#[test]
fn surplus_above_minimum_split_by_payout_rate() {
    let mut s = Setup::new(vec![pool(1, 1), pool(2, 3)]);
    s.free = 1000;

    let targets = s.targets();

    // 200 reserved as minimums, the other 800 split 1:3
    assert_eq!(targets[&addr(1)], wei(300));
    assert_eq!(targets[&addr(2)], wei(700));
}

#[test]
fn rounding_remainder_stays_unallocated() {
    let mut s = Setup::new(vec![pool(1, 1), pool(2, 1), pool(3, 1)]);
    s.free = 1000;
    s.min_stake = 0;

    let targets = s.targets();

    for n in 1..=3 {
        assert_eq!(targets[&addr(n)], wei(333));
    }
    assert_eq!(total(&targets), wei(999));
}

#[test]
fn zero_payout_rates_get_minimum_only() {
    let mut s = Setup::new(vec![pool(1, 0), pool(2, 0)]);
    s.free = 1000;

    let targets = s.targets();

    assert_eq!(targets[&addr(1)], wei(100));
    assert_eq!(targets[&addr(2)], wei(100));
}

#[test]
fn selection_limited_by_affordable_minimums() {
    let mut s = Setup::new(vec![
        pool(1, 5),
        pool(2, 50),
        pool(3, 10),
        pool(4, 40),
        pool(5, 1),
    ]);
    s.free = 250;

    let targets = s.targets();

    // 250 / 100 = 2 pools: the two best paying
    assert_eq!(targets.len(), 2);
    assert!(targets.contains_key(&addr(2)));
    assert!(targets.contains_key(&addr(4)));
    assert!(total(&targets) <= wei(250));
}

#[test]
fn selection_limited_by_max_pool_count() {
    let mut s = Setup::new(vec![pool(1, 1), pool(2, 2), pool(3, 3)]);
    s.free = 10_000;
    s.max_pool_count = 1;

    let targets = s.targets();

    assert_eq!(targets.len(), 1);
    assert_eq!(targets[&addr(3)], wei(10_000));
}

#[test]
fn kept_pools_outrank_better_paying_new_ones() {
    let mut s = Setup::new(vec![pool(1, 1), pool(2, 100), pool(3, 50)]);
    s.current = stakes(&[(1, 200)]);
    s.max_pool_count = 2;

    let targets = s.targets();

    assert_eq!(targets.len(), 2);
    assert_eq!(targets[&addr(1)], wei(100));
    assert_eq!(targets[&addr(2)], wei(100));
    assert!(!targets.contains_key(&addr(3)));
}

#[test]
fn pools_missing_from_candidates_target_zero() {
    let mut s = Setup::new(vec![pool(1, 10)]);
    s.current = stakes(&[(1, 500), (9, 300)]);

    let targets = s.targets();

    assert_eq!(targets[&addr(9)], U256::ZERO);
    assert_eq!(targets[&addr(1)], wei(800));
}

#[test]
fn no_candidates_unwinds_everything() {
    let mut s = Setup::new(vec![]);
    s.current = stakes(&[(1, 500), (2, 700)]);
    s.free = 50;

    let targets = s.targets();

    assert_eq!(targets.len(), 2);
    assert!(targets.values().all(U256::is_zero));
}

#[test]
fn total_below_minimum_unwinds_everything() {
    let mut s = Setup::new(vec![pool(1, 10)]);
    s.current = stakes(&[(1, 50)]);

    let targets = s.targets();

    assert_eq!(targets[&addr(1)], U256::ZERO);
}

#[test]
fn queue_larger_than_holdings_leaves_nothing_stakeable() {
    let current = stakes(&[(1, 500)]);
    assert_eq!(total_stakeable(&current, wei(20), wei(10_000)), U256::ZERO);

    let mut s = Setup::new(vec![pool(1, 10)]);
    s.current = current;
    s.free = 20;
    s.queue = 10_000;

    let targets = s.targets();
    assert_eq!(targets[&addr(1)], U256::ZERO);
}

#[test]
fn queue_reduces_stakeable_total() {
    let mut s = Setup::new(vec![pool(1, 10)]);
    s.current = stakes(&[(1, 600)]);
    s.free = 400;
    s.queue = 300;

    let targets = s.targets();

    assert_eq!(targets[&addr(1)], wei(700));
}

// ── Tie-break ───────────────────────────────────────────────────────

#[test]
fn equal_rates_ordered_by_operator_hash() {
    let mut s = Setup::new(vec![pool(1, 10), pool(2, 10)]);
    s.free = 1000;
    s.max_pool_count = 1;

    let operator = addr(OPERATOR);
    let expected = if tie_break(operator, &addr(1)) < tie_break(operator, &addr(2)) {
        addr(1)
    } else {
        addr(2)
    };

    let first = s.targets();
    assert_eq!(first.len(), 1);
    assert_eq!(first[&expected], wei(1000));

    // candidate order does not matter
    s.candidates.reverse();
    assert_eq!(s.targets(), first);
}

#[test]
fn tie_break_depends_on_operator() {
    let a = tie_break(addr(1), &addr(7));
    let b = tie_break(addr(2), &addr(7));
    assert_ne!(a, b);
    assert_eq!(a, tie_break(addr(1), &addr(7)));
}

// ── Candidate filter ────────────────────────────────────────────────

#[test]
fn live_candidates_filters_ineligible_pools() {
    let now = 1_000;
    let config = OperatorConfig {
        max_acceptable_min_operator_count: 3,
        ..OperatorConfig::default()
    };

    let live = pool(1, 10);
    let drained = Pool {
        remaining_balance: U256::ZERO,
        ..pool(2, 10)
    };
    let insolvent = Pool {
        projected_insolvency: Some(now),
        ..pool(3, 10)
    };
    let full = Pool {
        operator_count: 5,
        max_operators: Some(5),
        ..pool(4, 10)
    };
    let demanding = Pool {
        min_operators: 4,
        ..pool(5, 10)
    };
    let locked_period = Pool {
        min_staking_period_secs: 86_400,
        ..pool(6, 10)
    };
    let full_but_joined = Pool {
        operator_count: 5,
        max_operators: Some(5),
        ..pool(7, 10)
    };

    let pools = vec![
        live,
        drained,
        insolvent,
        full,
        demanding,
        locked_period,
        full_but_joined,
    ];
    let current = stakes(&[(7, 100)]);

    let ids: Vec<_> = live_candidates(&pools, &current, &config, now)
        .iter()
        .map(|p| p.id)
        .collect();

    assert_eq!(ids, vec![addr(1), addr(7)]);
}

#[test]
fn future_insolvency_is_still_live() {
    let p = Pool {
        projected_insolvency: Some(2_000),
        ..pool(1, 10)
    };
    assert!(!p.is_expired(1_999));
    assert!(p.is_expired(2_000));
}
