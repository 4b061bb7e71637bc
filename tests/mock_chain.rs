#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;

use autostaker::ledger::{Ledger, LedgerError, StakingQuery};
use autostaker::model::{OperatorSnapshot, Pool, PoolId, StakeMap};

// ── Helpers ─────────────────────────────────────────────────────────

pub fn addr(n: u8) -> Address {
    Address::repeat_byte(n)
}

pub fn wei(n: u64) -> U256 {
    U256::from(n)
}

/// A live pool with unlimited capacity and the given payout rate.
pub fn pool(n: u8, rate: u64) -> Pool {
    Pool {
        id: addr(n),
        payout_per_second: wei(rate),
        operator_count: 1,
        max_operators: None,
        min_operators: 0,
        remaining_balance: wei(1_000_000),
        projected_insolvency: None,
        min_staking_period_secs: 0,
    }
}

pub fn stakes(entries: &[(u8, u64)]) -> StakeMap {
    entries.iter().map(|(n, a)| (addr(*n), wei(*a))).collect()
}

pub const OPERATOR: u8 = 0xAA;

// ── Mock chain ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub enum FailKind {
    /// Generic revert, classified retryable.
    Revert,
    /// Unrecognised RPC error, classified fatal.
    Fatal,
}

impl FailKind {
    fn error(self, call: &str) -> LedgerError {
        match self {
            FailKind::Revert => LedgerError::Reverted {
                call: call.into(),
                reason: "execution reverted".into(),
            },
            FailKind::Fatal => LedgerError::Rpc {
                call: call.into(),
                message: "invalid signature".into(),
            },
        }
    }
}

pub struct ChainState {
    pub stakes: StakeMap,
    pub free: U256,
    pub queue: U256,
    pub pools: Vec<Pool>,
    pub min_stake: U256,
    pub locked: BTreeMap<PoolId, U256>,
    pub timestamp: u64,
    /// Stake calls to fail, per pool, before succeeding again.
    pub stake_failures: BTreeMap<PoolId, (u32, FailKind)>,
    /// Added to the undelegation queue by every failed stake call
    /// (delegators leaving while a transaction is in flight).
    pub queue_on_stake_failure: U256,
    pub fail_reads: bool,
    /// When set, the query adapter keeps returning this snapshot
    /// (an indexer that lags behind the chain).
    pub frozen_snapshot: Option<OperatorSnapshot>,
    pub calls: Vec<String>,
    tx_counter: u64,
}

/// In-memory operator contract + indexer with real balance accounting:
/// staking moves free funds into a pool, unstaking moves them back, and
/// a queue payout spends free funds on the undelegation queue.
pub struct MockChain {
    pub state: Mutex<ChainState>,
}

impl MockChain {
    pub fn new(free: u64, min_stake: u64, pools: Vec<Pool>) -> Self {
        MockChain {
            state: Mutex::new(ChainState {
                stakes: StakeMap::new(),
                free: wei(free),
                queue: U256::ZERO,
                pools,
                min_stake: wei(min_stake),
                locked: BTreeMap::new(),
                timestamp: 1_700_000_000,
                stake_failures: BTreeMap::new(),
                queue_on_stake_failure: U256::ZERO,
                fail_reads: false,
                frozen_snapshot: None,
                calls: Vec::new(),
                tx_counter: 0,
            }),
        }
    }

    pub fn with_stakes(self, entries: &[(u8, u64)]) -> Self {
        self.state.lock().unwrap().stakes = stakes(entries);
        self
    }

    pub fn with_queue(self, queue: u64) -> Self {
        self.state.lock().unwrap().queue = wei(queue);
        self
    }

    pub fn fail_stake(&self, pool: u8, times: u32, kind: FailKind) {
        self.state
            .lock()
            .unwrap()
            .stake_failures
            .insert(addr(pool), (times, kind));
    }

    pub fn grow_queue_on_stake_failure(&self, amount: u64) {
        self.state.lock().unwrap().queue_on_stake_failure = wei(amount);
    }

    pub fn staked(&self, pool: u8) -> U256 {
        let s = self.state.lock().unwrap();
        s.stakes.get(&addr(pool)).copied().unwrap_or(U256::ZERO)
    }

    pub fn free(&self) -> U256 {
        self.state.lock().unwrap().free
    }

    pub fn queue(&self) -> U256 {
        self.state.lock().unwrap().queue
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn current_snapshot(&self) -> OperatorSnapshot {
        let s = self.state.lock().unwrap();
        OperatorSnapshot {
            operator: addr(OPERATOR),
            stakes: s.stakes.clone(),
            free_balance: s.free,
            pools: s.pools.clone(),
            undelegation_queue: s.queue,
            min_stake_per_pool: s.min_stake,
            timestamp: s.timestamp,
        }
    }

    pub fn freeze_snapshot(&self) {
        let snapshot = self.current_snapshot();
        self.state.lock().unwrap().frozen_snapshot = Some(snapshot);
    }
}

impl ChainState {
    fn next_tx(&mut self) -> TxHash {
        self.tx_counter += 1;
        TxHash::with_last_byte(self.tx_counter as u8)
    }

    fn read_guard(&self, call: &str) -> Result<(), LedgerError> {
        if self.fail_reads {
            return Err(LedgerError::Rpc {
                call: call.into(),
                message: "connection refused".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Ledger for MockChain {
    async fn stake(&self, pool: PoolId, amount: U256) -> Result<Option<TxHash>, LedgerError> {
        let mut s = self.state.lock().unwrap();
        s.calls.push(format!("stake {pool} {amount}"));
        let failure = match s.stake_failures.get_mut(&pool) {
            Some((remaining, kind)) if *remaining > 0 => {
                *remaining -= 1;
                Some(kind.error("stake"))
            }
            _ => None,
        };
        if let Some(e) = failure {
            let grown = s.queue_on_stake_failure;
            s.queue += grown;
            return Err(e);
        }
        if s.free < amount {
            return Err(LedgerError::Reverted {
                call: "stake".into(),
                reason: "insufficient balance".into(),
            });
        }
        s.free -= amount;
        *s.stakes.entry(pool).or_insert(U256::ZERO) += amount;
        Ok(Some(s.next_tx()))
    }

    async fn reduce_stake_to(
        &self,
        pool: PoolId,
        target: U256,
    ) -> Result<Option<TxHash>, LedgerError> {
        let mut s = self.state.lock().unwrap();
        s.calls.push(format!("reduceStakeTo {pool} {target}"));
        let current = s.stakes.get(&pool).copied().unwrap_or(U256::ZERO);
        if target >= current {
            return Err(LedgerError::Reverted {
                call: "reduceStakeTo".into(),
                reason: "target not below current stake".into(),
            });
        }
        s.free += current - target;
        if target.is_zero() {
            s.stakes.remove(&pool);
        } else {
            s.stakes.insert(pool, target);
        }
        Ok(Some(s.next_tx()))
    }

    async fn pay_out_queue(&self, _max_iterations: u32) -> Result<Option<TxHash>, LedgerError> {
        let mut s = self.state.lock().unwrap();
        s.calls.push("payOutQueue".into());
        if s.free.is_zero() {
            return Err(LedgerError::Reverted {
                call: "payOutQueue".into(),
                reason: "no free funds".into(),
            });
        }
        let paid = s.free.min(s.queue);
        s.free -= paid;
        s.queue -= paid;
        Ok(Some(s.next_tx()))
    }

    async fn withdraw_earnings(&self, pools: &[PoolId]) -> Result<Option<TxHash>, LedgerError> {
        let mut s = self.state.lock().unwrap();
        s.calls.push(format!("withdrawEarnings {}", pools.len()));
        Ok(Some(s.next_tx()))
    }

    async fn staked_into(&self, pool: PoolId) -> Result<U256, LedgerError> {
        let s = self.state.lock().unwrap();
        s.read_guard("stakedInto")?;
        Ok(s.stakes.get(&pool).copied().unwrap_or(U256::ZERO))
    }

    async fn minimum_stake_of(&self, _pool: PoolId) -> Result<U256, LedgerError> {
        let s = self.state.lock().unwrap();
        s.read_guard("minimumStakeOf")?;
        Ok(s.min_stake)
    }

    async fn locked_stake(&self, pool: PoolId) -> Result<U256, LedgerError> {
        let s = self.state.lock().unwrap();
        s.read_guard("lockedStakeWei")?;
        Ok(s.locked.get(&pool).copied().unwrap_or(U256::ZERO))
    }

    async fn queue_is_empty(&self) -> Result<bool, LedgerError> {
        let s = self.state.lock().unwrap();
        s.read_guard("queueIsEmpty")?;
        Ok(s.queue.is_zero())
    }
}

#[async_trait]
impl StakingQuery for MockChain {
    async fn snapshot(&self) -> anyhow::Result<OperatorSnapshot> {
        if self.state.lock().unwrap().fail_reads {
            anyhow::bail!("subgraph unreachable");
        }
        if let Some(frozen) = self.state.lock().unwrap().frozen_snapshot.clone() {
            return Ok(frozen);
        }
        Ok(self.current_snapshot())
    }
}
