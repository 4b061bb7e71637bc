use std::collections::{BTreeSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{TxHash, U256};
use tracing::{debug, error, info, warn};

use super::errors::{classify, ErrorClass, ExecutionError};
use super::report::{ExecutionReport, FailedAction, SkippedAction, SucceededAction};
use crate::engine::plan_cycle;
use crate::ledger::{Ledger, LedgerError, StakingQuery};
use crate::model::amount::format_tokens;
use crate::model::{Action, OperatorConfig, PoolId};

/// Default `payOutQueue` iteration cap.
pub const DEFAULT_QUEUE_PAYOUT_ITERATIONS: u32 = 10;

/// Hard cap on recalculations per run.
pub const MAX_RETRY_ATTEMPTS: u32 = 5;

/// Bounded recalculation budget for one run.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: MAX_RETRY_ATTEMPTS,
            delay: Duration::from_secs(10),
        }
    }
}

/// Cooperative cancellation, checked between actions. A transaction that
/// is already submitted is always awaited to its receipt.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

enum Submission {
    Confirmed(Option<TxHash>),
    Skipped(String),
}

enum SubmitError {
    /// A pre-submission read failed; the run cannot continue safely.
    Read(LedgerError),
    /// The transaction itself failed.
    Write(LedgerError),
}

/// Drives a compiled plan against the ledger.
///
/// Actions run strictly in order. A retryable failure triggers a fresh
/// snapshot and a full re-plan; pools already acted on in this run are
/// removed from the new plan, which then replaces the remaining queue.
pub struct Orchestrator<'a> {
    ledger: &'a dyn Ledger,
    query: &'a dyn StakingQuery,
    config: &'a OperatorConfig,
    retry: RetryPolicy,
    cancel: CancelFlag,
    queue_payout_iterations: u32,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        ledger: &'a dyn Ledger,
        query: &'a dyn StakingQuery,
        config: &'a OperatorConfig,
    ) -> Self {
        Orchestrator {
            ledger,
            query,
            config,
            retry: RetryPolicy::default(),
            cancel: CancelFlag::default(),
            queue_payout_iterations: DEFAULT_QUEUE_PAYOUT_ITERATIONS,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_queue_payout_iterations(mut self, iterations: u32) -> Self {
        self.queue_payout_iterations = iterations;
        self
    }

    /// Execute `actions` and report what happened to each of them.
    pub async fn execute(&self, actions: Vec<Action>) -> ExecutionReport {
        let mut report = ExecutionReport::default();

        let queue_empty = match self.settle_queue().await {
            Ok(empty) => empty,
            Err(e) => {
                error!("queue check failed, aborting run: {e}");
                report.aborted = Some(e.to_string());
                report.not_attempted = actions;
                return report;
            }
        };

        let mut pending: VecDeque<Action> = actions.into();
        if !queue_empty && !pending.iter().any(Action::is_unstake) {
            fail_queued_stakes(&mut report, &mut pending);
            return report;
        }

        let mut acted: BTreeSet<PoolId> = BTreeSet::new();

        while let Some(action) = pending.pop_front() {
            if self.cancel.is_cancelled() {
                info!("run cancelled with {} actions left", pending.len() + 1);
                report.not_attempted.push(action);
                report.not_attempted.extend(pending.drain(..));
                report.aborted = Some(ExecutionError::Cancelled.to_string());
                break;
            }

            info!("submitting: {action}");
            match self.submit(&action).await {
                Ok(Submission::Confirmed(tx)) => {
                    acted.insert(action.pool());
                    if action.pays_queue() {
                        self.try_pay_out_queue().await;
                    }
                    report.succeeded.push(SucceededAction { action, tx });
                }
                Ok(Submission::Skipped(reason)) => {
                    info!("skipping {action}: {reason}");
                    acted.insert(action.pool());
                    report.skipped.push(SkippedAction { action, reason });
                }
                Err(SubmitError::Read(e)) => {
                    let e = ExecutionError::from(e);
                    error!("{action}: {e}, aborting run");
                    report.aborted = Some(e.to_string());
                    report.not_attempted.push(action);
                    report.not_attempted.extend(pending.drain(..));
                    break;
                }
                Err(SubmitError::Write(e)) => {
                    let class = classify(&e);
                    if class == ErrorClass::Retryable && report.retries < self.retry.max_attempts {
                        report.retries += 1;
                        warn!(
                            attempt = report.retries,
                            max = self.retry.max_attempts,
                            "{action} failed ({e}), recalculating in {:?}",
                            self.retry.delay
                        );
                        tokio::time::sleep(self.retry.delay).await;
                        match self.replan(&acted).await {
                            Ok(fresh) => {
                                debug!(
                                    replaced = pending.len() + 1,
                                    fresh = fresh.len(),
                                    "plan recalculated"
                                );
                                report.replaced.push(action);
                                report.replaced.extend(pending.drain(..));
                                pending = fresh.into();

                                // the queue may have grown while the plan was stale
                                match self.settle_queue().await {
                                    Ok(false) if !pending.iter().any(Action::is_unstake) => {
                                        fail_queued_stakes(&mut report, &mut pending);
                                        break;
                                    }
                                    Ok(_) => continue,
                                    Err(queue_err) => {
                                        error!("queue check failed, aborting run: {queue_err}");
                                        report.aborted = Some(queue_err.to_string());
                                        report.not_attempted.extend(pending.drain(..));
                                        break;
                                    }
                                }
                            }
                            Err(query_err) => {
                                error!("recalculation failed, aborting run: {query_err}");
                                report.failed.push(FailedAction {
                                    action,
                                    error: e.to_string(),
                                    class,
                                    retries: report.retries,
                                });
                                report.aborted = Some(query_err.to_string());
                                report.not_attempted.extend(pending.drain(..));
                                break;
                            }
                        }
                    }
                    error!("{action} failed: {e}");
                    report.failed.push(FailedAction {
                        action,
                        error: e.to_string(),
                        class,
                        retries: report.retries,
                    });
                }
            }
        }

        report
    }

    /// Best-effort queue payout before the plan runs. Returns whether the
    /// queue is empty afterwards. Payout failures are expected when there
    /// are no free funds and are only logged.
    async fn settle_queue(&self) -> Result<bool, ExecutionError> {
        if self.ledger.queue_is_empty().await? {
            return Ok(true);
        }
        self.try_pay_out_queue().await;
        Ok(self.ledger.queue_is_empty().await?)
    }

    async fn try_pay_out_queue(&self) {
        match self.ledger.pay_out_queue(self.queue_payout_iterations).await {
            Ok(_) => info!("undelegation queue payout sent"),
            Err(e) => warn!("undelegation queue payout failed: {e}"),
        }
    }

    async fn submit(&self, action: &Action) -> Result<Submission, SubmitError> {
        match action {
            Action::Stake { pool, amount, .. } => self
                .ledger
                .stake(*pool, *amount)
                .await
                .map(Submission::Confirmed)
                .map_err(SubmitError::Write),
            Action::Unstake { pool, target, .. } => {
                let on_chain = self
                    .ledger
                    .staked_into(*pool)
                    .await
                    .map_err(SubmitError::Read)?;
                let minimum = self
                    .ledger
                    .minimum_stake_of(*pool)
                    .await
                    .map_err(SubmitError::Read)?;
                let locked = self
                    .ledger
                    .locked_stake(*pool)
                    .await
                    .map_err(SubmitError::Read)?;

                let target = safe_unstake_target(*target, minimum, locked);
                if target >= on_chain {
                    return Ok(Submission::Skipped(format!(
                        "target {} is not below on-chain stake {}",
                        format_tokens(target),
                        format_tokens(on_chain)
                    )));
                }
                self.ledger
                    .reduce_stake_to(*pool, target)
                    .await
                    .map(Submission::Confirmed)
                    .map_err(SubmitError::Write)
            }
        }
    }

    async fn replan(&self, acted: &BTreeSet<PoolId>) -> Result<Vec<Action>, ExecutionError> {
        let snapshot = self.query.snapshot().await.map_err(ExecutionError::Query)?;
        let plan = plan_cycle(&snapshot, self.config);
        Ok(plan
            .actions
            .into_iter()
            .filter(|a| !acted.contains(&a.pool()))
            .collect())
    }
}

/// Record every queued stake as blocked by the outstanding undelegation
/// queue. Callers only use this when no unstake is queued.
fn fail_queued_stakes(report: &mut ExecutionReport, pending: &mut VecDeque<Action>) {
    let blocked = ExecutionError::QueueOutstanding.to_string();
    for action in pending.drain(..) {
        warn!("{action}: {blocked}");
        report.failed.push(FailedAction {
            action,
            error: blocked.clone(),
            class: ErrorClass::Fatal,
            retries: report.retries,
        });
    }
}

/// Clamp an unstake target to what the sponsorship currently allows:
/// locked stake cannot be withdrawn, and a non-zero stake may not fall
/// below the operator's minimum.
pub fn safe_unstake_target(target: U256, minimum: U256, locked: U256) -> U256 {
    let target = target.max(locked);
    if !target.is_zero() && target < minimum {
        minimum
    } else {
        target
    }
}
