use std::time::Duration;

use alloy::network::Ethereum;
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::PendingTransactionBuilder;
use alloy::sol;
use async_trait::async_trait;
use tracing::info;

use super::evm;
use super::{Ledger, LedgerError};
use crate::model::amount::format_tokens;
use crate::model::PoolId;

// ── Contract interfaces ─────────────────────────────────────────────

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IOperator {
        function stake(address sponsorship, uint256 amountWei) external;
        function reduceStakeTo(address sponsorship, uint256 targetStakeWei) external;
        function payOutQueue(uint256 maxIterations) external;
        function withdrawEarningsFromSponsorships(address[] memory sponsorshipAddresses) external;
        function stakedInto(address sponsorship) external view returns (uint256);
        function queueIsEmpty() external view returns (bool);
    }
}

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract ISponsorship {
        function minimumStakeOf(address operator) external view returns (uint256);
        function lockedStakeWei(address operator) external view returns (uint256);
    }
}

// ── Operator contract client ────────────────────────────────────────

/// Live [`Ledger`] backed by the operator contract.
///
/// Read calls need only the RPC URL; transactions need the operator
/// owner's private key unless `dry_run` is set.
pub struct OperatorContract {
    operator: Address,
    rpc_url: String,
    private_key: Option<String>,
    dry_run: bool,
    confirmation_timeout: Duration,
}

impl OperatorContract {
    pub fn new(
        operator: Address,
        rpc_url: impl Into<String>,
        private_key: Option<String>,
        dry_run: bool,
        confirmation_timeout: Duration,
    ) -> Self {
        OperatorContract {
            operator,
            rpc_url: rpc_url.into(),
            private_key,
            dry_run,
            confirmation_timeout,
        }
    }

    fn private_key(&self, call: &str) -> Result<&str, LedgerError> {
        self.private_key.as_deref().ok_or_else(|| {
            LedgerError::Rejected(format!(
                "{call}: no private key configured (set AUTOSTAKER_PRIVATE_KEY or use --dry-run)"
            ))
        })
    }

    /// Await the receipt under the confirmation timeout; a reverted receipt
    /// is an error.
    async fn confirm(
        &self,
        call: &str,
        pending: PendingTransactionBuilder<Ethereum>,
    ) -> Result<Option<TxHash>, LedgerError> {
        let timeout = self.confirmation_timeout;
        let receipt = tokio::time::timeout(timeout, pending.get_receipt())
            .await
            .map_err(|_| LedgerError::Timeout {
                call: call.to_string(),
                timeout,
            })?
            .map_err(|e| LedgerError::rpc(call, e))?;

        if !receipt.status() {
            return Err(LedgerError::Reverted {
                call: call.to_string(),
                reason: format!(
                    "tx {:?} reverted (gas_used: {})",
                    receipt.transaction_hash, receipt.gas_used
                ),
            });
        }
        info!(call, tx = ?receipt.transaction_hash, "confirmed");
        Ok(Some(receipt.transaction_hash))
    }
}

#[async_trait]
impl Ledger for OperatorContract {
    async fn stake(&self, pool: PoolId, amount: U256) -> Result<Option<TxHash>, LedgerError> {
        const CALL: &str = "stake";
        if self.dry_run {
            info!(
                "[DRY RUN] would stake {} into {}",
                format_tokens(amount),
                evm::short_addr(&pool)
            );
            return Ok(None);
        }
        let provider = evm::signer_provider(self.private_key(CALL)?, &self.rpc_url)
            .map_err(|e| LedgerError::rpc(CALL, e))?;
        let operator = IOperator::new(self.operator, &provider);
        let pending = operator
            .stake(pool, amount)
            .send()
            .await
            .map_err(|e| LedgerError::rpc(CALL, e))?;
        self.confirm(CALL, pending).await
    }

    async fn reduce_stake_to(
        &self,
        pool: PoolId,
        target: U256,
    ) -> Result<Option<TxHash>, LedgerError> {
        const CALL: &str = "reduceStakeTo";
        if self.dry_run {
            info!(
                "[DRY RUN] would reduce stake in {} to {}",
                evm::short_addr(&pool),
                format_tokens(target)
            );
            return Ok(None);
        }
        let provider = evm::signer_provider(self.private_key(CALL)?, &self.rpc_url)
            .map_err(|e| LedgerError::rpc(CALL, e))?;
        let operator = IOperator::new(self.operator, &provider);
        let pending = operator
            .reduceStakeTo(pool, target)
            .send()
            .await
            .map_err(|e| LedgerError::rpc(CALL, e))?;
        self.confirm(CALL, pending).await
    }

    async fn pay_out_queue(&self, max_iterations: u32) -> Result<Option<TxHash>, LedgerError> {
        const CALL: &str = "payOutQueue";
        if self.dry_run {
            info!("[DRY RUN] would pay out undelegation queue ({max_iterations} iterations)");
            return Ok(None);
        }
        let provider = evm::signer_provider(self.private_key(CALL)?, &self.rpc_url)
            .map_err(|e| LedgerError::rpc(CALL, e))?;
        let operator = IOperator::new(self.operator, &provider);
        let pending = operator
            .payOutQueue(U256::from(max_iterations))
            .send()
            .await
            .map_err(|e| LedgerError::rpc(CALL, e))?;
        self.confirm(CALL, pending).await
    }

    async fn withdraw_earnings(&self, pools: &[PoolId]) -> Result<Option<TxHash>, LedgerError> {
        const CALL: &str = "withdrawEarningsFromSponsorships";
        if self.dry_run {
            info!("[DRY RUN] would withdraw earnings from {} sponsorships", pools.len());
            return Ok(None);
        }
        let provider = evm::signer_provider(self.private_key(CALL)?, &self.rpc_url)
            .map_err(|e| LedgerError::rpc(CALL, e))?;
        let operator = IOperator::new(self.operator, &provider);
        let pending = operator
            .withdrawEarningsFromSponsorships(pools.to_vec())
            .send()
            .await
            .map_err(|e| LedgerError::rpc(CALL, e))?;
        self.confirm(CALL, pending).await
    }

    async fn staked_into(&self, pool: PoolId) -> Result<U256, LedgerError> {
        let rp = evm::read_provider(&self.rpc_url).map_err(|e| LedgerError::rpc("stakedInto", e))?;
        IOperator::new(self.operator, &rp)
            .stakedInto(pool)
            .call()
            .await
            .map_err(|e| LedgerError::rpc("stakedInto", e))
    }

    async fn minimum_stake_of(&self, pool: PoolId) -> Result<U256, LedgerError> {
        let rp = evm::read_provider(&self.rpc_url)
            .map_err(|e| LedgerError::rpc("minimumStakeOf", e))?;
        ISponsorship::new(pool, &rp)
            .minimumStakeOf(self.operator)
            .call()
            .await
            .map_err(|e| LedgerError::rpc("minimumStakeOf", e))
    }

    async fn locked_stake(&self, pool: PoolId) -> Result<U256, LedgerError> {
        let rp = evm::read_provider(&self.rpc_url)
            .map_err(|e| LedgerError::rpc("lockedStakeWei", e))?;
        ISponsorship::new(pool, &rp)
            .lockedStakeWei(self.operator)
            .call()
            .await
            .map_err(|e| LedgerError::rpc("lockedStakeWei", e))
    }

    async fn queue_is_empty(&self) -> Result<bool, LedgerError> {
        let rp = evm::read_provider(&self.rpc_url)
            .map_err(|e| LedgerError::rpc("queueIsEmpty", e))?;
        IOperator::new(self.operator, &rp)
            .queueIsEmpty()
            .call()
            .await
            .map_err(|e| LedgerError::rpc("queueIsEmpty", e))
    }
}
