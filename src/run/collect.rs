use tracing::{info, warn};

use crate::ledger::Ledger;
use crate::model::config::AutoCollectConfig;
use crate::model::PoolId;

/// True when auto-collect is enabled and its interval has elapsed.
pub fn is_due(config: &AutoCollectConfig, last_collect: u64, now: u64) -> bool {
    config.enabled && now.saturating_sub(last_collect) >= config.interval_secs
}

/// Withdraw earnings from `pools`. Returns whether the collection went
/// through; a failure is logged and left for the next cycle.
pub async fn collect_earnings(ledger: &dyn Ledger, pools: &[PoolId]) -> bool {
    if pools.is_empty() {
        return true;
    }
    match ledger.withdraw_earnings(pools).await {
        Ok(tx) => {
            info!(pools = pools.len(), ?tx, "earnings withdrawn");
            true
        }
        Err(e) => {
            warn!("earnings withdrawal failed, retrying next cycle: {e}");
            false
        }
    }
}
