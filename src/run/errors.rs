use serde::Serialize;
use thiserror::Error;

use crate::ledger::LedgerError;

/// How the orchestrator treats a failed submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// On-chain state moved under the plan; re-query, re-plan, resume.
    Retryable,
    /// Recorded against the action; the run moves on.
    Fatal,
}

/// Message fragments of stale-state failures. Matched case-insensitively.
const RETRYABLE_PATTERNS: &[&str] = &[
    "insufficient",
    "allowance",
    "exceeds balance",
    "queue",
    "nonce",
    "underpriced",
    "replacement",
    "revert",
];

/// Classify a ledger failure.
///
/// Reverts and confirmation timeouts are always stale-state failures; RPC
/// rejections are retryable only when the message says so. Local refusals
/// (e.g. no signer configured) never are.
pub fn classify(err: &LedgerError) -> ErrorClass {
    match err {
        LedgerError::Reverted { .. } | LedgerError::Timeout { .. } => ErrorClass::Retryable,
        LedgerError::Rpc { message, .. } => classify_message(message),
        LedgerError::Rejected(_) => ErrorClass::Fatal,
    }
}

pub fn classify_message(message: &str) -> ErrorClass {
    let lower = message.to_lowercase();
    if RETRYABLE_PATTERNS.iter().any(|p| lower.contains(p)) {
        ErrorClass::Retryable
    } else {
        ErrorClass::Fatal
    }
}

/// Run-level failures that stop execution before or between actions.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// Live state could not be read; no plan can be trusted without it.
    #[error("query failed: {0:#}")]
    Query(anyhow::Error),

    #[error("ledger read failed: {0}")]
    LedgerRead(#[from] LedgerError),

    #[error("staking is blocked while the undelegation queue is not empty")]
    QueueOutstanding,

    #[error("run cancelled")]
    Cancelled,
}
