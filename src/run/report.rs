use alloy::primitives::{TxHash, U256};
use serde::{Deserialize, Serialize};

use super::errors::ErrorClass;
use crate::model::amount::format_tokens;
use crate::model::Action;

#[derive(Debug, Clone, Serialize)]
pub struct SucceededAction {
    pub action: Action,
    /// `None` when nothing was sent (dry run).
    pub tx: Option<TxHash>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedAction {
    pub action: Action,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedAction {
    pub action: Action,
    pub error: String,
    pub class: ErrorClass,
    /// Recalculation attempts spent in the run when this action failed.
    pub retries: u32,
}

/// Overall verdict of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    NothingToDo,
    Success,
    PartialSuccess,
    HardFailure,
}

/// Itemized result of one execution run. Every action handed to the
/// orchestrator ends up in exactly one list.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionReport {
    pub succeeded: Vec<SucceededAction>,
    pub skipped: Vec<SkippedAction>,
    pub failed: Vec<FailedAction>,
    /// Actions never attempted because the run was cancelled or aborted.
    pub not_attempted: Vec<Action>,
    /// Actions superseded by a recalculated plan after a retryable failure.
    pub replaced: Vec<Action>,
    /// Recalculations performed.
    pub retries: u32,
    /// Why the run stopped early, if it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
    /// Undelegation queue shortfall that no sponsorship had the surplus to
    /// cover.
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "ser_opt_amount"
    )]
    pub unpayable_queue: Option<U256>,
}

impl ExecutionReport {
    pub fn outcome(&self) -> RunOutcome {
        let attempted = self.succeeded.len() + self.skipped.len() + self.failed.len();
        let unfinished = self.failed.len() + self.not_attempted.len();
        if self.unpayable_queue.is_some() {
            return RunOutcome::HardFailure;
        }
        if attempted == 0 && unfinished == 0 && self.aborted.is_none() {
            RunOutcome::NothingToDo
        } else if unfinished == 0 && self.aborted.is_none() {
            RunOutcome::Success
        } else if self.succeeded.is_empty() && self.skipped.is_empty() {
            RunOutcome::HardFailure
        } else {
            RunOutcome::PartialSuccess
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self.outcome(),
            RunOutcome::NothingToDo | RunOutcome::Success
        )
    }

    /// Human-readable summary, one line per action.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for s in &self.succeeded {
            match s.tx {
                Some(tx) => lines.push(format!("  ok      {}  (tx {tx})", s.action)),
                None => lines.push(format!("  ok      {}  (dry run)", s.action)),
            }
        }
        for s in &self.skipped {
            lines.push(format!("  skipped {}  ({})", s.action, s.reason));
        }
        for f in &self.failed {
            lines.push(format!(
                "  FAILED  {}  [{:?}, {} retries] {}",
                f.action, f.class, f.retries, f.error
            ));
        }
        for a in &self.not_attempted {
            lines.push(format!("  not run {a}"));
        }
        if let Some(reason) = &self.aborted {
            lines.push(format!("  aborted: {reason}"));
        }
        if let Some(shortfall) = self.unpayable_queue {
            lines.push(format!(
                "  undelegation queue short by {} with no stake above the minimum",
                format_tokens(shortfall)
            ));
        }
        lines
    }
}

fn ser_opt_amount<S>(value: &Option<U256>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match value {
        Some(v) => serializer.serialize_some(&v.to_string()),
        None => serializer.serialize_none(),
    }
}
