use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::report::RunOutcome;

/// Persistent state for the run command, saved as JSON between restarts.
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct RunState {
    /// Unix timestamp of the last successful earnings collection.
    #[serde(default)]
    pub last_collect: u64,
    /// Unix timestamp of the last completed cycle.
    #[serde(default)]
    pub last_cycle: u64,
    /// Number of cycles completed.
    #[serde(default)]
    pub cycles: u64,
    /// Outcome of the last cycle.
    #[serde(default)]
    pub last_outcome: Option<RunOutcome>,
}

impl RunState {
    /// Load state from file, or create a fresh state if the file doesn't exist.
    pub fn load_or_new(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path).context("reading state file")?;
            let state: RunState = serde_json::from_str(&contents).context("parsing state file")?;
            info!(
                "Loaded state from {} (cycles={}, last_collect={})",
                path.display(),
                state.cycles,
                state.last_collect
            );
            Ok(state)
        } else {
            Ok(RunState::default())
        }
    }

    /// Save state to file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).context("writing state file")?;
        Ok(())
    }
}
