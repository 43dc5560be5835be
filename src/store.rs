//! Persisted user preferences
//!
//! The only state that survives a restart is a single boolean recording that
//! the user previously declined the wallet connection prompt. The Connection
//! Manager is the sole reader and writer.

use crate::error::{StakingError, StakingResult};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Preferences {
    #[serde(default)]
    wallet_prompt_declined: bool,
}

/// File-backed preference store
pub struct PreferenceStore {
    path: PathBuf,
    prefs: Mutex<Preferences>,
}

impl PreferenceStore {
    /// Open the store, falling back to defaults when the file is absent or unreadable
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let prefs = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Ignoring malformed preference file {:?}: {}", path, e);
                Preferences::default()
            }),
            Err(_) => Preferences::default(),
        };

        Self {
            path,
            prefs: Mutex::new(prefs),
        }
    }

    /// Whether the user previously declined the connection prompt
    pub fn prompt_declined(&self) -> bool {
        self.prefs.lock().expect("preference lock poisoned").wallet_prompt_declined
    }

    /// Record the declined-prompt flag and persist it
    pub fn record_declined(&self, declined: bool) -> StakingResult<()> {
        let snapshot = {
            let mut prefs = self.prefs.lock().expect("preference lock poisoned");
            prefs.wallet_prompt_declined = declined;
            prefs.clone()
        };

        let raw = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| StakingError::Store(e.to_string()))?;
        std::fs::write(&self.path, raw).map_err(|e| StakingError::Store(e.to_string()))?;
        Ok(())
    }
}
