// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::types::ProductIdentifier;

/// Persistent settings for an application embedding the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Product identifiers the application asks the store about.
    pub products: Vec<ProductIdentifier>,
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_filter: String,
    /// How long the application waits for store events before giving up.
    /// The bridge itself never times out.
    pub event_timeout_secs: u64,
    /// Where granted entitlements are persisted.
    pub entitlements_file: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            products: vec![ProductIdentifier::from("com.game.fullgame")],
            log_filter: "info".into(),
            event_timeout_secs: 30,
            entitlements_file: PathBuf::from("entitlements.json"),
        }
    }
}

impl StoreConfig {
    /// Read a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&data)?;
        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Write the config as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
