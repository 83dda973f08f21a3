// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Persisted record of what the user owns.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storekit_core::ProductIdentifier;
use storekit_core::error::Result;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantSource {
    Purchase,
    Restore,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    pub product: ProductIdentifier,
    pub source: GrantSource,
    pub granted_at: DateTime<Utc>,
}

/// JSON-file-backed set of entitlements, keyed by product.
#[derive(Debug)]
pub struct EntitlementStore {
    path: PathBuf,
    entries: BTreeMap<ProductIdentifier, Entitlement>,
}

impl EntitlementStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: &Path) -> Result<Self> {
        let entries = match std::fs::read_to_string(path) {
            Ok(data) => serde_json::from_str::<Vec<Entitlement>>(&data)?
                .into_iter()
                .map(|e| (e.product.clone(), e))
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// Record `product` as owned and persist. Returns `false` when it was
    /// already owned; the original grant is kept.
    pub fn grant(&mut self, product: &ProductIdentifier, source: GrantSource) -> Result<bool> {
        if self.entries.contains_key(product) {
            return Ok(false);
        }
        let entitlement = Entitlement {
            product: product.clone(),
            source,
            granted_at: Utc::now(),
        };
        self.entries.insert(product.clone(), entitlement);
        self.save()?;
        info!(%product, ?source, "entitlement granted");
        Ok(true)
    }

    pub fn is_granted(&self, product: &ProductIdentifier) -> bool {
        self.entries.contains_key(product)
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entitlement> {
        self.entries.values()
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let list: Vec<&Entitlement> = self.entries.values().collect();
        std::fs::write(&self.path, serde_json::to_string_pretty(&list)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = EntitlementStore::open(&dir.path().join("none.json")).expect("open");
        assert_eq!(store.entries().count(), 0);
    }

    #[test]
    fn grants_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("entitlements.json");
        let full_game = ProductIdentifier::from("com.game.fullgame");

        let mut store = EntitlementStore::open(&path).expect("open");
        assert!(store.grant(&full_game, GrantSource::Purchase).expect("grant"));

        let reopened = EntitlementStore::open(&path).expect("reopen");
        assert!(reopened.is_granted(&full_game));
        let entry = reopened.entries().next().expect("one entry");
        assert_eq!(entry.source, GrantSource::Purchase);
    }

    #[test]
    fn regrant_keeps_the_first_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("entitlements.json");
        let id = ProductIdentifier::from("com.game.fullgame");

        let mut store = EntitlementStore::open(&path).expect("open");
        store.grant(&id, GrantSource::Purchase).expect("grant");
        let first = store.entries().next().cloned().expect("entry");

        assert!(!store.grant(&id, GrantSource::Restore).expect("regrant"));
        assert_eq!(store.entries().next(), Some(&first));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("entitlements.json");
        std::fs::write(&path, "{ not json").expect("write");
        assert!(EntitlementStore::open(&path).is_err());
    }
}
