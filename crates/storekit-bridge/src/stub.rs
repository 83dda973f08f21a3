// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Null store for platforms without a native store (desktop, CI).
//
// Purchasing is reported unavailable and every operation is accepted and
// dropped. Nothing ever calls back, so callers that skip the availability
// check wait forever.

use storekit_core::error::Result;
use storekit_core::{OwnerToken, ProductIdentifier};

use crate::traits::StoreService;

/// No-op store returned on platforms without StoreKit.
#[derive(Debug, Default)]
pub struct NullStoreService;

impl StoreService for NullStoreService {
    fn platform_name(&self) -> &str {
        "Unsupported platform (null store)"
    }

    fn init(&self, owner: OwnerToken) {
        tracing::debug!(%owner, "null store initialised");
    }

    fn can_make_payments(&self) -> bool {
        false
    }

    fn request(&self, identifiers: &[ProductIdentifier]) -> Result<()> {
        tracing::warn!(count = identifiers.len(), "StoreService::request called on null store");
        Ok(())
    }

    fn purchase(&self, identifier: &ProductIdentifier) -> Result<()> {
        tracing::warn!(%identifier, "StoreService::purchase called on null store");
        Ok(())
    }

    fn restore(&self) {
        tracing::warn!("StoreService::restore called on null store");
    }
}
