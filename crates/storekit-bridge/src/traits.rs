// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for the store bridge.
//
// `StoreService` is the outbound half: the calls the bridge makes into the
// native store. `StoreObserver` is the inbound half: what the application
// hears back once the native store calls the bridge.

use storekit_core::error::Result;
use storekit_core::{MarshalError, OwnerToken, ProductIdentifier};

use crate::catalog::ProductCatalogEntry;

/// The native store as seen from the bridge.
///
/// Every operation is fire-and-forget: it returns once the request has been
/// handed to the native side, and the outcome arrives later through the
/// callback entry points. An `Err` means the request never left the process.
pub trait StoreService: Send + Sync {
    /// Human-readable provider name (e.g. "iOS StoreKit").
    fn platform_name(&self) -> &str;

    /// Tell the native side which bridge its callbacks belong to.
    fn init(&self, owner: OwnerToken);

    /// Whether purchases are permitted on this device. Must not block.
    fn can_make_payments(&self) -> bool;

    /// Ask the store for catalog metadata on `identifiers`.
    fn request(&self, identifiers: &[ProductIdentifier]) -> Result<()>;

    /// Start a purchase of `identifier`.
    fn purchase(&self, identifier: &ProductIdentifier) -> Result<()>;

    /// Replay completed purchases for the signed-in account.
    fn restore(&self);
}

/// Receives store outcomes. At most one observer is registered per bridge.
///
/// Callbacks may arrive on any thread, including threads the application
/// does not own. No lock is held while an observer method runs, so an
/// observer may call back into the bridge (for example to replace itself).
pub trait StoreObserver: Send + Sync {
    /// Catalog metadata arrived, in the order the native store reported it.
    fn on_request_success(&self, catalog: Vec<ProductCatalogEntry>);

    /// The catalog request failed; `error` is the native message verbatim.
    fn on_request_failure(&self, error: &str);

    fn on_purchase_success(&self, identifier: &ProductIdentifier);

    fn on_purchase_failure(&self, identifier: &ProductIdentifier);

    /// One previously purchased product was restored. Called once per item;
    /// there is no "restore finished" signal.
    fn on_restore(&self, identifier: &ProductIdentifier);

    /// A catalog payload could not be decoded. The request still completes
    /// with an empty catalog right after this call.
    fn on_marshal_failure(&self, _error: &MarshalError) {}
}
