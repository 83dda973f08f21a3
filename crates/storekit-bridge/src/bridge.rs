// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The store bridge: outbound requests to the native store, inbound callbacks
// relayed to the single registered observer.
//
// The bridge is a thin relay. It performs no retries, no deduplication and
// no rewording of native error strings. Events that arrive while no observer
// is registered are dropped, not queued.

use std::sync::{Arc, PoisonError, RwLock};

use storekit_core::{MarshalError, OwnerToken, ProductIdentifier};
use tracing::{debug, info, warn};

use crate::callbacks;
use crate::catalog::{NativeProductRecord, ProductCatalogEntry};
use crate::marshal::{ForeignBuffer, marshal};
use crate::registry::SingletonRegistry;
use crate::traits::{StoreObserver, StoreService};

/// Bridge between the application and one native store.
///
/// Build one with [`StoreBridge::new`] at the application's composition root
/// and hand the `Arc` to whoever needs it, or use [`StoreBridge::shared`]
/// for the process-wide instance backed by the platform store.
pub struct StoreBridge {
    service: Box<dyn StoreService>,
    observer: RwLock<Option<Arc<dyn StoreObserver>>>,
    token: OwnerToken,
}

/// Registry slot for the process-wide bridge.
struct SharedBridge(Arc<StoreBridge>);

impl Default for SharedBridge {
    fn default() -> Self {
        Self(StoreBridge::new(crate::platform_service()))
    }
}

impl StoreBridge {
    /// Create a bridge over `service` and register it as a callback target.
    pub fn new(service: Box<dyn StoreService>) -> Arc<Self> {
        let token = callbacks::next_token();
        let bridge = Arc::new(Self {
            service,
            observer: RwLock::new(None),
            token,
        });
        callbacks::register(&bridge);
        bridge.service.init(token);
        info!(
            platform = bridge.service.platform_name(),
            %token,
            "store bridge initialised"
        );
        bridge
    }

    /// The process-wide bridge over the platform store, created on first use
    /// and kept until the process exits.
    pub fn shared() -> Arc<Self> {
        Arc::clone(&SingletonRegistry::global().get_or_create::<SharedBridge>().0)
    }

    pub fn owner_token(&self) -> OwnerToken {
        self.token
    }

    pub fn platform_name(&self) -> &str {
        self.service.platform_name()
    }

    // -- Outbound -------------------------------------------------------------

    /// Whether purchasing is permitted here. `false` when there is no native
    /// store at all.
    pub fn is_available(&self) -> bool {
        self.service.can_make_payments()
    }

    /// Ask the store for catalog metadata. The answer arrives through
    /// `on_request_success` or `on_request_failure`.
    ///
    /// An empty list is answered immediately, on the calling thread, with an
    /// empty catalog; it never reaches the native store.
    pub fn request(&self, identifiers: &[ProductIdentifier]) {
        if identifiers.is_empty() {
            debug!("empty product request answered locally");
            self.deliver("request_success", |o| o.on_request_success(Vec::new()));
            return;
        }

        info!(count = identifiers.len(), "requesting product data");
        if let Err(e) = self.service.request(identifiers) {
            warn!(error = %e, "product request did not reach the store");
            let message = e.to_string();
            self.deliver("request_failure", |o| o.on_request_failure(&message));
        }
    }

    /// Start a purchase. The answer arrives through `on_purchase_success` or
    /// `on_purchase_failure` carrying the same identifier.
    pub fn purchase(&self, identifier: &ProductIdentifier) {
        info!(%identifier, "starting purchase");
        if let Err(e) = self.service.purchase(identifier) {
            warn!(%identifier, error = %e, "purchase did not reach the store");
            self.deliver("purchase_failure", |o| o.on_purchase_failure(identifier));
        }
    }

    /// Replay completed purchases; each restored product arrives as its own
    /// `on_restore` call.
    pub fn restore(&self) {
        info!("restoring completed purchases");
        self.service.restore();
    }

    /// Register `observer`, replacing any previous one, or clear the slot
    /// with `None`.
    pub fn set_observer(&self, observer: Option<Arc<dyn StoreObserver>>) {
        let registering = observer.is_some();
        let previous = {
            let mut slot = self.observer.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *slot, observer)
        };
        debug!(
            registering,
            replaced = previous.is_some(),
            "store observer updated"
        );
    }

    // -- Inbound (native callbacks) ------------------------------------------

    /// The store answered a catalog request with `buffer`.
    ///
    /// The buffer is decoded and released even when no observer is
    /// registered. Undecodable payloads are reported through
    /// `on_marshal_failure` and the request completes with an empty catalog.
    pub fn handle_request_success(&self, buffer: ForeignBuffer<NativeProductRecord>) {
        match marshal(buffer, Vec::new()) {
            Ok(catalog) => self.deliver_catalog(catalog),
            Err(e) => self.handle_malformed_catalog(e),
        }
    }

    pub(crate) fn handle_malformed_catalog(&self, error: MarshalError) {
        warn!(error = %error, "discarding undecodable product payload");
        self.deliver("marshal_failure", |o| o.on_marshal_failure(&error));
        self.deliver_catalog(Vec::new());
    }

    pub fn handle_request_failure(&self, error: &str) {
        debug!(error, "product request failed");
        self.deliver("request_failure", |o| o.on_request_failure(error));
    }

    pub fn handle_purchase_success(&self, identifier: &ProductIdentifier) {
        debug!(%identifier, "purchase succeeded");
        self.deliver("purchase_success", |o| o.on_purchase_success(identifier));
    }

    pub fn handle_purchase_failure(&self, identifier: &ProductIdentifier) {
        debug!(%identifier, "purchase failed");
        self.deliver("purchase_failure", |o| o.on_purchase_failure(identifier));
    }

    pub fn handle_restore_item(&self, identifier: &ProductIdentifier) {
        debug!(%identifier, "purchase restored");
        self.deliver("restore", |o| o.on_restore(identifier));
    }

    fn deliver_catalog(&self, catalog: Vec<ProductCatalogEntry>) {
        debug!(count = catalog.len(), "product data received");
        self.deliver("request_success", move |o| o.on_request_success(catalog));
    }

    /// Hand an event to the current observer, if any. The slot lock is
    /// released before the observer runs.
    fn deliver(&self, event: &'static str, notify: impl FnOnce(&dyn StoreObserver)) {
        let observer = self
            .observer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match observer {
            Some(observer) => notify(observer.as_ref()),
            None => debug!(event, "no store observer registered, event dropped"),
        }
    }
}

impl Drop for StoreBridge {
    fn drop(&mut self) {
        callbacks::unregister(self.token);
    }
}

impl std::fmt::Debug for StoreBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreBridge")
            .field("platform", &self.service.platform_name())
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}
