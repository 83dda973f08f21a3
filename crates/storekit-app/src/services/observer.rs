// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Store observer that forwards every outcome into a tokio channel.
//
// Store callbacks arrive on native threads; the channel moves them onto the
// async task that owns the session.

use storekit_bridge::{ProductCatalogEntry, StoreObserver};
use storekit_core::{MarshalError, ProductIdentifier};
use tokio::sync::mpsc;

/// One store outcome, owned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Catalog(Vec<ProductCatalogEntry>),
    RequestFailed(String),
    Purchased(ProductIdentifier),
    PurchaseFailed(ProductIdentifier),
    Restored(ProductIdentifier),
    Malformed(MarshalError),
}

pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<StoreEvent>,
}

impl ChannelObserver {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StoreEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: StoreEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("store session closed, event discarded");
        }
    }
}

impl StoreObserver for ChannelObserver {
    fn on_request_success(&self, catalog: Vec<ProductCatalogEntry>) {
        self.send(StoreEvent::Catalog(catalog));
    }

    fn on_request_failure(&self, error: &str) {
        self.send(StoreEvent::RequestFailed(error.to_owned()));
    }

    fn on_purchase_success(&self, identifier: &ProductIdentifier) {
        self.send(StoreEvent::Purchased(identifier.clone()));
    }

    fn on_purchase_failure(&self, identifier: &ProductIdentifier) {
        self.send(StoreEvent::PurchaseFailed(identifier.clone()));
    }

    fn on_restore(&self, identifier: &ProductIdentifier) {
        self.send(StoreEvent::Restored(identifier.clone()));
    }

    fn on_marshal_failure(&self, error: &MarshalError) {
        self.send(StoreEvent::Malformed(error.clone()));
    }
}
