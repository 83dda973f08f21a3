// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Store session: drives the bridge for one command and waits for its outcome.
//
// The bridge never times out, so every wait here is bounded by
// `event_timeout_secs`. Restores have no completion signal; the session stops
// collecting once the store has been quiet for that long.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use storekit_bridge::{ProductCatalogEntry, StoreBridge};
use storekit_core::error::{Result, StoreError};
use storekit_core::{ProductIdentifier, StoreConfig};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::data_dir;
use super::entitlements::{EntitlementStore, GrantSource};
use super::observer::{ChannelObserver, StoreEvent};

/// What the user asked the demo to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Command {
    #[default]
    Request,
    Purchase,
    Restore,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "request" => Ok(Self::Request),
            "purchase" => Ok(Self::Purchase),
            "restore" => Ok(Self::Restore),
            other => Err(format!("unknown command `{other}`")),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Catalog(Vec<ProductCatalogEntry>),
    Purchased {
        product: ProductIdentifier,
        newly_granted: bool,
    },
    PurchaseFailed(ProductIdentifier),
    Restored(Vec<ProductIdentifier>),
}

pub struct AppServices {
    bridge: Arc<StoreBridge>,
    events: mpsc::UnboundedReceiver<StoreEvent>,
    entitlements: EntitlementStore,
    config: StoreConfig,
}

impl AppServices {
    /// Session over the process-wide bridge, with entitlements stored under
    /// the data directory.
    pub fn init(config: StoreConfig) -> Result<Self> {
        let path = data_dir::resolve(&data_dir::data_dir(), &config.entitlements_file);
        Self::with_bridge(StoreBridge::shared(), config, &path)
    }

    pub fn with_bridge(
        bridge: Arc<StoreBridge>,
        config: StoreConfig,
        entitlements_path: &Path,
    ) -> Result<Self> {
        let entitlements = EntitlementStore::open(entitlements_path)?;
        let (observer, events) = ChannelObserver::channel();
        bridge.set_observer(Some(Arc::new(observer)));
        info!(platform = bridge.platform_name(), "store session ready");
        Ok(Self {
            bridge,
            events,
            entitlements,
            config,
        })
    }

    pub fn entitlements(&self) -> &EntitlementStore {
        &self.entitlements
    }

    pub async fn run(&mut self, command: Command) -> Result<Outcome> {
        if !self.bridge.is_available() {
            warn!("in-app purchases are disabled on this device");
            return Err(StoreError::PlatformUnavailable);
        }
        match command {
            Command::Request => self.request_catalog().await.map(Outcome::Catalog),
            Command::Purchase => {
                let product = self
                    .config
                    .products
                    .first()
                    .cloned()
                    .ok_or_else(|| StoreError::Config("no products configured".into()))?;
                self.purchase(product).await
            }
            Command::Restore => self.restore().await.map(Outcome::Restored),
        }
    }

    async fn request_catalog(&mut self) -> Result<Vec<ProductCatalogEntry>> {
        self.bridge.request(&self.config.products);
        loop {
            match self.next_event(self.timeout()).await? {
                StoreEvent::Catalog(catalog) => return Ok(catalog),
                StoreEvent::RequestFailed(message) => return Err(StoreError::Native(message)),
                StoreEvent::Malformed(e) => warn!(error = %e, "store sent an undecodable catalog"),
                other => debug!(?other, "ignoring unrelated store event"),
            }
        }
    }

    async fn purchase(&mut self, product: ProductIdentifier) -> Result<Outcome> {
        if self.entitlements.is_granted(&product) {
            info!(%product, "already owned, asking the store anyway");
        }
        self.bridge.purchase(&product);
        loop {
            match self.next_event(self.timeout()).await? {
                StoreEvent::Purchased(id) if id == product => {
                    let newly_granted = self.entitlements.grant(&id, GrantSource::Purchase)?;
                    return Ok(Outcome::Purchased {
                        product: id,
                        newly_granted,
                    });
                }
                StoreEvent::PurchaseFailed(id) if id == product => {
                    return Ok(Outcome::PurchaseFailed(id));
                }
                other => debug!(?other, "ignoring unrelated store event"),
            }
        }
    }

    async fn restore(&mut self) -> Result<Vec<ProductIdentifier>> {
        self.bridge.restore();
        let mut restored = Vec::new();
        loop {
            match self.next_event(self.timeout()).await {
                Ok(StoreEvent::Restored(id)) => {
                    self.entitlements.grant(&id, GrantSource::Restore)?;
                    restored.push(id);
                }
                Ok(other) => debug!(?other, "ignoring unrelated store event"),
                Err(StoreError::Timeout(_)) => break,
                Err(e) => return Err(e),
            }
        }
        info!(count = restored.len(), "restore window closed");
        Ok(restored)
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.event_timeout_secs)
    }

    async fn next_event(&mut self, wait: Duration) -> Result<StoreEvent> {
        match tokio::time::timeout(wait, self.events.recv()).await {
            Ok(Some(event)) => Ok(event),
            Ok(None) => Err(StoreError::Native("store observer detached".into())),
            Err(_) => Err(StoreError::Timeout(wait.as_secs())),
        }
    }
}

impl Drop for AppServices {
    fn drop(&mut self) {
        self.bridge.set_observer(None);
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::CString;
    use std::sync::atomic::{AtomicU64, Ordering};

    use storekit_bridge::StoreService;
    use storekit_bridge::callbacks::{
        storekit_on_purchase_failure, storekit_on_purchase_success, storekit_on_request_failure,
        storekit_on_restore_item,
    };
    use storekit_core::OwnerToken;

    use super::*;

    /// Store that answers every call immediately through the C entry points.
    struct ScriptedStore {
        available: bool,
        owner: AtomicU64,
        restorable: Vec<&'static str>,
    }

    impl ScriptedStore {
        fn new(available: bool, restorable: Vec<&'static str>) -> Self {
            Self {
                available,
                owner: AtomicU64::new(0),
                restorable,
            }
        }

        fn owner(&self) -> u64 {
            self.owner.load(Ordering::SeqCst)
        }
    }

    impl StoreService for ScriptedStore {
        fn platform_name(&self) -> &str {
            "scripted"
        }

        fn init(&self, owner: OwnerToken) {
            self.owner.store(owner.0, Ordering::SeqCst);
        }

        fn can_make_payments(&self) -> bool {
            self.available
        }

        fn request(&self, _identifiers: &[ProductIdentifier]) -> Result<()> {
            // SAFETY: static C string literal.
            unsafe { storekit_on_request_failure(self.owner(), c"Cannot connect to iTunes Store".as_ptr()) };
            Ok(())
        }

        fn purchase(&self, identifier: &ProductIdentifier) -> Result<()> {
            let id = CString::new(identifier.as_str()).expect("no interior NUL");
            // SAFETY: `id` outlives the call.
            unsafe {
                if identifier.as_str().ends_with("declined") {
                    storekit_on_purchase_failure(self.owner(), id.as_ptr());
                } else {
                    storekit_on_purchase_success(self.owner(), id.as_ptr());
                }
            }
            Ok(())
        }

        fn restore(&self) {
            for item in &self.restorable {
                let id = CString::new(*item).expect("no interior NUL");
                // SAFETY: `id` outlives the call.
                unsafe { storekit_on_restore_item(self.owner(), id.as_ptr()) };
            }
        }
    }

    fn session(store: ScriptedStore, products: &[&str], dir: &Path) -> AppServices {
        let config = StoreConfig {
            products: products.iter().map(|p| ProductIdentifier::from(*p)).collect(),
            event_timeout_secs: 1,
            ..Default::default()
        };
        let bridge = StoreBridge::new(Box::new(store));
        AppServices::with_bridge(bridge, config, &dir.join("entitlements.json")).expect("session")
    }

    #[test]
    fn commands_parse() {
        assert_eq!("request".parse::<Command>(), Ok(Command::Request));
        assert_eq!("purchase".parse::<Command>(), Ok(Command::Purchase));
        assert_eq!("restore".parse::<Command>(), Ok(Command::Restore));
        assert!("refund".parse::<Command>().is_err());
    }

    #[tokio::test]
    async fn unavailable_store_stops_before_any_call() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut app = session(ScriptedStore::new(false, vec![]), &["com.game.fullgame"], dir.path());

        let err = app.run(Command::Purchase).await.unwrap_err();

        assert!(matches!(err, StoreError::PlatformUnavailable));
        assert_eq!(app.entitlements().entries().count(), 0);
    }

    #[tokio::test]
    async fn purchase_grants_the_full_game() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut app = session(ScriptedStore::new(true, vec![]), &["com.game.fullgame"], dir.path());

        let outcome = app.run(Command::Purchase).await.expect("purchase");

        assert_eq!(
            outcome,
            Outcome::Purchased {
                product: "com.game.fullgame".into(),
                newly_granted: true,
            }
        );
        assert!(app.entitlements().is_granted(&"com.game.fullgame".into()));
    }

    #[tokio::test]
    async fn declined_purchase_grants_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut app = session(ScriptedStore::new(true, vec![]), &["com.game.declined"], dir.path());

        let outcome = app.run(Command::Purchase).await.expect("purchase");

        assert_eq!(outcome, Outcome::PurchaseFailed("com.game.declined".into()));
        assert_eq!(app.entitlements().entries().count(), 0);
    }

    #[tokio::test]
    async fn purchase_without_products_is_a_config_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut app = session(ScriptedStore::new(true, vec![]), &[], dir.path());

        let err = app.run(Command::Purchase).await.unwrap_err();

        assert!(matches!(err, StoreError::Config(_)));
    }

    #[tokio::test]
    async fn request_failure_text_is_surfaced() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut app = session(ScriptedStore::new(true, vec![]), &["com.game.fullgame"], dir.path());

        let err = app.run(Command::Request).await.unwrap_err();

        assert!(matches!(err, StoreError::Native(m) if m == "Cannot connect to iTunes Store"));
    }

    #[tokio::test]
    async fn empty_request_returns_empty_catalog() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut app = session(ScriptedStore::new(true, vec![]), &[], dir.path());

        let outcome = app.run(Command::Request).await.expect("request");

        assert_eq!(outcome, Outcome::Catalog(Vec::new()));
    }

    #[tokio::test]
    async fn restore_collects_every_item_and_grants_them() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ScriptedStore::new(true, vec!["A", "B", "C"]);
        let mut app = session(store, &["com.game.fullgame"], dir.path());

        let outcome = app.run(Command::Restore).await.expect("restore");

        assert_eq!(
            outcome,
            Outcome::Restored(vec!["A".into(), "B".into(), "C".into()])
        );
        assert_eq!(app.entitlements().entries().count(), 3);
    }
}
