// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! StoreKit transaction bridge.
//!
//! Relays product requests, purchases and restores to the platform store and
//! hands the asynchronous outcomes to a single registered [`StoreObserver`].
//! On iOS the native plugin is reached through the `USK*` C functions; every
//! other target gets a null store that reports purchasing as unavailable.

pub mod bridge;
pub mod callbacks;
pub mod catalog;
pub mod marshal;
pub mod registry;
pub mod traits;

#[cfg(target_os = "ios")]
pub mod ios;

#[cfg(not(target_os = "ios"))]
pub mod stub;

#[cfg(test)]
mod testing;

pub use bridge::StoreBridge;
pub use catalog::{NativeProductRecord, ProductCatalogEntry};
pub use marshal::{ForeignBuffer, ForeignRecord, marshal};
pub use registry::SingletonRegistry;
pub use traits::{StoreObserver, StoreService};

/// The store provider for the target operating system, chosen at build time.
pub fn platform_service() -> Box<dyn StoreService> {
    #[cfg(target_os = "ios")]
    {
        Box::new(ios::IosStoreService::new())
    }
    #[cfg(not(target_os = "ios"))]
    {
        Box::new(stub::NullStoreService)
    }
}
