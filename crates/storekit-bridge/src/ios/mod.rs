// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// iOS store provider.
//
// Forwards to the `USK*` C functions exported by the StoreKit plugin linked
// into the app. The plugin answers through the `storekit_on_*` entry points
// in `callbacks`, passing back the owner token it was given in `USKInit`.
//
// Identifiers are copied into `CString`s for the duration of each call; the
// plugin copies whatever it keeps.

#![cfg(target_os = "ios")]

use std::ffi::{CString, c_char};

use storekit_core::error::{Result, StoreError};
use storekit_core::{OwnerToken, ProductIdentifier};
use tracing::info;

use crate::traits::StoreService;

unsafe extern "C" {
    fn USKInit(owner: u64);
    fn USKCanMakePayments() -> bool;
    fn USKRequest(identifiers: *const *const c_char, count: i32);
    fn USKPurchase(identifier: *const c_char);
    fn USKRestore();
}

/// StoreKit-backed provider.
#[derive(Debug, Default)]
pub struct IosStoreService;

impl IosStoreService {
    pub fn new() -> Self {
        Self
    }
}

fn to_cstring(id: &ProductIdentifier) -> Result<CString> {
    CString::new(id.as_str()).map_err(|_| StoreError::InvalidIdentifier(id.as_str().to_owned()))
}

impl StoreService for IosStoreService {
    fn platform_name(&self) -> &str {
        "iOS StoreKit"
    }

    fn init(&self, owner: OwnerToken) {
        info!(%owner, "USKInit");
        // SAFETY: plain value argument.
        unsafe { USKInit(owner.0) }
    }

    fn can_make_payments(&self) -> bool {
        // SAFETY: no arguments; the plugin answers from cached state.
        unsafe { USKCanMakePayments() }
    }

    fn request(&self, identifiers: &[ProductIdentifier]) -> Result<()> {
        let owned = identifiers.iter().map(to_cstring).collect::<Result<Vec<_>>>()?;
        let count = i32::try_from(owned.len())
            .map_err(|_| StoreError::Native(format!("{} identifiers in one request", owned.len())))?;
        let pointers: Vec<*const c_char> = owned.iter().map(|s| s.as_ptr()).collect();

        info!(count, "USKRequest");
        // SAFETY: `pointers` holds `count` NUL-terminated strings owned by
        // `owned`, both alive until the call returns.
        unsafe { USKRequest(pointers.as_ptr(), count) }
        Ok(())
    }

    fn purchase(&self, identifier: &ProductIdentifier) -> Result<()> {
        let id = to_cstring(identifier)?;
        info!(%identifier, "USKPurchase");
        // SAFETY: `id` outlives the call.
        unsafe { USKPurchase(id.as_ptr()) }
        Ok(())
    }

    fn restore(&self) {
        info!("USKRestore");
        // SAFETY: no arguments.
        unsafe { USKRestore() }
    }
}
