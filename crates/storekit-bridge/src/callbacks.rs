// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Native → bridge callback routing.
//
// The native plugin is handed an opaque `u64` owner token at init and passes
// it back with every callback. Tokens map to weak bridge references, so a
// callback arriving after its bridge is gone is dropped instead of touching
// freed memory.
//
// Every entry point catches panics: nothing unwinds into the caller's C
// frames.

use std::collections::HashMap;
use std::ffi::{CStr, c_char};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, Mutex, PoisonError, Weak};

use storekit_core::{MarshalError, OwnerToken, ProductIdentifier};
use tracing::{debug, error, warn};

use crate::bridge::StoreBridge;
use crate::catalog::NativeProductRecord;
use crate::marshal::ForeignBuffer;

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

static TARGETS: LazyLock<Mutex<HashMap<u64, Weak<StoreBridge>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

pub(crate) fn next_token() -> OwnerToken {
    OwnerToken(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
}

pub(crate) fn register(bridge: &Arc<StoreBridge>) {
    let mut targets = TARGETS.lock().unwrap_or_else(PoisonError::into_inner);
    targets.insert(bridge.owner_token().0, Arc::downgrade(bridge));
}

pub(crate) fn unregister(token: OwnerToken) {
    let mut targets = TARGETS.lock().unwrap_or_else(PoisonError::into_inner);
    targets.remove(&token.0);
}

fn resolve(owner: u64) -> Option<Arc<StoreBridge>> {
    let targets = TARGETS.lock().unwrap_or_else(PoisonError::into_inner);
    let bridge = targets.get(&owner).and_then(Weak::upgrade);
    if bridge.is_none() {
        debug!(token = %OwnerToken(owner), "callback for unknown store bridge dropped");
    }
    bridge
}

/// Run an entry point body, swallowing any panic.
fn guard(entry: &'static str, body: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(body)).is_err() {
        error!(entry, "panic in store callback suppressed at the native boundary");
    }
}

/// Copy a native string, replacing invalid UTF-8. Null becomes empty.
///
/// # Safety
///
/// `ptr` is null or a NUL-terminated string valid for reads.
unsafe fn lossy_string(ptr: *const c_char, entry: &'static str) -> String {
    if ptr.is_null() {
        warn!(entry, "null string from native store, using empty string");
        return String::new();
    }
    // SAFETY: non-null and NUL-terminated per the caller's contract.
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

/// Deliver a catalog.
///
/// Takes ownership of `records`, which must come from `malloc`; it is freed
/// before this returns whether or not the token still resolves.
///
/// # Safety
///
/// `records` is null or points at `count` initialised records whose string
/// fields are null or NUL-terminated, all valid for the duration of the call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn storekit_on_request_success(
    owner: u64,
    records: *mut NativeProductRecord,
    count: i32,
) {
    guard("storekit_on_request_success", || {
        let (len, bad_count) = match usize::try_from(count) {
            Ok(len) => (len, None),
            Err(_) => (0, Some(MarshalError::NegativeCount(i64::from(count)))),
        };
        // SAFETY: forwarded caller contract; ownership of the malloc block
        // passes to the buffer, which frees it on drop.
        let buffer = unsafe { ForeignBuffer::from_malloc(records, len) };

        let Some(bridge) = resolve(owner) else {
            return;
        };
        match bad_count {
            Some(e) => {
                drop(buffer);
                bridge.handle_malformed_catalog(e);
            }
            None => bridge.handle_request_success(buffer),
        }
    });
}

/// # Safety
///
/// `message` is null or a NUL-terminated string valid for the call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn storekit_on_request_failure(owner: u64, message: *const c_char) {
    guard("storekit_on_request_failure", || {
        // SAFETY: forwarded caller contract.
        let message = unsafe { lossy_string(message, "storekit_on_request_failure") };
        if let Some(bridge) = resolve(owner) {
            bridge.handle_request_failure(&message);
        }
    });
}

/// # Safety
///
/// `identifier` is null or a NUL-terminated string valid for the call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn storekit_on_purchase_success(owner: u64, identifier: *const c_char) {
    guard("storekit_on_purchase_success", || {
        // SAFETY: forwarded caller contract.
        let id = unsafe { identifier_arg(identifier, "storekit_on_purchase_success") };
        if let Some(bridge) = resolve(owner) {
            bridge.handle_purchase_success(&id);
        }
    });
}

/// # Safety
///
/// `identifier` is null or a NUL-terminated string valid for the call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn storekit_on_purchase_failure(owner: u64, identifier: *const c_char) {
    guard("storekit_on_purchase_failure", || {
        // SAFETY: forwarded caller contract.
        let id = unsafe { identifier_arg(identifier, "storekit_on_purchase_failure") };
        if let Some(bridge) = resolve(owner) {
            bridge.handle_purchase_failure(&id);
        }
    });
}

/// One restored product. Called once per item.
///
/// # Safety
///
/// `identifier` is null or a NUL-terminated string valid for the call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn storekit_on_restore_item(owner: u64, identifier: *const c_char) {
    guard("storekit_on_restore_item", || {
        // SAFETY: forwarded caller contract.
        let id = unsafe { identifier_arg(identifier, "storekit_on_restore_item") };
        if let Some(bridge) = resolve(owner) {
            bridge.handle_restore_item(&id);
        }
    });
}

/// # Safety
///
/// Same as [`lossy_string`].
unsafe fn identifier_arg(ptr: *const c_char, entry: &'static str) -> ProductIdentifier {
    // SAFETY: forwarded caller contract.
    ProductIdentifier::from(unsafe { lossy_string(ptr, entry) })
}
