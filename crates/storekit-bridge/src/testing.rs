// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Test doubles shared by the bridge and callback tests.

use std::ffi::CString;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use storekit_core::error::Result;
use storekit_core::{MarshalError, OwnerToken, ProductIdentifier, StoreError};

use crate::catalog::{NativeProductRecord, ProductCatalogEntry};
use crate::marshal::ForeignBuffer;
use crate::traits::{StoreObserver, StoreService};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Init(OwnerToken),
    Request(Vec<ProductIdentifier>),
    Purchase(ProductIdentifier),
    Restore,
}

/// Store that records every call and rejects identifiers containing NUL,
/// the way the native provider does.
pub struct RecordingService {
    available: bool,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl RecordingService {
    pub fn available() -> (Self, Arc<Mutex<Vec<Call>>>) {
        Self::with_availability(true)
    }

    pub fn unavailable() -> (Self, Arc<Mutex<Vec<Call>>>) {
        Self::with_availability(false)
    }

    fn with_availability(available: bool) -> (Self, Arc<Mutex<Vec<Call>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let service = Self {
            available,
            calls: Arc::clone(&calls),
        };
        (service, calls)
    }

    fn check(id: &ProductIdentifier) -> Result<()> {
        if id.as_str().contains('\0') {
            return Err(StoreError::InvalidIdentifier(id.as_str().to_owned()));
        }
        Ok(())
    }
}

impl StoreService for RecordingService {
    fn platform_name(&self) -> &str {
        "recording"
    }

    fn init(&self, owner: OwnerToken) {
        self.calls.lock().unwrap().push(Call::Init(owner));
    }

    fn can_make_payments(&self) -> bool {
        self.available
    }

    fn request(&self, identifiers: &[ProductIdentifier]) -> Result<()> {
        identifiers.iter().try_for_each(Self::check)?;
        self.calls.lock().unwrap().push(Call::Request(identifiers.to_vec()));
        Ok(())
    }

    fn purchase(&self, identifier: &ProductIdentifier) -> Result<()> {
        Self::check(identifier)?;
        self.calls.lock().unwrap().push(Call::Purchase(identifier.clone()));
        Ok(())
    }

    fn restore(&self) {
        self.calls.lock().unwrap().push(Call::Restore);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    RequestSuccess(Vec<ProductCatalogEntry>),
    RequestFailure(String),
    PurchaseSuccess(ProductIdentifier),
    PurchaseFailure(ProductIdentifier),
    Restore(ProductIdentifier),
    MarshalFailure(MarshalError),
}

#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Event>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl StoreObserver for RecordingObserver {
    fn on_request_success(&self, catalog: Vec<ProductCatalogEntry>) {
        self.push(Event::RequestSuccess(catalog));
    }

    fn on_request_failure(&self, error: &str) {
        self.push(Event::RequestFailure(error.to_owned()));
    }

    fn on_purchase_success(&self, identifier: &ProductIdentifier) {
        self.push(Event::PurchaseSuccess(identifier.clone()));
    }

    fn on_purchase_failure(&self, identifier: &ProductIdentifier) {
        self.push(Event::PurchaseFailure(identifier.clone()));
    }

    fn on_restore(&self, identifier: &ProductIdentifier) {
        self.push(Event::Restore(identifier.clone()));
    }

    fn on_marshal_failure(&self, error: &MarshalError) {
        self.push(Event::MarshalFailure(error.clone()));
    }
}

/// Native product records backed by Rust-owned strings.
///
/// The fixture owns the strings; buffers built from it borrow the record
/// array and must be consumed before the fixture is dropped.
pub struct RecordFixture {
    _strings: Vec<CString>,
    pub records: Vec<NativeProductRecord>,
}

impl RecordFixture {
    pub fn new(rows: &[[&str; 4]]) -> Self {
        let strings: Vec<CString> = rows
            .iter()
            .flatten()
            .map(|s| CString::new(*s).expect("no interior NUL"))
            .collect();
        let records = strings
            .chunks_exact(4)
            .map(|f| NativeProductRecord {
                identifier: f[0].as_ptr(),
                title: f[1].as_ptr(),
                price: f[2].as_ptr(),
                description: f[3].as_ptr(),
            })
            .collect();
        Self {
            _strings: strings,
            records,
        }
    }

    /// A buffer over the fixture's records whose release bumps `releases`.
    pub fn buffer(&mut self, releases: &Arc<AtomicUsize>) -> ForeignBuffer<NativeProductRecord> {
        let releases = Arc::clone(releases);
        // SAFETY: the records and their strings live in `self`, which the
        // tests keep alive until the buffer has been consumed. The release
        // closure only counts; the memory stays owned by the fixture.
        unsafe {
            ForeignBuffer::from_raw_parts(self.records.as_mut_ptr(), self.records.len(), move |_| {
                releases.fetch_add(1, Ordering::SeqCst);
            })
        }
    }

    /// Copy the records into a `malloc` block, for the C entry points.
    pub fn malloc_copy(&self) -> *mut NativeProductRecord {
        let bytes = size_of::<NativeProductRecord>() * self.records.len().max(1);
        // SAFETY: `bytes` is non-zero; the copy fits in the allocation.
        unsafe {
            let block = libc::malloc(bytes).cast::<NativeProductRecord>();
            assert!(!block.is_null(), "malloc failed");
            std::ptr::copy_nonoverlapping(self.records.as_ptr(), block, self.records.len());
            block
        }
    }
}
