// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Product catalog entries and the native record they are decoded from.

use std::ffi::{CStr, c_char};

use serde::Serialize;
use storekit_core::{MarshalError, ProductIdentifier};

use crate::marshal::ForeignRecord;

/// Store metadata for one product, as reported by the native store.
///
/// Only the bridge creates these, by decoding native records. Every field is
/// a display string: `price` is already localized with its currency symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductCatalogEntry {
    id: ProductIdentifier,
    title: String,
    price: String,
    description: String,
}

impl ProductCatalogEntry {
    pub(crate) fn new(
        id: ProductIdentifier,
        title: String,
        price: String,
        description: String,
    ) -> Self {
        Self {
            id,
            title,
            price,
            description,
        }
    }

    pub fn id(&self) -> &ProductIdentifier {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Localized price including the currency symbol, e.g. `"$4.99"`.
    pub fn price(&self) -> &str {
        &self.price
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Product record as laid out by the native plugin.
///
/// The record array is allocated with `malloc` and owned by the bridge once
/// handed over; the strings it points at stay owned by the native side.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct NativeProductRecord {
    pub identifier: *const c_char,
    pub title: *const c_char,
    pub price: *const c_char,
    pub description: *const c_char,
}

impl ForeignRecord for NativeProductRecord {
    type Output = ProductCatalogEntry;

    unsafe fn decode(&self, index: usize) -> Result<ProductCatalogEntry, MarshalError> {
        // SAFETY: forwarded trait contract, every field pointer is valid.
        unsafe {
            Ok(ProductCatalogEntry::new(
                read_field(self.identifier, index, "identifier")?.into(),
                read_field(self.title, index, "title")?,
                read_field(self.price, index, "price")?,
                read_field(self.description, index, "description")?,
            ))
        }
    }
}

/// Copy one NUL-terminated UTF-8 field out of native memory.
///
/// # Safety
///
/// `ptr` is null or points at a NUL-terminated string valid for reads.
unsafe fn read_field(
    ptr: *const c_char,
    index: usize,
    field: &'static str,
) -> Result<String, MarshalError> {
    if ptr.is_null() {
        return Err(MarshalError::NullField { index, field });
    }
    // SAFETY: non-null, NUL-terminated per the caller's contract.
    let raw = unsafe { CStr::from_ptr(ptr) };
    raw.to_str()
        .map(str::to_owned)
        .map_err(|_| MarshalError::InvalidUtf8 { index, field })
}
