// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Foreign record arrays.
//
// The native side hands us a contiguous block of fixed-size `#[repr(C)]`
// records it allocated itself. `ForeignBuffer` owns that block for the
// duration of one `marshal` call and releases it from `Drop`, so the
// release happens exactly once on every exit path: success, skipped
// (empty), decode error, or unwinding out of a decoder.
//
// Pointer arithmetic never leaves `usize`: records are addressed through a
// slice built from the original pointer, never through an integer address
// that could be narrowed on the way.

use std::ptr;
use std::slice;

use storekit_core::MarshalError;
use tracing::{debug, trace};

type Releaser<R> = Box<dyn FnOnce(*mut R)>;

/// A fixed-size record laid out by the native side.
///
/// The record type *is* the layout descriptor: record `i` lives at
/// `address + i * size_of::<Self>()`.
pub trait ForeignRecord: Sized {
    /// Owned value produced from one record.
    type Output;

    /// Decode one record into an owned value.
    ///
    /// `index` is the record's position in its buffer, used for error
    /// reporting only.
    ///
    /// # Safety
    ///
    /// Any pointers embedded in the record must be valid for reads for the
    /// duration of the call. `ForeignBuffer`'s constructors require this of
    /// their callers.
    unsafe fn decode(&self, index: usize) -> Result<Self::Output, MarshalError>;
}

/// Owned handle over a foreign-allocated array of `R` records.
pub struct ForeignBuffer<R> {
    ptr: *mut R,
    len: usize,
    release: Option<Releaser<R>>,
}

impl<R: 'static> ForeignBuffer<R> {
    /// Take ownership of `len` records at `ptr`, to be freed by `release`.
    ///
    /// `release` runs exactly once when the buffer is dropped, unless `ptr`
    /// is null (there is nothing to release).
    ///
    /// # Safety
    ///
    /// When `ptr` is non-null and `len > 0`, `ptr` must be valid for reads of
    /// `len` records, and every pointer embedded in those records must stay
    /// valid until the buffer is dropped. Nothing else may free `ptr`.
    pub unsafe fn from_raw_parts(
        ptr: *mut R,
        len: usize,
        release: impl FnOnce(*mut R) + 'static,
    ) -> Self {
        Self {
            ptr,
            len,
            release: Some(Box::new(release)),
        }
    }

    /// Take ownership of a `malloc`-allocated array, released with `free`.
    ///
    /// # Safety
    ///
    /// Same contract as [`ForeignBuffer::from_raw_parts`], and `ptr` must
    /// come from the C allocator (or be null).
    pub unsafe fn from_malloc(ptr: *mut R, len: usize) -> Self {
        let release = |p: *mut R| {
            // SAFETY: the caller promised `p` came from malloc and that we
            // are its only owner; Drop calls this at most once.
            unsafe { libc::free(p.cast()) }
        };
        // SAFETY: forwarded caller contract.
        unsafe { Self::from_raw_parts(ptr, len, release) }
    }

    /// Wrap records allocated on the Rust side. Used by Rust-implemented
    /// store services.
    pub fn from_boxed(records: Box<[R]>) -> Self {
        let len = records.len();
        let ptr = Box::into_raw(records) as *mut R;
        let release = move |p: *mut R| {
            // SAFETY: `p` is the pointer leaked just above with the same
            // length; it is rebuilt and dropped exactly once.
            drop(unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(p, len)) });
        };
        // SAFETY: a leaked boxed slice is valid for `len` reads until the
        // releaser rebuilds it.
        unsafe { Self::from_raw_parts(ptr, len, release) }
    }
}

impl<R> ForeignBuffer<R> {
    /// A buffer with no backing memory.
    pub fn null() -> Self {
        Self {
            ptr: ptr::null_mut(),
            len: 0,
            release: None,
        }
    }

    /// Full-width address of the first record.
    pub fn address(&self) -> usize {
        self.ptr.addr()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// True when there is nothing to decode (null address or zero count).
    pub fn is_empty(&self) -> bool {
        self.ptr.is_null() || self.len == 0
    }

    /// View the records as a slice after checking the buffer's geometry.
    fn records(&self) -> Result<&[R], MarshalError> {
        let record_size = size_of::<R>();
        if record_size != 0 && self.len > isize::MAX as usize / record_size {
            return Err(MarshalError::TooLarge {
                count: self.len,
                record_size,
            });
        }
        if !self.ptr.is_aligned() {
            return Err(MarshalError::Misaligned {
                address: self.address(),
                align: align_of::<R>(),
            });
        }
        // SAFETY: non-null (checked by the caller via is_empty), aligned, and
        // the total size fits in isize. Validity for `len` reads is the
        // constructor's contract.
        Ok(unsafe { slice::from_raw_parts(self.ptr, self.len) })
    }
}

impl<R> Drop for ForeignBuffer<R> {
    fn drop(&mut self) {
        if self.ptr.is_null() {
            return;
        }
        if let Some(release) = self.release.take() {
            trace!(address = self.address(), len = self.len, "releasing foreign buffer");
            release(self.ptr);
        }
    }
}

impl<R> std::fmt::Debug for ForeignBuffer<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForeignBuffer")
            .field("address", &format_args!("{:#x}", self.address()))
            .field("len", &self.len)
            .field("record_size", &size_of::<R>())
            .finish()
    }
}

/// Copy every record of `buffer` into owned values, then release it.
///
/// A null or zero-length buffer yields `default_on_empty` untouched. The
/// first record that fails to decode aborts the copy with an error naming
/// its index. In all cases the buffer is released before this returns.
pub fn marshal<R: ForeignRecord>(
    buffer: ForeignBuffer<R>,
    default_on_empty: Vec<R::Output>,
) -> Result<Vec<R::Output>, MarshalError> {
    if buffer.is_empty() {
        trace!("empty foreign buffer, using default");
        return Ok(default_on_empty);
    }

    let records = buffer.records()?;
    let mut decoded = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        // SAFETY: embedded pointers are covered by the buffer's constructor
        // contract and the buffer outlives this loop.
        decoded.push(unsafe { record.decode(index) }?);
    }

    debug!(count = decoded.len(), "marshaled foreign records");
    Ok(decoded)
}
