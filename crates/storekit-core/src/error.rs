// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for the StoreKit bridge.

use thiserror::Error;

/// Top-level error type for bridge operations.
///
/// Native-reported failures (request errors, failed purchases) are *not*
/// represented here: they travel verbatim to the observer as callbacks.
#[derive(Debug, Error)]
pub enum StoreError {
    // -- Outbound native calls --
    #[error("product identifier cannot cross the native boundary: {0:?}")]
    InvalidIdentifier(String),

    #[error("native store error: {0}")]
    Native(String),

    #[error("store is not available on this platform")]
    PlatformUnavailable,

    // -- Application --
    #[error("no store response within {0}s")]
    Timeout(u64),

    #[error("invalid configuration: {0}")]
    Config(String),

    // -- Configuration / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure while copying a foreign record array into owned values.
///
/// Always recoverable: the foreign buffer has been released by the time
/// this error is observed. It reaches the application through
/// `StoreObserver::on_marshal_failure`, never as a `StoreError`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarshalError {
    #[error("negative element count {0}")]
    NegativeCount(i64),

    #[error("buffer of {count} records of {record_size} bytes exceeds the address space")]
    TooLarge { count: usize, record_size: usize },

    #[error("buffer address {address:#x} is not aligned to {align} bytes")]
    Misaligned { address: usize, align: usize },

    #[error("record {index}: field `{field}` is null")]
    NullField { index: usize, field: &'static str },

    #[error("record {index}: field `{field}` is not valid UTF-8")]
    InvalidUtf8 { index: usize, field: &'static str },
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, StoreError>;
