// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer: the store session, the observer feeding it, and the
// entitlements it grants.

pub mod app_services;
pub mod data_dir;
pub mod entitlements;
pub mod observer;
