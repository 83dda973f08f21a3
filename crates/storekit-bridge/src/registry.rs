// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Process-lifetime singletons keyed by type.
//
// Each type gets its own `OnceLock` slot, so concurrent first access builds
// exactly one instance and every caller gets the same `&'static` reference.
// The map lock is only held while looking up a slot, never while running a
// constructor, so a constructor may itself ask the registry for a different
// type. Asking for its own type from inside its constructor deadlocks.
//
// Instances are never dropped; the OS reclaims them at process exit.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{LazyLock, Mutex, OnceLock, PoisonError};

use tracing::debug;

type Slot = OnceLock<Box<dyn Any + Send + Sync>>;

static GLOBAL: LazyLock<SingletonRegistry> = LazyLock::new(SingletonRegistry::new);

/// Lazily-constructed, never-destroyed instances, one per type.
///
/// [`SingletonRegistry::global`] is the only registry outside this crate, so
/// each type has at most one instance per process. There is no public
/// constructor:
///
/// ```compile_fail
/// let second = storekit_bridge::SingletonRegistry::new();
/// ```
///
/// ```compile_fail
/// let second: storekit_bridge::SingletonRegistry = Default::default();
/// ```
pub struct SingletonRegistry {
    slots: Mutex<HashMap<TypeId, &'static Slot>>,
}

impl SingletonRegistry {
    fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// The process-wide registry.
    pub fn global() -> &'static SingletonRegistry {
        &GLOBAL
    }

    /// Return the sole instance of `T`, building it with `T::default()` on
    /// first use.
    pub fn get_or_create<T>(&self) -> &'static T
    where
        T: Default + Send + Sync + 'static,
    {
        let slot = self.slot_for(TypeId::of::<T>());
        let instance = slot.get_or_init(|| {
            debug!(type_name = std::any::type_name::<T>(), "creating singleton");
            Box::new(T::default())
        });
        match (**instance).downcast_ref::<T>() {
            Some(instance) => instance,
            None => unreachable!("singleton slot is keyed by its own TypeId"),
        }
    }

    fn slot_for(&self, id: TypeId) -> &'static Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        *slots
            .entry(id)
            .or_insert_with(|| &*Box::leak(Box::new(OnceLock::new())))
    }
}
