//! Service registration types.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::error::DiResult;
use crate::key::Key;
use crate::lifetime::Lifetime;

pub(crate) use crate::provider::ResolverContext;

// Type-erased Arc for storage
pub(crate) type AnyArc = Arc<dyn Any + Send + Sync>;

/// Service registration with lifetime and constructor
pub(crate) struct Registration {
    pub(crate) lifetime: Lifetime,
    pub(crate) ctor: Arc<dyn for<'a> Fn(&ResolverContext<'a>) -> DiResult<AnyArc> + Send + Sync>,
    /// Singleton cache, lock-free after initialization
    pub(crate) single_runtime: Option<OnceCell<AnyArc>>,
    /// Scoped slot index for O(1) scoped service resolution
    pub(crate) scoped_slot: Option<usize>,
}

impl Registration {
    pub(crate) fn new(
        lifetime: Lifetime,
        ctor: Arc<dyn for<'a> Fn(&ResolverContext<'a>) -> DiResult<AnyArc> + Send + Sync>,
    ) -> Self {
        let single_runtime = match lifetime {
            Lifetime::Singleton => Some(OnceCell::new()),
            _ => None,
        };
        Self {
            lifetime,
            ctor,
            single_runtime,
            scoped_slot: None,
        }
    }
}

/// Service registry holding all registrations
pub(crate) struct Registry {
    /// Single-binding registrations, last write wins
    pub(crate) one: HashMap<Key, Registration>,
    /// Multi-binding registrations, append-only, registration order preserved
    pub(crate) many: HashMap<&'static str, Vec<Registration>>,
    /// Total count of scoped registrations for slot allocation
    pub(crate) scoped_count: usize,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            one: HashMap::new(),
            many: HashMap::new(),
            scoped_count: 0,
        }
    }

    pub(crate) fn insert(&mut self, key: Key, registration: Registration) {
        self.one.insert(key, registration);
    }

    pub(crate) fn append_multi(&mut self, trait_name: &'static str, registration: Registration) {
        self.many.entry(trait_name).or_default().push(registration);
    }

    #[inline(always)]
    pub(crate) fn get(&self, key: &Key) -> Option<&Registration> {
        self.one.get(key)
    }

    pub(crate) fn get_many(&self, trait_name: &'static str) -> Option<&Vec<Registration>> {
        self.many.get(trait_name)
    }

    /// Finalizes the registry by assigning scoped slot indices.
    pub(crate) fn finalize(&mut self) {
        let mut next_scoped_slot = 0;

        for reg in self.one.values_mut() {
            if reg.lifetime == Lifetime::Scoped {
                reg.scoped_slot = Some(next_scoped_slot);
                next_scoped_slot += 1;
            }
        }

        for regs in self.many.values_mut() {
            for reg in regs.iter_mut() {
                if reg.lifetime == Lifetime::Scoped {
                    reg.scoped_slot = Some(next_scoped_slot);
                    next_scoped_slot += 1;
                }
            }
        }

        self.scoped_count = next_scoped_slot;
    }
}
