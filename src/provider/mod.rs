//! Service provider module for dependency injection.
//!
//! Contains the `ServiceProvider` type and related functionality for
//! resolving registered services from the container.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use once_cell::sync::OnceCell;

use crate::internal::{with_resolution_frame, BoxFutureUnit, DisposeBag};
use crate::registration::{AnyArc, Registry};
use crate::traits::{Resolver, ResolverCore};
use crate::{DiError, DiResult, Key, Lifetime};

pub mod context;
pub mod scope;
pub use context::ResolverContext;
pub use scope::Scope;

/// Service provider for resolving dependencies from the container.
///
/// Resolves services according to their registered lifetimes (Singleton,
/// Scoped, Transient) and manages the lifecycle of singleton services
/// including disposal. The host builds one provider at composition time and
/// every scene component resolution flows through it.
///
/// # Thread Safety
///
/// `ServiceProvider` is fully thread-safe and cheap to clone (it shares state
/// through an `Arc`). Singleton caches use `OnceCell`, so reads after first
/// initialization take no locks.
///
/// # Examples
///
/// ```
/// use scene_host::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct AssetServer { root: String }
/// struct AudioSystem { assets: Arc<AssetServer> }
///
/// let mut collection = ServiceCollection::new();
/// collection.add_singleton(AssetServer { root: "assets/".to_string() });
/// collection.add_transient_factory::<AudioSystem, _>(|resolver| {
///     AudioSystem { assets: resolver.get_required::<AssetServer>() }
/// });
///
/// let provider = collection.build();
/// let audio = provider.get_required::<AudioSystem>();
/// assert_eq!(audio.assets.root, "assets/");
/// ```
pub struct ServiceProvider {
    inner: Arc<ProviderInner>,
}

pub(crate) struct ProviderInner {
    pub registry: Registry,
    /// Cache for multi-binding singletons, keyed by `Key::MultiTrait`
    pub singletons: Mutex<HashMap<Key, AnyArc>>,
    pub root_disposers: Mutex<DisposeBag>,
}

impl ServiceProvider {
    #[inline]
    pub(crate) fn inner(&self) -> &ProviderInner {
        &self.inner
    }

    pub(crate) fn new(registry: Registry) -> Self {
        Self {
            inner: Arc::new(ProviderInner {
                registry,
                singletons: Mutex::new(HashMap::new()),
                root_disposers: Mutex::new(DisposeBag::default()),
            }),
        }
    }

    /// Creates a new scope for resolving scoped services.
    ///
    /// Scoped services are cached per scope. Each scope maintains its own
    /// cache while still accessing singleton services from the root provider.
    ///
    /// # Examples
    ///
    /// ```
    /// use scene_host::{ServiceCollection, Resolver};
    /// use std::sync::{Arc, Mutex};
    ///
    /// #[derive(Debug)]
    /// struct SessionId(String);
    ///
    /// let mut collection = ServiceCollection::new();
    /// let counter = Arc::new(Mutex::new(0));
    /// let counter_clone = counter.clone();
    ///
    /// collection.add_scoped_factory::<SessionId, _>(move |_| {
    ///     let mut c = counter_clone.lock().unwrap();
    ///     *c += 1;
    ///     SessionId(format!("session-{}", *c))
    /// });
    ///
    /// let provider = collection.build();
    ///
    /// let scope1 = provider.create_scope();
    /// let scope2 = provider.create_scope();
    ///
    /// let s1a = scope1.get_required::<SessionId>();
    /// let s1b = scope1.get_required::<SessionId>();
    /// let s2 = scope2.get_required::<SessionId>();
    ///
    /// assert!(Arc::ptr_eq(&s1a, &s1b));
    /// assert!(!Arc::ptr_eq(&s1a, &s2));
    /// ```
    pub fn create_scope(&self) -> Scope {
        let scoped_count = self.inner().registry.scoped_count;
        let scoped_cells: Box<[OnceCell<AnyArc>]> = (0..scoped_count)
            .map(|_| OnceCell::new())
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Scope {
            root: self.clone(),
            scoped_cells,
            scoped_disposers: Mutex::new(DisposeBag::default()),
        }
    }

    /// Disposes all registered disposal hooks in LIFO order.
    ///
    /// Runs all asynchronous disposal hooks first (in reverse order),
    /// followed by all synchronous disposal hooks (in reverse order).
    pub async fn dispose_all(&self) {
        let mut bag = std::mem::take(&mut *self.inner().root_disposers.lock().unwrap());
        bag.run_all_async_reverse().await;
        bag.run_all_sync_reverse();
    }
}

impl Clone for ServiceProvider {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl ResolverCore for ServiceProvider {
    fn resolve_any(&self, key: &Key) -> DiResult<AnyArc> {
        let name = key.display_name();
        with_resolution_frame(name, || self.resolve_any_impl(key))
    }

    fn resolve_many(&self, key: &Key) -> DiResult<Vec<AnyArc>> {
        if let Key::Trait(_) = key {
            let name = key.display_name();
            with_resolution_frame(name, || self.resolve_many_impl(key))
        } else {
            Ok(Vec::new())
        }
    }

    fn push_sync_disposer(&self, f: Box<dyn FnOnce() + Send>) {
        self.inner().root_disposers.lock().unwrap().push_sync(f);
    }

    fn push_async_disposer(&self, f: Box<dyn FnOnce() -> BoxFutureUnit + Send>) {
        self.inner().root_disposers.lock().unwrap().push_async(f);
    }
}

impl ServiceProvider {
    /// Singleton resolution through the registration's embedded `OnceCell`.
    #[inline(always)]
    pub(crate) fn resolve_singleton(
        &self,
        reg: &crate::registration::Registration,
    ) -> DiResult<AnyArc> {
        if let Some(cell) = &reg.single_runtime {
            // Ctor runs inside the cell init so concurrent first
            // resolutions invoke it at most once; same-thread cycles
            // error in the resolution frame before re-entering the cell
            let stored = cell.get_or_try_init(|| {
                let ctx = ResolverContext::new(self);
                (reg.ctor)(&ctx)
            })?;
            return Ok(stored.clone());
        }

        // No cell means the registration was not built as a singleton.
        let ctx = ResolverContext::new(self);
        (reg.ctor)(&ctx)
    }

    fn resolve_any_impl(&self, key: &Key) -> DiResult<AnyArc> {
        let name = key.display_name();

        if let Some(reg) = self.inner().registry.get(key) {
            match reg.lifetime {
                Lifetime::Singleton => self.resolve_singleton(reg),
                Lifetime::Scoped => Err(DiError::WrongLifetime(
                    "Cannot resolve scoped service from root provider",
                )),
                Lifetime::Transient => {
                    let ctx = ResolverContext::new(self);
                    (reg.ctor)(&ctx)
                }
            }
        } else if let Key::Trait(trait_name) = key {
            // Fallback: if the trait has multi-bindings, return the last as single
            match self.inner().registry.get_many(trait_name).and_then(|r| r.last()) {
                Some(last) => {
                    let ctx = ResolverContext::new(self);
                    (last.ctor)(&ctx)
                }
                None => Err(DiError::NotFound(name)),
            }
        } else {
            Err(DiError::NotFound(name))
        }
    }

    fn resolve_many_impl(&self, key: &Key) -> DiResult<Vec<AnyArc>> {
        let trait_name = match key {
            Key::Trait(name) => *name,
            _ => return Ok(Vec::new()),
        };
        let regs = match self.inner().registry.get_many(trait_name) {
            Some(regs) => regs,
            None => return Ok(Vec::new()),
        };

        let mut results = Vec::with_capacity(regs.len());
        for (i, reg) in regs.iter().enumerate() {
            let multi_key = Key::MultiTrait(trait_name, i);

            let value = match reg.lifetime {
                Lifetime::Singleton => {
                    // Never hold the cache lock while invoking the factory
                    {
                        let cache = self.inner().singletons.lock().unwrap();
                        if let Some(cached) = cache.get(&multi_key) {
                            results.push(cached.clone());
                            continue;
                        }
                    }

                    let ctx = ResolverContext::new(self);
                    let value = (reg.ctor)(&ctx)?;

                    let mut cache = self.inner().singletons.lock().unwrap();
                    match cache.get(&multi_key) {
                        Some(cached) => cached.clone(),
                        None => {
                            cache.insert(multi_key, value.clone());
                            value
                        }
                    }
                }
                Lifetime::Scoped => {
                    return Err(DiError::WrongLifetime(
                        "Cannot resolve scoped service from root provider",
                    ));
                }
                Lifetime::Transient => {
                    let ctx = ResolverContext::new(self);
                    (reg.ctor)(&ctx)?
                }
            };

            results.push(value);
        }

        Ok(results)
    }
}

impl Resolver for ServiceProvider {}
