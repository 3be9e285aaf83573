//! Scoped service resolution and lifecycle management.

use std::sync::Mutex;

use once_cell::sync::OnceCell;

use super::{ResolverContext, ServiceProvider};
use crate::internal::{with_resolution_frame, BoxFutureUnit, DisposeBag};
use crate::registration::AnyArc;
use crate::traits::{Resolver, ResolverCore};
use crate::{DiError, DiResult, Key, Lifetime};

/// Scoped service container.
///
/// A `Scope` provides isolated dependency resolution for scoped services
/// while still accessing singleton services from the root provider. In the
/// scene hosting model every scope is paired with a scope-root node; the
/// pairing type is `SceneScope`, which disposes this container scope before
/// destroying the node.
///
/// # Lifetime Behavior
///
/// - **Singleton**: resolved and cached in the root provider, shared across
///   all scopes
/// - **Scoped**: resolved and cached within this specific scope
/// - **Transient**: created fresh on every resolution
///
/// # Examples
///
/// ```
/// use scene_host::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// #[derive(Debug)]
/// struct SessionState(String);
///
/// #[derive(Debug)]
/// struct Hud {
///     session: Arc<SessionState>,
/// }
///
/// let mut collection = ServiceCollection::new();
/// collection.add_scoped_factory::<SessionState, _>(|_| {
///     SessionState("session-123".to_string())
/// });
/// collection.add_transient_factory::<Hud, _>(|resolver| {
///     Hud {
///         session: resolver.get_required::<SessionState>(),
///     }
/// });
///
/// let provider = collection.build();
/// let scope = provider.create_scope();
///
/// let hud1 = scope.get_required::<Hud>();
/// let hud2 = scope.get_required::<Hud>();
/// assert!(Arc::ptr_eq(&hud1.session, &hud2.session));
/// ```
pub struct Scope {
    pub(crate) root: ServiceProvider,
    // Slot-based scoped storage for O(1) access
    pub(crate) scoped_cells: Box<[OnceCell<AnyArc>]>,
    pub(crate) scoped_disposers: Mutex<DisposeBag>,
}

impl ResolverCore for Scope {
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
        self.scoped_disposers.lock().unwrap().push_sync(f);
    }

    fn push_async_disposer(&self, f: Box<dyn FnOnce() -> BoxFutureUnit + Send>) {
        self.scoped_disposers.lock().unwrap().push_async(f);
    }
}

impl Scope {
    /// Slot-based scoped resolution.
    #[inline(always)]
    fn resolve_scoped(&self, reg: &crate::registration::Registration) -> DiResult<AnyArc> {
        if let Some(slot) = reg.scoped_slot {
            let cell = &self.scoped_cells[slot];

            // Ctor runs inside the cell init so concurrent first
            // resolutions in this scope invoke it at most once
            let stored = cell.get_or_try_init(|| {
                let ctx = ResolverContext::new(self);
                (reg.ctor)(&ctx)
            })?;
            return Ok(stored.clone());
        }

        // No slot assigned, treat as transient
        let ctx = ResolverContext::new(self);
        (reg.ctor)(&ctx)
    }

    fn resolve_any_impl(&self, key: &Key) -> DiResult<AnyArc> {
        let name = key.display_name();

        if let Some(reg) = self.root.inner().registry.get(key) {
            match reg.lifetime {
                Lifetime::Singleton => self.root.resolve_singleton(reg),
                Lifetime::Scoped => self.resolve_scoped(reg),
                Lifetime::Transient => {
                    // The scope is the resolver so nested scoped deps cache here
                    let ctx = ResolverContext::new(self);
                    (reg.ctor)(&ctx)
                }
            }
        } else if let Key::Trait(trait_name) = key {
            match self
                .root
                .inner()
                .registry
                .get_many(trait_name)
                .and_then(|r| r.last())
            {
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
        let regs = match self.root.inner().registry.get_many(trait_name) {
            Some(regs) => regs,
            None => return Ok(Vec::new()),
        };

        let mut results = Vec::with_capacity(regs.len());
        for (i, reg) in regs.iter().enumerate() {
            let multi_key = Key::MultiTrait(trait_name, i);

            let value = match reg.lifetime {
                Lifetime::Singleton => {
                    {
                        let cache = self.root.inner().singletons.lock().unwrap();
                        if let Some(cached) = cache.get(&multi_key) {
                            results.push(cached.clone());
                            continue;
                        }
                    }

                    let ctx = ResolverContext::new(self);
                    let value = (reg.ctor)(&ctx)?;

                    let mut cache = self.root.inner().singletons.lock().unwrap();
                    match cache.get(&multi_key) {
                        Some(cached) => cached.clone(),
                        None => {
                            cache.insert(multi_key, value.clone());
                            value
                        }
                    }
                }
                Lifetime::Scoped => self.resolve_scoped(reg)?,
                Lifetime::Transient => {
                    let ctx = ResolverContext::new(self);
                    (reg.ctor)(&ctx)?
                }
            };

            results.push(value);
        }

        Ok(results)
    }

    /// Disposes all scoped disposal hooks in LIFO order.
    ///
    /// Runs all asynchronous disposal hooks first (in reverse order),
    /// followed by all synchronous disposal hooks (in reverse order).
    pub async fn dispose_all(&self) {
        let mut bag = std::mem::take(&mut *self.scoped_disposers.lock().unwrap());
        bag.run_all_async_reverse().await;
        bag.run_all_sync_reverse();
    }
}

impl Resolver for Scope {}
