//! Resolver context for dependency injection.

use crate::internal::BoxFutureUnit;
use crate::key::Key;
use crate::registration::AnyArc;
use crate::traits::{Resolver, ResolverCore};
use crate::DiResult;

/// Context passed to factory functions for resolving dependencies.
///
/// `ResolverContext` wraps a resolver (`ServiceProvider` or `Scope`) and
/// provides the interface that factory functions and injection methods use to
/// access other services, independent of where resolution happens.
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
/// let mut services = ServiceCollection::new();
/// services.add_singleton(AssetServer {
///     root: "assets/".to_string(),
/// });
/// services.add_transient_factory::<AudioSystem, _>(|resolver| {
///     AudioSystem {
///         assets: resolver.get_required::<AssetServer>(),
///     }
/// });
/// ```
pub struct ResolverContext<'a> {
    resolver: &'a dyn ResolverCore,
}

impl<'a> ResolverContext<'a> {
    pub(crate) fn new<T>(resolver: &'a T) -> Self
    where
        T: ResolverCore,
    {
        Self { resolver }
    }
}

impl<'a> ResolverCore for ResolverContext<'a> {
    fn resolve_any(&self, key: &Key) -> DiResult<AnyArc> {
        self.resolver.resolve_any(key)
    }

    fn resolve_many(&self, key: &Key) -> DiResult<Vec<AnyArc>> {
        self.resolver.resolve_many(key)
    }

    fn push_sync_disposer(&self, f: Box<dyn FnOnce() + Send>) {
        self.resolver.push_sync_disposer(f);
    }

    fn push_async_disposer(&self, f: Box<dyn FnOnce() -> BoxFutureUnit + Send>) {
        self.resolver.push_async_disposer(f);
    }
}

impl<'a> Resolver for ResolverContext<'a> {}
