//! Disposal traits for resource cleanup.

/// Trait for synchronous resource disposal.
///
/// Implement this trait for services that need structured teardown (flushing
/// caches, closing handles). Disposal hooks run in LIFO order when the owning
/// provider or scope is disposed.
///
/// # Examples
///
/// ```
/// use scene_host::{Dispose, ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct Cache {
///     name: String,
/// }
///
/// impl Dispose for Cache {
///     fn dispose(&self) {
///         println!("Flushing cache: {}", self.name);
///     }
/// }
///
/// let mut services = ServiceCollection::new();
/// services.add_scoped_factory::<Cache, _>(|resolver| {
///     let cache = Arc::new(Cache { name: "session_cache".to_string() });
///     resolver.register_disposer(cache.clone());
///     Cache { name: "session_cache".to_string() }
/// });
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Perform synchronous cleanup of resources.
    fn dispose(&self);
}

/// Trait for asynchronous resource disposal.
///
/// Implement this trait for services that require async teardown (graceful
/// connection shutdown, async I/O cleanup). Async disposal hooks run before
/// sync hooks, in LIFO order.
///
/// # Examples
///
/// ```
/// use scene_host::{AsyncDispose, ServiceCollection, Resolver};
/// use async_trait::async_trait;
/// use std::sync::Arc;
///
/// struct SaveSystem {
///     slot: String,
/// }
///
/// #[async_trait]
/// impl AsyncDispose for SaveSystem {
///     async fn dispose(&self) {
///         println!("Flushing save slot: {}", self.slot);
///     }
/// }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton_factory::<SaveSystem, _>(|resolver| {
///     let saves = Arc::new(SaveSystem { slot: "slot_0".to_string() });
///     resolver.register_async_disposer(saves.clone());
///     SaveSystem { slot: "slot_0".to_string() }
/// });
/// ```
#[async_trait::async_trait]
pub trait AsyncDispose: Send + Sync + 'static {
    /// Perform asynchronous cleanup of resources.
    async fn dispose(&self);
}
