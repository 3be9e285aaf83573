//! Service lifetime definitions.

/// Service lifetimes controlling instance caching behavior.
///
/// Defines how service instances are created, cached, and shared within the
/// container. For scene components the lifetime must agree with how the
/// factory allocates the underlying scene node: transient factories allocate
/// a fresh node per resolution, singleton and scoped factories allocate at
/// most one node per container or scope respectively.
///
/// # Examples
///
/// ```rust
/// use scene_host::{ServiceCollection, Resolver, Lifetime};
///
/// struct Config { url: String }
/// struct Repository { url: String }
///
/// let mut services = ServiceCollection::new();
///
/// // Singleton: one instance for the entire host
/// services.add_singleton(Config { url: "postgres://localhost".to_string() });
///
/// // Scoped: one instance per scope
/// services.add_scoped_factory::<Repository, _>(|r| {
///     let config = r.get_required::<Config>();
///     Repository { url: config.url.clone() }
/// });
///
/// let provider = services.build();
/// let scope1 = provider.create_scope();
/// let scope2 = provider.create_scope();
///
/// let a = scope1.get_required::<Repository>();
/// let b = scope1.get_required::<Repository>();
/// assert!(std::ptr::eq(&*a, &*b)); // Same within a scope
///
/// let c = scope2.get_required::<Repository>();
/// assert!(!std::ptr::eq(&*a, &*c)); // Different across scopes
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// Single instance per root provider, cached forever.
    ///
    /// Singleton components are parented under the host root and survive
    /// until the host is torn down.
    Singleton,
    /// Single instance per scope, cached for the scope lifetime.
    ///
    /// Scoped components are parented under the active scope root and are
    /// destroyed together when the scope is disposed.
    Scoped,
    /// New instance per resolution, never cached.
    ///
    /// Transient components get a fresh scene node each time; the caller
    /// owns their lifetime.
    Transient,
}
