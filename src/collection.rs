//! Service collection for registering services and building providers.

use std::any::TypeId;
use std::sync::Arc;

use crate::hosting::HostedService;
use crate::provider::ResolverContext;
use crate::registration::{AnyArc, Registration, Registry};
use crate::traits::Resolver;
use crate::{DiResult, Key, Lifetime, ServiceProvider};

/// Mutable set of service registrations, consumed by [`build`](Self::build).
///
/// Registrations are append-only; re-registering a concrete type replaces the
/// earlier entry, while trait multi-bindings accumulate in registration order.
/// The scene component builder layers its registration verbs on top of this
/// collection, so plain (non-scene) services and components share one
/// container.
///
/// # Examples
///
/// ```rust
/// use scene_host::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct GameConfig { tick_rate: u32 }
/// struct Simulation { config: Arc<GameConfig> }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(GameConfig { tick_rate: 60 });
/// services.add_singleton_factory::<Simulation, _>(|resolver| {
///     Simulation { config: resolver.get_required::<GameConfig>() }
/// });
///
/// let provider = services.build();
/// let sim = provider.get_required::<Simulation>();
/// assert_eq!(sim.config.tick_rate, 60);
/// ```
pub struct ServiceCollection {
    registry: Registry,
}

impl ServiceCollection {
    /// Creates a new empty service collection.
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
        }
    }

    // ----- Concrete Type Registrations -----

    /// Registers a singleton instance shared across the entire host.
    ///
    /// The instance is wrapped in an `Arc` immediately; all requests for this
    /// service type return the same instance.
    pub fn add_singleton<T: 'static + Send + Sync>(&mut self, value: T) -> &mut Self {
        let arc = Arc::new(value);
        let key = Key::Type(TypeId::of::<T>(), std::any::type_name::<T>());
        let ctor = move |_: &ResolverContext| -> DiResult<AnyArc> { Ok(arc.clone()) };
        self.registry
            .insert(key, Registration::new(Lifetime::Singleton, Arc::new(ctor)));
        self
    }

    /// Registers a singleton factory that creates the instance on first
    /// request.
    ///
    /// The factory is called at most once; the result is cached and shared.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use scene_host::{ServiceCollection, Resolver};
    /// # use std::sync::Arc;
    /// struct AssetServer { root: String }
    /// struct AudioSystem { assets: Arc<AssetServer> }
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton(AssetServer { root: "assets/".to_string() });
    /// services.add_singleton_factory::<AudioSystem, _>(|resolver| {
    ///     AudioSystem {
    ///         assets: resolver.get_required::<AssetServer>()
    ///     }
    /// });
    /// ```
    pub fn add_singleton_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: 'static + Send + Sync,
        F: Fn(&ResolverContext) -> T + Send + Sync + 'static,
    {
        self.add_factory(Lifetime::Singleton, factory)
    }

    /// Registers a scoped factory that creates one instance per scope.
    pub fn add_scoped_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: 'static + Send + Sync,
        F: Fn(&ResolverContext) -> T + Send + Sync + 'static,
    {
        self.add_factory(Lifetime::Scoped, factory)
    }

    /// Registers a transient factory that creates a new instance on every
    /// request.
    pub fn add_transient_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: 'static + Send + Sync,
        F: Fn(&ResolverContext) -> T + Send + Sync + 'static,
    {
        self.add_factory(Lifetime::Transient, factory)
    }

    fn add_factory<T, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        T: 'static + Send + Sync,
        F: Fn(&ResolverContext) -> T + Send + Sync + 'static,
    {
        let key = Key::Type(TypeId::of::<T>(), std::any::type_name::<T>());
        let ctor = move |r: &ResolverContext| -> DiResult<AnyArc> { Ok(Arc::new(factory(r))) };
        self.registry
            .insert(key, Registration::new(lifetime, Arc::new(ctor)));
        self
    }

    /// Registers a fallible factory returning an already-shared `Arc<T>`.
    ///
    /// The scene component builder uses this for allocation paths that can
    /// fail (unknown prefab, injection failure) and that need to hand out the
    /// same `Arc` they attached to a scene node.
    pub fn add_arc_factory<T, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        T: 'static + Send + Sync,
        F: Fn(&ResolverContext) -> DiResult<Arc<T>> + Send + Sync + 'static,
    {
        let key = Key::Type(TypeId::of::<T>(), std::any::type_name::<T>());
        let ctor = move |r: &ResolverContext| -> DiResult<AnyArc> {
            let arc = factory(r)?;
            Ok(arc as AnyArc)
        };
        self.registry
            .insert(key, Registration::new(lifetime, Arc::new(ctor)));
        self
    }

    // ----- Trait Single-Binding Registrations -----

    /// Registers a singleton trait implementation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use scene_host::{ServiceCollection, Resolver};
    /// # use std::sync::Arc;
    /// trait Pathfinder: Send + Sync {
    ///     fn route(&self, from: u32, to: u32) -> Vec<u32>;
    /// }
    ///
    /// struct GridPathfinder;
    /// impl Pathfinder for GridPathfinder {
    ///     fn route(&self, from: u32, to: u32) -> Vec<u32> {
    ///         vec![from, to]
    ///     }
    /// }
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton_trait::<dyn Pathfinder>(Arc::new(GridPathfinder));
    /// ```
    pub fn add_singleton_trait<T>(&mut self, value: Arc<T>) -> &mut Self
    where
        T: ?Sized + 'static + Send + Sync,
    {
        let key = Key::Trait(std::any::type_name::<T>());
        // Stored as Arc<Arc<dyn Trait>> inside Any
        let any_arc: AnyArc = Arc::new(value);
        let ctor = move |_: &ResolverContext| -> DiResult<AnyArc> { Ok(any_arc.clone()) };
        self.registry
            .insert(key, Registration::new(Lifetime::Singleton, Arc::new(ctor)));
        self
    }

    /// Registers a singleton trait factory.
    ///
    /// The factory creates the implementation on first request and the result
    /// is cached. The factory must return an `Arc<Trait>`.
    pub fn add_singleton_trait_factory<Trait, F>(&mut self, factory: F) -> &mut Self
    where
        Trait: ?Sized + 'static + Send + Sync,
        F: Fn(&ResolverContext) -> Arc<Trait> + Send + Sync + 'static,
    {
        let key = Key::Trait(std::any::type_name::<Trait>());
        let ctor = move |r: &ResolverContext| -> DiResult<AnyArc> { Ok(Arc::new(factory(r))) };
        self.registry
            .insert(key, Registration::new(Lifetime::Singleton, Arc::new(ctor)));
        self
    }

    // ----- Trait Multi-Binding Registrations -----

    /// Adds a trait implementation to the multi-binding list.
    ///
    /// Multi-bindings accumulate and resolve in registration order through
    /// `get_all_trait`.
    pub fn add_trait_implementation<T>(&mut self, value: Arc<T>, lifetime: Lifetime) -> &mut Self
    where
        T: ?Sized + 'static + Send + Sync,
    {
        let name = std::any::type_name::<T>();
        let any_arc: AnyArc = Arc::new(value);
        let ctor = move |_: &ResolverContext| -> DiResult<AnyArc> { Ok(any_arc.clone()) };
        self.registry
            .append_multi(name, Registration::new(lifetime, Arc::new(ctor)));
        self
    }

    /// Adds a fallible trait factory to the multi-binding list.
    pub fn add_trait_implementation_factory<Trait, F>(
        &mut self,
        lifetime: Lifetime,
        factory: F,
    ) -> &mut Self
    where
        Trait: ?Sized + 'static + Send + Sync,
        F: Fn(&ResolverContext) -> DiResult<Arc<Trait>> + Send + Sync + 'static,
    {
        let name = std::any::type_name::<Trait>();
        let ctor = move |r: &ResolverContext| -> DiResult<AnyArc> {
            let arc = factory(r)?;
            Ok(Arc::new(arc) as AnyArc)
        };
        self.registry
            .append_multi(name, Registration::new(lifetime, Arc::new(ctor)));
        self
    }

    // ----- Hosted Services -----

    /// Registers a hosted service.
    ///
    /// The concrete type is registered as a singleton, and the service joins
    /// the hosted start/stop sequence in registration order. Services start
    /// in the order they were added and stop in reverse.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use scene_host::{ServiceCollection, HostedService, CancellationToken, ServiceError};
    /// # use async_trait::async_trait;
    /// # use std::sync::Arc;
    /// struct Matchmaker;
    ///
    /// #[async_trait]
    /// impl HostedService for Matchmaker {
    ///     async fn start(&self, _token: CancellationToken) -> Result<(), ServiceError> {
    ///         Ok(())
    ///     }
    ///     async fn stop(&self, _token: CancellationToken) -> Result<(), ServiceError> {
    ///         Ok(())
    ///     }
    /// }
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_hosted_service::<Matchmaker, _>(|_| Ok(Arc::new(Matchmaker)));
    /// ```
    pub fn add_hosted_service<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: HostedService + 'static,
        F: Fn(&ResolverContext) -> DiResult<Arc<T>> + Send + Sync + 'static,
    {
        self.add_arc_factory(Lifetime::Singleton, factory);
        self.add_trait_implementation_factory::<dyn HostedService, _>(
            Lifetime::Singleton,
            |r| {
                let service = r.get::<T>()?;
                Ok(service as Arc<dyn HostedService>)
            },
        );
        self
    }

    /// Builds the service provider, consuming the collection.
    ///
    /// No further registrations are possible after building.
    pub fn build(mut self) -> ServiceProvider {
        self.registry.finalize();
        ServiceProvider::new(self.registry)
    }
}

impl Default for ServiceCollection {
    fn default() -> Self {
        Self::new()
    }
}
