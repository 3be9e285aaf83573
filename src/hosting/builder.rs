//! Host construction.

use std::sync::{Arc, Mutex};

use crate::collection::ServiceCollection;
use crate::config::{Configuration, ConfigurationBuilder};
use crate::error::{HostError, HostResult};
use crate::hosting::components::{HostRoot, SceneContext, SceneServiceBuilder, ScopeRoot};
use crate::hosting::host::{Host, HostOptions, HostState};
use crate::hosting::lifecycle::ApplicationLifetime;
use crate::lifetime::Lifetime;
use crate::logging::{Logger, LoggingBuilder};
use crate::scene::{PrefabRegistry, Scene};

/// Builds a [`Host`] over a scene.
///
/// Configuration happens through the `configure_*` methods, each handing the
/// closure the matching sub-builder. `build` consumes the accumulated setup:
/// it loads configuration, creates the host root node, registers the ambient
/// services, runs the deferred component registrations, and produces the
/// host. A builder builds at most once.
///
/// # Examples
///
/// ```
/// use scene_host::{HostBuilder, Resolver, Scene};
///
/// struct Clock {
///     tick_rate: u32,
/// }
///
/// let scene = Scene::new();
/// let mut builder = HostBuilder::new(scene, "awake_services").unwrap();
/// builder.configure_services(|services| {
///     services.add_singleton(Clock { tick_rate: 60 });
/// });
///
/// let host = builder.build().unwrap();
/// assert_eq!(host.provider().get_required::<Clock>().tick_rate, 60);
/// ```
pub struct HostBuilder {
    scene: Scene,
    injection: Arc<str>,
    services: ServiceCollection,
    components: SceneServiceBuilder,
    logging: LoggingBuilder,
    configuration: ConfigurationBuilder,
    prefabs: Arc<PrefabRegistry>,
    options: HostOptions,
    built: bool,
}

impl HostBuilder {
    /// Creates a builder for `scene`.
    ///
    /// `injection_method_name` is the method name components must declare for
    /// dependency injection; see `SceneComponent::injection`. An empty name
    /// is rejected.
    pub fn new(scene: Scene, injection_method_name: &str) -> HostResult<Self> {
        if injection_method_name.trim().is_empty() {
            return Err(HostError::InvalidRegistration(
                "injection method name must not be empty".to_string(),
            ));
        }
        let components = SceneServiceBuilder::new(scene.clone());
        Ok(Self {
            scene,
            injection: Arc::from(injection_method_name),
            services: ServiceCollection::new(),
            components,
            logging: LoggingBuilder::new(),
            configuration: ConfigurationBuilder::new(),
            prefabs: Arc::new(PrefabRegistry::new()),
            options: HostOptions::default(),
            built: false,
        })
    }

    /// Configures logging sinks and the minimum level.
    pub fn configure_logging(&mut self, f: impl FnOnce(&mut LoggingBuilder)) -> &mut Self {
        f(&mut self.logging);
        self
    }

    /// Adds configuration sources.
    pub fn configure_configuration(
        &mut self,
        f: impl FnOnce(&mut ConfigurationBuilder),
    ) -> &mut Self {
        f(&mut self.configuration);
        self
    }

    /// Registers plain (non-scene) services.
    pub fn configure_services(&mut self, f: impl FnOnce(&mut ServiceCollection)) -> &mut Self {
        f(&mut self.services);
        self
    }

    /// Registers scene components.
    pub fn configure_components(&mut self, f: impl FnOnce(&mut SceneServiceBuilder)) -> &mut Self {
        f(&mut self.components);
        self
    }

    /// Replaces the host behavior options.
    pub fn with_options(&mut self, options: HostOptions) -> &mut Self {
        self.options = options;
        self
    }

    /// The prefab template registry used by the `add_prefab_*` verbs.
    pub fn prefabs(&self) -> &Arc<PrefabRegistry> {
        &self.prefabs
    }

    /// Builds the host.
    ///
    /// Order of operations: load and merge configuration, build the logger,
    /// create the persistent host root node, register the ambient singletons
    /// (configuration, logger, lifetime, scene, host root, prefab registry,
    /// scope root), then run the deferred component registration actions.
    /// Component registration errors surface here, not at first resolution.
    pub fn build(&mut self) -> HostResult<Host> {
        if self.built {
            return Err(HostError::LifecycleMisuse("host has already been built"));
        }
        self.built = true;

        let configuration = std::mem::take(&mut self.configuration).build()?;
        let logger = Arc::new(std::mem::take(&mut self.logging).build());
        let lifetime = Arc::new(ApplicationLifetime::new());

        let host_root = self.scene.create_node("SceneHost", None);
        self.scene.mark_persistent(host_root);

        let mut services = std::mem::take(&mut self.services);
        self.register_ambient(&mut services, &configuration, &logger, &lifetime, host_root);

        let ctx = SceneContext {
            scene: self.scene.clone(),
            host_root,
            injection: self.injection.clone(),
            prefabs: self.prefabs.clone(),
        };
        for action in self.components.take_actions() {
            action(&mut services, &ctx)?;
        }

        Ok(Host {
            provider: services.build(),
            scene: self.scene.clone(),
            host_root,
            lifetime,
            logger,
            options: self.options.clone(),
            state: Mutex::new(HostState::Built),
            started: Mutex::new(Vec::new()),
        })
    }

    fn register_ambient(
        &self,
        services: &mut ServiceCollection,
        configuration: &Configuration,
        logger: &Arc<Logger>,
        lifetime: &Arc<ApplicationLifetime>,
        host_root: crate::scene::NodeId,
    ) {
        services.add_singleton(configuration.clone());
        services.add_singleton(self.scene.clone());
        services.add_singleton(HostRoot::new(self.scene.clone(), host_root));

        let logger = logger.clone();
        services.add_arc_factory::<Logger, _>(Lifetime::Singleton, move |_| Ok(logger.clone()));

        let lifetime = lifetime.clone();
        services.add_arc_factory::<ApplicationLifetime, _>(Lifetime::Singleton, move |_| {
            Ok(lifetime.clone())
        });

        let prefabs = self.prefabs.clone();
        services
            .add_arc_factory::<PrefabRegistry, _>(Lifetime::Singleton, move |_| Ok(prefabs.clone()));

        // One scope-root node per container scope
        let scene = self.scene.clone();
        services.add_arc_factory::<ScopeRoot, _>(Lifetime::Scoped, move |_| {
            Ok(Arc::new(ScopeRoot::new(scene.clone())))
        });
    }
}
