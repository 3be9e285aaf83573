//! Scene component registration.
//!
//! `SceneServiceBuilder` offers lifetime-specific verbs for components that
//! live on scene nodes. Each verb validates its inputs eagerly, then defers
//! node allocation into a container factory so nothing is created before
//! first resolution. Every allocation path runs the component's injection
//! method and registers an application-stopping hook that cancels the node's
//! repeating timers.

use std::any::TypeId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::collection::ServiceCollection;
use crate::error::{DiResult, HostError, HostResult};
use crate::hosting::host::HostedService;
use crate::hosting::lifecycle::ApplicationLifetime;
use crate::inject::inject_component;
use crate::lifetime::Lifetime;
use crate::provider::{ResolverContext, Scope, ServiceProvider};
use crate::scene::{NodeId, PrefabRegistry, Scene, SceneComponent};
use crate::traits::Resolver;

/// The process-lifetime node all singleton and hosted components hang off.
///
/// Registered as a singleton so components can parent their own spawned
/// nodes under it.
pub struct HostRoot {
    scene: Scene,
    node: NodeId,
}

impl HostRoot {
    pub(crate) fn new(scene: Scene, node: NodeId) -> Self {
        Self { scene, node }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }
}

/// Root node owned by one container scope.
///
/// Registered as a scoped service; the first scoped resolution in a scope
/// creates the node, and scoped components parent under it. Destroyed
/// exactly once, by [`SceneScope::dispose`] or explicitly.
pub struct ScopeRoot {
    scene: Scene,
    node: NodeId,
    destroyed: AtomicBool,
}

impl ScopeRoot {
    pub(crate) fn new(scene: Scene) -> Self {
        let node = scene.create_node("ScopeRoot", None);
        Self {
            scene,
            node,
            destroyed: AtomicBool::new(false),
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Destroys the root node and everything parented under it. Idempotent.
    pub fn destroy(&self) {
        if !self.destroyed.swap(true, Ordering::SeqCst) {
            self.scene.destroy(self.node);
        }
    }
}

/// A container scope paired with its scope-root node.
///
/// Disposal order matters: the container scope disposes first, so scoped
/// disposers still see live scene state, then the root node and every
/// component node under it are destroyed.
pub struct SceneScope {
    scope: Scope,
    root: Arc<ScopeRoot>,
}

impl SceneScope {
    pub(crate) fn create(provider: &ServiceProvider) -> HostResult<Self> {
        let scope = provider.create_scope();
        let root = scope.get::<ScopeRoot>()?;
        Ok(Self { scope, root })
    }

    /// The underlying container scope.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// The scope-root node.
    pub fn root(&self) -> NodeId {
        self.root.node()
    }

    /// Disposes the container scope, then destroys the scope-root node.
    pub async fn dispose(&self) {
        self.scope.dispose_all().await;
        self.root.destroy();
    }
}

/// Everything a deferred registration action needs at host build time.
pub(crate) struct SceneContext {
    pub(crate) scene: Scene,
    pub(crate) host_root: NodeId,
    pub(crate) injection: Arc<str>,
    pub(crate) prefabs: Arc<PrefabRegistry>,
}

type Action = Box<dyn FnOnce(&mut ServiceCollection, &SceneContext) -> HostResult<()> + Send>;

/// Allocates a node, attaches a freshly made component, injects it, and
/// registers the timer-cancelling stopping hook.
fn allocate<C: SceneComponent>(
    scene: &Scene,
    parent: Option<NodeId>,
    persistent: bool,
    start_disabled: bool,
    injection: &str,
    r: &ResolverContext<'_>,
    make: impl FnOnce() -> DiResult<Arc<C>>,
) -> DiResult<Arc<C>> {
    let node = scene.create_node(std::any::type_name::<C>(), parent);
    if start_disabled {
        scene.set_enabled(node, false);
    }
    if persistent {
        scene.mark_persistent(node);
    }

    let component = make()?;
    scene.attach(node, component.clone());
    component.on_spawn(scene, node);

    if let Err(err) = inject_component(component.as_ref(), injection, r) {
        scene.destroy(node);
        return Err(err);
    }

    // Hosted components see no frame ticks until injection completed
    if start_disabled {
        scene.set_enabled(node, true);
    }

    register_stopping_hook(scene, node, r);
    Ok(component)
}

fn register_stopping_hook(scene: &Scene, node: NodeId, r: &ResolverContext<'_>) {
    if let Ok(lifetime) = r.get::<ApplicationLifetime>() {
        let scene = scene.clone();
        lifetime.on_stopping(move || scene.cancel_scheduled(node));
    }
}

/// Fluent registration of scene components, layered over
/// [`ServiceCollection`].
///
/// # Examples
///
/// ```
/// use scene_host::{Behaviour, HostBuilder, Scene, SceneComponent};
///
/// struct Spawner;
/// impl Behaviour for Spawner {}
/// impl SceneComponent for Spawner {
///     fn spawn() -> Self {
///         Spawner
///     }
/// }
///
/// let scene = Scene::new();
/// let mut builder = HostBuilder::new(scene, "awake_services").unwrap();
/// builder.configure_components(|components| {
///     components.add_component_singleton::<Spawner>();
/// });
/// ```
pub struct SceneServiceBuilder {
    scene: Scene,
    actions: Vec<Action>,
}

impl SceneServiceBuilder {
    pub(crate) fn new(scene: Scene) -> Self {
        Self {
            scene,
            actions: Vec::new(),
        }
    }

    pub(crate) fn take_actions(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.actions)
    }

    /// Registers an existing component instance as a singleton.
    ///
    /// The node must be alive at registration. With `use_host_lifetime` the
    /// node is reparented under the host root at build, tying its lifetime
    /// to the host's.
    pub fn add_component_singleton_instance<C: SceneComponent>(
        &mut self,
        node: NodeId,
        component: Arc<C>,
        use_host_lifetime: bool,
    ) -> HostResult<&mut Self> {
        if !self.scene.is_alive(node) {
            return Err(HostError::InvalidRegistration(format!(
                "node for {} instance is not alive",
                std::any::type_name::<C>()
            )));
        }
        self.actions.push(Box::new(move |services, ctx| {
            if use_host_lifetime {
                ctx.scene.set_parent(node, Some(ctx.host_root));
            }
            let scene = ctx.scene.clone();
            let injection = ctx.injection.clone();
            services.add_arc_factory::<C, _>(Lifetime::Singleton, move |r| {
                inject_component(component.as_ref(), &injection, r)?;
                register_stopping_hook(&scene, node, r);
                Ok(component.clone())
            });
            Ok(())
        }));
        Ok(self)
    }

    /// Registers a singleton component on a new node under the host root.
    pub fn add_component_singleton<C: SceneComponent>(&mut self) -> &mut Self {
        self.actions.push(Box::new(|services, ctx| {
            let scene = ctx.scene.clone();
            let parent = ctx.host_root;
            let injection = ctx.injection.clone();
            services.add_arc_factory::<C, _>(Lifetime::Singleton, move |r| {
                allocate::<C>(&scene, Some(parent), false, false, &injection, r, || {
                    Ok(Arc::new(C::spawn()))
                })
            });
            Ok(())
        }));
        self
    }

    /// Registers a singleton component on a root-level node that survives
    /// scene reloads, detached from the host root.
    pub fn add_detached_singleton<C: SceneComponent>(&mut self) -> &mut Self {
        self.actions.push(Box::new(|services, ctx| {
            let scene = ctx.scene.clone();
            let injection = ctx.injection.clone();
            services.add_arc_factory::<C, _>(Lifetime::Singleton, move |r| {
                allocate::<C>(&scene, None, true, false, &injection, r, || {
                    Ok(Arc::new(C::spawn()))
                })
            });
            Ok(())
        }));
        self
    }

    /// Registers a transient component. Every resolution allocates a fresh
    /// root-level node; the caller owns its lifetime.
    pub fn add_component_transient<C: SceneComponent>(&mut self) -> &mut Self {
        self.actions.push(Box::new(|services, ctx| {
            let scene = ctx.scene.clone();
            let injection = ctx.injection.clone();
            services.add_arc_factory::<C, _>(Lifetime::Transient, move |r| {
                allocate::<C>(&scene, None, false, false, &injection, r, || {
                    Ok(Arc::new(C::spawn()))
                })
            });
            Ok(())
        }));
        self
    }

    /// Registers a scoped component, parented under the resolving scope's
    /// root node.
    pub fn add_component_scoped<C: SceneComponent>(&mut self) -> &mut Self {
        self.actions.push(Box::new(|services, ctx| {
            let scene = ctx.scene.clone();
            let injection = ctx.injection.clone();
            services.add_arc_factory::<C, _>(Lifetime::Scoped, move |r| {
                let root = r.get::<ScopeRoot>()?;
                allocate::<C>(&scene, Some(root.node()), false, false, &injection, r, || {
                    Ok(Arc::new(C::spawn()))
                })
            });
            Ok(())
        }));
        self
    }

    /// Registers a hosted component: singleton allocation rules plus a place
    /// in the hosted start/stop sequence.
    ///
    /// The node starts disabled, injection runs, then the node is enabled,
    /// so no frame tick reaches a partially constructed component.
    pub fn add_hosted_component<C>(&mut self) -> &mut Self
    where
        C: SceneComponent + HostedService,
    {
        self.actions.push(Box::new(|services, ctx| {
            let scene = ctx.scene.clone();
            let parent = ctx.host_root;
            let injection = ctx.injection.clone();
            services.add_arc_factory::<C, _>(Lifetime::Singleton, move |r| {
                allocate::<C>(&scene, Some(parent), false, true, &injection, r, || {
                    Ok(Arc::new(C::spawn()))
                })
            });
            services.add_trait_implementation_factory::<dyn HostedService, _>(
                Lifetime::Singleton,
                |r| Ok(r.get::<C>()? as Arc<dyn HostedService>),
            );
            Ok(())
        }));
        self
    }

    /// Registers a singleton component instantiated from a prefab template,
    /// parented under the host root.
    pub fn add_prefab_singleton<C: SceneComponent>(
        &mut self,
        path: &str,
    ) -> HostResult<&mut Self> {
        let path = Self::validated_path::<C>(path)?;
        self.actions.push(Box::new(move |services, ctx| {
            Self::check_prefab::<C>(ctx, &path)?;
            let scene = ctx.scene.clone();
            let parent = ctx.host_root;
            let injection = ctx.injection.clone();
            let prefabs = ctx.prefabs.clone();
            services.add_arc_factory::<C, _>(Lifetime::Singleton, move |r| {
                allocate::<C>(&scene, Some(parent), false, false, &injection, r, || {
                    prefabs.instantiate::<C>(&path)
                })
            });
            Ok(())
        }));
        Ok(self)
    }

    /// Registers a transient component instantiated from a prefab template
    /// on a fresh root-level node per resolution.
    pub fn add_prefab_transient<C: SceneComponent>(
        &mut self,
        path: &str,
    ) -> HostResult<&mut Self> {
        let path = Self::validated_path::<C>(path)?;
        self.actions.push(Box::new(move |services, ctx| {
            Self::check_prefab::<C>(ctx, &path)?;
            let scene = ctx.scene.clone();
            let injection = ctx.injection.clone();
            let prefabs = ctx.prefabs.clone();
            services.add_arc_factory::<C, _>(Lifetime::Transient, move |r| {
                allocate::<C>(&scene, None, false, false, &injection, r, || {
                    prefabs.instantiate::<C>(&path)
                })
            });
            Ok(())
        }));
        Ok(self)
    }

    /// Registers a scoped component instantiated from a prefab template,
    /// parented under the resolving scope's root node.
    pub fn add_prefab_scoped<C: SceneComponent>(&mut self, path: &str) -> HostResult<&mut Self> {
        let path = Self::validated_path::<C>(path)?;
        self.actions.push(Box::new(move |services, ctx| {
            Self::check_prefab::<C>(ctx, &path)?;
            let scene = ctx.scene.clone();
            let injection = ctx.injection.clone();
            let prefabs = ctx.prefabs.clone();
            services.add_arc_factory::<C, _>(Lifetime::Scoped, move |r| {
                let root = r.get::<ScopeRoot>()?;
                allocate::<C>(&scene, Some(root.node()), false, false, &injection, r, || {
                    prefabs.instantiate::<C>(&path)
                })
            });
            Ok(())
        }));
        Ok(self)
    }

    fn validated_path<C>(path: &str) -> HostResult<String> {
        if path.trim().is_empty() {
            return Err(HostError::InvalidRegistration(format!(
                "empty prefab path for {}",
                std::any::type_name::<C>()
            )));
        }
        Ok(path.to_string())
    }

    /// Unknown prefab paths fail at host build, not at first resolution.
    fn check_prefab<C: SceneComponent>(ctx: &SceneContext, path: &str) -> HostResult<()> {
        match ctx.prefabs.type_of(path) {
            Some(type_id) if type_id == TypeId::of::<C>() => Ok(()),
            Some(_) => Err(HostError::InvalidRegistration(format!(
                "prefab '{}' is not a {} template",
                path,
                std::any::type_name::<C>()
            ))),
            None => Err(HostError::InvalidRegistration(format!(
                "prefab '{}' is not registered",
                path
            ))),
        }
    }
}
