//! Scene graph façade.
//!
//! Models the engine side of the hosting story: a node arena with
//! parent/child links, enabled flags, attached components, and repeating
//! timers, driven by an explicit [`Scene::update`] loop. The host parents
//! singleton components under a host root node and scoped components under
//! per-scope root nodes, so destroying a root tears down everything it owns.

pub mod prefab;

pub use prefab::PrefabRegistry;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::inject::InjectionMethod;

/// Stable handle to a scene node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u64);

/// Frame-driven component behavior.
///
/// All hooks are synchronous and are expected to complete within a frame
/// slice; long-running work belongs in a hosted service. Default
/// implementations are no-ops so components override only what they need.
pub trait Behaviour: Send + Sync + 'static {
    /// Called once per [`Scene::update`] while the owning node is enabled.
    fn tick(&self, _dt: Duration) {}
    /// Called when the owning node becomes effectively enabled.
    fn on_enable(&self) {}
    /// Called when the owning node becomes effectively disabled.
    fn on_disable(&self) {}
    /// Called exactly once when the owning node is destroyed.
    fn on_destroy(&self) {}
}

/// A component the registration builder can allocate and inject.
///
/// `spawn` constructs the component without arguments, the way the engine
/// would. Dependencies arrive afterwards through the declared injection
/// method, if any.
///
/// # Examples
///
/// ```
/// use scene_host::{Behaviour, SceneComponent, InjectionMethod};
/// use std::sync::{Arc, Mutex};
///
/// struct AssetServer;
///
/// struct Loader {
///     assets: Mutex<Option<Arc<AssetServer>>>,
/// }
///
/// impl Behaviour for Loader {}
///
/// impl SceneComponent for Loader {
///     fn spawn() -> Self {
///         Loader { assets: Mutex::new(None) }
///     }
///
///     fn injection() -> Option<InjectionMethod<Self>> {
///         Some(
///             InjectionMethod::<Self>::named("awake_services")
///                 .param::<AssetServer>()
///                 .apply(|loader, args| {
///                     *loader.assets.lock().unwrap() = Some(args.get::<AssetServer>()?);
///                     Ok(())
///                 }),
///         )
///     }
/// }
/// ```
pub trait SceneComponent: Behaviour + Sized {
    /// Constructs the component with no arguments.
    fn spawn() -> Self;

    /// Called once the component is attached to its node, before injection.
    ///
    /// This is where a component learns which node it lives on, e.g. to
    /// schedule repeating callbacks via [`Scene::schedule_repeating`].
    fn on_spawn(&self, _scene: &Scene, _node: NodeId) {}

    /// Declares the injection method, if the component wants one.
    fn injection() -> Option<InjectionMethod<Self>> {
        None
    }
}

struct Timer {
    interval: Duration,
    elapsed: Duration,
    callback: Arc<dyn Fn() + Send + Sync>,
}

struct Node {
    #[allow(dead_code)]
    name: String,
    parent: Option<u64>,
    children: Vec<u64>,
    enabled: bool,
    alive: bool,
    persistent: bool,
    components: Vec<Arc<dyn Behaviour>>,
    timers: Vec<Timer>,
}

#[derive(Default)]
struct SceneState {
    nodes: HashMap<u64, Node>,
    /// Creation order, drives tick order
    order: Vec<u64>,
    next_id: u64,
}

impl SceneState {
    fn effectively_enabled(&self, id: u64) -> bool {
        let mut current = Some(id);
        while let Some(cursor) = current {
            match self.nodes.get(&cursor) {
                Some(node) if node.alive && node.enabled => current = node.parent,
                _ => return false,
            }
        }
        true
    }

    /// Collects `id` and all live descendants, parents before children.
    fn subtree(&self, id: u64) -> Vec<u64> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(cursor) = stack.pop() {
            if let Some(node) = self.nodes.get(&cursor) {
                if node.alive {
                    out.push(cursor);
                    stack.extend(node.children.iter().copied());
                }
            }
        }
        out
    }
}

/// Shared handle over the scene node arena.
///
/// Cheap to clone; all clones observe the same nodes. Mutation happens under
/// an internal lock, but component callbacks (`tick`, `on_enable`,
/// `on_destroy`, timer callbacks) always run outside it, so callbacks may
/// call back into the scene.
#[derive(Clone)]
pub struct Scene {
    inner: Arc<Mutex<SceneState>>,
}

impl Scene {
    /// Creates an empty scene.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SceneState::default())),
        }
    }

    /// Creates a node, optionally parented, enabled by default.
    pub fn create_node(&self, name: impl Into<String>, parent: Option<NodeId>) -> NodeId {
        let mut state = self.inner.lock().unwrap();
        let id = state.next_id;
        state.next_id += 1;

        let parent_id = parent.map(|p| p.0).filter(|p| {
            state
                .nodes
                .get(p)
                .map(|node| node.alive)
                .unwrap_or(false)
        });

        state.nodes.insert(
            id,
            Node {
                name: name.into(),
                parent: parent_id,
                children: Vec::new(),
                enabled: true,
                alive: true,
                persistent: false,
                components: Vec::new(),
                timers: Vec::new(),
            },
        );
        state.order.push(id);

        if let Some(p) = parent_id {
            if let Some(parent_node) = state.nodes.get_mut(&p) {
                parent_node.children.push(id);
            }
        }

        NodeId(id)
    }

    /// Reparents a node. `None` makes it a root node.
    pub fn set_parent(&self, node: NodeId, parent: Option<NodeId>) {
        let mut state = self.inner.lock().unwrap();
        if !state.nodes.contains_key(&node.0) {
            return;
        }

        let old_parent = state.nodes.get(&node.0).and_then(|n| n.parent);
        if let Some(op) = old_parent {
            if let Some(parent_node) = state.nodes.get_mut(&op) {
                parent_node.children.retain(|&c| c != node.0);
            }
        }

        let new_parent = parent.map(|p| p.0).filter(|p| {
            state
                .nodes
                .get(p)
                .map(|n| n.alive)
                .unwrap_or(false)
        });
        if let Some(np) = new_parent {
            if let Some(parent_node) = state.nodes.get_mut(&np) {
                parent_node.children.push(node.0);
            }
        }
        if let Some(n) = state.nodes.get_mut(&node.0) {
            n.parent = new_parent;
        }
    }

    /// Attaches a component to a node.
    ///
    /// Fires `on_enable` immediately if the node is effectively enabled.
    pub fn attach(&self, node: NodeId, component: Arc<dyn Behaviour>) {
        let notify = {
            let mut state = self.inner.lock().unwrap();
            match state.nodes.get_mut(&node.0) {
                Some(n) if n.alive => {
                    n.components.push(component.clone());
                    state.effectively_enabled(node.0)
                }
                _ => false,
            }
        };
        if notify {
            component.on_enable();
        }
    }

    /// Enables or disables a node.
    ///
    /// Components on every node in the subtree whose effective enabled state
    /// changes get `on_enable`/`on_disable` callbacks, invoked outside the
    /// scene lock.
    pub fn set_enabled(&self, node: NodeId, enabled: bool) {
        let callbacks: Vec<(Arc<dyn Behaviour>, bool)> = {
            let mut state = self.inner.lock().unwrap();
            let before: Vec<(u64, bool)> = state
                .subtree(node.0)
                .into_iter()
                .map(|id| (id, state.effectively_enabled(id)))
                .collect();

            match state.nodes.get_mut(&node.0) {
                Some(n) if n.alive && n.enabled != enabled => n.enabled = enabled,
                _ => return,
            }

            let mut callbacks = Vec::new();
            for (id, was_enabled) in before {
                let now_enabled = state.effectively_enabled(id);
                if was_enabled != now_enabled {
                    if let Some(n) = state.nodes.get(&id) {
                        for component in &n.components {
                            callbacks.push((component.clone(), now_enabled));
                        }
                    }
                }
            }
            callbacks
        };

        for (component, now_enabled) in callbacks {
            if now_enabled {
                component.on_enable();
            } else {
                component.on_disable();
            }
        }
    }

    /// Returns whether a node exists and has not been destroyed.
    pub fn is_alive(&self, node: NodeId) -> bool {
        self.inner
            .lock()
            .unwrap()
            .nodes
            .get(&node.0)
            .map(|n| n.alive)
            .unwrap_or(false)
    }

    /// Marks a node as surviving scene reloads.
    pub fn mark_persistent(&self, node: NodeId) {
        let mut state = self.inner.lock().unwrap();
        if let Some(n) = state.nodes.get_mut(&node.0) {
            n.persistent = true;
        }
    }

    /// Destroys a node and its entire subtree.
    ///
    /// `on_destroy` fires exactly once per component, leaf-first. Destroying
    /// an already-destroyed node is a no-op.
    pub fn destroy(&self, node: NodeId) {
        let callbacks: Vec<Arc<dyn Behaviour>> = {
            let mut state = self.inner.lock().unwrap();
            let doomed = state.subtree(node.0);
            if doomed.is_empty() {
                return;
            }

            // Detach the subtree root from its parent
            if let Some(parent) = state.nodes.get(&node.0).and_then(|n| n.parent) {
                if let Some(parent_node) = state.nodes.get_mut(&parent) {
                    parent_node.children.retain(|&c| c != node.0);
                }
            }

            // Leaf-first: subtree() yields parents before children
            let mut callbacks = Vec::new();
            for &id in doomed.iter().rev() {
                if let Some(n) = state.nodes.get_mut(&id) {
                    n.alive = false;
                    n.timers.clear();
                    callbacks.extend(n.components.drain(..));
                }
            }
            state.order.retain(|id| !doomed.contains(id));
            for id in doomed {
                state.nodes.remove(&id);
            }
            callbacks
        };

        for component in callbacks {
            component.on_destroy();
        }
    }

    /// Destroys every non-persistent root node, simulating a scene reload.
    pub fn reload(&self) {
        let roots: Vec<u64> = {
            let state = self.inner.lock().unwrap();
            state
                .order
                .iter()
                .copied()
                .filter(|id| {
                    state
                        .nodes
                        .get(id)
                        .map(|n| n.alive && n.parent.is_none() && !n.persistent)
                        .unwrap_or(false)
                })
                .collect()
        };
        for id in roots {
            self.destroy(NodeId(id));
        }
    }

    /// Schedules a repeating callback on a node.
    ///
    /// The callback fires every `interval` of accumulated update time while
    /// the node is alive and effectively enabled. A zero interval fires once
    /// per [`Scene::update`].
    pub fn schedule_repeating(
        &self,
        node: NodeId,
        interval: Duration,
        callback: impl Fn() + Send + Sync + 'static,
    ) {
        let mut state = self.inner.lock().unwrap();
        if let Some(n) = state.nodes.get_mut(&node.0) {
            if n.alive {
                n.timers.push(Timer {
                    interval,
                    elapsed: Duration::ZERO,
                    callback: Arc::new(callback),
                });
            }
        }
    }

    /// Cancels all repeating callbacks scheduled on a node.
    pub fn cancel_scheduled(&self, node: NodeId) {
        let mut state = self.inner.lock().unwrap();
        if let Some(n) = state.nodes.get_mut(&node.0) {
            n.timers.clear();
        }
    }

    /// Number of repeating callbacks currently scheduled on a node.
    pub fn scheduled_count(&self, node: NodeId) -> usize {
        self.inner
            .lock()
            .unwrap()
            .nodes
            .get(&node.0)
            .map(|n| n.timers.len())
            .unwrap_or(0)
    }

    /// Advances the scene by one frame.
    ///
    /// Timers fire first, then `tick` runs on every component of every
    /// effectively enabled node, in node creation order. Callbacks run
    /// outside the scene lock.
    pub fn update(&self, dt: Duration) {
        let (timer_callbacks, tick_components) = {
            let mut state = self.inner.lock().unwrap();
            let active: Vec<u64> = state
                .order
                .iter()
                .copied()
                .filter(|&id| state.effectively_enabled(id))
                .collect();

            let mut timer_callbacks: Vec<Arc<dyn Fn() + Send + Sync>> = Vec::new();
            for &id in &active {
                if let Some(n) = state.nodes.get_mut(&id) {
                    for timer in &mut n.timers {
                        // A zero interval would never drain the accumulator
                        if timer.interval.is_zero() {
                            timer.elapsed = Duration::ZERO;
                            timer_callbacks.push(timer.callback.clone());
                            continue;
                        }
                        timer.elapsed += dt;
                        while timer.elapsed >= timer.interval {
                            timer.elapsed -= timer.interval;
                            timer_callbacks.push(timer.callback.clone());
                        }
                    }
                }
            }

            let mut tick_components: Vec<Arc<dyn Behaviour>> = Vec::new();
            for &id in &active {
                if let Some(n) = state.nodes.get(&id) {
                    tick_components.extend(n.components.iter().cloned());
                }
            }
            (timer_callbacks, tick_components)
        };

        for callback in timer_callbacks {
            callback();
        }
        for component in tick_components {
            component.tick(dt);
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
