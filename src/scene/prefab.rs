//! Prefab template registry.
//!
//! Prefabs map resource paths to component template closures. Registration
//! is explicit at composition time; there is no asset scanning. The
//! component builder validates paths eagerly so an unknown prefab fails at
//! host build rather than at first resolution.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{DiError, DiResult};
use crate::scene::SceneComponent;

struct PrefabEntry {
    type_id: TypeId,
    make: Arc<dyn Fn() -> Arc<dyn Any + Send + Sync> + Send + Sync>,
}

/// Registry of prefab templates keyed by resource path.
///
/// # Examples
///
/// ```
/// use scene_host::{Behaviour, PrefabRegistry, SceneComponent};
///
/// struct Turret { range: f32 }
/// impl Behaviour for Turret {}
/// impl SceneComponent for Turret {
///     fn spawn() -> Self {
///         Turret { range: 1.0 }
///     }
/// }
///
/// let prefabs = PrefabRegistry::new();
/// prefabs.register::<Turret, _>("Prefabs/Turret", || Turret { range: 12.5 });
///
/// assert!(prefabs.contains("Prefabs/Turret"));
/// let turret = prefabs.instantiate::<Turret>("Prefabs/Turret").unwrap();
/// assert_eq!(turret.range, 12.5);
/// ```
pub struct PrefabRegistry {
    entries: RwLock<HashMap<String, PrefabEntry>>,
}

impl PrefabRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a template for the given resource path.
    ///
    /// Re-registering a path replaces the earlier template.
    pub fn register<C, F>(&self, path: impl Into<String>, factory: F)
    where
        C: SceneComponent,
        F: Fn() -> C + Send + Sync + 'static,
    {
        let entry = PrefabEntry {
            type_id: TypeId::of::<C>(),
            make: Arc::new(move || Arc::new(factory()) as Arc<dyn Any + Send + Sync>),
        };
        self.entries.write().unwrap().insert(path.into(), entry);
    }

    /// Returns whether a template is registered for the path.
    pub fn contains(&self, path: &str) -> bool {
        self.entries.read().unwrap().contains_key(path)
    }

    /// Returns the component type registered for the path.
    pub fn type_of(&self, path: &str) -> Option<TypeId> {
        self.entries.read().unwrap().get(path).map(|e| e.type_id)
    }

    /// Instantiates a fresh component from the template at `path`.
    pub fn instantiate<C: SceneComponent>(&self, path: &str) -> DiResult<Arc<C>> {
        let make = {
            let entries = self.entries.read().unwrap();
            let entry = entries
                .get(path)
                .ok_or(DiError::NotFound(std::any::type_name::<C>()))?;
            if entry.type_id != TypeId::of::<C>() {
                return Err(DiError::TypeMismatch(std::any::type_name::<C>()));
            }
            entry.make.clone()
        };
        make()
            .downcast::<C>()
            .map_err(|_| DiError::TypeMismatch(std::any::type_name::<C>()))
    }
}

impl Default for PrefabRegistry {
    fn default() -> Self {
        Self::new()
    }
}
