//! Service key types for the dependency injection container.

use std::any::TypeId;

/// Key for service storage and lookup.
///
/// Keys uniquely identify services in the container. Concrete types use
/// their `TypeId`; trait objects have no `TypeId` and key on the trait
/// name. Multi-bindings index each implementation so registration order
/// survives into resolution order, which the hosted-component start
/// sequence relies on.
///
/// # Examples
///
/// ```rust
/// use scene_host::{ServiceCollection, Resolver, Key};
/// use std::sync::Arc;
///
/// trait Sink: Send + Sync {
///     fn write(&self, msg: &str);
/// }
///
/// struct ConsoleSink;
/// impl Sink for ConsoleSink {
///     fn write(&self, msg: &str) {
///         println!("{}", msg);
///     }
/// }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(8080u32);
/// services.add_singleton_trait(Arc::new(ConsoleSink) as Arc<dyn Sink>);
///
/// let provider = services.build();
/// let port = provider.get_required::<u32>(); // Type key
/// let sink = provider.get_required_trait::<dyn Sink>(); // Trait key
///
/// assert_eq!(*port, 8080);
/// sink.write("resolved");
/// ```
#[derive(Debug, Clone)]
pub enum Key {
    /// Concrete type key with TypeId and name for diagnostics
    Type(TypeId, &'static str),
    /// Single trait binding key
    ///
    /// Only stores the trait name since traits don't have TypeId.
    Trait(&'static str),
    /// Multi-trait binding with index
    ///
    /// The index distinguishes multiple implementations of the same trait
    /// and preserves registration order.
    MultiTrait(&'static str, usize),
}

impl Key {
    /// Returns the type or trait name for diagnostics and error messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Key::Type(_, name) => name,
            Key::Trait(name) => name,
            Key::MultiTrait(name, _) => name,
        }
    }
}

// TypeId-only comparison for concrete types; the name is diagnostics only.
impl PartialEq for Key {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Key::Type(a, _), Key::Type(b, _)) => a == b,
            (Key::Trait(a), Key::Trait(b)) => a == b,
            (Key::MultiTrait(a, idx_a), Key::MultiTrait(b, idx_b)) => a == b && idx_a == idx_b,
            _ => false,
        }
    }
}

impl Eq for Key {}

impl std::hash::Hash for Key {
    #[inline(always)]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Key::Type(id, _) => {
                0u8.hash(state);
                id.hash(state);
            }
            Key::Trait(name) => {
                1u8.hash(state);
                name.hash(state);
            }
            Key::MultiTrait(name, idx) => {
                2u8.hash(state);
                name.hash(state);
                idx.hash(state);
            }
        }
    }
}

#[inline(always)]
pub fn key_of_type<T: 'static>() -> Key {
    Key::Type(std::any::TypeId::of::<T>(), std::any::type_name::<T>())
}
