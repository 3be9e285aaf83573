//! Injection-method resolution for scene components.
//!
//! Scene components are constructed without arguments, so constructor
//! injection is off the table. Instead a component declares a named injection
//! method with an ordered parameter list and an apply closure. The
//! registration builder resolves the declaration against the host's
//! configured method name, validates the parameter types, and invokes the
//! closure with container-resolved arguments before the component is enabled.
//!
//! Descriptors are cached per `(component type, method name)` for the process
//! lifetime, so repeated allocations of transient components do not repeat
//! validation.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

use crate::error::{DiError, DiResult, InjectError};
use crate::key::Key;
use crate::provider::ResolverContext;
use crate::scene::SceneComponent;
use crate::traits::ResolverCore;

/// A declared injection parameter.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub type_id: TypeId,
    pub type_name: &'static str,
}

/// Container-resolved arguments handed to an injection apply closure.
pub struct InjectionArgs {
    values: Vec<(TypeId, Arc<dyn Any + Send + Sync>)>,
}

impl InjectionArgs {
    /// Retrieves the resolved argument of type `P`.
    ///
    /// Declared parameter types are unique per method, so lookup by type is
    /// unambiguous.
    pub fn get<P: 'static + Send + Sync>(&self) -> DiResult<Arc<P>> {
        let wanted = TypeId::of::<P>();
        for (type_id, value) in &self.values {
            if *type_id == wanted {
                return value
                    .clone()
                    .downcast::<P>()
                    .map_err(|_| DiError::TypeMismatch(std::any::type_name::<P>()));
            }
        }
        Err(DiError::NotFound(std::any::type_name::<P>()))
    }
}

/// Fluent builder for an injection method declaration.
///
/// Produced by [`InjectionMethod::named`]; finished by
/// [`apply`](InjectionMethodBuilder::apply).
pub struct InjectionMethodBuilder<C> {
    name: &'static str,
    params: Vec<ParamSpec>,
    _marker: PhantomData<fn(&C)>,
}

impl<C: SceneComponent> InjectionMethodBuilder<C> {
    /// Declares the next parameter, in call order.
    pub fn param<P: 'static + Send + Sync>(mut self) -> Self {
        self.params.push(ParamSpec {
            type_id: TypeId::of::<P>(),
            type_name: std::any::type_name::<P>(),
        });
        self
    }

    /// Finishes the declaration with the closure that receives the resolved
    /// arguments.
    pub fn apply<F>(self, apply: F) -> InjectionMethod<C>
    where
        F: Fn(&C, &InjectionArgs) -> DiResult<()> + Send + Sync + 'static,
    {
        InjectionMethod {
            name: self.name,
            params: self.params.into(),
            apply: Arc::new(apply),
        }
    }
}

/// A component's declared injection method.
///
/// Mirrors a named engine-side method taking service parameters: a name the
/// host matches against its configured injection method name, an ordered
/// parameter list, and the closure standing in for the method body.
pub struct InjectionMethod<C> {
    name: &'static str,
    params: Arc<[ParamSpec]>,
    apply: Arc<dyn Fn(&C, &InjectionArgs) -> DiResult<()> + Send + Sync>,
}

impl<C: SceneComponent> InjectionMethod<C> {
    /// Starts a declaration for a method with the given name.
    pub fn named(name: &'static str) -> InjectionMethodBuilder<C> {
        InjectionMethodBuilder {
            name,
            params: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// The declared method name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The declared parameters, in call order.
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }
}

/// Type-erased, validated injection descriptor.
pub(crate) struct ResolvedInjection {
    target: &'static str,
    params: Arc<[ParamSpec]>,
    invoke: Arc<dyn Fn(&dyn Any, &InjectionArgs) -> DiResult<()> + Send + Sync>,
}

impl std::fmt::Debug for ResolvedInjection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedInjection")
            .field("target", &self.target)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

type InjectionCache = HashMap<(TypeId, String), Option<Arc<ResolvedInjection>>>;

static CACHE: Lazy<RwLock<InjectionCache>> = Lazy::new(|| RwLock::new(HashMap::new()));

fn is_value_type(type_id: TypeId) -> bool {
    type_id == TypeId::of::<bool>()
        || type_id == TypeId::of::<char>()
        || type_id == TypeId::of::<i8>()
        || type_id == TypeId::of::<i16>()
        || type_id == TypeId::of::<i32>()
        || type_id == TypeId::of::<i64>()
        || type_id == TypeId::of::<i128>()
        || type_id == TypeId::of::<isize>()
        || type_id == TypeId::of::<u8>()
        || type_id == TypeId::of::<u16>()
        || type_id == TypeId::of::<u32>()
        || type_id == TypeId::of::<u64>()
        || type_id == TypeId::of::<u128>()
        || type_id == TypeId::of::<usize>()
        || type_id == TypeId::of::<f32>()
        || type_id == TypeId::of::<f64>()
        || type_id == TypeId::of::<String>()
        || type_id == TypeId::of::<&'static str>()
}

/// Resolves and validates the injection descriptor for component `C`.
///
/// Returns `Ok(None)` when the component declares no injection method, or
/// when the declared name does not match the configured one. Validation
/// failures (a value-type parameter, a parameterless method) are loud.
/// Successful outcomes are cached per `(type, method name)`.
pub(crate) fn resolve_injection<C: SceneComponent>(
    configured_name: &str,
) -> DiResult<Option<Arc<ResolvedInjection>>> {
    let cache_key = (TypeId::of::<C>(), configured_name.to_string());
    if let Some(cached) = CACHE.read().unwrap().get(&cache_key) {
        return Ok(cached.clone());
    }

    let resolved = build_injection::<C>(configured_name)?;
    CACHE
        .write()
        .unwrap()
        .insert(cache_key, resolved.clone());
    Ok(resolved)
}

fn build_injection<C: SceneComponent>(
    configured_name: &str,
) -> DiResult<Option<Arc<ResolvedInjection>>> {
    let method = match C::injection() {
        Some(method) => method,
        None => return Ok(None),
    };

    // Name-based lookup: a declaration under another name is invisible.
    if method.name != configured_name {
        return Ok(None);
    }

    let target = std::any::type_name::<C>();

    if method.params.is_empty() {
        return Err(InjectError::NoParameters {
            target,
            method: method.name,
        }
        .into());
    }
    for param in method.params.iter() {
        if is_value_type(param.type_id) {
            return Err(InjectError::UnsupportedParameter {
                target,
                method: method.name,
                param: param.type_name,
            }
            .into());
        }
    }

    let apply = method.apply.clone();
    let invoke = Arc::new(move |component: &dyn Any, args: &InjectionArgs| -> DiResult<()> {
        let component = component
            .downcast_ref::<C>()
            .ok_or(DiError::TypeMismatch(std::any::type_name::<C>()))?;
        (apply)(component, args)
    });

    Ok(Some(Arc::new(ResolvedInjection {
        target,
        params: method.params.clone(),
        invoke,
    })))
}

/// Runs a component's injection method, if it has one matching the
/// configured name.
///
/// Each parameter resolves through the container; a missing service is fatal
/// for this component's construction and propagates.
pub(crate) fn inject_component<C: SceneComponent>(
    component: &C,
    configured_name: &str,
    resolver: &ResolverContext<'_>,
) -> DiResult<()> {
    let resolved = match resolve_injection::<C>(configured_name)? {
        Some(resolved) => resolved,
        None => return Ok(()),
    };

    let mut values = Vec::with_capacity(resolved.params.len());
    for param in resolved.params.iter() {
        let key = Key::Type(param.type_id, param.type_name);
        let value = resolver.resolve_any(&key).map_err(|err| match err {
            DiError::NotFound(name) => {
                log::error!(
                    "{}: injection parameter {} is not registered",
                    resolved.target,
                    name
                );
                DiError::NotFound(name)
            }
            other => other,
        })?;
        values.push((param.type_id, value));
    }

    (resolved.invoke)(component as &dyn Any, &InjectionArgs { values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Behaviour;
    use std::sync::Mutex;

    struct Tool;

    struct WithValueParam;
    impl Behaviour for WithValueParam {}
    impl SceneComponent for WithValueParam {
        fn spawn() -> Self {
            WithValueParam
        }
        fn injection() -> Option<InjectionMethod<Self>> {
            Some(
                InjectionMethod::<Self>::named("awake_services")
                    .param::<u32>()
                    .apply(|_, _| Ok(())),
            )
        }
    }

    struct WithNoParams;
    impl Behaviour for WithNoParams {}
    impl SceneComponent for WithNoParams {
        fn spawn() -> Self {
            WithNoParams
        }
        fn injection() -> Option<InjectionMethod<Self>> {
            Some(InjectionMethod::<Self>::named("awake_services").apply(|_, _| Ok(())))
        }
    }

    struct WithOtherName {
        seen: Mutex<bool>,
    }
    impl Behaviour for WithOtherName {}
    impl SceneComponent for WithOtherName {
        fn spawn() -> Self {
            WithOtherName {
                seen: Mutex::new(false),
            }
        }
        fn injection() -> Option<InjectionMethod<Self>> {
            Some(
                InjectionMethod::<Self>::named("late_init")
                    .param::<Tool>()
                    .apply(|c, _| {
                        *c.seen.lock().unwrap() = true;
                        Ok(())
                    }),
            )
        }
    }

    #[test]
    fn value_type_parameter_is_rejected() {
        let err = resolve_injection::<WithValueParam>("awake_services").unwrap_err();
        match err {
            DiError::Injection(InjectError::UnsupportedParameter { param, .. }) => {
                assert_eq!(param, "u32");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn parameterless_method_is_rejected() {
        let err = resolve_injection::<WithNoParams>("awake_services").unwrap_err();
        assert!(matches!(
            err,
            DiError::Injection(InjectError::NoParameters { .. })
        ));
    }

    #[test]
    fn name_mismatch_skips_injection() {
        let resolved = resolve_injection::<WithOtherName>("awake_services").unwrap();
        assert!(resolved.is_none());

        let resolved = resolve_injection::<WithOtherName>("late_init").unwrap();
        assert!(resolved.is_some());
    }
}
