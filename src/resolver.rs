use alloc::{borrow::Cow, collections::btree_map::BTreeMap, sync::Arc, vec::Vec};
use parking_lot::Mutex;
use tracing::{debug, debug_span, error, warn};

use crate::{
    any::TypeInfo,
    cache::{Instance, Resolved, Slot},
    config::{bound_identity, Bindings},
    container::Container,
    errors::{Cycle, InstantiateErrorKind, LifecycleErrorKind, ResolveErrorKind},
    identity::Identity,
    instantiator::InstantiatorErrorKind,
    lifecycle,
    registry::Registration,
    request::RequestToken,
    scope::Scope,
    service::Service as _,
};

/// Context of one resolution call tree.
///
/// Recipes can take it as a parameter to resolve dependencies on their own,
/// e.g. to pick an implementation at runtime.
#[derive(Clone)]
pub struct Resolver {
    container: Container,
    request: Option<RequestToken>,
    /// Identities under construction, from the root down to the current recipe.
    stack: Vec<Identity>,
    /// Bindings of the registration under construction.
    bindings: Option<Arc<Bindings>>,
    /// Instances already resolved within this call tree, prototypes included.
    resolved: Arc<Mutex<BTreeMap<Identity, Arc<Instance>>>>,
}

impl Resolver {
    #[inline]
    #[must_use]
    pub(crate) fn root(container: Container, request: Option<RequestToken>) -> Self {
        Self {
            container,
            request,
            stack: Vec::new(),
            bindings: None,
            resolved: Arc::default(),
        }
    }

    #[inline]
    #[must_use]
    fn child(&self, registration: &Registration) -> Self {
        let mut stack = self.stack.clone();
        stack.push(registration.identity.clone());

        Self {
            container: self.container.clone(),
            request: self.request,
            stack,
            bindings: Some(registration.bindings.clone()),
            resolved: self.resolved.clone(),
        }
    }

    #[inline]
    #[must_use]
    pub fn container(&self) -> &Container {
        &self.container
    }

    #[inline]
    #[must_use]
    pub const fn request_token(&self) -> Option<RequestToken> {
        self.request
    }

    /// Identities under construction, outermost first.
    #[inline]
    #[must_use]
    pub fn stack(&self) -> &[Identity] {
        &self.stack
    }

    /// Identity `Dep` resolves to here: an explicit name, or the bound name
    /// of the registration under construction, or the default name.
    #[must_use]
    pub(crate) fn identity_for<Dep: ?Sized + 'static>(&self, name: Option<&'static str>) -> Identity {
        match (name, &self.bindings) {
            (Some(name), _) => Identity::named::<Dep>(name),
            (None, Some(bindings)) => bound_identity(bindings, TypeInfo::of::<Dep>()),
            (None, None) => Identity::of::<Dep>(),
        }
    }

    /// Resolves `Dep` by the name bound for it, or its default name.
    #[inline]
    pub fn get<Dep: Send + Sync + 'static>(&self) -> Result<Arc<Dep>, ResolveErrorKind> {
        self.get_identity(&self.identity_for::<Dep>(None))
    }

    #[inline]
    pub fn get_named<Dep: Send + Sync + 'static>(&self, name: impl Into<Cow<'static, str>>) -> Result<Arc<Dep>, ResolveErrorKind> {
        self.get_identity(&Identity::named::<Dep>(name))
    }

    pub fn get_identity<Dep: Send + Sync + 'static>(&self, identity: &Identity) -> Result<Arc<Dep>, ResolveErrorKind> {
        let instance = self.resolve(identity)?;
        downcast(&instance)
    }

    /// Resolves `identity` and runs its start hook if the instance isn't started yet.
    pub(crate) fn get_started<Dep: Send + Sync + 'static>(&self, identity: &Identity) -> Result<Arc<Dep>, LifecycleErrorKind> {
        let instance = self.resolve(identity)?;
        if let Some(registration) = self.container.inner.registry.get(identity) {
            lifecycle::run_start(identity, &registration.hooks, &instance)?;
        }
        Ok(downcast(&instance)?)
    }

    pub(crate) fn resolve(&self, identity: &Identity) -> Result<Arc<Instance>, ResolveErrorKind> {
        let span = debug_span!("resolve", dependency = %identity);
        let _guard = span.enter();

        if let Some(instance) = self.resolved.lock().get(identity) {
            debug!("Found in resolution");
            return Ok(instance.clone());
        }

        let inner = &self.container.inner;
        let Some(registration) = inner.registry.get(identity) else {
            let err = ResolveErrorKind::UnregisteredDependency {
                identity: identity.clone(),
            };
            error!("{}", err);
            return Err(err);
        };

        let cached = match (registration.scope, self.request) {
            (Scope::Singleton, _) => registration.slot.get(),
            (Scope::Request, Some(token)) => inner.requests.get(token, identity),
            (Scope::Request, None) | (Scope::Prototype, _) => None,
        };
        if let Some(instance) = cached {
            debug!("Found in cache");
            return Ok(self.remember(identity, instance));
        }

        if self.stack.contains(identity) {
            let mut cycle = self.stack.clone();
            cycle.push(identity.clone());

            let err = ResolveErrorKind::CircularDependency { cycle: Cycle(cycle) };
            error!("{}", err);
            return Err(err);
        }
        if self.stack.is_empty() {
            if let Err(err) = inner.registry.check_acyclic(identity) {
                error!("{}", err);
                return Err(err);
            }
        }

        let instance = match (registration.scope, self.request) {
            (Scope::Singleton, _) => {
                let (instance, built) = registration.slot.get_or_build(identity, || self.build(&registration))?;
                if built {
                    if let Some(resolved) = resolved_entry(&registration, registration.slot.clone(), &instance) {
                        inner.resolved.lock().push(resolved);
                    }
                }
                instance
            }
            (Scope::Request, Some(token)) => {
                let cache = inner.requests.cache(token);
                let slot = cache.lock().slot(identity);
                let (instance, built) = slot.get_or_build(identity, || self.build(&registration))?;
                if built {
                    if let Some(resolved) = resolved_entry(&registration, slot, &instance) {
                        cache.lock().resolved.push(resolved);
                    }
                }
                instance
            }
            (Scope::Request, None) => {
                warn!("Request-scoped dependency resolved outside of a request, the instance won't be cached");
                self.build(&registration)?
            }
            (Scope::Prototype, _) => self.build(&registration)?,
        };

        Ok(self.remember(identity, instance))
    }

    fn build(&self, registration: &Registration) -> Result<Arc<Instance>, ResolveErrorKind> {
        let mut instantiator = registration.instantiator.clone();
        let dependency = match instantiator.call(self.child(registration)) {
            Ok(dependency) => dependency,
            Err(InstantiatorErrorKind::Deps(err)) => return Err(err),
            Err(InstantiatorErrorKind::Factory(InstantiateErrorKind::Resolve(err))) => return Err(*err),
            Err(InstantiatorErrorKind::Factory(source)) => {
                let err = ResolveErrorKind::ConstructionFailed {
                    identity: registration.identity.clone(),
                    source,
                };
                error!("{}", err);
                return Err(err);
            }
        };

        lifecycle::run_init(&registration.identity, &registration.hooks, &dependency)?;

        debug!(scope = %registration.scope, "Constructed");
        Ok(Arc::new(Instance::new(dependency)))
    }

    #[inline]
    fn remember(&self, identity: &Identity, instance: Arc<Instance>) -> Arc<Instance> {
        self.resolved.lock().insert(identity.clone(), instance.clone());
        instance
    }
}

fn resolved_entry(registration: &Registration, slot: Arc<Slot>, instance: &Arc<Instance>) -> Option<Resolved> {
    let on_destroy = registration.hooks.on_destroy.clone()?;
    Some(Resolved {
        identity: registration.identity.clone(),
        instance: instance.clone(),
        slot,
        on_destroy,
    })
}

fn downcast<Dep: Send + Sync + 'static>(instance: &Instance) -> Result<Arc<Dep>, ResolveErrorKind> {
    match instance.dependency.clone().downcast::<Dep>() {
        Ok(dependency) => Ok(dependency),
        Err(incorrect_type) => {
            let err = ResolveErrorKind::IncorrectType {
                expected: TypeInfo::of::<Dep>(),
                actual: (*incorrect_type).type_id(),
            };
            error!("{}", err);
            Err(err)
        }
    }
}
