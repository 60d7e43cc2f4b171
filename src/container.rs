use alloc::{borrow::Cow, sync::Arc};
use core::any::type_name;
use parking_lot::Mutex;
use tracing::{debug, error, info_span};

use crate::{
    any::TypeInfo,
    autowire::{self, AutoWire},
    cache::{RequestCaches, ResolvedSet},
    config::{bound_identity, Config},
    dependency_resolver::DependencyResolver,
    errors::{AutoWireErrorKind, InstantiateErrorKind, LifecycleErrorKind, RegisterErrorKind, ResolveErrorKind},
    identity::Identity,
    instantiator::{boxed_instantiator, Instantiator},
    lifecycle,
    registry::{Registration, Registry},
    request::{RequestContext, RequestScope, RequestToken},
    resolver::Resolver,
    scope::Scope,
};

pub(crate) struct ContainerInner {
    pub(crate) registry: Registry,
    pub(crate) requests: RequestCaches,
    /// Singletons with a destroy hook, in construction order.
    pub(crate) resolved: Mutex<ResolvedSet>,
}

impl ContainerInner {
    fn destroy(&self) -> Result<(), LifecycleErrorKind> {
        loop {
            let Some(resolved) = self.resolved.lock().pop() else {
                break;
            };
            resolved.finalize()?;
        }
        Ok(())
    }
}

impl Drop for ContainerInner {
    fn drop(&mut self) {
        while let Err(err) = self.destroy() {
            error!(%err, "Destroy on drop failed, continuing with the rest");
        }
        debug!("Container dropped");
    }
}

/// Dependency container: registrations plus the instances built from them.
///
/// Cloning is cheap and every clone shares the same state.
/// Singletons with a destroy hook are torn down when the last clone is dropped
/// if [`Container::destroy`] wasn't called before.
///
/// ```
/// use wirebox::{Container, Inject, Scope};
///
/// struct Db(&'static str);
/// struct UserRepo(std::sync::Arc<Db>);
///
/// let container = Container::new();
/// container.provide(|| Ok(Db("postgres://")), Scope::Singleton).unwrap();
/// container.provide(|Inject(db): Inject<Db>| Ok(UserRepo(db)), Scope::Prototype).unwrap();
///
/// let repo = container.get::<UserRepo>().unwrap();
/// assert_eq!(repo.0 .0, "postgres://");
/// ```
#[derive(Clone)]
pub struct Container {
    pub(crate) inner: Arc<ContainerInner>,
}

impl Container {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ContainerInner {
                registry: Registry::default(),
                requests: RequestCaches::default(),
                resolved: Mutex::new(ResolvedSet::default()),
            }),
        }
    }

    /// Registers `instantiator` under `identity`.
    ///
    /// Replaces a previous registration of the same identity. Instances built from the replaced
    /// registration are dropped from the caches without running their hooks.
    ///
    /// # Errors
    /// [`RegisterErrorKind::InvalidRecipeShape`] if the recipe doesn't provide the identity's type.
    pub fn register<Inst, Deps>(&self, identity: Identity, instantiator: Inst, config: Config<Inst::Provides>) -> Result<(), RegisterErrorKind>
    where
        Inst: Instantiator<Deps, Error = InstantiateErrorKind> + Send + Sync,
        Inst::Provides: Send + Sync,
        Deps: DependencyResolver<Error = ResolveErrorKind>,
    {
        let provides = TypeInfo::of::<Inst::Provides>();
        if *identity.type_info() != provides {
            let err = RegisterErrorKind::InvalidRecipeShape { identity, provides };
            error!("{}", err);
            return Err(err);
        }

        let Config { scope, hooks, bindings } = config;
        let dependencies = Deps::dependencies()
            .into_iter()
            .map(|type_info| bound_identity(&bindings, type_info))
            .collect();

        let registration = Registration {
            identity: identity.clone(),
            scope,
            instantiator: boxed_instantiator(instantiator),
            hooks: hooks.into_boxed(),
            bindings: Arc::new(bindings),
            dependencies,
            slot: Arc::default(),
        };
        if let Some(previous) = self.inner.registry.insert(registration) {
            self.inner.resolved.lock().discard(&previous.slot);
            self.inner.requests.evict_identity(&identity);
            debug!(%identity, "Previous registration replaced");
        }

        debug!(%identity, %scope, "Registered");
        Ok(())
    }

    /// Registers `instantiator` under the default name of the type it provides.
    #[inline]
    pub fn provide<Inst, Deps>(&self, instantiator: Inst, scope: Scope) -> Result<(), RegisterErrorKind>
    where
        Inst: Instantiator<Deps, Error = InstantiateErrorKind> + Send + Sync,
        Inst::Provides: Send + Sync,
        Deps: DependencyResolver<Error = ResolveErrorKind>,
    {
        self.register(Identity::of::<Inst::Provides>(), instantiator, Config::new(scope))
    }

    #[inline]
    pub fn provide_named<Inst, Deps>(&self, name: impl Into<Cow<'static, str>>, instantiator: Inst, scope: Scope) -> Result<(), RegisterErrorKind>
    where
        Inst: Instantiator<Deps, Error = InstantiateErrorKind> + Send + Sync,
        Inst::Provides: Send + Sync,
        Deps: DependencyResolver<Error = ResolveErrorKind>,
    {
        self.register(Identity::named::<Inst::Provides>(name), instantiator, Config::new(scope))
    }

    #[inline]
    pub fn provide_with_config<Inst, Deps>(&self, instantiator: Inst, config: Config<Inst::Provides>) -> Result<(), RegisterErrorKind>
    where
        Inst: Instantiator<Deps, Error = InstantiateErrorKind> + Send + Sync,
        Inst::Provides: Send + Sync,
        Deps: DependencyResolver<Error = ResolveErrorKind>,
    {
        self.register(Identity::of::<Inst::Provides>(), instantiator, config)
    }

    #[inline]
    #[must_use]
    pub fn is_registered(&self, identity: &Identity) -> bool {
        self.inner.registry.contains(identity)
    }

    /// Resolver for resolutions outside of any request.
    #[inline]
    #[must_use]
    pub fn resolver(&self) -> Resolver {
        Resolver::root(self.clone(), None)
    }

    /// Resolves `Dep` by its default name.
    ///
    /// # Errors
    /// - [`ResolveErrorKind::UnregisteredDependency`] if `Dep` or one of its dependencies isn't registered
    /// - [`ResolveErrorKind::CircularDependency`] if the dependency graph reaches an identity twice on one path
    /// - [`ResolveErrorKind::ConstructionFailed`] or [`ResolveErrorKind::InitFailed`] if a recipe or init hook fails
    pub fn get<Dep: Send + Sync + 'static>(&self) -> Result<Arc<Dep>, ResolveErrorKind> {
        let span = info_span!("get", dependency = type_name::<Dep>());
        let _guard = span.enter();

        self.resolver().get()
    }

    pub fn get_named<Dep: Send + Sync + 'static>(&self, name: impl Into<Cow<'static, str>>) -> Result<Arc<Dep>, ResolveErrorKind> {
        let identity = Identity::named::<Dep>(name);

        let span = info_span!("get", dependency = %identity);
        let _guard = span.enter();

        self.resolver().get_identity(&identity)
    }

    /// Resolves `Dep` and runs its start hook if the instance isn't started yet.
    pub fn get_started<Dep: Send + Sync + 'static>(&self) -> Result<Arc<Dep>, LifecycleErrorKind> {
        let span = info_span!("get_started", dependency = type_name::<Dep>());
        let _guard = span.enter();

        self.resolver().get_started(&Identity::of::<Dep>())
    }

    /// Binds the container to the request identified by `context`.
    #[inline]
    #[must_use]
    pub fn enter(&self, context: &impl RequestContext) -> RequestScope {
        RequestScope::new(self.clone(), context.request_token())
    }

    /// Runs start hooks of all singletons, dependencies before their dependents.
    ///
    /// Singletons are constructed if needed. Prototypes are skipped and so are request-scoped
    /// registrations, use [`RequestScope::start`] for them.
    ///
    /// # Errors
    /// Stops at the first failing resolution or start hook.
    #[inline]
    pub fn start(&self) -> Result<(), LifecycleErrorKind> {
        self.start_with(None)
    }

    pub(crate) fn start_with(&self, request: Option<RequestToken>) -> Result<(), LifecycleErrorKind> {
        let span = info_span!("start", request = ?request.map(|token| token.id()));
        let _guard = span.enter();

        for registration in self.inner.registry.start_order() {
            if registration.hooks.on_start.is_none() {
                continue;
            }
            match (registration.scope, request) {
                (Scope::Prototype, _) | (Scope::Request, None) => {
                    debug!(identity = %registration.identity, scope = %registration.scope, "Start skipped");
                    continue;
                }
                (Scope::Singleton, _) | (Scope::Request, Some(_)) => {}
            }

            let instance = Resolver::root(self.clone(), request).resolve(&registration.identity)?;
            lifecycle::run_start(&registration.identity, &registration.hooks, &instance)?;
        }

        debug!("Started");
        Ok(())
    }

    /// Runs destroy hooks of the constructed singletons, dependents before their dependencies,
    /// and drops them from the cache.
    ///
    /// # Errors
    /// Stops at the first failing hook. Its singleton is already dropped and the hook won't be
    /// called again. Calling `destroy` again continues with the rest.
    pub fn destroy(&self) -> Result<(), LifecycleErrorKind> {
        let span = info_span!("destroy");
        let _guard = span.enter();

        self.inner.destroy()?;

        debug!("Destroyed");
        Ok(())
    }

    /// Drops the request-scoped instances of all requests. No hooks run,
    /// use [`RequestScope::close`] to tear down one request with its destroy hooks.
    pub fn clear_request_scoped(&self) {
        self.inner.requests.clear();
        debug!("Request-scoped instances cleared");
    }

    /// Fills the tagged fields of `target` from the container.
    pub fn auto_wire<T: AutoWire>(&self, target: &mut T) -> Result<(), AutoWireErrorKind> {
        let span = info_span!("auto_wire", target = type_name::<T>());
        let _guard = span.enter();

        autowire::auto_wire(&self.resolver(), target)
    }

    /// Like [`Container::auto_wire`] for a shared target.
    ///
    /// # Errors
    /// [`AutoWireErrorKind::InvalidTarget`] if `target` has other owners.
    pub fn auto_wire_shared<T: AutoWire + 'static>(&self, target: &mut Arc<T>) -> Result<(), AutoWireErrorKind> {
        let span = info_span!("auto_wire", target = type_name::<T>());
        let _guard = span.enter();

        autowire::auto_wire_shared(&self.resolver(), target)
    }
}

impl Default for Container {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
