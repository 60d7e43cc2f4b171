use core::marker::PhantomData;
use tracing::{debug, error};

use crate::{
    any::RcAny,
    cache::Instance,
    errors::{HookErrorKind, LifecycleErrorKind, ResolveErrorKind},
    identity::Identity,
    service::{service_fn, BoxCloneService, Service as _},
};

pub(crate) type BoxedCloneHook = BoxCloneService<RcAny, (), HookErrorKind>;

/// Lifecycle hooks of a registration.
///
/// - `on_init` runs right after the recipe, before the instance is cached or handed out.
///   Its failure fails the resolution.
/// - `on_start` runs at most once per cached instance, on [`crate::Container::start`]
///   or [`crate::Container::get_started`].
/// - `on_destroy` runs on [`crate::Container::destroy`] (singletons) or
///   [`crate::RequestScope::close`] (request instances), dependents before their dependencies.
pub struct Hooks<Dep> {
    on_init: Option<BoxedCloneHook>,
    on_start: Option<BoxedCloneHook>,
    on_destroy: Option<BoxedCloneHook>,
    _marker: PhantomData<fn(&Dep)>,
}

impl<Dep> Hooks<Dep> {
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            on_init: None,
            on_start: None,
            on_destroy: None,
            _marker: PhantomData,
        }
    }

    #[inline]
    #[must_use]
    pub(crate) fn into_boxed(self) -> BoxedHooks {
        BoxedHooks {
            on_init: self.on_init,
            on_start: self.on_start,
            on_destroy: self.on_destroy,
        }
    }
}

impl<Dep: Send + Sync + 'static> Hooks<Dep> {
    #[inline]
    #[must_use]
    pub fn on_init<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&Dep) -> Result<(), HookErrorKind> + Clone + Send + Sync + 'static,
    {
        self.on_init = Some(boxed_hook(hook));
        self
    }

    #[inline]
    #[must_use]
    pub fn on_start<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&Dep) -> Result<(), HookErrorKind> + Clone + Send + Sync + 'static,
    {
        self.on_start = Some(boxed_hook(hook));
        self
    }

    #[inline]
    #[must_use]
    pub fn on_destroy<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&Dep) -> Result<(), HookErrorKind> + Clone + Send + Sync + 'static,
    {
        self.on_destroy = Some(boxed_hook(hook));
        self
    }
}

impl<Dep> Default for Hooks<Dep> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Default)]
pub(crate) struct BoxedHooks {
    pub(crate) on_init: Option<BoxedCloneHook>,
    pub(crate) on_start: Option<BoxedCloneHook>,
    pub(crate) on_destroy: Option<BoxedCloneHook>,
}

#[must_use]
fn boxed_hook<Dep, F>(mut hook: F) -> BoxedCloneHook
where
    Dep: Send + Sync + 'static,
    F: FnMut(&Dep) -> Result<(), HookErrorKind> + Clone + Send + Sync + 'static,
{
    BoxCloneService::new(service_fn(move |dependency: RcAny| {
        let dependency = dependency
            .downcast::<Dep>()
            .expect("hook registered for a different type than its recipe provides");
        hook(&dependency)
    }))
}

pub(crate) fn run_init(identity: &Identity, hooks: &BoxedHooks, dependency: &RcAny) -> Result<(), ResolveErrorKind> {
    let Some(mut on_init) = hooks.on_init.clone() else {
        return Ok(());
    };

    match on_init.call(dependency.clone()) {
        Ok(()) => {
            debug!("Init hook called");
            Ok(())
        }
        Err(source) => {
            let err = ResolveErrorKind::InitFailed {
                identity: identity.clone(),
                source,
            };
            error!("{}", err);
            Err(err)
        }
    }
}

/// Runs the start hook if the instance isn't started yet.
/// A failed start leaves the instance unstarted, so a later pass calls the hook again.
pub(crate) fn run_start(identity: &Identity, hooks: &BoxedHooks, instance: &Instance) -> Result<(), LifecycleErrorKind> {
    let Some(mut on_start) = hooks.on_start.clone() else {
        return Ok(());
    };

    if !instance.mark_started() {
        debug!(%identity, "Already started");
        return Ok(());
    }

    match on_start.call(instance.dependency.clone()) {
        Ok(()) => {
            debug!(%identity, "Start hook called");
            Ok(())
        }
        Err(source) => {
            instance.unmark_started();

            let err = LifecycleErrorKind::StartFailed {
                identity: identity.clone(),
                source,
            };
            error!("{}", err);
            Err(err)
        }
    }
}

pub(crate) fn run_destroy(identity: &Identity, mut on_destroy: BoxedCloneHook, instance: &Instance) -> Result<(), LifecycleErrorKind> {
    match on_destroy.call(instance.dependency.clone()) {
        Ok(()) => {
            debug!(%identity, "Destroy hook called");
            Ok(())
        }
        Err(source) => {
            let err = LifecycleErrorKind::DestroyFailed {
                identity: identity.clone(),
                source,
            };
            error!("{}", err);
            Err(err)
        }
    }
}
