use alloc::{borrow::Cow, sync::Arc};
use core::{
    any::type_name,
    fmt::{self, Display, Formatter},
    sync::atomic::{AtomicU64, Ordering},
};
use tracing::{debug, info_span};

use crate::{
    autowire::{self, AutoWire},
    container::Container,
    errors::{AutoWireErrorKind, LifecycleErrorKind, ResolveErrorKind},
    identity::Identity,
    resolver::Resolver,
};

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Identifier of one logical request. Request-scoped instances are cached per token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    /// Creates a token no other call of this function returned.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }

    /// Wraps an identifier taken from elsewhere, e.g. a request id of a server.
    /// Uniqueness is up to the caller.
    #[inline]
    #[must_use]
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    #[inline]
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.0
    }
}

impl Default for RequestToken {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RequestToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Anything that identifies the current logical request.
pub trait RequestContext {
    fn request_token(&self) -> RequestToken;
}

impl RequestContext for RequestToken {
    #[inline]
    fn request_token(&self) -> RequestToken {
        *self
    }
}

/// Container view bound to one request: request-scoped dependencies
/// resolved through it are cached for its token.
#[derive(Clone)]
pub struct RequestScope {
    container: Container,
    token: RequestToken,
}

impl RequestScope {
    #[inline]
    #[must_use]
    pub(crate) const fn new(container: Container, token: RequestToken) -> Self {
        Self { container, token }
    }

    #[inline]
    #[must_use]
    pub const fn token(&self) -> RequestToken {
        self.token
    }

    #[inline]
    #[must_use]
    pub fn container(&self) -> &Container {
        &self.container
    }

    #[inline]
    #[must_use]
    pub fn resolver(&self) -> Resolver {
        Resolver::root(self.container.clone(), Some(self.token))
    }

    /// Resolves `Dep` by its default name within this request.
    pub fn get<Dep: Send + Sync + 'static>(&self) -> Result<Arc<Dep>, ResolveErrorKind> {
        let span = info_span!("get", dependency = type_name::<Dep>(), request = %self.token);
        let _guard = span.enter();

        self.resolver().get()
    }

    pub fn get_named<Dep: Send + Sync + 'static>(&self, name: impl Into<Cow<'static, str>>) -> Result<Arc<Dep>, ResolveErrorKind> {
        let identity = Identity::named::<Dep>(name);

        let span = info_span!("get", dependency = %identity, request = %self.token);
        let _guard = span.enter();

        self.resolver().get_identity(&identity)
    }

    /// Resolves `Dep` and runs its start hook if it isn't started yet.
    pub fn get_started<Dep: Send + Sync + 'static>(&self) -> Result<Arc<Dep>, LifecycleErrorKind> {
        let span = info_span!("get_started", dependency = type_name::<Dep>(), request = %self.token);
        let _guard = span.enter();

        self.resolver().get_started(&Identity::of::<Dep>())
    }

    /// Runs the start pass over singletons and this request's request-scoped registrations.
    pub fn start(&self) -> Result<(), LifecycleErrorKind> {
        self.container.start_with(Some(self.token))
    }

    /// Fills the tagged fields of `target`, resolving request-scoped ones within this request.
    pub fn auto_wire<T: AutoWire>(&self, target: &mut T) -> Result<(), AutoWireErrorKind> {
        autowire::auto_wire(&self.resolver(), target)
    }

    /// Drops the request's cache, running destroy hooks of its instances,
    /// dependents before their dependencies.
    ///
    /// Stops at the first failing hook. The request keeps its remaining instances then,
    /// so calling `close` again continues with the rest.
    pub fn close(&self) -> Result<(), LifecycleErrorKind> {
        let span = info_span!("close", request = %self.token);
        let _guard = span.enter();

        let requests = &self.container.inner.requests;
        let Some(cache) = requests.existing(self.token) else {
            debug!("Nothing to close");
            return Ok(());
        };

        loop {
            let Some(resolved) = cache.lock().resolved.pop() else {
                break;
            };
            resolved.finalize()?;
        }
        requests.remove(self.token);

        debug!("Closed");
        Ok(())
    }
}
