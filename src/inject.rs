use alloc::{sync::Arc, vec, vec::Vec};
use core::ops::Deref;

use crate::{any::TypeInfo, dependency_resolver::DependencyResolver, errors::ResolveErrorKind, resolver::Resolver};

/// Recipe parameter holding a resolved dependency.
///
/// The dependency is looked up by its type and the name bound for it in the registration's
/// [`crate::Config::bind`], or the default name of the type.
pub struct Inject<Dep>(pub Arc<Dep>);

impl<Dep: Send + Sync + 'static> DependencyResolver for Inject<Dep> {
    type Error = ResolveErrorKind;

    #[inline]
    fn resolve(resolver: &Resolver) -> Result<Self, Self::Error> {
        resolver.get().map(Self)
    }

    #[inline]
    fn dependencies() -> Vec<TypeInfo> {
        vec![TypeInfo::of::<Dep>()]
    }
}

impl<Dep> Deref for Inject<Dep> {
    type Target = Dep;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
