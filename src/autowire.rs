use alloc::sync::Arc;
use tracing::{debug, error};

use crate::{
    any::TypeInfo,
    errors::{AutoWireErrorKind, ResolveErrorKind},
    resolver::Resolver,
};

/// Struct whose tagged fields can be filled from the container.
///
/// Usually derived: fields marked `#[autowired]` are resolved by their type,
/// `#[autowired(name = "...")]` by an explicit name, and untagged fields are left as they are.
///
/// ```
/// # #[cfg(feature = "macros")] {
/// use std::sync::Arc;
/// use wirebox::{AutoWire, Container, Scope};
///
/// struct Db;
///
/// #[derive(AutoWire, Default)]
/// struct Handler {
///     #[autowired]
///     db: Option<Arc<Db>>,
///     hits: u64,
/// }
///
/// let container = Container::new();
/// container.provide(|| Ok(Db), Scope::Singleton).unwrap();
///
/// let mut handler = Handler::default();
/// container.auto_wire(&mut handler).unwrap();
/// assert!(handler.db.is_some());
/// # }
/// ```
pub trait AutoWire {
    fn auto_wire(&mut self, resolver: &Resolver) -> Result<(), AutoWireErrorKind>;
}

/// Field type an auto-wired struct can hold.
pub trait AutoWireField: Sized {
    fn wire(resolver: &Resolver, name: Option<&'static str>) -> Result<Self, ResolveErrorKind>;
}

impl<Dep: Send + Sync + 'static> AutoWireField for Arc<Dep> {
    #[inline]
    fn wire(resolver: &Resolver, name: Option<&'static str>) -> Result<Self, ResolveErrorKind> {
        resolver.get_identity(&resolver.identity_for::<Dep>(name))
    }
}

/// Left as `None` if the dependency itself isn't registered.
/// Failures further down its graph are still reported.
impl<Dep: Send + Sync + 'static> AutoWireField for Option<Arc<Dep>> {
    fn wire(resolver: &Resolver, name: Option<&'static str>) -> Result<Self, ResolveErrorKind> {
        let identity = resolver.identity_for::<Dep>(name);
        match resolver.get_identity(&identity) {
            Ok(dependency) => Ok(Some(dependency)),
            Err(ResolveErrorKind::UnregisteredDependency { identity: missing }) if missing == identity => {
                debug!(%identity, "Optional dependency isn't registered");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

#[inline]
pub(crate) fn auto_wire<T: AutoWire>(resolver: &Resolver, target: &mut T) -> Result<(), AutoWireErrorKind> {
    target.auto_wire(resolver)?;

    debug!("Auto-wired");
    Ok(())
}

pub(crate) fn auto_wire_shared<T: AutoWire + 'static>(resolver: &Resolver, target: &mut Arc<T>) -> Result<(), AutoWireErrorKind> {
    let Some(target) = Arc::get_mut(target) else {
        let err = AutoWireErrorKind::InvalidTarget {
            type_info: TypeInfo::of::<T>(),
            reason: "it's shared with other owners, so its fields can't be set",
        };
        error!("{}", err);
        return Err(err);
    };
    auto_wire(resolver, target)
}
