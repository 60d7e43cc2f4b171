use alloc::sync::Arc;
use tracing::debug;

use crate::{
    any::RcAny,
    dependency_resolver::DependencyResolver,
    errors::{InstantiateErrorKind, ResolveErrorKind},
    resolver::Resolver,
    service::{service_fn, BoxCloneService},
};

/// Recipe that builds a dependency out of other resolved dependencies.
///
/// Implemented for closures `FnMut(T1, .., Tn) -> Result<Provides, Err>` where every `Ti`
/// is a [`DependencyResolver`], e.g. [`crate::Inject`] or [`crate::Resolver`] itself.
pub trait Instantiator<Deps>: Clone + 'static
where
    Deps: DependencyResolver,
{
    type Provides: 'static;
    type Error: Into<InstantiateErrorKind>;

    fn instantiate(&mut self, dependencies: Deps) -> Result<Self::Provides, Self::Error>;
}

/// Failure of a boxed instantiator: either one of its dependencies couldn't be resolved,
/// or the recipe itself returned an error.
pub(crate) enum InstantiatorErrorKind<DepsErr, FactoryErr> {
    Deps(DepsErr),
    Factory(FactoryErr),
}

pub(crate) type BoxedCloneInstantiator =
    BoxCloneService<Resolver, RcAny, InstantiatorErrorKind<ResolveErrorKind, InstantiateErrorKind>>;

#[must_use]
pub(crate) fn boxed_instantiator<Inst, Deps>(mut instantiator: Inst) -> BoxedCloneInstantiator
where
    Inst: Instantiator<Deps> + Send + Sync,
    Inst::Provides: Send + Sync,
    Deps: DependencyResolver,
{
    BoxCloneService::new(service_fn(
        move |resolver: Resolver| -> Result<RcAny, InstantiatorErrorKind<ResolveErrorKind, InstantiateErrorKind>> {
            let dependencies = match Deps::resolve(&resolver) {
                Ok(dependencies) => dependencies,
                Err(err) => return Err(InstantiatorErrorKind::Deps(err.into())),
            };
            let dependency = match instantiator.instantiate(dependencies) {
                Ok(dependency) => dependency,
                Err(err) => return Err(InstantiatorErrorKind::Factory(err.into())),
            };

            debug!("Instantiated");

            Ok(Arc::new(dependency))
        },
    ))
}

/// Recipe that hands out clones of an already built value.
#[inline]
#[must_use]
pub fn instance<T: Clone + 'static>(val: T) -> impl Instantiator<(), Provides = T, Error = InstantiateErrorKind> {
    move || Ok(val.clone())
}

/// Wraps a value into a `Box<dyn Trait>` recipe output, e.g.
/// `container.provide(|| Ok(boxed!(PgRepo::new(); Repo)), Scope::Singleton)`.
#[macro_export]
macro_rules! boxed {
    ($val:expr ; $bound:tt $($bounds:tt)*) => {{
        $crate::__private::Box::new($val) as $crate::__private::Box<dyn $bound $($bounds)*>
    }};
}

macro_rules! impl_instantiator {
    (
        [$($ty:ident),*]
    ) => {
        #[allow(non_snake_case)]
        impl<F, Response, Err, $($ty,)*> Instantiator<($($ty,)*)> for F
        where
            F: FnMut($($ty,)*) -> Result<Response, Err> + Clone + 'static,
            Response: 'static,
            Err: Into<InstantiateErrorKind>,
            $( $ty: DependencyResolver, )*
        {
            type Provides = Response;
            type Error = Err;

            #[inline]
            fn instantiate(&mut self, ($($ty,)*): ($($ty,)*)) -> Result<Self::Provides, Self::Error> {
                self($($ty,)*)
            }
        }
    };
}

all_the_tuples!(impl_instantiator);
