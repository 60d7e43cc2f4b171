use alloc::vec::Vec;

use crate::{any::TypeInfo, errors::ResolveErrorKind, resolver::Resolver};

/// Recipe parameter that can be resolved from the container.
pub trait DependencyResolver: Sized {
    type Error: Into<ResolveErrorKind>;

    fn resolve(resolver: &Resolver) -> Result<Self, Self::Error>;

    /// Types this parameter resolves, in declaration order.
    /// Used for ahead-of-construction cycle detection and start ordering.
    #[inline]
    #[must_use]
    fn dependencies() -> Vec<TypeInfo> {
        Vec::new()
    }
}

/// Gives a recipe direct access to the resolution it runs in.
/// Dependencies it resolves aren't declared, so they're only checked for cycles while resolving.
impl DependencyResolver for Resolver {
    type Error = ResolveErrorKind;

    #[inline]
    fn resolve(resolver: &Resolver) -> Result<Self, Self::Error> {
        Ok(resolver.clone())
    }
}

macro_rules! impl_dependency_resolver {
    (
        [$($ty:ident),*]
    ) => {
        #[allow(non_snake_case)]
        impl<$($ty,)*> DependencyResolver for ($($ty,)*)
        where
            $( $ty: DependencyResolver, )*
        {
            type Error = ResolveErrorKind;

            #[inline]
            #[allow(unused_variables)]
            fn resolve(resolver: &Resolver) -> Result<Self, Self::Error> {
                Ok(($($ty::resolve(resolver).map_err(Into::into)?,)*))
            }

            #[allow(unused_mut)]
            fn dependencies() -> Vec<TypeInfo> {
                let mut dependencies = Vec::new();
                $( dependencies.extend($ty::dependencies()); )*
                dependencies
            }
        }
    };
}

all_the_tuples!(impl_dependency_resolver);
