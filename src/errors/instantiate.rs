use alloc::{boxed::Box, sync::Arc};
use core::fmt::{Debug, Display};

use super::resolve::ResolveErrorKind;

/// Failure returned by a recipe.
///
/// The source is shared, so the error can be handed to every caller
/// waiting on the same construction.
#[derive(thiserror::Error, Debug, Clone)]
pub enum InstantiateErrorKind {
    #[error("{0}")]
    Custom(Arc<anyhow::Error>),
    /// A dependency the recipe resolved on its own failed.
    /// It's reported to the caller as is, not as a failure of the recipe.
    #[error(transparent)]
    Resolve(Box<ResolveErrorKind>),
}

impl InstantiateErrorKind {
    #[inline]
    #[must_use]
    pub fn msg<M>(message: M) -> Self
    where
        M: Display + Debug + Send + Sync + 'static,
    {
        anyhow::Error::msg(message).into()
    }
}

impl From<anyhow::Error> for InstantiateErrorKind {
    #[inline]
    fn from(err: anyhow::Error) -> Self {
        Self::Custom(Arc::new(err))
    }
}

/// Lets recipes that resolve on their own (through [`crate::Resolver`]) use `?`.
impl From<ResolveErrorKind> for InstantiateErrorKind {
    #[inline]
    fn from(err: ResolveErrorKind) -> Self {
        Self::Resolve(Box::new(err))
    }
}
