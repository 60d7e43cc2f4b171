use alloc::vec::Vec;
use core::{
    any::TypeId,
    fmt::{self, Display, Formatter},
};

use super::{hook::HookErrorKind, instantiate::InstantiateErrorKind};
use crate::{any::TypeInfo, identity::Identity};

/// Identities from the root of a resolution to the repeated one,
/// e.g. `ServiceA -> ServiceB -> ServiceA`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle(pub(crate) Vec<Identity>);

impl Cycle {
    #[inline]
    #[must_use]
    pub fn identities(&self) -> &[Identity] {
        &self.0
    }

    /// The identity that closes the cycle.
    #[inline]
    #[must_use]
    pub fn repeated(&self) -> Option<&Identity> {
        self.0.last()
    }
}

impl Display for Cycle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (index, identity) in self.0.iter().enumerate() {
            if index != 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{identity}")?;
        }
        Ok(())
    }
}

#[derive(thiserror::Error, Debug, Clone)]
pub enum ResolveErrorKind {
    #[error("No registration found for {identity}")]
    UnregisteredDependency { identity: Identity },
    #[error("Circular dependency detected: {cycle}")]
    CircularDependency { cycle: Cycle },
    #[error("Recipe for {identity} failed: {source}")]
    ConstructionFailed { identity: Identity, source: InstantiateErrorKind },
    #[error("Init hook for {identity} failed: {source}")]
    InitFailed { identity: Identity, source: HookErrorKind },
    #[error("Incorrect provided type. Actual: {actual:?}, expected: {expected}")]
    IncorrectType { expected: TypeInfo, actual: TypeId },
}

impl ResolveErrorKind {
    /// Identity the error was raised for, if any
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::UnregisteredDependency { identity }
            | Self::ConstructionFailed { identity, .. }
            | Self::InitFailed { identity, .. } => Some(identity),
            Self::CircularDependency { cycle } => cycle.repeated(),
            Self::IncorrectType { .. } => None,
        }
    }
}
