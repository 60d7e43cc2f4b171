use alloc::borrow::Cow;
use core::fmt::{self, Display, Formatter};

use crate::any::TypeInfo;

/// Key of a registration: the type a recipe provides plus a name.
///
/// When no name is given, the default name derived from the type is used
/// (see [`TypeInfo::default_name`]), so `Identity::of::<Counter>()` is the same
/// identity as `Identity::named::<Counter>("counter")`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Identity {
    type_info: TypeInfo,
    name: Cow<'static, str>,
}

impl Identity {
    #[inline]
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::from_type_info(TypeInfo::of::<T>())
    }

    #[inline]
    #[must_use]
    pub fn named<T: ?Sized + 'static>(name: impl Into<Cow<'static, str>>) -> Self {
        Self::named_type_info(TypeInfo::of::<T>(), name)
    }

    #[inline]
    #[must_use]
    pub fn named_type_info(type_info: TypeInfo, name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            type_info,
            name: name.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn from_type_info(type_info: TypeInfo) -> Self {
        Self {
            name: Cow::Owned(type_info.default_name()),
            type_info,
        }
    }

    #[inline]
    #[must_use]
    pub const fn type_info(&self) -> &TypeInfo {
        &self.type_info
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn has_default_name(&self) -> bool {
        *self.name == self.type_info.default_name()
    }
}

impl Display for Identity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.has_default_name() {
            write!(f, "{}", self.type_info)
        } else {
            write!(f, "{} (name: {})", self.type_info, self.name)
        }
    }
}
