use core::fmt::{self, Display, Formatter};

/// Lifetime and sharing policy of the instances built for a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    /// One instance for the container's lifetime.
    Singleton,
    /// A new instance per resolution. Never cached and never torn down by the container.
    Prototype,
    /// One instance per [`crate::RequestToken`], dropped by [`crate::Container::clear_request_scoped`]
    /// or [`crate::RequestScope::close`].
    Request,
}

impl Scope {
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Scope::Singleton => "singleton",
            Scope::Prototype => "prototype",
            Scope::Request => "request",
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_cached(&self) -> bool {
        !matches!(self, Scope::Prototype)
    }
}

impl Display for Scope {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
