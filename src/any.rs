use alloc::{
    string::{String, ToString as _},
    sync::Arc,
};
use core::{
    any::{type_name, Any, TypeId},
    cmp::Ordering,
    fmt::{self, Display, Formatter},
};

pub(crate) type RcAny = Arc<dyn Any + Send + Sync>;

/// Type tag of a service: the [`TypeId`] plus the type name for diagnostics.
/// Equality and ordering only look at the id.
#[derive(Debug, Clone, Copy)]
pub struct TypeInfo {
    pub name: &'static str,
    pub id: TypeId,
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl PartialOrd for TypeInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeInfo {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl TypeInfo {
    #[inline]
    #[must_use]
    pub fn of<T>() -> Self
    where
        T: ?Sized + 'static,
    {
        Self {
            name: type_name::<T>(),
            id: TypeId::of::<T>(),
        }
    }

    /// Type name without module path and generic arguments,
    /// e.g. `Repo` for `app::repo::Repo<app::Pg>`.
    #[inline]
    #[must_use]
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split_once('<').map_or(self.name, |(base, _)| base);
        base.rsplit_once("::").map_or(base, |(_, name)| name)
    }

    /// Name used when a service is registered or resolved without an explicit one:
    /// the short type name with its first letter lowercased (`UserRepo` -> `userRepo`).
    #[must_use]
    pub fn default_name(&self) -> String {
        let short_name = self.short_name();
        let mut chars = short_name.chars();
        match chars.next() {
            Some(first) => first.to_lowercase().chain(chars).collect(),
            None => short_name.to_string(),
        }
    }
}

impl Display for TypeInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

#[cfg(test)]
mod tests {
    use super::TypeInfo;

    mod repo {
        pub struct UserRepo<T>(pub T);
    }

    struct Counter;

    #[test]
    fn test_short_name() {
        assert_eq!(TypeInfo::of::<Counter>().short_name(), "Counter");
        assert_eq!(TypeInfo::of::<repo::UserRepo<Counter>>().short_name(), "UserRepo");
        assert_eq!(TypeInfo::of::<u8>().short_name(), "u8");
    }

    #[test]
    fn test_default_name() {
        assert_eq!(TypeInfo::of::<Counter>().default_name(), "counter");
        assert_eq!(TypeInfo::of::<repo::UserRepo<u8>>().default_name(), "userRepo");
        assert_eq!(TypeInfo::of::<()>().default_name(), "()");
    }

    #[test]
    fn test_eq_by_id() {
        assert_eq!(TypeInfo::of::<Counter>(), TypeInfo::of::<Counter>());
        assert_ne!(TypeInfo::of::<Counter>(), TypeInfo::of::<u8>());
    }
}
