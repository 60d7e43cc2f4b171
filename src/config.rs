use alloc::{borrow::Cow, collections::btree_map::BTreeMap};

use crate::{any::TypeInfo, identity::Identity, lifecycle::Hooks, scope::Scope};

/// Names to resolve a registration's dependencies with, per dependency type.
pub(crate) type Bindings = BTreeMap<TypeInfo, Cow<'static, str>>;

/// Returns the identity `Dep` resolves to under `bindings`.
#[inline]
#[must_use]
pub(crate) fn bound_identity(bindings: &Bindings, type_info: TypeInfo) -> Identity {
    match bindings.get(&type_info) {
        Some(name) => Identity::named_type_info(type_info, name.clone()),
        None => Identity::from_type_info(type_info),
    }
}

/// Registration options of a recipe providing `Dep`.
///
/// ```
/// use wirebox::{Config, HookErrorKind, Hooks, Scope};
///
/// struct Pool;
/// struct Db;
///
/// let config = Config::<Pool>::new(Scope::Singleton)
///     .hooks(Hooks::new().on_destroy(|_: &Pool| Ok::<_, HookErrorKind>(())))
///     .bind::<Db>("replica");
/// assert_eq!(config.scope(), Scope::Singleton);
/// ```
pub struct Config<Dep> {
    pub(crate) scope: Scope,
    pub(crate) hooks: Hooks<Dep>,
    pub(crate) bindings: Bindings,
}

impl<Dep> Config<Dep> {
    #[inline]
    #[must_use]
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            hooks: Hooks::new(),
            bindings: Bindings::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn hooks(mut self, hooks: Hooks<Dep>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Resolves the recipe's dependency of type `T` by `name` instead of its default name.
    #[inline]
    #[must_use]
    pub fn bind<T: ?Sized + 'static>(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.bindings.insert(TypeInfo::of::<T>(), name.into());
        self
    }

    #[inline]
    #[must_use]
    pub const fn scope(&self) -> Scope {
        self.scope
    }
}

impl<Dep> Default for Config<Dep> {
    #[inline]
    fn default() -> Self {
        Self::new(Scope::Singleton)
    }
}

impl<Dep> From<Scope> for Config<Dep> {
    #[inline]
    fn from(scope: Scope) -> Self {
        Self::new(scope)
    }
}

#[cfg(test)]
mod tests {
    use super::{bound_identity, Config};
    use crate::{any::TypeInfo, identity::Identity, scope::Scope};

    struct Db;

    #[test]
    fn test_bound_identity() {
        let config = Config::<()>::new(Scope::Prototype).bind::<Db>("replica");

        assert_eq!(
            bound_identity(&config.bindings, TypeInfo::of::<Db>()),
            Identity::named::<Db>("replica")
        );
        assert_eq!(bound_identity(&config.bindings, TypeInfo::of::<u8>()), Identity::of::<u8>());
    }
}
