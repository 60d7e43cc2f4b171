use alloc::{
    collections::{btree_map::BTreeMap, btree_set::BTreeSet},
    sync::Arc,
    vec::Vec,
};
use parking_lot::{Mutex, RwLock};

use crate::{
    cache::Slot,
    config::Bindings,
    errors::{Cycle, ResolveErrorKind},
    identity::Identity,
    instantiator::BoxedCloneInstantiator,
    lifecycle::BoxedHooks,
    scope::Scope,
};

/// Everything known about one identity: how to build it and where its instance lives.
pub(crate) struct Registration {
    pub(crate) identity: Identity,
    pub(crate) scope: Scope,
    pub(crate) instantiator: BoxedCloneInstantiator,
    pub(crate) hooks: BoxedHooks,
    pub(crate) bindings: Arc<Bindings>,
    /// Declared dependencies with the registration's bindings applied.
    pub(crate) dependencies: Vec<Identity>,
    /// Singleton cache. Unused for other scopes.
    pub(crate) slot: Arc<Slot>,
}

#[derive(Default)]
struct RegistryInner {
    registrations: BTreeMap<Identity, Arc<Registration>>,
    /// Identities whose declared dependency graph was checked and has no cycles.
    acyclic: Mutex<BTreeSet<Identity>>,
}

#[derive(Default)]
pub(crate) struct Registry {
    inner: RwLock<RegistryInner>,
}

impl Registry {
    /// Adds the registration, replacing and returning the previous one for the same identity.
    /// The replaced registration's singleton goes away with it.
    pub(crate) fn insert(&self, registration: Registration) -> Option<Arc<Registration>> {
        let mut inner = self.inner.write();
        inner.acyclic.get_mut().clear();
        inner
            .registrations
            .insert(registration.identity.clone(), Arc::new(registration))
    }

    #[inline]
    #[must_use]
    pub(crate) fn get(&self, identity: &Identity) -> Option<Arc<Registration>> {
        self.inner.read().registrations.get(identity).cloned()
    }

    #[inline]
    #[must_use]
    pub(crate) fn contains(&self, identity: &Identity) -> bool {
        self.inner.read().registrations.contains_key(identity)
    }

    #[cfg(test)]
    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.inner.read().registrations.len()
    }

    /// Checks the declared dependency graph reachable from `identity` for cycles.
    /// The reported cycle is the path from `identity` to the first repeated identity.
    ///
    /// Unregistered dependencies are skipped here, resolution reports them.
    pub(crate) fn check_acyclic(&self, identity: &Identity) -> Result<(), ResolveErrorKind> {
        let inner = self.inner.read();
        if inner.acyclic.lock().contains(identity) {
            return Ok(());
        }

        let mut path = Vec::new();
        let mut visited = BTreeSet::new();
        if let Some(cycle) = find_cycle(&inner.registrations, identity, &mut path, &mut visited) {
            return Err(ResolveErrorKind::CircularDependency { cycle: Cycle(cycle) });
        }

        inner.acyclic.lock().extend(visited);
        Ok(())
    }

    /// Registrations ordered so that declared dependencies come before their dependents.
    #[must_use]
    pub(crate) fn start_order(&self) -> Vec<Arc<Registration>> {
        let inner = self.inner.read();

        let mut order = Vec::with_capacity(inner.registrations.len());
        let mut visited = BTreeSet::new();
        for identity in inner.registrations.keys() {
            visit_postorder(&inner.registrations, identity, &mut visited, &mut order);
        }
        order
    }
}

fn find_cycle(
    registrations: &BTreeMap<Identity, Arc<Registration>>,
    identity: &Identity,
    path: &mut Vec<Identity>,
    visited: &mut BTreeSet<Identity>,
) -> Option<Vec<Identity>> {
    if path.contains(identity) {
        let mut cycle = path.clone();
        cycle.push(identity.clone());
        return Some(cycle);
    }
    if visited.contains(identity) {
        return None;
    }
    let registration = registrations.get(identity)?;

    path.push(identity.clone());
    for dependency in &registration.dependencies {
        if let Some(cycle) = find_cycle(registrations, dependency, path, visited) {
            return Some(cycle);
        }
    }
    path.pop();

    visited.insert(identity.clone());
    None
}

fn visit_postorder(
    registrations: &BTreeMap<Identity, Arc<Registration>>,
    identity: &Identity,
    visited: &mut BTreeSet<Identity>,
    order: &mut Vec<Arc<Registration>>,
) {
    // Inserting before descending keeps cyclic graphs finite, resolution reports the cycle
    if !visited.insert(identity.clone()) {
        return;
    }
    let Some(registration) = registrations.get(identity) else {
        return;
    };

    for dependency in &registration.dependencies {
        visit_postorder(registrations, dependency, visited, order);
    }
    order.push(registration.clone());
}

#[cfg(test)]
mod tests {
    use alloc::{sync::Arc, vec, vec::Vec};

    use super::{Registration, Registry};
    use crate::{
        errors::{InstantiateErrorKind, ResolveErrorKind},
        identity::Identity,
        instantiator::boxed_instantiator,
        scope::Scope,
    };

    struct A;
    struct B;
    struct C;

    fn registration(identity: Identity, dependencies: Vec<Identity>) -> Registration {
        Registration {
            identity,
            scope: Scope::Singleton,
            instantiator: boxed_instantiator(|| Ok::<_, InstantiateErrorKind>(())),
            hooks: Default::default(),
            bindings: Arc::default(),
            dependencies,
            slot: Arc::default(),
        }
    }

    #[test]
    fn test_insert_replaces() {
        let registry = Registry::default();

        assert!(registry.insert(registration(Identity::of::<A>(), vec![])).is_none());
        assert!(registry.insert(registration(Identity::of::<A>(), vec![])).is_some());
        assert!(registry.insert(registration(Identity::named::<A>("other"), vec![])).is_none());
        assert_eq!(registry.len(), 2);
        assert!(registry.contains(&Identity::named::<A>("other")));
    }

    #[test]
    fn test_check_acyclic() {
        let registry = Registry::default();
        registry.insert(registration(Identity::of::<A>(), vec![Identity::of::<B>()]));
        registry.insert(registration(Identity::of::<B>(), vec![Identity::of::<C>()]));
        registry.insert(registration(Identity::of::<C>(), vec![]));

        assert!(registry.check_acyclic(&Identity::of::<A>()).is_ok());

        registry.insert(registration(Identity::of::<C>(), vec![Identity::of::<A>()]));
        match registry.check_acyclic(&Identity::of::<B>()) {
            Err(ResolveErrorKind::CircularDependency { cycle }) => assert_eq!(
                cycle.identities(),
                [Identity::of::<B>(), Identity::of::<C>(), Identity::of::<A>(), Identity::of::<B>()]
            ),
            _ => panic!("cycle should be detected"),
        }
    }

    #[test]
    fn test_check_acyclic_skips_unregistered() {
        let registry = Registry::default();
        registry.insert(registration(Identity::of::<A>(), vec![Identity::of::<B>()]));

        assert!(registry.check_acyclic(&Identity::of::<A>()).is_ok());
    }

    #[test]
    fn test_start_order() {
        let registry = Registry::default();
        registry.insert(registration(Identity::of::<A>(), vec![Identity::of::<B>(), Identity::of::<C>()]));
        registry.insert(registration(Identity::of::<B>(), vec![Identity::of::<C>()]));
        registry.insert(registration(Identity::of::<C>(), vec![]));

        let order = registry
            .start_order()
            .into_iter()
            .map(|registration| registration.identity.clone())
            .collect::<Vec<_>>();

        assert_eq!(order, [Identity::of::<C>(), Identity::of::<B>(), Identity::of::<A>()]);
    }
}
