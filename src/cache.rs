extern crate std;

use alloc::{
    collections::{btree_map::BTreeMap, vec_deque::VecDeque},
    sync::Arc,
    vec::Vec,
};
use core::sync::atomic::{AtomicBool, Ordering};
use dashmap::DashMap;
use parking_lot::{const_mutex, Condvar, Mutex};
use std::thread::{self, ThreadId};
use tracing::{debug, error};

use crate::{
    any::RcAny,
    errors::{Cycle, LifecycleErrorKind, ResolveErrorKind},
    identity::Identity,
    lifecycle::{self, BoxedCloneHook},
    request::RequestToken,
};

/// Constructed dependency together with its "started" flag.
#[derive(Debug)]
pub(crate) struct Instance {
    pub(crate) dependency: RcAny,
    started: AtomicBool,
}

impl Instance {
    #[inline]
    #[must_use]
    pub(crate) fn new(dependency: RcAny) -> Self {
        Self {
            dependency,
            started: AtomicBool::new(false),
        }
    }

    /// Returns `false` if the instance was already marked.
    #[inline]
    pub(crate) fn mark_started(&self) -> bool {
        self.started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    #[inline]
    pub(crate) fn unmark_started(&self) {
        self.started.store(false, Ordering::Release);
    }

    #[cfg(test)]
    #[must_use]
    pub(crate) fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }
}

type Outcome = Result<Arc<Instance>, ResolveErrorKind>;

#[derive(Default)]
enum FlightState {
    #[default]
    Pending,
    Done(Outcome),
    Abandoned,
}

/// Construction in progress. Callers that arrive while it runs wait here
/// and receive the builder's outcome, success or failure.
struct Flight {
    identity: Identity,
    /// Thread running the recipe.
    owner: ThreadId,
    state: Mutex<FlightState>,
    done: Condvar,
}

impl Flight {
    fn new(identity: Identity) -> Self {
        Self {
            identity,
            owner: thread::current().id(),
            state: Mutex::default(),
            done: Condvar::new(),
        }
    }

    #[inline]
    fn is_pending(&self) -> bool {
        matches!(*self.state.lock(), FlightState::Pending)
    }

    /// Returns `None` if the builder unwound without an outcome.
    fn wait(&self) -> Option<Outcome> {
        let mut state = self.state.lock();
        while matches!(*state, FlightState::Pending) {
            self.done.wait(&mut state);
        }
        match &*state {
            FlightState::Done(outcome) => Some(outcome.clone()),
            FlightState::Pending | FlightState::Abandoned => None,
        }
    }

    fn complete(&self, state: FlightState) {
        *self.state.lock() = state;
        self.done.notify_all();
    }
}

/// Flights that threads are blocked on, at most one per thread.
static WAITING: Mutex<Vec<(ThreadId, Arc<Flight>)>> = const_mutex(Vec::new());

/// Registration of the current thread as a waiter of a flight.
/// Removed on drop.
struct WaitGuard {
    thread: ThreadId,
}

impl WaitGuard {
    /// Follows the flight's builder to the flight it waits on, and so on.
    /// Reaching a flight built by the current thread means nobody would ever wake up.
    fn enter(flight: &Arc<Flight>) -> Result<Self, ResolveErrorKind> {
        let current = thread::current().id();
        let mut waiting = WAITING.lock();

        let mut chain = Vec::new();
        let mut next = Some(flight.clone());
        while let Some(flight) = next {
            if !flight.is_pending() {
                break;
            }
            chain.push(flight.identity.clone());
            if flight.owner == current {
                chain.insert(0, flight.identity.clone());

                let err = ResolveErrorKind::CircularDependency { cycle: Cycle(chain) };
                error!("{}", err);
                return Err(err);
            }
            next = waiting
                .iter()
                .find(|(thread, _)| *thread == flight.owner)
                .map(|(_, flight)| flight.clone());
        }

        waiting.push((current, flight.clone()));
        Ok(Self { thread: current })
    }
}

impl Drop for WaitGuard {
    fn drop(&mut self) {
        WAITING.lock().retain(|(thread, _)| *thread != self.thread);
    }
}

#[derive(Default)]
enum SlotState {
    #[default]
    Vacant,
    Building(Arc<Flight>),
    Occupied(Arc<Instance>),
}

/// Cache entry of a singleton or of a request-scoped dependency within one request.
///
/// Only successful constructions are stored. A failed one leaves the slot vacant,
/// so the next caller (after the current waiters) builds again.
#[derive(Default)]
pub(crate) struct Slot {
    state: Mutex<SlotState>,
}

impl Slot {
    #[must_use]
    pub(crate) fn get(&self) -> Option<Arc<Instance>> {
        match &*self.state.lock() {
            SlotState::Occupied(instance) => Some(instance.clone()),
            SlotState::Vacant | SlotState::Building(_) => None,
        }
    }

    /// Returns the cached instance or builds it, at most one builder at a time.
    /// The flag is `true` if this call ran `build` and stored its result.
    ///
    /// # Errors
    /// [`ResolveErrorKind::CircularDependency`] instead of waiting for a construction
    /// that can't finish before this call returns, e.g. when `build` reaches the same slot again.
    pub(crate) fn get_or_build<F>(&self, identity: &Identity, build: F) -> Result<(Arc<Instance>, bool), ResolveErrorKind>
    where
        F: FnOnce() -> Outcome,
    {
        let flight = loop {
            let flight = {
                let mut state = self.state.lock();
                match &*state {
                    SlotState::Occupied(instance) => return Ok((instance.clone(), false)),
                    SlotState::Building(flight) => flight.clone(),
                    SlotState::Vacant => {
                        let flight = Arc::new(Flight::new(identity.clone()));
                        *state = SlotState::Building(flight.clone());
                        break flight;
                    }
                }
            };

            debug!("Waiting for construction in another call");
            let waiting = WaitGuard::enter(&flight)?;
            let outcome = flight.wait();
            drop(waiting);

            if let Some(outcome) = outcome {
                return outcome.map(|instance| (instance, false));
            }
        };

        let guard = BuildGuard {
            slot: self,
            flight,
            finished: false,
        };
        let outcome = build();
        guard.finish(&outcome);

        outcome.map(|instance| (instance, true))
    }

    /// Empties the slot if it still holds `instance`.
    pub(crate) fn evict(&self, instance: &Arc<Instance>) -> bool {
        let mut state = self.state.lock();
        if matches!(&*state, SlotState::Occupied(current) if Arc::ptr_eq(current, instance)) {
            *state = SlotState::Vacant;
            true
        } else {
            false
        }
    }
}

struct BuildGuard<'a> {
    slot: &'a Slot,
    flight: Arc<Flight>,
    finished: bool,
}

impl BuildGuard<'_> {
    fn finish(mut self, outcome: &Outcome) {
        *self.slot.state.lock() = match outcome {
            Ok(instance) => SlotState::Occupied(instance.clone()),
            Err(_) => SlotState::Vacant,
        };
        self.flight.complete(FlightState::Done(outcome.clone()));
        self.finished = true;
    }
}

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            *self.slot.state.lock() = SlotState::Vacant;
            self.flight.complete(FlightState::Abandoned);
        }
    }
}

/// Cached instance that has a destroy hook to run on teardown.
pub(crate) struct Resolved {
    pub(crate) identity: Identity,
    pub(crate) instance: Arc<Instance>,
    pub(crate) slot: Arc<Slot>,
    pub(crate) on_destroy: BoxedCloneHook,
}

impl Resolved {
    /// Evicts the instance from its slot and runs the destroy hook.
    /// The entry is consumed, so the hook can't run twice for the same instance.
    pub(crate) fn finalize(self) -> Result<(), LifecycleErrorKind> {
        if self.slot.evict(&self.instance) {
            debug!(identity = %self.identity, "Evicted from cache");
        }
        lifecycle::run_destroy(&self.identity, self.on_destroy, &self.instance)
    }
}

/// Resolved entries in construction order. Dependencies finish construction
/// before their dependents, so popping from the back tears down dependents first.
#[derive(Default)]
pub(crate) struct ResolvedSet(VecDeque<Resolved>);

impl ResolvedSet {
    #[inline]
    pub(crate) fn push(&mut self, resolved: Resolved) {
        self.0.push_back(resolved);
    }

    #[inline]
    pub(crate) fn pop(&mut self) -> Option<Resolved> {
        self.0.pop_back()
    }

    /// Drops the entries cached in `slot` without running their hooks.
    pub(crate) fn discard(&mut self, slot: &Arc<Slot>) {
        self.0.retain(|resolved| !Arc::ptr_eq(&resolved.slot, slot));
    }
}

#[derive(Default)]
pub(crate) struct RequestCache {
    slots: BTreeMap<Identity, Arc<Slot>>,
    pub(crate) resolved: ResolvedSet,
}

impl RequestCache {
    #[inline]
    pub(crate) fn slot(&mut self, identity: &Identity) -> Arc<Slot> {
        self.slots.entry(identity.clone()).or_default().clone()
    }
}

pub(crate) type SharedRequestCache = Arc<Mutex<RequestCache>>;

/// Request-scoped caches of all requests, keyed by token.
#[derive(Default)]
pub(crate) struct RequestCaches {
    caches: DashMap<RequestToken, SharedRequestCache>,
}

impl RequestCaches {
    #[must_use]
    pub(crate) fn get(&self, token: RequestToken, identity: &Identity) -> Option<Arc<Instance>> {
        let cache = self.caches.get(&token)?.clone();
        let slot = cache.lock().slots.get(identity)?.clone();
        slot.get()
    }

    #[inline]
    pub(crate) fn cache(&self, token: RequestToken) -> SharedRequestCache {
        self.caches.entry(token).or_default().clone()
    }

    #[inline]
    #[must_use]
    pub(crate) fn existing(&self, token: RequestToken) -> Option<SharedRequestCache> {
        self.caches.get(&token).map(|cache| cache.clone())
    }

    #[inline]
    pub(crate) fn remove(&self, token: RequestToken) {
        self.caches.remove(&token);
    }

    /// Drops the instances of all requests without running any hooks.
    #[inline]
    pub(crate) fn clear(&self) {
        self.caches.clear();
    }

    /// Drops the instances cached for `identity` in every request, hooks included.
    pub(crate) fn evict_identity(&self, identity: &Identity) {
        for cache in self.caches.iter() {
            let mut cache = cache.lock();
            if let Some(slot) = cache.slots.remove(identity) {
                cache.resolved.discard(&slot);
            }
        }
    }

    #[cfg(test)]
    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.caches.len()
    }
}
