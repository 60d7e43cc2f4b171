use std::{
    sync::{
        atomic::{AtomicU32, AtomicU8, Ordering},
        mpsc, Arc, Barrier, Mutex,
    },
    thread,
    time::Duration,
};
use tracing_test::traced_test;
use wirebox::{
    Config, Container, HookErrorKind, Hooks, Identity, Inject, InstantiateErrorKind, RequestToken, ResolveErrorKind, Resolver, Scope,
};

#[derive(Default)]
struct Counter {
    count: AtomicU32,
}

impl Counter {
    fn increment(&self, by: u32) {
        self.count.fetch_add(by, Ordering::SeqCst);
    }

    fn count(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }
}

struct ServiceA(Arc<ServiceB>);
struct ServiceB(Arc<ServiceA>);

struct TestService {
    value: &'static str,
}

#[test]
#[traced_test]
fn test_singleton_shared() {
    let container = Container::new();
    container.provide(|| Ok(Counter::default()), Scope::Singleton).unwrap();

    let first = container.get::<Counter>().unwrap();
    let second = container.get::<Counter>().unwrap();
    first.increment(2);

    assert_eq!(second.count(), 2);
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
#[traced_test]
fn test_prototype_distinct() {
    let container = Container::new();
    container.provide(|| Ok(Counter::default()), Scope::Prototype).unwrap();

    let first = container.get::<Counter>().unwrap();
    let second = container.get::<Counter>().unwrap();
    first.increment(2);
    second.increment(1);

    assert_eq!(first.count(), 2);
    assert_eq!(second.count(), 1);
}

#[test]
#[traced_test]
fn test_cycle_reported_without_construction() {
    let constructed = Arc::new(AtomicU8::new(0));

    let container = Container::new();
    container
        .provide(
            {
                let constructed = constructed.clone();
                move |Inject(b): Inject<ServiceB>| {
                    constructed.fetch_add(1, Ordering::SeqCst);
                    Ok(ServiceA(b))
                }
            },
            Scope::Singleton,
        )
        .unwrap();
    container
        .provide(
            {
                let constructed = constructed.clone();
                move |Inject(a): Inject<ServiceA>| {
                    constructed.fetch_add(1, Ordering::SeqCst);
                    Ok(ServiceB(a))
                }
            },
            Scope::Singleton,
        )
        .unwrap();

    match container.get::<ServiceA>() {
        Err(ResolveErrorKind::CircularDependency { cycle }) => {
            assert_eq!(
                cycle.identities(),
                [Identity::of::<ServiceA>(), Identity::of::<ServiceB>(), Identity::of::<ServiceA>()]
            );
            assert_eq!(cycle.to_string(), "ServiceA -> ServiceB -> ServiceA");
        }
        _ => panic!("cycle should be detected"),
    }
    assert!(matches!(
        container.get::<ServiceB>(),
        Err(ResolveErrorKind::CircularDependency { .. })
    ));
    assert_eq!(constructed.load(Ordering::SeqCst), 0);
}

#[test]
#[traced_test]
fn test_named_identities() {
    let container = Container::new();
    container
        .provide_named("service1", || Ok(TestService { value: "one" }), Scope::Singleton)
        .unwrap();
    container
        .provide_named("service2", || Ok(TestService { value: "two" }), Scope::Singleton)
        .unwrap();

    assert_eq!(container.get_named::<TestService>("service1").unwrap().value, "one");
    assert_eq!(container.get_named::<TestService>("service2").unwrap().value, "two");
    match container.get::<TestService>() {
        Err(ResolveErrorKind::UnregisteredDependency { identity }) => {
            assert_eq!(identity, Identity::named::<TestService>("testService"));
        }
        _ => panic!("default identity shouldn't be registered"),
    }
}

#[test]
#[traced_test]
fn test_failed_construction_not_cached() {
    let container = Container::new();
    container
        .provide(
            || Err::<TestService, _>(InstantiateErrorKind::msg("database is down")),
            Scope::Singleton,
        )
        .unwrap();

    match container.get::<TestService>() {
        Err(ResolveErrorKind::ConstructionFailed { identity, source }) => {
            assert_eq!(identity, Identity::of::<TestService>());
            assert_eq!(source.to_string(), "database is down");
        }
        _ => panic!("construction should fail"),
    }

    container
        .provide(|| Ok(TestService { value: "fixed" }), Scope::Singleton)
        .unwrap();
    assert_eq!(container.get::<TestService>().unwrap().value, "fixed");
}

#[test]
#[traced_test]
fn test_request_isolation() {
    let container = Container::new();
    container.provide(|| Ok(Counter::default()), Scope::Request).unwrap();

    let first = container.enter(&RequestToken::new());
    let second = container.enter(&RequestToken::new());

    let first_1 = first.get::<Counter>().unwrap();
    let first_2 = first.get::<Counter>().unwrap();
    let second_1 = second.get::<Counter>().unwrap();

    assert!(Arc::ptr_eq(&first_1, &first_2));
    assert!(!Arc::ptr_eq(&first_1, &second_1));

    container.clear_request_scoped();
    assert!(!Arc::ptr_eq(&first_1, &first.get::<Counter>().unwrap()));
}

#[test]
#[traced_test]
fn test_request_close_runs_destroy_in_reverse_order() {
    struct Connection;
    struct Transaction(Arc<Connection>);

    let events = Arc::new(Mutex::new(Vec::new()));

    let container = Container::new();
    container
        .provide_with_config(
            || Ok(Connection),
            Config::new(Scope::Request).hooks(Hooks::new().on_destroy({
                let events = events.clone();
                move |_: &Connection| {
                    events.lock().unwrap().push("connection");
                    Ok(())
                }
            })),
        )
        .unwrap();
    container
        .provide_with_config(
            |Inject(connection): Inject<Connection>| Ok(Transaction(connection)),
            Config::new(Scope::Request).hooks(Hooks::new().on_destroy({
                let events = events.clone();
                move |_: &Transaction| {
                    events.lock().unwrap().push("transaction");
                    Ok(())
                }
            })),
        )
        .unwrap();

    let scope = container.enter(&RequestToken::new());
    let transaction = scope.get::<Transaction>().unwrap();
    assert!(Arc::ptr_eq(&transaction.0, &scope.get::<Connection>().unwrap()));

    scope.close().unwrap();
    scope.close().unwrap();

    assert_eq!(*events.lock().unwrap(), ["transaction", "connection"]);
    assert!(!Arc::ptr_eq(&transaction, &scope.get::<Transaction>().unwrap()));
}

#[test]
#[traced_test]
fn test_hook_ordering() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let record = |event: &'static str| {
        let events = events.clone();
        move |_: &Counter| -> Result<(), HookErrorKind> {
            events.lock().unwrap().push(event);
            Ok(())
        }
    };

    let container = Container::new();
    container
        .provide_with_config(
            || Ok(Counter::default()),
            Config::new(Scope::Singleton).hooks(
                Hooks::new()
                    .on_init(record("init"))
                    .on_start(record("start"))
                    .on_destroy(record("destroy")),
            ),
        )
        .unwrap();

    container.start().unwrap();
    container.get::<Counter>().unwrap();
    container.destroy().unwrap();
    container.destroy().unwrap();

    assert_eq!(*events.lock().unwrap(), ["init", "start", "destroy"]);
}

#[test]
#[traced_test]
fn test_failed_init_never_destroyed() {
    let destroyed = Arc::new(AtomicU8::new(0));

    let container = Container::new();
    container
        .provide_with_config(
            || Ok(Counter::default()),
            Config::new(Scope::Singleton).hooks(
                Hooks::new()
                    .on_init(|_: &Counter| Err(HookErrorKind::msg("invalid config")))
                    .on_destroy({
                        let destroyed = destroyed.clone();
                        move |_: &Counter| {
                            destroyed.fetch_add(1, Ordering::SeqCst);
                            Ok(())
                        }
                    }),
            ),
        )
        .unwrap();

    assert!(matches!(
        container.get::<Counter>(),
        Err(ResolveErrorKind::InitFailed { .. })
    ));
    container.destroy().unwrap();
    drop(container);

    assert_eq!(destroyed.load(Ordering::SeqCst), 0);
}

#[test]
#[traced_test]
fn test_concurrent_singleton_construction() {
    const THREADS: usize = 16;

    let constructed = Arc::new(AtomicU8::new(0));

    let container = Container::new();
    container
        .provide(
            {
                let constructed = constructed.clone();
                move || {
                    constructed.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(20));
                    Ok(Counter::default())
                }
            },
            Scope::Singleton,
        )
        .unwrap();

    let barrier = Barrier::new(THREADS);
    let counters = thread::scope(|s| {
        let handles = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    container.get::<Counter>().unwrap()
                })
            })
            .collect::<Vec<_>>();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect::<Vec<_>>()
    });

    assert_eq!(constructed.load(Ordering::SeqCst), 1);
    assert!(counters.iter().all(|counter| Arc::ptr_eq(counter, &counters[0])));
}

#[test]
#[traced_test]
fn test_concurrent_singleton_failure_shared() {
    const THREADS: usize = 8;

    let attempts = Arc::new(AtomicU8::new(0));

    let container = Container::new();
    container
        .provide(
            {
                let attempts = attempts.clone();
                move || {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(50));
                    Err::<Counter, _>(InstantiateErrorKind::msg("unavailable"))
                }
            },
            Scope::Singleton,
        )
        .unwrap();

    let barrier = Barrier::new(THREADS);
    let errors = thread::scope(|s| {
        let handles = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    container.get::<Counter>().err()
                })
            })
            .collect::<Vec<_>>();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect::<Vec<_>>()
    });

    assert_eq!(attempts.load(Ordering::SeqCst), 1);

    let sources = errors
        .into_iter()
        .map(|err| match err {
            Some(ResolveErrorKind::ConstructionFailed {
                source: InstantiateErrorKind::Custom(source),
                ..
            }) => source,
            _ => panic!("every caller should get the construction failure"),
        })
        .collect::<Vec<_>>();
    assert!(sources.iter().all(|source| Arc::ptr_eq(source, &sources[0])));
}

#[test]
#[traced_test]
fn test_concurrent_request_scoped_construction() {
    const THREADS: usize = 16;

    let constructed = Arc::new(AtomicU8::new(0));

    let container = Container::new();
    container
        .provide(
            {
                let constructed = constructed.clone();
                move || {
                    constructed.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(20));
                    Ok(Counter::default())
                }
            },
            Scope::Request,
        )
        .unwrap();

    let token = RequestToken::new();
    let barrier = Barrier::new(THREADS);
    let counters = thread::scope(|s| {
        let handles = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    container.enter(&token).get::<Counter>().unwrap()
                })
            })
            .collect::<Vec<_>>();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect::<Vec<_>>()
    });

    assert_eq!(constructed.load(Ordering::SeqCst), 1);
    assert!(counters.iter().all(|counter| Arc::ptr_eq(counter, &counters[0])));

    let other = container.enter(&RequestToken::new()).get::<Counter>().unwrap();
    assert!(!Arc::ptr_eq(&other, &counters[0]));
}

#[derive(Clone)]
struct Left;
#[derive(Clone)]
struct Right;

fn resolving<Own, Other>(own: Own) -> impl FnMut(Resolver) -> Result<Own, InstantiateErrorKind> + Clone + Send + Sync + 'static
where
    Own: Clone + Send + Sync + 'static,
    Other: Send + Sync + 'static,
{
    move |resolver: Resolver| {
        thread::sleep(Duration::from_millis(100));
        resolver.get::<Other>()?;
        Ok(own.clone())
    }
}

#[test]
fn test_concurrent_runtime_cycle_reported() {
    let container = Container::new();
    container.provide(resolving::<Left, Right>(Left), Scope::Singleton).unwrap();
    container.provide(resolving::<Right, Left>(Right), Scope::Singleton).unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let (tx, rx) = mpsc::channel();
    {
        let (container, barrier, tx) = (container.clone(), barrier.clone(), tx.clone());
        thread::spawn(move || {
            barrier.wait();
            tx.send(container.get::<Left>().err()).unwrap();
        });
    }
    {
        let (container, barrier) = (container.clone(), barrier.clone());
        thread::spawn(move || {
            barrier.wait();
            tx.send(container.get::<Right>().err()).unwrap();
        });
    }

    for _ in 0..2 {
        let err = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("crosswise resolution shouldn't deadlock");
        assert!(matches!(err, Some(ResolveErrorKind::CircularDependency { .. })));
    }
}
