//! Container fundamentals: lifetimes, trait bindings, error reporting.

use std::sync::Arc;

use scene_host::{DiError, Lifetime, Resolver, ServiceCollection};

struct Config {
    tick_rate: u32,
}

struct Session {
    id: u32,
}

#[test]
fn singleton_returns_same_instance() {
    let mut services = ServiceCollection::new();
    services.add_singleton(Config { tick_rate: 60 });
    let provider = services.build();

    let a = provider.get::<Config>().unwrap();
    let b = provider.get::<Config>().unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(a.tick_rate, 60);
}

#[test]
fn transient_returns_fresh_instances() {
    let mut services = ServiceCollection::new();
    services.add_transient_factory::<Session, _>(|_| Session { id: 1 });
    let provider = services.build();

    let a = provider.get::<Session>().unwrap();
    let b = provider.get::<Session>().unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
}

#[test]
fn singleton_factory_runs_once() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    let calls = Arc::new(AtomicUsize::new(0));
    let calls_clone = calls.clone();

    let mut services = ServiceCollection::new();
    services.add_singleton_factory::<Session, _>(move |_| {
        calls_clone.fetch_add(1, Ordering::SeqCst);
        Session { id: 7 }
    });
    let provider = services.build();

    provider.get::<Session>().unwrap();
    provider.get::<Session>().unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn concurrent_first_resolution_runs_factory_once() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    let calls = Arc::new(AtomicUsize::new(0));
    let calls_clone = calls.clone();

    let mut services = ServiceCollection::new();
    services.add_singleton_factory::<Session, _>(move |_| {
        calls_clone.fetch_add(1, Ordering::SeqCst);
        // Widen the race window; losers must block on the winner
        std::thread::sleep(Duration::from_millis(50));
        Session { id: 9 }
    });
    let provider = services.build();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let provider = provider.clone();
            std::thread::spawn(move || provider.get::<Session>().unwrap())
        })
        .collect();
    let resolved: Vec<Arc<Session>> = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .collect();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    for session in &resolved[1..] {
        assert!(Arc::ptr_eq(&resolved[0], session));
    }
}

#[test]
fn missing_service_reports_type_name() {
    let provider = ServiceCollection::new().build();
    match provider.get::<Config>() {
        Err(DiError::NotFound(name)) => assert!(name.contains("Config")),
        other => panic!("unexpected: {:?}", other.map(|_| ())),
    }
}

trait Handler: Send + Sync {
    fn id(&self) -> u32;
}

struct First;
impl Handler for First {
    fn id(&self) -> u32 {
        1
    }
}

struct Second;
impl Handler for Second {
    fn id(&self) -> u32 {
        2
    }
}

#[test]
fn multi_bindings_resolve_in_registration_order() {
    let mut services = ServiceCollection::new();
    services.add_trait_implementation::<dyn Handler>(Arc::new(First), Lifetime::Singleton);
    services.add_trait_implementation::<dyn Handler>(Arc::new(Second), Lifetime::Singleton);
    let provider = services.build();

    let all = provider.get_all_trait::<dyn Handler>().unwrap();
    let ids: Vec<u32> = all.iter().map(|h| h.id()).collect();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn single_trait_resolution_falls_back_to_last_multi_binding() {
    let mut services = ServiceCollection::new();
    services.add_trait_implementation::<dyn Handler>(Arc::new(First), Lifetime::Singleton);
    services.add_trait_implementation::<dyn Handler>(Arc::new(Second), Lifetime::Singleton);
    let provider = services.build();

    let handler = provider.get_trait::<dyn Handler>().unwrap();
    assert_eq!(handler.id(), 2);
}

struct Left {
    _right: Arc<Right>,
}

struct Right {
    _left: Arc<Left>,
}

#[test]
fn circular_dependency_is_reported_with_path() {
    let mut services = ServiceCollection::new();
    services.add_arc_factory::<Left, _>(Lifetime::Singleton, |r| {
        Ok(Arc::new(Left {
            _right: r.get::<Right>()?,
        }))
    });
    services.add_arc_factory::<Right, _>(Lifetime::Singleton, |r| {
        Ok(Arc::new(Right {
            _left: r.get::<Left>()?,
        }))
    });
    let provider = services.build();

    match provider.get::<Left>() {
        Err(DiError::Circular(path)) => assert!(path.len() >= 3),
        other => panic!("unexpected: {:?}", other.map(|_| ())),
    }
}
