//! Scope behavior: per-scope caching, lifetime enforcement, scene scope
//! teardown ordering.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use scene_host::{
    Behaviour, DiError, Dispose, HostBuilder, Lifetime, Resolver, Scene, SceneComponent,
    ServiceCollection,
};

struct Session {
    id: usize,
}

fn provider_with_scoped_session() -> scene_host::ServiceProvider {
    let counter = Arc::new(Mutex::new(0));
    let mut services = ServiceCollection::new();
    services.add_scoped_factory::<Session, _>(move |_| {
        let mut c = counter.lock().unwrap();
        *c += 1;
        Session { id: *c }
    });
    services.build()
}

#[test]
fn scoped_services_are_cached_per_scope() {
    let provider = provider_with_scoped_session();

    let scope1 = provider.create_scope();
    let scope2 = provider.create_scope();

    let a = scope1.get::<Session>().unwrap();
    let b = scope1.get::<Session>().unwrap();
    let c = scope2.get::<Session>().unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&a, &c));
    assert_ne!(a.id, c.id);
}

#[test]
fn scoped_resolution_from_root_is_rejected() {
    let provider = provider_with_scoped_session();
    assert!(matches!(
        provider.get::<Session>(),
        Err(DiError::WrongLifetime(_))
    ));
}

struct Connection {
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl Dispose for Connection {
    fn dispose(&self) {
        self.log.lock().unwrap().push("dispose connection");
    }
}

#[tokio::test]
async fn scope_disposers_run_on_dispose() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let log_clone = log.clone();

    let mut services = ServiceCollection::new();
    services.add_arc_factory::<Connection, _>(Lifetime::Scoped, move |r| {
        let conn = Arc::new(Connection {
            log: log_clone.clone(),
        });
        r.register_disposer(conn.clone());
        Ok(conn)
    });
    let provider = services.build();

    let scope = provider.create_scope();
    scope.get::<Connection>().unwrap();
    assert!(log.lock().unwrap().is_empty());

    scope.dispose_all().await;
    assert_eq!(*log.lock().unwrap(), vec!["dispose connection"]);
}

struct RoomState {
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl Dispose for RoomState {
    fn dispose(&self) {
        self.log.lock().unwrap().push("dispose room state");
    }
}

struct Room;

impl Behaviour for Room {
    fn on_destroy(&self) {
        ROOM_LOG.with_log(|log| log.lock().unwrap().push("destroy room node"));
    }
}

impl SceneComponent for Room {
    fn spawn() -> Self {
        Room
    }
}

// Shared between the Room component (constructed without arguments) and the
// test body.
struct RoomLog(Mutex<Option<Arc<Mutex<Vec<&'static str>>>>>);

impl RoomLog {
    fn with_log(&self, f: impl FnOnce(&Arc<Mutex<Vec<&'static str>>>)) {
        if let Some(log) = self.0.lock().unwrap().as_ref() {
            f(log);
        }
    }
}

static ROOM_LOG: RoomLog = RoomLog(Mutex::new(None));

#[tokio::test]
async fn scene_scope_disposes_container_before_destroying_nodes() {
    let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    *ROOM_LOG.0.lock().unwrap() = Some(log.clone());

    let scene = Scene::new();
    let mut builder = HostBuilder::new(scene, "awake_services").unwrap();
    let log_clone = log.clone();
    builder.configure_services(move |services| {
        let log_clone = log_clone.clone();
        services.add_arc_factory::<RoomState, _>(Lifetime::Scoped, move |r| {
            let state = Arc::new(RoomState {
                log: log_clone.clone(),
            });
            r.register_disposer(state.clone());
            Ok(state)
        });
    });
    builder.configure_components(|components| {
        components.add_component_scoped::<Room>();
    });
    let host = builder.build().unwrap();

    let scope = host.create_scope().unwrap();
    scope.scope().get::<RoomState>().unwrap();
    scope.scope().get::<Room>().unwrap();

    scope.dispose().await;
    assert_eq!(
        *log.lock().unwrap(),
        vec!["dispose room state", "destroy room node"]
    );

    *ROOM_LOG.0.lock().unwrap() = None;
}

struct Lobby;

impl Behaviour for Lobby {}

impl SceneComponent for Lobby {
    fn spawn() -> Self {
        Lobby
    }
}

#[test]
fn scoped_components_die_with_their_scope_root_only() {
    let scene = Scene::new();
    let mut builder = HostBuilder::new(scene.clone(), "awake_services").unwrap();
    builder.configure_components(|components| {
        components.add_component_scoped::<Lobby>();
    });
    let host = builder.build().unwrap();

    let scope_a = host.create_scope().unwrap();
    let scope_b = host.create_scope().unwrap();

    let a = scope_a.scope().get::<Lobby>().unwrap();
    let b = scope_b.scope().get::<Lobby>().unwrap();
    assert!(!Arc::ptr_eq(&a, &b));

    scene.destroy(scope_a.root());
    assert!(!scene.is_alive(scope_a.root()));
    assert!(scene.is_alive(scope_b.root()));

    // The surviving scope still updates without incident
    scene.update(Duration::from_millis(16));
}
