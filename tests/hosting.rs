//! Host orchestration: start/stop ordering, failure isolation, lifecycle
//! misuse.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use scene_host::{
    CancellationToken, Host, HostBuilder, HostError, HostOptions, HostState, HostedService,
    Scene, ServiceError, StartFailurePolicy,
};

type EventLog = Arc<Mutex<Vec<String>>>;

struct Recorder {
    name: &'static str,
    log: EventLog,
    fail_start: bool,
    fail_stop: bool,
}

impl Recorder {
    fn new(name: &'static str, log: &EventLog) -> Self {
        Self {
            name,
            log: log.clone(),
            fail_start: false,
            fail_stop: false,
        }
    }
}

#[async_trait]
impl HostedService for Recorder {
    async fn start(&self, _token: CancellationToken) -> Result<(), ServiceError> {
        self.log.lock().unwrap().push(format!("start {}", self.name));
        if self.fail_start {
            return Err(format!("{} start refused", self.name).into());
        }
        Ok(())
    }

    async fn stop(&self, _token: CancellationToken) -> Result<(), ServiceError> {
        self.log.lock().unwrap().push(format!("stop {}", self.name));
        if self.fail_stop {
            return Err(format!("{} stop refused", self.name).into());
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

fn host_with(services: Vec<Recorder>) -> Host {
    let mut builder = HostBuilder::new(Scene::new(), "awake_services").unwrap();
    builder.with_options(HostOptions {
        suppress_status_messages: true,
        ..Default::default()
    });
    builder.configure_services(move |collection| {
        for service in services {
            collection.add_trait_implementation::<dyn HostedService>(
                Arc::new(service) as Arc<dyn HostedService>,
                scene_host::Lifetime::Singleton,
            );
        }
    });
    builder.build().unwrap()
}

#[tokio::test]
async fn services_start_in_registration_order() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let host = host_with(vec![
        Recorder::new("a", &log),
        Recorder::new("b", &log),
        Recorder::new("c", &log),
    ]);

    host.start(CancellationToken::new()).await.unwrap();
    assert_eq!(host.state(), HostState::Started);
    assert_eq!(*log.lock().unwrap(), vec!["start a", "start b", "start c"]);
}

#[tokio::test]
async fn services_stop_in_reverse_order() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let host = host_with(vec![
        Recorder::new("a", &log),
        Recorder::new("b", &log),
        Recorder::new("c", &log),
    ]);

    host.start(CancellationToken::new()).await.unwrap();
    log.lock().unwrap().clear();

    host.stop(CancellationToken::new()).await.unwrap();
    assert_eq!(host.state(), HostState::Stopped);
    assert_eq!(*log.lock().unwrap(), vec!["stop c", "stop b", "stop a"]);
}

#[tokio::test]
async fn start_failure_aborts_remaining_starts() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let mut failing = Recorder::new("b", &log);
    failing.fail_start = true;
    let host = host_with(vec![
        Recorder::new("a", &log),
        failing,
        Recorder::new("c", &log),
    ]);

    let err = host.start(CancellationToken::new()).await.unwrap_err();
    match err {
        HostError::StartFailure { service, .. } => assert_eq!(service, "b"),
        other => panic!("unexpected: {}", other),
    }
    assert_eq!(host.state(), HostState::Failed);
    assert_eq!(*log.lock().unwrap(), vec!["start a", "start b"]);
}

#[tokio::test]
async fn start_failure_policy_stops_started_services() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let mut failing = Recorder::new("b", &log);
    failing.fail_start = true;

    let mut builder = HostBuilder::new(Scene::new(), "awake_services").unwrap();
    builder.with_options(HostOptions {
        start_failure_policy: StartFailurePolicy::StopStarted,
        suppress_status_messages: true,
        ..Default::default()
    });
    let services = vec![Recorder::new("a", &log), failing];
    builder.configure_services(move |collection| {
        for service in services {
            collection.add_trait_implementation::<dyn HostedService>(
                Arc::new(service) as Arc<dyn HostedService>,
                scene_host::Lifetime::Singleton,
            );
        }
    });
    let host = builder.build().unwrap();

    host.start(CancellationToken::new()).await.unwrap_err();
    assert_eq!(
        *log.lock().unwrap(),
        vec!["start a", "start b", "stop a"]
    );
}

#[tokio::test]
async fn stop_failure_does_not_skip_remaining_services() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let mut failing = Recorder::new("b", &log);
    failing.fail_stop = true;
    let host = host_with(vec![
        Recorder::new("a", &log),
        failing,
        Recorder::new("c", &log),
    ]);

    host.start(CancellationToken::new()).await.unwrap();
    log.lock().unwrap().clear();

    let err = host.stop(CancellationToken::new()).await.unwrap_err();
    match err {
        HostError::StopFailures(failures) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].service, "b");
        }
        other => panic!("unexpected: {}", other),
    }

    // Every service was still attempted, in reverse order
    assert_eq!(*log.lock().unwrap(), vec!["stop c", "stop b", "stop a"]);
    assert_eq!(host.state(), HostState::Stopped);
}

struct NeverStops;

#[async_trait]
impl HostedService for NeverStops {
    async fn start(&self, _token: CancellationToken) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn stop(&self, _token: CancellationToken) -> Result<(), ServiceError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "never-stops"
    }
}

#[tokio::test]
async fn shutdown_timeout_abandons_stuck_services() {
    let mut builder = HostBuilder::new(Scene::new(), "awake_services").unwrap();
    builder.with_options(HostOptions {
        shutdown_timeout: Duration::from_millis(50),
        suppress_status_messages: true,
        ..Default::default()
    });
    builder.configure_services(|collection| {
        collection.add_hosted_service::<NeverStops, _>(|_| Ok(Arc::new(NeverStops)));
    });
    let host = builder.build().unwrap();

    host.start(CancellationToken::new()).await.unwrap();
    let err = host.stop(CancellationToken::new()).await.unwrap_err();
    match err {
        HostError::StopFailures(failures) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].service, "never-stops");
        }
        other => panic!("unexpected: {}", other),
    }
    assert_eq!(host.state(), HostState::Stopped);
}

#[tokio::test]
async fn starting_twice_is_a_lifecycle_error() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let host = host_with(vec![Recorder::new("a", &log)]);

    host.start(CancellationToken::new()).await.unwrap();
    assert!(matches!(
        host.start(CancellationToken::new()).await,
        Err(HostError::LifecycleMisuse(_))
    ));
}

#[tokio::test]
async fn stopping_a_never_started_host_is_a_noop() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let host = host_with(vec![Recorder::new("a", &log)]);

    host.stop(CancellationToken::new()).await.unwrap();
    assert!(log.lock().unwrap().is_empty());
    assert_eq!(host.state(), HostState::Built);
}

#[test]
fn building_twice_is_a_lifecycle_error() {
    let mut builder = HostBuilder::new(Scene::new(), "awake_services").unwrap();
    builder.build().unwrap();
    assert!(matches!(
        builder.build(),
        Err(HostError::LifecycleMisuse(_))
    ));
}

#[tokio::test]
async fn lifetime_events_fire_in_order() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let host = host_with(vec![Recorder::new("a", &log)]);

    let lifetime = host.lifetime().clone();
    let started_log = log.clone();
    lifetime.on_started(move || started_log.lock().unwrap().push("started".to_string()));
    let stopping_log = log.clone();
    lifetime.on_stopping(move || stopping_log.lock().unwrap().push("stopping".to_string()));
    let stopped_log = log.clone();
    lifetime.on_stopped(move || stopped_log.lock().unwrap().push("stopped".to_string()));

    host.start(CancellationToken::new()).await.unwrap();
    host.stop(CancellationToken::new()).await.unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec!["start a", "started", "stopping", "stop a", "stopped"]
    );
    assert!(lifetime.stopping_token().is_cancelled());
}
