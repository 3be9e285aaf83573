//! Full application flow: composition, configuration, hosted component with
//! repeating work, shutdown cancelling scheduled callbacks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use scene_host::{
    Behaviour, CancellationToken, Configuration, HostComposition, HostManager,
    HostManagerOptions, HostedService, InjectionMethod, JsonSettings, Logger, NodeId, Resolver,
    Scene, SceneComponent, ServiceError,
};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
struct NetSettings {
    port: u16,
    region: String,
}

impl Default for NetSettings {
    fn default() -> Self {
        Self {
            port: 7777,
            region: "dev".to_string(),
        }
    }
}

static HEARTBEATS: AtomicUsize = AtomicUsize::new(0);

struct Heartbeat {
    logger: Mutex<Option<Arc<Logger>>>,
}

impl Behaviour for Heartbeat {}

impl SceneComponent for Heartbeat {
    fn spawn() -> Self {
        Heartbeat {
            logger: Mutex::new(None),
        }
    }

    fn on_spawn(&self, scene: &Scene, node: NodeId) {
        scene.schedule_repeating(node, Duration::from_millis(100), || {
            HEARTBEATS.fetch_add(1, Ordering::SeqCst);
        });
    }

    fn injection() -> Option<InjectionMethod<Self>> {
        Some(
            InjectionMethod::<Self>::named("awake_services")
                .param::<Logger>()
                .apply(|heartbeat, args| {
                    *heartbeat.logger.lock().unwrap() = Some(args.get::<Logger>()?);
                    Ok(())
                }),
        )
    }
}

#[async_trait]
impl HostedService for Heartbeat {
    async fn start(&self, _token: CancellationToken) -> Result<(), ServiceError> {
        if let Some(logger) = self.logger.lock().unwrap().as_ref() {
            logger.info("heartbeat", "online");
        }
        Ok(())
    }

    async fn stop(&self, _token: CancellationToken) -> Result<(), ServiceError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "heartbeat"
    }
}

struct App {
    config_dir: std::path::PathBuf,
}

impl HostComposition for App {
    fn configure_configuration(&self, configuration: &mut scene_host::ConfigurationBuilder) {
        configuration.add_source(JsonSettings::<NetSettings>::new(&self.config_dir, "network"));
    }

    fn configure_components(&self, components: &mut scene_host::SceneServiceBuilder) {
        components.add_hosted_component::<Heartbeat>();
    }
}

#[test]
fn composed_application_runs_and_shuts_down_cleanly() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().unwrap();
    let scene = Scene::new();

    let manager = HostManager::new(
        scene.clone(),
        App {
            config_dir: dir.path().to_path_buf(),
        },
        HostManagerOptions::default(),
    )
    .unwrap();

    manager.awake().unwrap();
    let host = manager.host().unwrap();

    // First run wrote the defaults to disk and merged them flattened
    assert!(dir.path().join("Config").join("network.json").exists());
    let config = host.provider().get::<Configuration>().unwrap();
    assert_eq!(config.get("port"), Some("7777"));
    assert_eq!(config.get("region"), Some("dev"));

    // The hosted component was injected before starting
    let heartbeat = host.provider().get::<Heartbeat>().unwrap();
    assert!(heartbeat.logger.lock().unwrap().is_some());

    // Repeating work scheduled at spawn fires with scene updates
    scene.update(Duration::from_millis(150));
    assert_eq!(HEARTBEATS.load(Ordering::SeqCst), 1);

    // Stopping cancels the node's scheduled callbacks
    manager.stop().unwrap();
    scene.update(Duration::from_secs(1));
    assert_eq!(HEARTBEATS.load(Ordering::SeqCst), 1);
}
