//! Engine-driven host management.
//!
//! `HostManager` is itself a scene component: attached to a node, it builds
//! the host when the engine wakes it and tears the host down when the node
//! is destroyed. It carries its own async runtime so the engine's
//! synchronous callbacks can drive the async host lifecycle.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Runtime;

use crate::cancellation::CancellationToken;
use crate::collection::ServiceCollection;
use crate::config::ConfigurationBuilder;
use crate::error::{HostError, HostResult};
use crate::hosting::builder::HostBuilder;
use crate::hosting::components::SceneServiceBuilder;
use crate::hosting::host::{Host, HostOptions};
use crate::logging::{ConsoleSink, LoggingBuilder};
use crate::scene::{Behaviour, Scene};

const LOG_CATEGORY: &str = "scene_host::manager";

/// Application composition root.
///
/// Implementations override the methods for the concerns they use; each
/// default is empty. The manager applies them in order: logging,
/// configuration, services, components.
pub trait HostComposition: Send + Sync + 'static {
    fn configure_logging(&self, _logging: &mut LoggingBuilder) {}

    fn configure_configuration(&self, _configuration: &mut ConfigurationBuilder) {}

    fn configure_services(&self, _services: &mut ServiceCollection) {}

    fn configure_components(&self, _components: &mut SceneServiceBuilder) {}
}

/// Manager behavior knobs.
#[derive(Clone)]
pub struct HostManagerOptions {
    /// Method name components must declare for dependency injection.
    pub injection_method_name: String,
    /// Build and start the host when the engine wakes the manager. With
    /// `false`, the host waits for [`HostManager::build_manually`].
    pub build_on_awake: bool,
    /// Stop the host when the manager's node is destroyed.
    pub bind_engine_lifetime: bool,
    /// Register a console sink before the composition's logging runs.
    pub log_to_console: bool,
    pub host: HostOptions,
}

impl Default for HostManagerOptions {
    fn default() -> Self {
        Self {
            injection_method_name: "awake_services".to_string(),
            build_on_awake: true,
            bind_engine_lifetime: true,
            log_to_console: true,
            host: HostOptions::default(),
        }
    }
}

/// Scene component that owns and drives a [`Host`].
///
/// # Examples
///
/// ```
/// use scene_host::{
///     HostComposition, HostManager, HostManagerOptions, Scene, ServiceCollection,
/// };
///
/// struct Game;
///
/// impl HostComposition for Game {
///     fn configure_services(&self, services: &mut ServiceCollection) {
///         services.add_singleton(42u64);
///     }
/// }
///
/// let scene = Scene::new();
/// let manager = HostManager::new(scene, Game, HostManagerOptions::default()).unwrap();
/// manager.awake().unwrap();
/// assert!(manager.host().is_some());
/// manager.stop().unwrap();
/// ```
pub struct HostManager {
    scene: Scene,
    composition: Box<dyn HostComposition>,
    options: HostManagerOptions,
    runtime: Runtime,
    host: Mutex<Option<Arc<Host>>>,
}

impl HostManager {
    pub fn new(
        scene: Scene,
        composition: impl HostComposition,
        options: HostManagerOptions,
    ) -> HostResult<Self> {
        let runtime = Runtime::new().map_err(HostError::Runtime)?;
        Ok(Self {
            scene,
            composition: Box::new(composition),
            options,
            runtime,
            host: Mutex::new(None),
        })
    }

    /// The built host, if any.
    pub fn host(&self) -> Option<Arc<Host>> {
        self.host.lock().unwrap().clone()
    }

    /// Engine wake-up. With `build_on_awake` this builds and starts the
    /// host; otherwise it does nothing.
    pub fn awake(&self) -> HostResult<()> {
        if !self.options.build_on_awake {
            return Ok(());
        }
        self.build_host()?;
        self.start()
    }

    /// Builds the host without starting it. For compositions with
    /// `build_on_awake` disabled.
    pub fn build_manually(&self) -> HostResult<Arc<Host>> {
        self.build_host()
    }

    /// Starts the built host's services, blocking until the sequence
    /// completes.
    pub fn start(&self) -> HostResult<()> {
        let host = self
            .host()
            .ok_or(HostError::LifecycleMisuse("host has not been built"))?;
        self.runtime.block_on(host.start(CancellationToken::new()))
    }

    /// Stops the host's services, blocking until the sweep completes.
    /// Stopping before the host is built is a no-op.
    pub fn stop(&self) -> HostResult<()> {
        match self.host() {
            Some(host) => self.runtime.block_on(host.stop(CancellationToken::new())),
            None => Ok(()),
        }
    }

    /// Engine shutdown: stops the host and disposes the container, logging
    /// failures instead of surfacing them.
    pub fn application_quit(&self) {
        let Some(host) = self.host() else {
            return;
        };
        if let Err(err) = self.runtime.block_on(host.stop(CancellationToken::new())) {
            log::error!(target: LOG_CATEGORY, "Host stop failed during shutdown: {}", err);
        }
        self.runtime.block_on(host.dispose());
    }

    fn build_host(&self) -> HostResult<Arc<Host>> {
        let mut slot = self.host.lock().unwrap();
        if slot.is_some() {
            return Err(HostError::LifecycleMisuse(
                "manager has already built its host",
            ));
        }

        let mut builder =
            HostBuilder::new(self.scene.clone(), &self.options.injection_method_name)?;
        builder.with_options(self.options.host.clone());
        if self.options.log_to_console {
            builder.configure_logging(|logging| {
                logging.add_sink(ConsoleSink);
            });
        }
        builder.configure_logging(|logging| self.composition.configure_logging(logging));
        builder.configure_configuration(|configuration| {
            self.composition.configure_configuration(configuration)
        });
        builder.configure_services(|services| self.composition.configure_services(services));
        builder.configure_components(|components| {
            self.composition.configure_components(components)
        });

        let host = Arc::new(builder.build()?);
        *slot = Some(host.clone());
        Ok(host)
    }
}

impl Behaviour for HostManager {
    fn tick(&self, _dt: Duration) {}

    fn on_disable(&self) {
        if self.options.bind_engine_lifetime {
            if let Err(err) = self.stop() {
                log::error!(target: LOG_CATEGORY, "Host stop failed on disable: {}", err);
            }
        }
    }

    fn on_destroy(&self) {
        if self.options.bind_engine_lifetime {
            self.application_quit();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hosting::host::HostState;

    struct Empty;
    impl HostComposition for Empty {}

    #[test]
    fn awake_builds_and_starts() {
        let scene = Scene::new();
        let manager = HostManager::new(scene, Empty, HostManagerOptions::default()).unwrap();
        manager.awake().unwrap();

        let host = manager.host().unwrap();
        assert_eq!(host.state(), HostState::Started);

        manager.stop().unwrap();
        assert_eq!(host.state(), HostState::Stopped);
    }

    #[test]
    fn manual_build_skips_start() {
        let scene = Scene::new();
        let options = HostManagerOptions {
            build_on_awake: false,
            ..Default::default()
        };
        let manager = HostManager::new(scene, Empty, options).unwrap();
        manager.awake().unwrap();
        assert!(manager.host().is_none());
        assert!(matches!(
            manager.start(),
            Err(HostError::LifecycleMisuse(_))
        ));

        let host = manager.build_manually().unwrap();
        assert_eq!(host.state(), HostState::Built);
    }

    #[test]
    fn second_build_is_rejected() {
        let scene = Scene::new();
        let options = HostManagerOptions {
            build_on_awake: false,
            ..Default::default()
        };
        let manager = HostManager::new(scene, Empty, options).unwrap();
        manager.build_manually().unwrap();
        assert!(matches!(
            manager.build_manually(),
            Err(HostError::LifecycleMisuse(_))
        ));
    }
}
