//! Host start/stop orchestration.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::cancellation::{CancellationError, CancellationToken};
use crate::error::{HostError, HostResult, ServiceError, StopFailure};
use crate::hosting::components::SceneScope;
use crate::hosting::lifecycle::ApplicationLifetime;
use crate::logging::Logger;
use crate::provider::ServiceProvider;
use crate::scene::{NodeId, Scene};
use crate::traits::Resolver;

const LOG_CATEGORY: &str = "scene_host";

/// Host lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostState {
    Built,
    Starting,
    Started,
    Stopping,
    Stopped,
    Failed,
}

/// What the host does with already-started services when a later start
/// fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartFailurePolicy {
    /// Leave started services running; the caller decides whether to stop.
    #[default]
    LeaveAsIs,
    /// Stop already-started services, in reverse order, best effort.
    StopStarted,
}

/// Host behavior knobs.
#[derive(Clone)]
pub struct HostOptions {
    /// Upper bound on the whole stop sweep. Services still running when it
    /// elapses are abandoned and recorded as stop failures.
    pub shutdown_timeout: Duration,
    pub start_failure_policy: StartFailurePolicy,
    /// Silences the host's own start/stop status log lines.
    pub suppress_status_messages: bool,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            shutdown_timeout: Duration::from_secs(5),
            start_failure_policy: StartFailurePolicy::default(),
            suppress_status_messages: false,
        }
    }
}

/// Long-running service started and stopped by the host.
///
/// Services start sequentially in registration order and stop sequentially
/// in reverse registration order; no two calls overlap.
///
/// # Examples
///
/// ```
/// use scene_host::{CancellationToken, HostedService, ServiceError};
/// use async_trait::async_trait;
///
/// struct Telemetry;
///
/// #[async_trait]
/// impl HostedService for Telemetry {
///     async fn start(&self, _token: CancellationToken) -> Result<(), ServiceError> {
///         Ok(())
///     }
///
///     async fn stop(&self, _token: CancellationToken) -> Result<(), ServiceError> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait HostedService: Send + Sync + 'static {
    /// Begins the service. The token links the caller's token with the
    /// application stopping signal.
    async fn start(&self, token: CancellationToken) -> Result<(), ServiceError>;

    /// Stops the service. The token links the caller's token with the
    /// graceful-shutdown timeout.
    async fn stop(&self, token: CancellationToken) -> Result<(), ServiceError>;

    /// Diagnostic name, defaults to the implementing type's name.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// The built host: a service provider, a scene with a host root node, and
/// the hosted service orchestration around them.
///
/// Produced by `HostBuilder::build`. `start` and `stop` drive the hosted
/// services; `dispose` tears down the container and the host root subtree.
pub struct Host {
    pub(crate) provider: ServiceProvider,
    pub(crate) scene: Scene,
    pub(crate) host_root: NodeId,
    pub(crate) lifetime: Arc<ApplicationLifetime>,
    pub(crate) logger: Arc<Logger>,
    pub(crate) options: HostOptions,
    pub(crate) state: Mutex<HostState>,
    pub(crate) started: Mutex<Vec<Arc<dyn HostedService>>>,
}

impl Host {
    /// The root service provider.
    pub fn provider(&self) -> &ServiceProvider {
        &self.provider
    }

    /// The scene this host drives.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// The process-lifetime node all singleton components hang off.
    pub fn root(&self) -> NodeId {
        self.host_root
    }

    /// The application lifetime notifications.
    pub fn lifetime(&self) -> &Arc<ApplicationLifetime> {
        &self.lifetime
    }

    /// Current lifecycle state.
    pub fn state(&self) -> HostState {
        *self.state.lock().unwrap()
    }

    fn status(&self, message: &str) {
        if !self.options.suppress_status_messages {
            self.logger.info(LOG_CATEGORY, message);
        }
    }

    /// Starts all hosted services in registration order.
    ///
    /// Each start is awaited before the next begins, with a token linked
    /// from `token` and the application stopping signal. The first failure
    /// aborts the remainder, leaves the host failed, and surfaces as
    /// [`HostError::StartFailure`]. With
    /// [`StartFailurePolicy::StopStarted`], already-started services are
    /// stopped best effort before returning.
    pub async fn start(&self, token: CancellationToken) -> HostResult<()> {
        {
            let mut state = self.state.lock().unwrap();
            match *state {
                HostState::Built => *state = HostState::Starting,
                HostState::Starting | HostState::Started => {
                    return Err(HostError::LifecycleMisuse("host is already started"));
                }
                HostState::Stopping | HostState::Stopped => {
                    return Err(HostError::LifecycleMisuse("host has already stopped"));
                }
                HostState::Failed => {
                    return Err(HostError::LifecycleMisuse(
                        "host cannot start again after a failed start",
                    ));
                }
            }
        }

        self.status("Application starting");

        let services = self.provider.get_all_trait::<dyn HostedService>()?;
        let linked = CancellationToken::linked(&token, &self.lifetime.stopping_token());

        for service in services {
            let name = service.name();
            self.logger.debug(LOG_CATEGORY, &format!("Starting {}", name));
            match service.start(linked.clone()).await {
                Ok(()) => self.started.lock().unwrap().push(service),
                Err(source) => {
                    *self.state.lock().unwrap() = HostState::Failed;
                    self.logger
                        .error(LOG_CATEGORY, &format!("{} failed to start: {}", name, source));
                    if self.options.start_failure_policy == StartFailurePolicy::StopStarted {
                        let _ = self.stop_started(&token).await;
                    }
                    return Err(HostError::StartFailure {
                        service: name,
                        source,
                    });
                }
            }
        }

        *self.state.lock().unwrap() = HostState::Started;
        self.lifetime.notify_started();
        self.status("Application started");
        Ok(())
    }

    /// Stops started hosted services in reverse start order.
    ///
    /// Every started service is attempted even when earlier ones fail; the
    /// failures aggregate into [`HostError::StopFailures`] after the sweep.
    /// The whole sweep shares one graceful-shutdown timeout; services still
    /// running when it elapses are abandoned and recorded. Stopping a host
    /// that never started is a no-op.
    pub async fn stop(&self, token: CancellationToken) -> HostResult<()> {
        {
            let mut state = self.state.lock().unwrap();
            match *state {
                HostState::Started | HostState::Failed => *state = HostState::Stopping,
                HostState::Built | HostState::Stopped => return Ok(()),
                HostState::Starting | HostState::Stopping => {
                    return Err(HostError::LifecycleMisuse(
                        "host is already starting or stopping",
                    ));
                }
            }
        }

        self.status("Application stopping");
        self.lifetime.notify_stopping();

        let failures = self.stop_started(&token).await;

        *self.state.lock().unwrap() = HostState::Stopped;
        self.lifetime.notify_stopped();
        self.status("Application stopped");

        if failures.is_empty() {
            Ok(())
        } else {
            Err(HostError::StopFailures(failures))
        }
    }

    async fn stop_started(&self, token: &CancellationToken) -> Vec<StopFailure> {
        let services: Vec<Arc<dyn HostedService>> = {
            let mut started = self.started.lock().unwrap();
            let mut services: Vec<_> = started.drain(..).collect();
            services.reverse();
            services
        };

        let timeout = CancellationToken::with_timeout(self.options.shutdown_timeout);
        let sweep = CancellationToken::linked(token, &timeout);

        let mut failures = Vec::new();
        for service in services {
            let name = service.name();
            self.logger.debug(LOG_CATEGORY, &format!("Stopping {}", name));
            tokio::select! {
                result = service.stop(sweep.clone()) => {
                    if let Err(source) = result {
                        self.logger
                            .error(LOG_CATEGORY, &format!("{} failed to stop: {}", name, source));
                        failures.push(StopFailure { service: name, source });
                    }
                }
                _ = sweep.cancelled() => {
                    self.logger.warn(
                        LOG_CATEGORY,
                        &format!("{} abandoned: graceful shutdown timed out", name),
                    );
                    failures.push(StopFailure {
                        service: name,
                        source: Box::new(CancellationError::new(
                            "graceful shutdown timed out",
                        )),
                    });
                }
            }
        }
        failures
    }

    /// Creates a scope paired with a fresh scope-root node.
    pub fn create_scope(&self) -> HostResult<SceneScope> {
        SceneScope::create(&self.provider)
    }

    /// Disposes the container, then destroys the host root subtree.
    ///
    /// Container disposers run first so injected services can still reach
    /// live scene state; then every singleton and hosted component node goes
    /// down with the root.
    pub async fn dispose(&self) {
        self.provider.dispose_all().await;
        self.scene.destroy(self.host_root);
    }
}
