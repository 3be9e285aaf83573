//! Scene-aware dependency injection and host orchestration.
//!
//! `scene-host` bridges two worlds: a scene graph of engine-driven component
//! nodes, and a lifetime-aware service container with hosted-service
//! orchestration around it. Components are allocated on scene nodes by the
//! container, receive their dependencies through a declared injection
//! method, and participate in an application lifecycle with ordered startup
//! and graceful, failure-isolating shutdown.
//!
//! # Core pieces
//!
//! - [`Scene`], [`Behaviour`], [`SceneComponent`]: the node graph, the
//!   engine callbacks, and the contract for container-managed components.
//! - [`ServiceCollection`] and [`ServiceProvider`]: registration and
//!   resolution with singleton, scoped, and transient lifetimes.
//! - [`HostBuilder`] and [`Host`]: composition of configuration, logging,
//!   services, and components into one orchestrated application.
//! - [`HostedService`]: long-running services started in registration order
//!   and stopped in reverse.
//! - [`HostManager`]: the whole lifecycle packaged as a scene component
//!   driven by engine callbacks.
//!
//! # Quick start
//!
//! ```rust
//! use scene_host::{
//!     CancellationToken, HostBuilder, HostedService, Resolver, Scene, ServiceError,
//! };
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! struct Matchmaker;
//!
//! #[async_trait]
//! impl HostedService for Matchmaker {
//!     async fn start(&self, _token: CancellationToken) -> Result<(), ServiceError> {
//!         Ok(())
//!     }
//!     async fn stop(&self, _token: CancellationToken) -> Result<(), ServiceError> {
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let scene = Scene::new();
//! let mut builder = HostBuilder::new(scene, "awake_services").unwrap();
//! builder.configure_services(|services| {
//!     services.add_hosted_service::<Matchmaker, _>(|_| Ok(Arc::new(Matchmaker)));
//! });
//!
//! let host = builder.build().unwrap();
//! host.start(CancellationToken::new()).await.unwrap();
//! host.stop(CancellationToken::new()).await.unwrap();
//! host.dispose().await;
//! # }
//! ```
//!
//! # Lifetimes
//!
//! - **Singleton**: one instance per host, node parented under the host
//!   root.
//! - **Scoped**: one instance per [`SceneScope`], node parented under the
//!   scope's root node and destroyed with it.
//! - **Transient**: a fresh instance and node per resolution; the caller
//!   owns the node's lifetime.
//!
//! # Injection
//!
//! Scene components are constructed without arguments, so dependencies
//! arrive through a declared injection method instead of a constructor. See
//! [`SceneComponent::injection`] and [`InjectionMethod`].

pub mod cancellation;
pub mod collection;
pub mod config;
pub mod error;
pub mod hosting;
pub mod inject;
pub mod key;
pub mod lifetime;
pub mod logging;
pub mod provider;
pub mod scene;
pub mod traits;

mod internal;
mod registration;

pub use cancellation::{CancellationError, CancellationToken};
pub use collection::ServiceCollection;
pub use config::{
    AssetConfigurationSource, Configuration, ConfigurationBuilder, ConfigurationSource,
    JsonSettings, SettingsAsset, KEY_DELIMITER,
};
pub use error::{
    ConfigError, ConfigResult, DiError, DiResult, HostError, HostResult, InjectError,
    ServiceError, StopFailure,
};
pub use hosting::{
    ApplicationLifetime, Host, HostBuilder, HostComposition, HostManager, HostManagerOptions,
    HostOptions, HostRoot, HostState, HostedService, SceneScope, SceneServiceBuilder, ScopeRoot,
    StartFailurePolicy,
};
pub use inject::{InjectionArgs, InjectionMethod, InjectionMethodBuilder, ParamSpec};
pub use key::{key_of_type, Key};
pub use lifetime::Lifetime;
pub use logging::{ConsoleSink, LogLevel, LogSink, Logger, LoggingBuilder};
pub use provider::{ResolverContext, Scope, ServiceProvider};
pub use scene::{Behaviour, NodeId, PrefabRegistry, Scene, SceneComponent};
pub use traits::{AsyncDispose, Dispose, Resolver, ResolverCore};
