//! Host orchestration over a scene.
//!
//! [`HostBuilder`] composes configuration, logging, services, and scene
//! components into a [`Host`]; the host starts and stops the registered
//! [`HostedService`]s. [`HostManager`] wraps the whole lifecycle in a scene
//! component driven by engine callbacks.

pub mod builder;
pub mod components;
pub mod host;
pub mod lifecycle;
pub mod manager;

pub use builder::HostBuilder;
pub use components::{HostRoot, SceneScope, SceneServiceBuilder, ScopeRoot};
pub use host::{Host, HostOptions, HostState, HostedService, StartFailurePolicy};
pub use lifecycle::ApplicationLifetime;
pub use manager::{HostComposition, HostManager, HostManagerOptions};
