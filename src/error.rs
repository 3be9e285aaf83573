//! Error types for the container and the host.
//!
//! The taxonomy deliberately separates misuse of the API (building twice,
//! starting a host twice) from failures of registered services (a hosted
//! service's start or stop returning an error). Container-level failures use
//! [`DiError`]; host-level failures use [`HostError`].

use std::fmt;

/// Dependency injection errors.
///
/// Represents the error conditions that can occur during service
/// registration, resolution, or injection.
///
/// # Examples
///
/// ```rust
/// use scene_host::{DiError, ServiceCollection, Resolver};
///
/// let provider = ServiceCollection::new().build();
/// match provider.get::<String>() {
///     Err(DiError::NotFound(type_name)) => {
///         assert_eq!(type_name, "alloc::string::String");
///     }
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug)]
pub enum DiError {
    /// Service not registered
    NotFound(&'static str),
    /// Type downcast failed
    TypeMismatch(&'static str),
    /// Circular dependency detected (includes path)
    Circular(Vec<&'static str>),
    /// Invalid lifetime resolution (e.g., scoped from root)
    WrongLifetime(&'static str),
    /// Injection-method resolution or invocation failed
    Injection(InjectError),
}

impl fmt::Display for DiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiError::NotFound(name) => write!(f, "Service not found: {}", name),
            DiError::TypeMismatch(name) => write!(f, "Type mismatch for: {}", name),
            DiError::Circular(path) => {
                write!(f, "Circular dependency: {}", path.join(" -> "))
            }
            DiError::WrongLifetime(msg) => write!(f, "Lifetime error: {}", msg),
            DiError::Injection(err) => write!(f, "Injection error: {}", err),
        }
    }
}

impl std::error::Error for DiError {}

impl From<InjectError> for DiError {
    fn from(err: InjectError) -> Self {
        DiError::Injection(err)
    }
}

/// Result type for container operations.
pub type DiResult<T> = Result<T, DiError>;

/// Errors raised by the injection-method resolver.
///
/// Injection methods substitute for constructor injection on scene components,
/// which the engine constructs without arguments. A declared method with an
/// unsupported signature is a configuration error and fails loudly at the
/// first registration that touches the component type.
#[derive(Debug)]
pub enum InjectError {
    /// A declared parameter is a value type (primitive or string) that
    /// cannot be satisfied by container lookup.
    UnsupportedParameter {
        target: &'static str,
        method: &'static str,
        param: &'static str,
    },
    /// The declared method takes no parameters.
    NoParameters {
        target: &'static str,
        method: &'static str,
    },
}

impl fmt::Display for InjectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InjectError::UnsupportedParameter { target, method, param } => write!(
                f,
                "{}::{}: parameter {} is a value type; only registered service types can be injected",
                target, method, param
            ),
            InjectError::NoParameters { target, method } => write!(
                f,
                "{}::{}: injection method must take at least one parameter",
                target, method
            ),
        }
    }
}

impl std::error::Error for InjectError {}

/// Configuration source errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Reading or writing a settings file failed.
    Io(std::io::Error),
    /// A settings document could not be serialized or deserialized.
    Json(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "Configuration I/O error: {}", err),
            ConfigError::Json(err) => write!(f, "Configuration JSON error: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(err) => Some(err),
            ConfigError::Json(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Json(err)
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Boxed error returned by hosted services.
pub type ServiceError = Box<dyn std::error::Error + Send + Sync>;

/// A single hosted service's stop failure, collected during the stop sweep.
#[derive(Debug)]
pub struct StopFailure {
    /// Name of the hosted service whose stop failed.
    pub service: &'static str,
    /// The error the service's stop returned, or a cancellation error when
    /// the graceful-shutdown timeout abandoned it.
    pub source: ServiceError,
}

impl fmt::Display for StopFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.service, self.source)
    }
}

/// Host-level errors.
///
/// `LifecycleMisuse` and `InvalidRegistration` are API-misuse errors raised
/// synchronously at registration or build time. `StartFailure` and
/// `StopFailures` report failures of registered services during the
/// orchestrated start/stop sequences.
#[derive(Debug)]
pub enum HostError {
    /// A lifecycle operation was invoked in the wrong state (build twice,
    /// start twice, start after a failed start).
    LifecycleMisuse(&'static str),
    /// A registration verb received invalid input (empty resource path,
    /// unknown prefab, dead scene node).
    InvalidRegistration(String),
    /// A hosted service's start failed; the remaining start sequence was
    /// aborted and the host is left in a failed state.
    StartFailure {
        service: &'static str,
        source: ServiceError,
    },
    /// One or more hosted services failed to stop. Every service was still
    /// attempted; the failures are aggregated here after the sweep.
    StopFailures(Vec<StopFailure>),
    /// Resolving a service from the container failed.
    Resolution(DiError),
    /// Loading a configuration source failed.
    Configuration(ConfigError),
    /// The async runtime backing the host manager could not be created.
    Runtime(std::io::Error),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::LifecycleMisuse(msg) => write!(f, "Host lifecycle misuse: {}", msg),
            HostError::InvalidRegistration(msg) => write!(f, "Invalid registration: {}", msg),
            HostError::StartFailure { service, source } => {
                write!(f, "Hosted service {} failed to start: {}", service, source)
            }
            HostError::StopFailures(failures) => {
                write!(f, "{} hosted service(s) failed to stop: ", failures.len())?;
                for (i, failure) in failures.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", failure)?;
                }
                Ok(())
            }
            HostError::Resolution(err) => write!(f, "Resolution failure: {}", err),
            HostError::Configuration(err) => write!(f, "{}", err),
            HostError::Runtime(err) => write!(f, "Runtime error: {}", err),
        }
    }
}

impl std::error::Error for HostError {}

impl From<DiError> for HostError {
    fn from(err: DiError) -> Self {
        HostError::Resolution(err)
    }
}

impl From<ConfigError> for HostError {
    fn from(err: ConfigError) -> Self {
        HostError::Configuration(err)
    }
}

/// Result type for host operations.
pub type HostResult<T> = Result<T, HostError>;
