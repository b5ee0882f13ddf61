//! Child Discovery Error Hierarchy
//!
//! Errors here describe failures of the service itself (configuration,
//! runtime wiring, IO). A misbehaving discovery module never produces an
//! [`Error`]: module faults and timeouts are reported as
//! [`crate::InvocationOutcome`] values and only logged.

use config::ConfigError;

use crate::ThingUid;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Infrastructure-level failures (runtime, IO, shutdown signalling)
    #[error(transparent)]
    System(#[from] SystemError),

    /// Configuration loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Malformed identifiers or type tags
    #[error(transparent)]
    Model(#[from] ModelError),
}

#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    /// Service constructed outside of a tokio runtime
    #[error("No tokio runtime available to drive discovery tasks")]
    RuntimeUnavailable,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    SignalSenderClosed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("Invalid thing type uid '{0}': expected '<binding>:<type>'")]
    InvalidThingTypeUid(String),

    #[error("Invalid thing uid '{0}': expected at least three non-empty segments")]
    InvalidThingUid(String),

    #[error("Segment '{0}' contains characters outside [A-Za-z0-9_-]")]
    InvalidSegment(String),
}

/// Fault reported by a discovery module from `create_results`.
///
/// Panics inside a module are treated the same way by the invocation gate.
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    /// The bridge can not be queried right now (offline, handler missing, ...)
    #[error("Bridge {0} is not available")]
    BridgeUnavailable(ThingUid),

    /// The bridge answered with data the module could not interpret
    #[error("Unexpected bridge response: {0}")]
    UnexpectedResponse(String),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::System(SystemError::Io(e))
    }
}
