use std::fmt;

use crate::types::TenantId;

/// Errors detected while validating a tenant configuration.
///
/// All of these are fatal at registration time; a tenant is never
/// created from an invalid config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No inbound source configured.
    NoSources,

    /// No outbound destination configured.
    NoDestinations,

    /// A delay range with min greater than max.
    InvalidDelayRange {
        field: &'static str,
    },

    /// Queue capacity of zero.
    ZeroQueueCapacity,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoSources =>
                write!(f, "tenant config has no inbound sources"),
            ConfigError::NoDestinations =>
                write!(f, "tenant config has no outbound destinations"),
            ConfigError::InvalidDelayRange { field } =>
                write!(f, "delay range min exceeds max: {}", field),
            ConfigError::ZeroQueueCapacity =>
                write!(f, "queue capacity must be at least 1"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors returned by the tenant registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A tenant with this id is already registered.
    AlreadyExists {
        tenant_id: TenantId,
    },

    /// No tenant with this id is registered.
    NotFound {
        tenant_id: TenantId,
    },

    /// The supplied configuration is invalid.
    Config(ConfigError),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::AlreadyExists { tenant_id } =>
                write!(f, "tenant already registered: {:?}", tenant_id),
            RegistryError::NotFound { tenant_id } =>
                write!(f, "tenant not registered: {:?}", tenant_id),
            RegistryError::Config(err) =>
                write!(f, "invalid tenant config: {}", err),
        }
    }
}

impl std::error::Error for RegistryError {}

impl From<ConfigError> for RegistryError {
    fn from(err: ConfigError) -> Self {
        RegistryError::Config(err)
    }
}

/// Errors returned when queuing an inbound event fails.
///
/// The inbound collaborator is never blocked; a full queue drops the
/// newest event and the caller counts it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueError {
    /// Queue is at capacity. The event was dropped.
    QueueFull,

    /// Tenant is stopped; no further jobs are accepted.
    Stopped,
}

impl fmt::Display for EnqueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnqueueError::QueueFull =>
                write!(f, "tenant queue at capacity"),
            EnqueueError::Stopped =>
                write!(f, "tenant is stopped"),
        }
    }
}

impl std::error::Error for EnqueueError {}

/// Reasons why a single send attempt failed.
///
/// All of these are recoverable at the fan-out level: logged, counted,
/// and the next destination is still attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// Transport reported it cannot accept sends right now.
    NotReady,

    /// Destination platform throttled the send.
    RateLimited,

    /// Destination platform rejected the payload.
    Rejected,

    /// Network or session failure, including a timed-out attempt.
    Transport,
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::NotReady =>
                write!(f, "outbound transport not ready"),
            SendError::RateLimited =>
                write!(f, "destination rate limited the send"),
            SendError::Rejected =>
                write!(f, "destination rejected the payload"),
            SendError::Transport =>
                write!(f, "transport error"),
        }
    }
}

impl std::error::Error for SendError {}

/// Reasons why resolving an attachment reference failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Reference is unknown on the inbound side.
    NotFound,

    /// Download failed or returned no bytes.
    Unavailable,
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::NotFound =>
                write!(f, "attachment reference not found"),
            FetchError::Unavailable =>
                write!(f, "attachment could not be fetched"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Reason reported by the outbound collaborator on disconnect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Session dropped; reconnecting may recover it.
    Transient,

    /// Session was logged out remotely; reconnecting will not help
    /// until the operator re-enables the tenant.
    LoggedOut,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::Transient =>
                write!(f, "transient disconnect"),
            DisconnectReason::LoggedOut =>
                write!(f, "remote logout"),
        }
    }
}
