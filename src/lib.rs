//! A single-process multi-tenant chat relay engine.
//!
//! This crate provides the **in-memory, paced, best-effort** core of a
//! message forwarder: events arriving from an inbound chat platform
//! are queued per tenant and fanned out to that tenant's destinations
//! under randomized pacing, with bounded reconnects toward the
//! outbound transport.
//!
//! ## Guarantees
//! - Per-tenant FIFO delivery-attempt order
//! - At-least-one-attempt per destination while delivery is enabled
//! - Bounded reconnects with a terminal, operator-visible failure state
//! - Randomized inter-message and inter-destination pacing
//! - Full tenant isolation
//!
//! ## Non-Guarantees
//! - Durability across restarts
//! - Exactly-once delivery
//! - Inbound/outbound wire protocols (trait seams only)
//!
//! The inbound and outbound platforms are reached exclusively through
//! the [`InboundFetcher`] and [`OutboundTransport`] traits; sessions,
//! auth, and protocol details live behind them. Configuration loading,
//! HTTP control surfaces, and signal handling are the embedding
//! binary's job.

mod connection;
mod error;
mod manager;
mod pacing;
mod queue;
mod tenant;
mod transport;
mod types;

pub use connection::{ConnectionMonitor, ConnectionState, ReconnectDirective};
pub use error::{
    ConfigError,
    DisconnectReason,
    EnqueueError,
    FetchError,
    RegistryError,
    SendError,
};
pub use manager::TenantManager;
pub use pacing::{Pacer, TEXT_VARIATIONS};
pub use queue::MessageQueue;
pub use tenant::ForwarderTenant;
pub use transport::{InboundFetcher, OutboundTransport};
pub use types::{
    AttachmentRef, DestinationId, FetchedMedia, InboundContent, ManagerSummary, MediaKind,
    OutboundPayload, QueuedJob, SourceId, TenantConfig, TenantId, TenantSnapshot,
};
