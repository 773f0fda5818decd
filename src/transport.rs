use async_trait::async_trait;

use crate::error::{FetchError, SendError};
use crate::types::{AttachmentRef, DestinationId, FetchedMedia, OutboundPayload};

/// Fetch side of the inbound collaborator.
///
/// The core stores only attachment references; bytes are resolved
/// through this trait at send time.
#[async_trait]
pub trait InboundFetcher: Send + Sync {
    async fn fetch_attachment(
        &self,
        attachment: &AttachmentRef,
    ) -> Result<FetchedMedia, FetchError>;
}

/// Delivery side of the outbound collaborator.
///
/// The transport owns its protocol and session entirely; the core only
/// asks it to connect and to deliver payloads. Readiness flows back
/// through the tenant's lifecycle callbacks (`on_ready`,
/// `on_disconnected`, `on_handshake_failure`), not through this trait.
#[async_trait]
pub trait OutboundTransport: Send + Sync {
    /// Start a connect attempt. The outcome is reported via the
    /// lifecycle callbacks.
    async fn connect(&self);

    /// Deliver one payload to one destination.
    async fn send(
        &self,
        destination: &DestinationId,
        payload: &OutboundPayload,
    ) -> Result<(), SendError>;
}
