use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::connection::ConnectionState;

/// Unique identifier for a tenant.
///
/// This is a strongly-typed wrapper to avoid accidental mixing
/// of tenant IDs with other string identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(pub String);

/// Identifier of an inbound source (a chat the messages originate from).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceId(pub String);

/// Identifier of an outbound destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DestinationId(pub String);

/// Kind of media carried by an inbound attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    Photo,
    Video,
    Audio,
    Voice,
    Document,
}

impl MediaKind {
    /// MIME type used when the fetch side does not declare one.
    pub fn mime_type(&self) -> &'static str {
        match self {
            MediaKind::Photo => "image/jpeg",
            MediaKind::Video => "video/mp4",
            MediaKind::Audio => "audio/mpeg",
            MediaKind::Voice => "audio/ogg",
            MediaKind::Document => "application/octet-stream",
        }
    }

    /// File extension used when building a fallback filename.
    pub fn fallback_extension(&self) -> &'static str {
        match self {
            MediaKind::Photo => "jpg",
            MediaKind::Video => "mp4",
            MediaKind::Audio => "mp3",
            MediaKind::Voice => "ogg",
            MediaKind::Document => "bin",
        }
    }
}

/// Reference to inbound media that has not been fetched yet.
///
/// The bytes are resolved through [`crate::InboundFetcher`] only at
/// send time, once per destination attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub media_kind: MediaKind,
    pub fetch_ref: String,
    pub file_name: Option<String>,
}

impl AttachmentRef {
    pub fn new(media_kind: MediaKind, fetch_ref: impl Into<String>) -> Self {
        Self {
            media_kind,
            fetch_ref: fetch_ref.into(),
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }
}

/// Content of one inbound message event, as handed to the core by the
/// inbound collaborator.
#[derive(Debug, Clone, Default)]
pub struct InboundContent {
    pub text: Option<String>,
    pub attachment: Option<AttachmentRef>,
}

impl InboundContent {
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            text: Some(body.into()),
            attachment: None,
        }
    }

    pub fn attachment(attachment: AttachmentRef) -> Self {
        Self {
            text: None,
            attachment: Some(attachment),
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.text = Some(caption.into());
        self
    }
}

/// One queued forward unit.
///
/// Immutable once enqueued; the cosmetic text variation is appended at
/// send time and never written back to the stored job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedJob {
    pub text: Option<String>,
    pub attachment: Option<AttachmentRef>,
    pub queued_at_secs: u64,
}

impl QueuedJob {
    /// Build a job from inbound content.
    ///
    /// Returns `None` when the content carries neither text nor an
    /// attachment; such events are not queueable.
    pub fn from_content(content: InboundContent) -> Option<Self> {
        let text = content.text.filter(|t| !t.is_empty());
        if text.is_none() && content.attachment.is_none() {
            return None;
        }
        Some(Self {
            text,
            attachment: content.attachment,
            queued_at_secs: now_secs(),
        })
    }
}

/// Media resolved through the inbound collaborator's fetch contract.
#[derive(Debug, Clone)]
pub struct FetchedMedia {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub file_name: Option<String>,
}

/// Payload handed to the outbound collaborator for one destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundPayload {
    Text {
        body: String,
    },
    Media {
        mime_type: String,
        bytes: Vec<u8>,
        file_name: String,
        caption: Option<String>,
    },
}

impl OutboundPayload {
    /// Text body, or the media caption for media payloads.
    pub fn text(&self) -> Option<&str> {
        match self {
            OutboundPayload::Text { body } => Some(body),
            OutboundPayload::Media { caption, .. } => caption.as_deref(),
        }
    }
}

/// Configuration of one tenant.
///
/// A `TenantConfig` describes *where from* and *where to* messages are
/// relayed, plus the pacing and reconnect policy. It is a pure
/// configuration object with no internal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantConfig {
    /// Logical identifier for the tenant.
    pub id: TenantId,

    /// Inbound sources this tenant accepts messages from.
    pub sources: Vec<SourceId>,

    /// Outbound destinations, in fan-out order.
    pub destinations: Vec<DestinationId>,

    /// Maximum number of queued jobs; enqueues beyond this are dropped.
    pub queue_capacity: usize,

    /// Reconnect attempts allowed before the connection is marked
    /// permanently failed.
    pub max_reconnect_attempts: u32,

    /// Delay before each reconnect attempt.
    pub reconnect_delay: Duration,

    /// Re-check interval while paused or while the outbound side is
    /// not ready.
    pub poll_interval: Duration,

    /// Randomized delay between two consecutive jobs (min, max).
    pub message_delay: (Duration, Duration),

    /// Randomized delay between two destinations of one job (min, max).
    pub destination_delay: (Duration, Duration),

    /// Deadline on a single send attempt; expiry counts as a
    /// transport failure.
    pub send_timeout: Duration,

    /// Kill-switch initial value. When false the queue is drained
    /// without delivery.
    pub outbound_enabled: bool,

    /// Seed for the pacing/variation random source. Random when unset.
    pub rng_seed: Option<u64>,
}

impl TenantConfig {
    /// Create a tenant config with default pacing and reconnect policy.
    ///
    /// Defaults:
    /// - queue_capacity: 1000
    /// - max_reconnect_attempts: 5
    /// - reconnect_delay: 10 seconds
    /// - poll_interval: 5 seconds
    /// - message_delay: 8..13 seconds
    /// - destination_delay: 3..5 seconds
    /// - send_timeout: 30 seconds
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: TenantId(id.into()),
            sources: Vec::new(),
            destinations: Vec::new(),
            queue_capacity: 1_000,
            max_reconnect_attempts: 5,
            reconnect_delay: Duration::from_secs(10),
            poll_interval: Duration::from_secs(5),
            message_delay: (Duration::from_secs(8), Duration::from_secs(13)),
            destination_delay: (Duration::from_secs(3), Duration::from_secs(5)),
            send_timeout: Duration::from_secs(30),
            outbound_enabled: true,
            rng_seed: None,
        }
    }

    /// Add an accepted inbound source.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.sources.push(SourceId(source.into()));
        self
    }

    /// Add an outbound destination. Fan-out follows insertion order.
    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destinations.push(DestinationId(destination.into()));
        self
    }

    /// Cap the pending-job queue.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Override the reconnect policy.
    pub fn with_reconnect_policy(mut self, max_attempts: u32, delay: Duration) -> Self {
        self.max_reconnect_attempts = max_attempts;
        self.reconnect_delay = delay;
        self
    }

    /// Override the paused / not-ready re-check interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Override the inter-message pacing range.
    pub fn with_message_delay(mut self, min: Duration, max: Duration) -> Self {
        self.message_delay = (min, max);
        self
    }

    /// Override the inter-destination pacing range.
    pub fn with_destination_delay(mut self, min: Duration, max: Duration) -> Self {
        self.destination_delay = (min, max);
        self
    }

    /// Override the per-send deadline.
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Start with the outbound side disabled.
    pub fn with_outbound_disabled(mut self) -> Self {
        self.outbound_enabled = false;
        self
    }

    /// Seed the pacing random source for deterministic delays.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }
}

/// Point-in-time view of one tenant, for the control surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantSnapshot {
    pub id: TenantId,
    pub state: ConnectionState,
    pub active: bool,
    pub outbound_enabled: bool,
    pub draining: bool,
    pub queue_len: usize,
    pub delivered: u64,
    pub failed: u64,
    pub skipped_outbound: u64,
    pub dropped_inbound: u64,
    pub reconnect_attempts: u32,
}

/// Aggregate view over all tenants, mirroring what a status page shows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerSummary {
    pub total: usize,
    pub ready: usize,
    pub active: usize,
}

pub(crate) fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
