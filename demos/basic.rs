use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chat_relay::{
    AttachmentRef, DestinationId, FetchError, FetchedMedia, InboundContent, InboundFetcher,
    OutboundPayload, OutboundTransport, SendError, SourceId, TenantConfig, TenantManager,
};

struct NoMedia;

#[async_trait]
impl InboundFetcher for NoMedia {
    async fn fetch_attachment(
        &self,
        _attachment: &AttachmentRef,
    ) -> Result<FetchedMedia, FetchError> {
        Err(FetchError::NotFound)
    }
}

struct StdoutTransport;

#[async_trait]
impl OutboundTransport for StdoutTransport {
    async fn connect(&self) {}

    async fn send(
        &self,
        destination: &DestinationId,
        payload: &OutboundPayload,
    ) -> Result<(), SendError> {
        println!("-> {}: {:?}", destination.0, payload.text());
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let manager = TenantManager::new();

    let config = TenantConfig::new("demo")
        .with_source("announcements")
        .with_destination("group-a")
        .with_destination("group-b")
        .with_message_delay(Duration::from_millis(100), Duration::from_millis(200))
        .with_destination_delay(Duration::from_millis(50), Duration::from_millis(80));

    let tenant = manager
        .register(config, Arc::new(NoMedia), Arc::new(StdoutTransport))
        .await
        .expect("register tenant");

    // A real deployment wires this callback to the transport's own
    // lifecycle events.
    tenant.on_ready().await;

    let source = SourceId("announcements".to_string());
    manager
        .route(&source, InboundContent::text("relay is up"))
        .await;
    manager
        .route(&source, InboundContent::text("second message"))
        .await;

    tokio::time::sleep(Duration::from_secs(1)).await;
    println!("{:#?}", tenant.snapshot().await);

    manager.shutdown().await;
}
