//! What a thin HTTP control surface would call: register, pause,
//! resume, kill-switch, snapshots. Transports are stubbed out.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chat_relay::{
    AttachmentRef, DestinationId, FetchError, FetchedMedia, InboundContent, InboundFetcher,
    OutboundPayload, OutboundTransport, SendError, SourceId, TenantConfig, TenantId,
    TenantManager,
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

struct SilentTransport;

#[async_trait]
impl OutboundTransport for SilentTransport {
    async fn connect(&self) {}

    async fn send(
        &self,
        _destination: &DestinationId,
        _payload: &OutboundPayload,
    ) -> Result<(), SendError> {
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let manager = TenantManager::new();
    let fetcher = Arc::new(NoMedia);
    let transport = Arc::new(SilentTransport);

    for name in ["alerts", "news"] {
        let config = TenantConfig::new(name)
            .with_source(format!("{name}-source"))
            .with_destination(format!("{name}-group"))
            .with_message_delay(Duration::from_millis(50), Duration::from_millis(100))
            .with_destination_delay(Duration::from_millis(10), Duration::from_millis(20));
        let tenant = manager
            .register(config, fetcher.clone(), transport.clone())
            .await
            .expect("register tenant");
        tenant.on_ready().await;
    }

    let alerts = TenantId("alerts".to_string());
    manager.pause(&alerts).await.unwrap();
    manager
        .route(
            &SourceId("alerts-source".to_string()),
            InboundContent::text("queued while paused"),
        )
        .await;

    println!(
        "summary: {}",
        serde_json::to_string_pretty(&manager.summary().await).unwrap()
    );
    println!(
        "tenants: {}",
        serde_json::to_string_pretty(&manager.list_all().await).unwrap()
    );

    manager.resume(&alerts).await.unwrap();
    manager.set_outbound_enabled(&alerts, false).await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    println!(
        "after drain: {}",
        serde_json::to_string_pretty(&manager.snapshot(&alerts).await.unwrap()).unwrap()
    );

    manager.shutdown().await;
}
