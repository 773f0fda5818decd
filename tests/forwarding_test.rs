mod common;

use std::sync::Arc;
use std::time::Duration;

use chat_relay::{
    AttachmentRef, ConnectionState, DisconnectReason, EnqueueError, FetchedMedia,
    ForwarderTenant, InboundContent, MediaKind, OutboundPayload, TenantConfig, TEXT_VARIATIONS,
};
use common::{RecordingFetcher, RecordingOutbound};

fn base_config(id: &str) -> TenantConfig {
    TenantConfig::new(id)
        .with_source("src-1")
        .with_destination("dest-1")
        .with_rng_seed(7)
}

fn spawn(
    config: TenantConfig,
) -> (ForwarderTenant, Arc<RecordingOutbound>, Arc<RecordingFetcher>) {
    let outbound = Arc::new(RecordingOutbound::new());
    let fetcher = Arc::new(RecordingFetcher::new());
    let tenant = ForwarderTenant::spawn(config, fetcher.clone(), outbound.clone())
        .expect("valid config");
    (tenant, outbound, fetcher)
}

async fn drain(duration_secs: u64) {
    tokio::time::sleep(Duration::from_secs(duration_secs)).await;
}

fn body_of(payload: &OutboundPayload) -> &str {
    payload.text().expect("payload carries text")
}

#[tokio::test(start_paused = true)]
async fn test_jobs_are_dispatched_in_fifo_order() {
    let (tenant, outbound, _) = spawn(base_config("fifo"));
    tenant.on_ready().await;

    for i in 1..=5 {
        tenant
            .enqueue(InboundContent::text(format!("msg-{i} ")))
            .await
            .unwrap();
    }

    drain(300).await;

    let attempts = outbound.attempts();
    assert_eq!(attempts.len(), 5);
    for (i, (_, payload)) in attempts.iter().enumerate() {
        assert!(
            body_of(payload).starts_with(&format!("msg-{} ", i + 1)),
            "delivery order broken at index {i}"
        );
    }
    assert_eq!(tenant.queue_len().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_pause_keeps_jobs_queued_and_enqueue_working() {
    let (tenant, outbound, _) = spawn(base_config("pause"));
    tenant.on_ready().await;
    tenant.pause();

    for i in 0..3 {
        tenant
            .enqueue(InboundContent::text(format!("queued-{i}")))
            .await
            .unwrap();
    }

    drain(120).await;

    assert_eq!(outbound.attempt_count(), 0);
    assert_eq!(tenant.queue_len().await, 3);

    // Enqueue still succeeds while paused.
    tenant
        .enqueue(InboundContent::text("late"))
        .await
        .unwrap();
    assert_eq!(tenant.queue_len().await, 4);

    tenant.resume();
    drain(300).await;
    assert_eq!(outbound.attempt_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_no_send_while_not_ready() {
    let (tenant, outbound, _) = spawn(base_config("gate"));

    tenant.enqueue(InboundContent::text("held")).await.unwrap();
    drain(60).await;

    assert_eq!(outbound.attempt_count(), 0);
    assert_eq!(tenant.queue_len().await, 1, "job must stay at queue head");

    tenant.on_ready().await;
    drain(60).await;

    assert_eq!(outbound.attempt_count(), 1);
    assert_eq!(tenant.queue_len().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_fanout_failure_does_not_abort_remaining_destinations() {
    let config = base_config("fanout")
        .with_destination("dest-2")
        .with_destination("dest-3");
    let (tenant, outbound, _) = spawn(config);
    outbound.fail_destination("dest-2");
    tenant.on_ready().await;

    tenant.enqueue(InboundContent::text("fan")).await.unwrap();
    drain(120).await;

    let attempts = outbound.attempts();
    assert_eq!(attempts.len(), 3);
    assert_eq!(attempts[0].0.0, "dest-1");
    assert_eq!(attempts[1].0.0, "dest-2");
    assert_eq!(attempts[2].0.0, "dest-3");

    let snapshot = tenant.snapshot().await;
    assert_eq!(snapshot.delivered, 2);
    assert_eq!(snapshot.failed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_skip_removes_exactly_the_front_job() {
    let (tenant, outbound, _) = spawn(base_config("skip"));
    tenant.pause();

    tenant.enqueue(InboundContent::text("first ")).await.unwrap();
    tenant.enqueue(InboundContent::text("second ")).await.unwrap();

    assert!(tenant.skip_current().await);
    assert_eq!(tenant.queue_len().await, 1);

    let snapshot = tenant.snapshot().await;
    assert_eq!(snapshot.delivered, 0);
    assert_eq!(snapshot.failed, 0);

    tenant.on_ready().await;
    tenant.resume();
    drain(120).await;

    let attempts = outbound.attempts();
    assert_eq!(attempts.len(), 1);
    assert!(body_of(&attempts[0].1).starts_with("second "));
}

#[tokio::test(start_paused = true)]
async fn test_kill_switch_drains_without_sending() {
    let (tenant, outbound, _) = spawn(base_config("kill"));
    tenant.on_ready().await;
    tenant.set_outbound_enabled(false);

    for i in 0..3 {
        tenant
            .enqueue(InboundContent::text(format!("dropped-{i}")))
            .await
            .unwrap();
    }

    drain(120).await;

    assert_eq!(outbound.attempt_count(), 0);
    assert_eq!(tenant.queue_len().await, 0);

    let snapshot = tenant.snapshot().await;
    assert_eq!(snapshot.skipped_outbound, 3);
    assert_eq!(snapshot.delivered, 0);
    assert_eq!(snapshot.failed, 0);
}

#[tokio::test(start_paused = true)]
async fn test_base_text_is_always_a_prefix_of_the_sent_text() {
    let (tenant, outbound, _) = spawn(base_config("variation"));
    tenant.on_ready().await;

    for i in 0..4 {
        tenant
            .enqueue(InboundContent::text(format!("base-{i}")))
            .await
            .unwrap();
    }
    drain(300).await;

    let attempts = outbound.attempts();
    assert_eq!(attempts.len(), 4);
    for (i, (_, payload)) in attempts.iter().enumerate() {
        let base = format!("base-{i}");
        let body = body_of(payload);
        assert!(body.starts_with(&base), "base text must stay a prefix");
        let suffix = &body[base.len()..];
        assert!(
            TEXT_VARIATIONS.contains(&suffix),
            "unexpected suffix {suffix:?}"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_variation_is_rolled_once_per_job_not_per_destination() {
    let config = base_config("variation-fanout")
        .with_destination("dest-2")
        .with_destination("dest-3");
    let (tenant, outbound, _) = spawn(config);
    tenant.on_ready().await;

    tenant.enqueue(InboundContent::text("same")).await.unwrap();
    drain(120).await;

    let attempts = outbound.attempts();
    assert_eq!(attempts.len(), 3);
    let first = body_of(&attempts[0].1).to_string();
    for (_, payload) in &attempts[1..] {
        assert_eq!(body_of(payload), first);
    }
}

#[tokio::test(start_paused = true)]
async fn test_full_queue_drops_newest_and_counts_it() {
    let config = base_config("backpressure").with_queue_capacity(2);
    let (tenant, _, _) = spawn(config);
    tenant.pause();

    tenant.enqueue(InboundContent::text("a")).await.unwrap();
    tenant.enqueue(InboundContent::text("b")).await.unwrap();
    let overflow = tenant.enqueue(InboundContent::text("c")).await;
    assert_eq!(overflow, Err(EnqueueError::QueueFull));

    assert_eq!(tenant.queue_len().await, 2);
    let snapshot = tenant.snapshot().await;
    assert_eq!(snapshot.dropped_inbound, 1);
}

#[tokio::test(start_paused = true)]
async fn test_media_is_fetched_and_sent_with_caption() {
    let (tenant, outbound, fetcher) = spawn(base_config("media"));
    fetcher.add_media(
        "ref-1",
        FetchedMedia {
            bytes: vec![1, 2, 3],
            mime_type: "image/png".to_string(),
            file_name: Some("pic.png".to_string()),
        },
    );
    tenant.on_ready().await;

    tenant
        .enqueue(
            InboundContent::attachment(AttachmentRef::new(MediaKind::Photo, "ref-1"))
                .with_caption("look "),
        )
        .await
        .unwrap();
    drain(120).await;

    let attempts = outbound.attempts();
    assert_eq!(attempts.len(), 1);
    match &attempts[0].1 {
        OutboundPayload::Media {
            mime_type,
            bytes,
            file_name,
            caption,
        } => {
            assert_eq!(mime_type, "image/png");
            assert_eq!(bytes, &vec![1, 2, 3]);
            assert_eq!(file_name, "pic.png");
            assert!(caption.as_deref().unwrap().starts_with("look "));
        }
        other => panic!("expected media payload, got {other:?}"),
    }
    assert_eq!(tenant.snapshot().await.delivered, 1);
}

#[tokio::test(start_paused = true)]
async fn test_media_falls_back_to_kind_mime_and_filename() {
    let (tenant, outbound, fetcher) = spawn(base_config("media-fallback"));
    fetcher.add_media(
        "ref-2",
        FetchedMedia {
            bytes: vec![9],
            mime_type: String::new(),
            file_name: None,
        },
    );
    tenant.on_ready().await;

    tenant
        .enqueue(InboundContent::attachment(AttachmentRef::new(
            MediaKind::Voice,
            "ref-2",
        )))
        .await
        .unwrap();
    drain(120).await;

    let attempts = outbound.attempts();
    assert_eq!(attempts.len(), 1);
    match &attempts[0].1 {
        OutboundPayload::Media {
            mime_type,
            file_name,
            caption,
            ..
        } => {
            assert_eq!(mime_type, "audio/ogg");
            assert_eq!(file_name, "file.ogg");
            assert_eq!(caption.as_deref(), None);
        }
        other => panic!("expected media payload, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_fetch_failure_counts_per_destination_and_continues() {
    let config = base_config("fetch-fail").with_destination("dest-2");
    let (tenant, outbound, _) = spawn(config);
    tenant.on_ready().await;

    // No media registered for this reference.
    tenant
        .enqueue(InboundContent::attachment(AttachmentRef::new(
            MediaKind::Document,
            "missing",
        )))
        .await
        .unwrap();
    drain(120).await;

    assert_eq!(outbound.attempt_count(), 0);
    let snapshot = tenant.snapshot().await;
    assert_eq!(snapshot.failed, 2, "one failure per destination");
    assert_eq!(snapshot.delivered, 0);
    assert_eq!(tenant.queue_len().await, 0, "job is consumed, not retried");
}

#[tokio::test(start_paused = true)]
async fn test_hung_send_times_out_as_failure() {
    let config = base_config("timeout").with_send_timeout(Duration::from_secs(30));
    let (tenant, outbound, _) = spawn(config);
    outbound.hang_destination("dest-1");
    tenant.on_ready().await;

    tenant.enqueue(InboundContent::text("stuck")).await.unwrap();
    drain(120).await;

    let snapshot = tenant.snapshot().await;
    assert_eq!(snapshot.failed, 1);
    assert_eq!(snapshot.delivered, 0);
    assert_eq!(tenant.queue_len().await, 0, "loop moved on past the hung send");
}

#[tokio::test(start_paused = true)]
async fn test_retry_budget_exhaustion_stops_automatic_reconnects() {
    let (tenant, outbound, _) = spawn(base_config("budget"));
    drain(1).await;
    assert_eq!(outbound.connect_count(), 1, "initial connect attempt");

    for _ in 0..5 {
        tenant.on_handshake_failure().await;
    }
    assert_eq!(
        tenant.connection_state().await,
        ConnectionState::FailedPermanently
    );

    // The one scheduled timer fires into the terminal state and must
    // not touch the transport.
    drain(60).await;
    assert_eq!(outbound.connect_count(), 1);

    tenant.force_reconnect().await;
    drain(1).await;
    assert_eq!(outbound.connect_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_logout_schedules_no_reconnect_until_operator_intervenes() {
    let (tenant, outbound, _) = spawn(base_config("logout"));
    drain(1).await;
    assert_eq!(outbound.connect_count(), 1, "initial connect attempt");
    tenant.on_ready().await;

    tenant.on_disconnected(DisconnectReason::LoggedOut).await;
    assert_eq!(
        tenant.connection_state().await,
        ConnectionState::Reconnecting
    );

    // Well past the reconnect delay: no automatic attempt.
    drain(60).await;
    assert_eq!(outbound.connect_count(), 1);

    tenant.force_reconnect().await;
    drain(1).await;
    assert_eq!(outbound.connect_count(), 2);
    tenant.on_ready().await;
    assert_eq!(tenant.connection_state().await, ConnectionState::Ready);
}

#[tokio::test(start_paused = true)]
async fn test_logout_while_reconnect_timer_pending_leaves_it_the_only_timer() {
    let (tenant, outbound, _) = spawn(base_config("logout-interleaved"));
    drain(1).await;
    assert_eq!(outbound.connect_count(), 1);
    tenant.on_ready().await;

    // Transient disconnect arms the one reconnect timer (10s out).
    tenant.on_disconnected(DisconnectReason::Transient).await;
    drain(1).await;

    // A logout while that timer is pending must not release its latch.
    tenant.on_disconnected(DisconnectReason::LoggedOut).await;
    drain(1).await;

    // Nor may a later transient disconnect arm a second timer.
    tenant.on_disconnected(DisconnectReason::Transient).await;

    drain(5).await;
    assert_eq!(outbound.connect_count(), 1, "backoff still running");

    drain(10).await;
    assert_eq!(outbound.connect_count(), 2, "the original timer fired");

    // No duplicate attempt follows.
    drain(60).await;
    assert_eq!(outbound.connect_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_stop_interrupts_sleeps_and_discards_queue() {
    let (tenant, _, _) = spawn(base_config("stop"));
    tenant.pause();

    for i in 0..3 {
        tenant
            .enqueue(InboundContent::text(format!("gone-{i}")))
            .await
            .unwrap();
    }

    tenant.stop().await;

    assert!(tenant.is_stopped());
    assert_eq!(tenant.queue_len().await, 0);
    assert_eq!(
        tenant.enqueue(InboundContent::text("late")).await,
        Err(EnqueueError::Stopped)
    );
}

#[tokio::test(start_paused = true)]
async fn test_empty_content_is_not_queued() {
    let (tenant, _, _) = spawn(base_config("empty"));
    tenant.pause();

    tenant.enqueue(InboundContent::default()).await.unwrap();
    tenant
        .enqueue(InboundContent::text(String::new()))
        .await
        .unwrap();

    assert_eq!(tenant.queue_len().await, 0);
}
