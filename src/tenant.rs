use std::sync::{
    Arc,
    Mutex as StdMutex,
    atomic::{AtomicBool, AtomicU64, Ordering},
};
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

use crate::connection::{ConnectionMonitor, ConnectionState, ReconnectDirective};
use crate::error::{ConfigError, DisconnectReason, EnqueueError, SendError};
use crate::pacing::Pacer;
use crate::queue::MessageQueue;
use crate::transport::{InboundFetcher, OutboundTransport};
use crate::types::{
    InboundContent, OutboundPayload, QueuedJob, SourceId, TenantConfig, TenantId, TenantSnapshot,
};

#[cfg(feature = "metrics")]
fn metric_inc(name: &'static str) {
    metrics::increment_counter!(name);
}

#[cfg(not(feature = "metrics"))]
fn metric_inc(_name: &'static str) {}

#[cfg(feature = "metrics")]
fn metric_inc_tenant(name: &'static str, tenant_id: &TenantId) {
    metrics::increment_counter!(name, "tenant" => tenant_id.0.clone());
}

#[cfg(not(feature = "metrics"))]
fn metric_inc_tenant(_name: &'static str, _tenant_id: &TenantId) {}

#[cfg(feature = "tracing")]
fn trace_event(message: &'static str) {
    tracing::info!(message);
}

#[cfg(not(feature = "tracing"))]
fn trace_event(_message: &'static str) {}

/// One tenant: a queue, a connection monitor, a dispatch loop, and the
/// operator controls around them.
///
/// Cheaply cloneable handle; all clones share the same tenant. A
/// tenant is created by [`ForwarderTenant::spawn`] (usually through
/// [`crate::TenantManager::register`]), runs one dispatch task, and is
/// torn down by [`ForwarderTenant::stop`].
#[derive(Clone)]
pub struct ForwarderTenant {
    inner: Arc<TenantInner>,
}

struct TenantInner {
    config: TenantConfig,

    queue: Mutex<MessageQueue>,
    monitor: Mutex<ConnectionMonitor>,
    pacer: Mutex<Pacer>,

    /// Operator pause flag. Independent of connection readiness.
    active: AtomicBool,

    /// Operator kill-switch. When false the queue is drained without
    /// delivery.
    outbound_enabled: AtomicBool,

    /// The dispatch loop is working through a non-empty queue.
    draining: AtomicBool,

    stopped: AtomicBool,

    delivered: AtomicU64,
    failed: AtomicU64,
    skipped_outbound: AtomicU64,
    dropped_inbound: AtomicU64,

    /// Wakes the dispatch loop when work arrives or the operator
    /// resumes.
    work: Notify,

    /// Broadcast on stop; interrupts every pending sleep.
    shutdown: Notify,

    fetcher: Arc<dyn InboundFetcher>,
    outbound: Arc<dyn OutboundTransport>,

    loop_handle: StdMutex<Option<JoinHandle<()>>>,
}

impl ForwarderTenant {
    /// Validate the config, spawn the dispatch loop, and start the
    /// initial connect attempt.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        config: TenantConfig,
        fetcher: Arc<dyn InboundFetcher>,
        outbound: Arc<dyn OutboundTransport>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let inner = Arc::new(TenantInner {
            queue: Mutex::new(MessageQueue::new(config.queue_capacity)),
            monitor: Mutex::new(ConnectionMonitor::new(
                config.max_reconnect_attempts,
                config.reconnect_delay,
            )),
            pacer: Mutex::new(Pacer::new(config.rng_seed)),
            active: AtomicBool::new(true),
            outbound_enabled: AtomicBool::new(config.outbound_enabled),
            draining: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            delivered: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            skipped_outbound: AtomicU64::new(0),
            dropped_inbound: AtomicU64::new(0),
            work: Notify::new(),
            shutdown: Notify::new(),
            fetcher,
            outbound,
            loop_handle: StdMutex::new(None),
            config,
        });

        let tenant = Self { inner };

        let loop_tenant = tenant.clone();
        let handle = tokio::spawn(async move {
            loop_tenant.dispatch_loop().await;
        });
        if let Ok(mut guard) = tenant.inner.loop_handle.lock() {
            *guard = Some(handle);
        }

        let connect_tenant = tenant.clone();
        tokio::spawn(async move {
            connect_tenant.begin_connect().await;
        });

        Ok(tenant)
    }

    pub fn id(&self) -> &TenantId {
        &self.inner.config.id
    }

    /// Whether this tenant accepts messages from the given source.
    pub fn accepts_source(&self, source: &SourceId) -> bool {
        self.inner.config.sources.contains(source)
    }

    /// Queue one inbound event.
    ///
    /// Succeeds while paused and while the outbound side is down; the
    /// job waits in the queue. Content with neither text nor
    /// attachment is ignored. A full queue drops the event, counts it,
    /// and returns `QueueFull` without ever blocking the caller.
    pub async fn enqueue(&self, content: InboundContent) -> Result<(), EnqueueError> {
        if self.inner.stopped.load(Ordering::SeqCst) {
            return Err(EnqueueError::Stopped);
        }

        let Some(job) = QueuedJob::from_content(content) else {
            return Ok(());
        };

        let result = {
            let mut queue = self.inner.queue.lock().await;
            queue.enqueue(job)
        };

        match result {
            Ok(()) => {
                metric_inc("relay.enqueue.accepted");
                trace_event("relay.enqueue.accepted");
                self.inner.work.notify_one();
                Ok(())
            }
            Err(err) => {
                self.inner.dropped_inbound.fetch_add(1, Ordering::SeqCst);
                metric_inc_tenant("relay.enqueue.dropped", self.id());
                trace_event("relay.enqueue.dropped");
                Err(err)
            }
        }
    }

    /// Pause dispatch. Queued jobs stay queued; enqueue still works.
    pub fn pause(&self) {
        self.inner.active.store(false, Ordering::SeqCst);
        trace_event("relay.tenant.paused");
    }

    /// Resume dispatch and wake the loop if it is parked.
    pub fn resume(&self) {
        self.inner.active.store(true, Ordering::SeqCst);
        trace_event("relay.tenant.resumed");
        self.inner.work.notify_one();
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Drop the job at the queue head without delivering it.
    ///
    /// Does not touch the delivered/failed counters.
    pub async fn skip_current(&self) -> bool {
        let mut queue = self.inner.queue.lock().await;
        queue.drop_front()
    }

    /// Flip the kill-switch. With delivery disabled the dispatch loop
    /// drains jobs into the `skipped_outbound` counter.
    pub fn set_outbound_enabled(&self, enabled: bool) {
        self.inner.outbound_enabled.store(enabled, Ordering::SeqCst);
        self.inner.work.notify_one();
    }

    pub fn is_outbound_enabled(&self) -> bool {
        self.inner.outbound_enabled.load(Ordering::SeqCst)
    }

    pub async fn connection_state(&self) -> ConnectionState {
        self.inner.monitor.lock().await.state()
    }

    pub async fn queue_len(&self) -> usize {
        self.inner.queue.lock().await.len()
    }

    /// Point-in-time view for the control surface. Always reflects the
    /// latest known state, failure or not.
    pub async fn snapshot(&self) -> TenantSnapshot {
        let queue_len = self.inner.queue.lock().await.len();
        let (state, reconnect_attempts) = {
            let monitor = self.inner.monitor.lock().await;
            (monitor.state(), monitor.attempts())
        };

        TenantSnapshot {
            id: self.inner.config.id.clone(),
            state,
            active: self.inner.active.load(Ordering::SeqCst),
            outbound_enabled: self.inner.outbound_enabled.load(Ordering::SeqCst),
            draining: self.inner.draining.load(Ordering::SeqCst),
            queue_len,
            delivered: self.inner.delivered.load(Ordering::SeqCst),
            failed: self.inner.failed.load(Ordering::SeqCst),
            skipped_outbound: self.inner.skipped_outbound.load(Ordering::SeqCst),
            dropped_inbound: self.inner.dropped_inbound.load(Ordering::SeqCst),
            reconnect_attempts,
        }
    }

    /// Transport lifecycle: the outbound side became ready.
    pub async fn on_ready(&self) {
        {
            let mut monitor = self.inner.monitor.lock().await;
            monitor.on_ready();
        }
        metric_inc_tenant("relay.connection.ready", self.id());
        trace_event("relay.connection.ready");
        self.inner.work.notify_one();
    }

    /// Transport lifecycle: the outbound side disconnected.
    ///
    /// Transient disconnects schedule a bounded, delayed reconnect. A
    /// remote logout schedules nothing; recovery is left to the
    /// operator (`force_reconnect` or tenant restart).
    pub async fn on_disconnected(&self, reason: DisconnectReason) {
        let directive = {
            let mut monitor = self.inner.monitor.lock().await;
            let directive = monitor.on_disconnected();
            if reason == DisconnectReason::LoggedOut {
                // Decline only a schedule this event itself produced. A
                // `None` here means an earlier timer still owns the
                // latch; releasing it would allow a second concurrent
                // timer.
                if matches!(directive, ReconnectDirective::Schedule(_)) {
                    monitor.cancel_schedule();
                }
                trace_event("relay.connection.logged_out");
                return;
            }
            directive
        };
        metric_inc_tenant("relay.connection.disconnected", self.id());
        trace_event("relay.connection.disconnected");
        self.apply_directive(directive);
    }

    /// Transport lifecycle: a connect attempt failed before ready.
    pub async fn on_handshake_failure(&self) {
        let directive = {
            let mut monitor = self.inner.monitor.lock().await;
            monitor.on_handshake_failure()
        };
        metric_inc_tenant("relay.connection.handshake_failure", self.id());
        trace_event("relay.connection.handshake_failure");
        self.apply_directive(directive);
    }

    /// Operator recovery: reset the retry budget and reconnect now.
    /// The only way back from `FailedPermanently` short of a restart.
    pub async fn force_reconnect(&self) {
        let directive = {
            let mut monitor = self.inner.monitor.lock().await;
            monitor.force_reconnect()
        };
        trace_event("relay.connection.force_reconnect");
        self.apply_directive(directive);
    }

    /// Stop the tenant: interrupt pending sleeps, join the dispatch
    /// loop, discard queued jobs.
    pub async fn stop(&self) {
        self.inner.stopped.store(true, Ordering::SeqCst);
        self.inner.shutdown.notify_waiters();
        self.inner.work.notify_one();

        let handle = self
            .inner
            .loop_handle
            .lock()
            .ok()
            .and_then(|mut guard| guard.take());
        if let Some(handle) = handle {
            let _ = handle.await;
        }

        self.inner.queue.lock().await.clear();
        trace_event("relay.tenant.stopped");
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    async fn begin_connect(&self) {
        if self.inner.stopped.load(Ordering::SeqCst) {
            return;
        }
        let proceed = {
            let mut monitor = self.inner.monitor.lock().await;
            monitor.begin_attempt()
        };
        if proceed {
            trace_event("relay.connection.connecting");
            self.inner.outbound.connect().await;
        }
    }

    fn apply_directive(&self, directive: ReconnectDirective) {
        match directive {
            ReconnectDirective::None => {}
            ReconnectDirective::Exhausted => {
                metric_inc_tenant("relay.connection.failed_permanently", self.id());
                trace_event("relay.connection.failed_permanently");
            }
            ReconnectDirective::Schedule(delay) => {
                let tenant = self.clone();
                tokio::spawn(async move {
                    if sleep_or_shutdown(&tenant.inner, delay).await {
                        return;
                    }
                    tenant.begin_connect().await;
                });
            }
        }
    }

    /// The per-tenant dispatch loop. One instance per tenant for the
    /// tenant's whole lifetime; it parks on the work notifier while
    /// the queue is empty, so repeated wake signals are harmless.
    async fn dispatch_loop(&self) {
        let inner = &self.inner;

        loop {
            if inner.stopped.load(Ordering::SeqCst) {
                break;
            }

            let queue_empty = inner.queue.lock().await.is_empty();
            if queue_empty {
                inner.draining.store(false, Ordering::SeqCst);
                tokio::select! {
                    _ = inner.shutdown.notified() => break,
                    _ = inner.work.notified() => continue,
                }
            }

            inner.draining.store(true, Ordering::SeqCst);

            // Operator pause: job stays at the queue head.
            if !inner.active.load(Ordering::SeqCst) {
                if sleep_or_shutdown(inner, inner.config.poll_interval).await {
                    break;
                }
                continue;
            }

            // Kill-switch: drain without delivery, no pacing.
            if !inner.outbound_enabled.load(Ordering::SeqCst) {
                let dropped = inner.queue.lock().await.dequeue().is_some();
                if dropped {
                    inner.skipped_outbound.fetch_add(1, Ordering::SeqCst);
                    metric_inc("relay.dispatch.skipped_outbound");
                    trace_event("relay.dispatch.skipped_outbound");
                }
                continue;
            }

            // Readiness gate: delivery order is never reordered by
            // readiness gaps.
            if !inner.monitor.lock().await.is_ready() {
                if sleep_or_shutdown(inner, inner.config.poll_interval).await {
                    break;
                }
                continue;
            }

            let Some(job) = inner.queue.lock().await.dequeue() else {
                continue;
            };

            self.fan_out(&job).await;

            if inner.stopped.load(Ordering::SeqCst) {
                break;
            }

            // Inter-message pacing. Mandatory even when every
            // destination failed.
            let delay = inner.pacer.lock().await.delay_in(inner.config.message_delay);
            if sleep_or_shutdown(inner, delay).await {
                break;
            }
        }

        inner.draining.store(false, Ordering::SeqCst);
    }

    /// Deliver one job to every destination in configured order.
    ///
    /// The cosmetic suffix is rolled once per job; every destination
    /// of the fan-out sees the same text. Failures are counted and
    /// logged per destination and never abort the remaining ones.
    async fn fan_out(&self, job: &QueuedJob) {
        let inner = &self.inner;

        let text = match &job.text {
            Some(base) => {
                let suffix = inner.pacer.lock().await.variation();
                let mut sent = base.clone();
                sent.push_str(suffix);
                Some(sent)
            }
            None => None,
        };

        let destinations = &inner.config.destinations;
        let last = destinations.len().saturating_sub(1);

        for (index, destination) in destinations.iter().enumerate() {
            let payload = match &job.attachment {
                Some(attachment) => {
                    match inner.fetcher.fetch_attachment(attachment).await {
                        Ok(media) => {
                            let mime_type = if media.mime_type.is_empty() {
                                attachment.media_kind.mime_type().to_string()
                            } else {
                                media.mime_type
                            };
                            let file_name = media
                                .file_name
                                .or_else(|| attachment.file_name.clone())
                                .unwrap_or_else(|| {
                                    format!(
                                        "file.{}",
                                        attachment.media_kind.fallback_extension()
                                    )
                                });
                            Some(OutboundPayload::Media {
                                mime_type,
                                bytes: media.bytes,
                                file_name,
                                caption: text.clone(),
                            })
                        }
                        Err(_err) => {
                            inner.failed.fetch_add(1, Ordering::SeqCst);
                            metric_inc_tenant("relay.fanout.fetch_failed", self.id());
                            trace_event("relay.fanout.fetch_failed");
                            None
                        }
                    }
                }
                None => text.clone().map(|body| OutboundPayload::Text { body }),
            };

            if let Some(payload) = payload {
                let attempt = timeout(
                    inner.config.send_timeout,
                    inner.outbound.send(destination, &payload),
                )
                .await;

                let outcome: Result<(), SendError> = match attempt {
                    Ok(result) => result,
                    Err(_elapsed) => Err(SendError::Transport),
                };

                match outcome {
                    Ok(()) => {
                        inner.delivered.fetch_add(1, Ordering::SeqCst);
                        metric_inc_tenant("relay.fanout.delivered", self.id());
                        trace_event("relay.fanout.delivered");
                    }
                    Err(_err) => {
                        inner.failed.fetch_add(1, Ordering::SeqCst);
                        metric_inc_tenant("relay.fanout.failed", self.id());
                        trace_event("relay.fanout.failed");
                    }
                }
            }

            // Inter-destination pacing, skipped after the last one.
            if index < last {
                let delay = inner.pacer.lock().await.delay_in(inner.config.destination_delay);
                if sleep_or_shutdown(inner, delay).await {
                    return;
                }
            }
        }
    }
}

/// Sleep `delay` unless the tenant stops first. Returns true on stop.
async fn sleep_or_shutdown(inner: &TenantInner, delay: Duration) -> bool {
    if inner.stopped.load(Ordering::SeqCst) {
        return true;
    }
    tokio::select! {
        _ = inner.shutdown.notified() => true,
        _ = sleep(delay) => inner.stopped.load(Ordering::SeqCst),
    }
}

impl TenantConfig {
    /// Reject configs a tenant cannot run with. Called by
    /// [`ForwarderTenant::spawn`]; exposed for pre-flight checks.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        if self.destinations.is_empty() {
            return Err(ConfigError::NoDestinations);
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        if self.message_delay.0 > self.message_delay.1 {
            return Err(ConfigError::InvalidDelayRange {
                field: "message_delay",
            });
        }
        if self.destination_delay.0 > self.destination_delay.1 {
            return Err(ConfigError::InvalidDelayRange {
                field: "destination_delay",
            });
        }
        Ok(())
    }
}
