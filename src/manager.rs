use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::connection::ConnectionState;
use crate::error::RegistryError;
use crate::tenant::ForwarderTenant;
use crate::transport::{InboundFetcher, OutboundTransport};
use crate::types::{
    InboundContent, ManagerSummary, SourceId, TenantConfig, TenantId, TenantSnapshot,
};

#[cfg(feature = "tracing")]
fn trace_event(message: &'static str) {
    tracing::info!(message);
}

#[cfg(not(feature = "tracing"))]
fn trace_event(_message: &'static str) {}

/// Registry of tenants, keyed by id.
///
/// An explicit, constructed object: build one, share it by reference
/// with the control surface. Tenants are fully isolated from each
/// other; a permanent failure in one never affects another's dispatch
/// loop or counters.
pub struct TenantManager {
    tenants: RwLock<HashMap<TenantId, ForwarderTenant>>,
}

impl TenantManager {
    pub fn new() -> Self {
        Self {
            tenants: RwLock::new(HashMap::new()),
        }
    }

    /// Validate the config, spawn the tenant, and register it.
    ///
    /// Fails with `AlreadyExists` when the id is taken and with
    /// `Config` when the configuration is invalid; no tenant is
    /// created in either case.
    pub async fn register(
        &self,
        config: TenantConfig,
        fetcher: Arc<dyn InboundFetcher>,
        outbound: Arc<dyn OutboundTransport>,
    ) -> Result<ForwarderTenant, RegistryError> {
        config.validate()?;

        let mut guard = self.tenants.write().await;
        if guard.contains_key(&config.id) {
            return Err(RegistryError::AlreadyExists {
                tenant_id: config.id.clone(),
            });
        }

        let id = config.id.clone();
        let tenant = ForwarderTenant::spawn(config, fetcher, outbound)?;
        guard.insert(id, tenant.clone());
        trace_event("relay.manager.registered");
        Ok(tenant)
    }

    /// Stop a tenant and remove it, releasing its queue and loop.
    pub async fn unregister(&self, id: &TenantId) -> Result<(), RegistryError> {
        let tenant = {
            let mut guard = self.tenants.write().await;
            guard.remove(id)
        };

        match tenant {
            Some(tenant) => {
                tenant.stop().await;
                trace_event("relay.manager.unregistered");
                Ok(())
            }
            None => Err(RegistryError::NotFound {
                tenant_id: id.clone(),
            }),
        }
    }

    pub async fn get(&self, id: &TenantId) -> Option<ForwarderTenant> {
        let guard = self.tenants.read().await;
        guard.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.tenants.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tenants.read().await.is_empty()
    }

    /// Snapshots of all tenants, for the control surface.
    pub async fn list_all(&self) -> Vec<TenantSnapshot> {
        let tenants: Vec<ForwarderTenant> = {
            let guard = self.tenants.read().await;
            guard.values().cloned().collect()
        };

        let mut snapshots = Vec::with_capacity(tenants.len());
        for tenant in tenants {
            snapshots.push(tenant.snapshot().await);
        }
        snapshots
    }

    /// Aggregate counts over all tenants.
    pub async fn summary(&self) -> ManagerSummary {
        let snapshots = self.list_all().await;
        ManagerSummary {
            total: snapshots.len(),
            ready: snapshots
                .iter()
                .filter(|s| s.state == ConnectionState::Ready)
                .count(),
            active: snapshots.iter().filter(|s| s.active).count(),
        }
    }

    /// Route one inbound event to every tenant whose allow-list
    /// contains the source.
    ///
    /// Returns the number of tenants that queued the event. A full
    /// queue on one tenant drops the event for that tenant only, is
    /// counted there, and never blocks the inbound collaborator or the
    /// other tenants.
    pub async fn route(&self, source: &SourceId, content: InboundContent) -> usize {
        let matching: Vec<ForwarderTenant> = {
            let guard = self.tenants.read().await;
            guard
                .values()
                .filter(|t| t.accepts_source(source))
                .cloned()
                .collect()
        };

        let mut accepted = 0usize;
        for tenant in matching {
            if tenant.enqueue(content.clone()).await.is_ok() {
                accepted += 1;
            }
        }
        accepted
    }

    /// Pause dispatch for one tenant.
    pub async fn pause(&self, id: &TenantId) -> Result<(), RegistryError> {
        self.with_tenant(id, |t| t.pause()).await
    }

    /// Resume dispatch for one tenant.
    pub async fn resume(&self, id: &TenantId) -> Result<(), RegistryError> {
        self.with_tenant(id, |t| t.resume()).await
    }

    /// Drop the front job of one tenant's queue.
    pub async fn skip_current(&self, id: &TenantId) -> Result<bool, RegistryError> {
        let tenant = self.require(id).await?;
        Ok(tenant.skip_current().await)
    }

    /// Flip one tenant's kill-switch.
    pub async fn set_outbound_enabled(
        &self,
        id: &TenantId,
        enabled: bool,
    ) -> Result<(), RegistryError> {
        self.with_tenant(id, |t| t.set_outbound_enabled(enabled)).await
    }

    /// Reset one tenant's retry budget and reconnect immediately.
    pub async fn force_reconnect(&self, id: &TenantId) -> Result<(), RegistryError> {
        let tenant = self.require(id).await?;
        tenant.force_reconnect().await;
        Ok(())
    }

    /// Snapshot of one tenant.
    pub async fn snapshot(&self, id: &TenantId) -> Result<TenantSnapshot, RegistryError> {
        let tenant = self.require(id).await?;
        Ok(tenant.snapshot().await)
    }

    /// Stop and remove every tenant. Used on process shutdown.
    pub async fn shutdown(&self) {
        let tenants: Vec<ForwarderTenant> = {
            let mut guard = self.tenants.write().await;
            guard.drain().map(|(_, t)| t).collect()
        };

        for tenant in tenants {
            tenant.stop().await;
        }
        trace_event("relay.manager.shutdown");
    }

    async fn require(&self, id: &TenantId) -> Result<ForwarderTenant, RegistryError> {
        self.get(id).await.ok_or_else(|| RegistryError::NotFound {
            tenant_id: id.clone(),
        })
    }

    async fn with_tenant<F>(&self, id: &TenantId, f: F) -> Result<(), RegistryError>
    where
        F: FnOnce(&ForwarderTenant),
    {
        let tenant = self.require(id).await?;
        f(&tenant);
        Ok(())
    }
}

impl Default for TenantManager {
    fn default() -> Self {
        Self::new()
    }
}
