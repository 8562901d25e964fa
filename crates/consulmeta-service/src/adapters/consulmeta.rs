//! Consul catalog + KV metadata adapter
//!
//! Registers services with the Consul agent and writes each service attribute
//! to the KV store under `{prefix}/{service name}/{attribute}`. Metadata is
//! shared by every instance of a service name, so it is removed only when the
//! last instance is deregistered.
//!
//! The adapter is configured from a URI:
//!
//! ```text
//! consulmeta://[host[:port]][/key/prefix]
//! ```
//!
//! An empty host falls back to the client defaults (see
//! [`ClientConfig::from_env`]).
//!
//! Catalog and KV are not updated atomically. A failed catalog registration
//! leaves already written metadata in place, and an instance registering
//! between the "no instances left" lookup and the subtree delete in
//! [`ConsulMetaAdapter::deregister`] loses its metadata.

use async_trait::async_trait;
use consulmeta_core::{
    AdapterError, AdapterFactory, AdapterResult, FactoryError, KeyPrefix, RegistryAdapter,
    Service,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use url::Url;

use crate::client::{ClientConfig, ConsulHttpClient, ConsulStore, ServiceRegistration};
use crate::error::StoreResult;

/// Name the adapter is registered under, and the URI scheme selecting it
pub const ADAPTER_NAME: &str = "consulmeta";

/// Settings parsed from the adapter URI
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdapterConfig {
    /// `host[:port]` of the agent; `None` uses the client default
    pub store_address: Option<String>,
    /// Raw key prefix from the URI path
    pub key_prefix: KeyPrefix,
}

impl AdapterConfig {
    pub fn from_uri(uri: &Url) -> Self {
        let store_address = uri.host_str().filter(|h| !h.is_empty()).map(|host| {
            match uri.port() {
                Some(port) => format!("{}:{}", host, port),
                None => host.to_string(),
            }
        });
        let decoded = urlencoding::decode_binary(uri.path().as_bytes());
        let key_prefix = String::from_utf8_lossy(&decoded);

        Self {
            store_address,
            key_prefix: KeyPrefix::new(key_prefix),
        }
    }

    /// Client settings: environment defaults with the URI host applied
    pub fn client_config(&self) -> StoreResult<ClientConfig> {
        let config = ClientConfig::from_env()?;
        Ok(match self.store_address {
            Some(ref address) => config.with_address(address),
            None => config,
        })
    }
}

/// Publishes services to the Consul catalog and their attributes to Consul KV
pub struct ConsulMetaAdapter {
    store: Arc<dyn ConsulStore>,
    prefix: KeyPrefix,
}

impl ConsulMetaAdapter {
    pub fn new(store: Arc<dyn ConsulStore>, prefix: KeyPrefix) -> Self {
        Self { store, prefix }
    }

    /// Build an adapter backed by [`ConsulHttpClient`]
    pub fn from_config(config: &AdapterConfig) -> StoreResult<Self> {
        let client = ConsulHttpClient::new(config.client_config()?)?;
        debug!(
            base_url = %client.base_url(),
            prefix = %config.key_prefix,
            "Created consulmeta adapter"
        );
        Ok(Self::new(Arc::new(client), config.key_prefix.clone()))
    }

    pub fn key_prefix(&self) -> &KeyPrefix {
        &self.prefix
    }

    /// Check the agent is reachable by asking for the current leader
    #[instrument(skip(self))]
    pub async fn ping(&self) -> StoreResult<String> {
        let leader = self.store.leader().await?;
        info!(leader = %leader, "consulmeta: current leader");
        Ok(leader)
    }

    /// Write the service's attributes to KV, then register it in the catalog.
    ///
    /// Attributes are written in key order and the first failed write aborts
    /// the registration.
    #[instrument(skip(self, service), fields(service_id = %service.id, service_name = %service.name))]
    pub async fn register(&self, service: &Service) -> StoreResult<()> {
        let registration = ServiceRegistration::for_service(service);

        for (attribute, value) in &service.attrs {
            let key = self.prefix.key(&service.name, attribute);
            debug!(key = %key, "Writing service metadata");
            if let Err(e) = self.store.kv_put(&key, value.as_bytes()).await {
                error!(key = %key, error = %e, "consulmeta: failed to register metadata for service");
                return Err(e);
            }
        }

        if let Err(e) = self.store.agent_service_register(&registration).await {
            error!(error = %e, "consulmeta: failed to register service");
            return Err(e);
        }

        info!(
            attributes = service.attrs.len(),
            check = registration.check.is_some(),
            "Registered service"
        );
        Ok(())
    }

    /// Deregister the instance, and drop the service's metadata if no
    /// instance of the same name remains in the catalog.
    #[instrument(skip(self, service), fields(service_id = %service.id, service_name = %service.name))]
    pub async fn deregister(&self, service: &Service) -> StoreResult<()> {
        if let Err(e) = self.store.agent_service_deregister(&service.id).await {
            error!(error = %e, "consulmeta: failed to deregister service");
            return Err(e);
        }

        let remaining = match self.store.catalog_service(&service.name).await {
            Ok(remaining) => remaining,
            Err(e) => {
                error!(error = %e, "consulmeta: failed to look up remaining instances, keeping metadata");
                return Err(e);
            }
        };

        if remaining.is_empty() {
            let subtree = self.prefix.subtree(&service.name);
            debug!(subtree = %subtree, "Last instance gone, removing service metadata");
            self.store.kv_delete_tree(&subtree).await?;
        } else {
            debug!(remaining = remaining.len(), "Other instances remain, keeping metadata");
        }

        info!("Deregistered service");
        Ok(())
    }

    /// Nothing to do: TTL heartbeats go straight to the agent
    pub async fn refresh(&self, _service: &Service) -> StoreResult<()> {
        Ok(())
    }

    /// Services registered with the local agent, sorted by ID.
    ///
    /// Only catalog fields are filled in; attributes and checks are not read.
    #[instrument(skip(self))]
    pub async fn services(&self) -> StoreResult<Vec<Service>> {
        let agent_services = self.store.agent_services().await?;

        let mut services: Vec<Service> = agent_services.into_values().map(Service::from).collect();
        services.sort_by(|a, b| a.id.cmp(&b.id));

        debug!(count = services.len(), "Listed agent services");
        Ok(services)
    }

    /// Metadata currently stored for a service name, keyed by attribute
    #[instrument(skip(self))]
    pub async fn metadata(&self, service_name: &str) -> StoreResult<BTreeMap<String, String>> {
        let subtree = self.prefix.subtree(service_name);
        let pairs = self.store.kv_list(&subtree).await?;

        Ok(pairs
            .into_iter()
            .filter_map(|pair| {
                let attribute = pair.key.strip_prefix(subtree.as_str())?;
                if attribute.is_empty() {
                    return None;
                }
                Some((
                    attribute.to_string(),
                    String::from_utf8_lossy(&pair.value).into_owned(),
                ))
            })
            .collect())
    }
}

impl std::fmt::Debug for ConsulMetaAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsulMetaAdapter")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RegistryAdapter for ConsulMetaAdapter {
    async fn ping(&self) -> AdapterResult<()> {
        ConsulMetaAdapter::ping(self)
            .await
            .map(|_| ())
            .map_err(AdapterError::new)
    }

    async fn register(&self, service: &Service) -> AdapterResult<()> {
        ConsulMetaAdapter::register(self, service)
            .await
            .map_err(AdapterError::new)
    }

    async fn deregister(&self, service: &Service) -> AdapterResult<()> {
        ConsulMetaAdapter::deregister(self, service)
            .await
            .map_err(AdapterError::new)
    }

    async fn refresh(&self, service: &Service) -> AdapterResult<()> {
        ConsulMetaAdapter::refresh(self, service)
            .await
            .map_err(AdapterError::new)
    }

    async fn services(&self) -> AdapterResult<Vec<Service>> {
        ConsulMetaAdapter::services(self)
            .await
            .map_err(AdapterError::new)
    }
}

/// Factory for [`ConsulMetaAdapter`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsulMetaFactory;

impl AdapterFactory for ConsulMetaFactory {
    fn create(&self, uri: &Url) -> Result<Box<dyn RegistryAdapter>, FactoryError> {
        let adapter = self.build(&AdapterConfig::from_uri(uri))?;
        Ok(Box::new(adapter))
    }
}

impl ConsulMetaFactory {
    /// Build the concrete adapter from already parsed settings
    pub fn build(&self, config: &AdapterConfig) -> Result<ConsulMetaAdapter, FactoryError> {
        ConsulMetaAdapter::from_config(config).map_err(|e| {
            error!(
                address = config.store_address.as_deref().unwrap_or("default"),
                error = %e,
                "consulmeta: failed to create store client"
            );
            FactoryError::Construction(e.to_string())
        })
    }
}
