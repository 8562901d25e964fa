//! Consul store client
//!
//! [`ConsulStore`] is the set of catalog and key-value calls the adapter
//! makes. [`ConsulHttpClient`] implements it over the Consul HTTP API; tests
//! substitute a mock.

use async_trait::async_trait;
use std::collections::HashMap;

pub mod config;
pub mod http;
pub mod types;

pub use self::config::{ClientConfig, Scheme, DEFAULT_ADDRESS};
pub use self::http::ConsulHttpClient;
pub use self::types::{AgentService, CatalogService, KvPair, ServiceRegistration};

use crate::error::StoreResult;

/// Catalog and key-value operations of a Consul agent
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConsulStore: Send + Sync {
    /// Address of the current raft leader; empty when there is none
    async fn leader(&self) -> StoreResult<String>;

    /// Write a single key
    async fn kv_put(&self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Read every key under `prefix`
    async fn kv_list(&self, prefix: &str) -> StoreResult<Vec<KvPair>>;

    /// Delete every key under `prefix`
    async fn kv_delete_tree(&self, prefix: &str) -> StoreResult<()>;

    /// Register a service with the local agent
    async fn agent_service_register(&self, registration: &ServiceRegistration) -> StoreResult<()>;

    /// Deregister a service instance from the local agent
    async fn agent_service_deregister(&self, service_id: &str) -> StoreResult<()>;

    /// Catalog instances of the named service, across all nodes
    async fn catalog_service(&self, name: &str) -> StoreResult<Vec<CatalogService>>;

    /// Services registered with the local agent, keyed by ID
    async fn agent_services(&self) -> StoreResult<HashMap<String, AgentService>>;
}
