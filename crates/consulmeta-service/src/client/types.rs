//! Consul HTTP API payloads

use consulmeta_core::{HealthCheck, Service};
use serde::{Deserialize, Serialize};

/// Body of `PUT /v1/agent/service/register`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRegistration {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Tags", default)]
    pub tags: Vec<String>,
    #[serde(rename = "Port")]
    pub port: u16,
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "Check", default, skip_serializing_if = "Option::is_none")]
    pub check: Option<HealthCheck>,
}

impl ServiceRegistration {
    /// Registration for `service`, resolving its health check from attributes
    pub fn for_service(service: &Service) -> Self {
        Self {
            id: service.id.clone(),
            name: service.name.clone(),
            tags: service.tags.clone(),
            port: service.port,
            address: service.ip.clone(),
            check: HealthCheck::for_service(service),
        }
    }
}

/// Entry of `GET /v1/agent/services`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AgentService {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Service")]
    pub service: String,
    #[serde(rename = "Tags", default)]
    pub tags: Option<Vec<String>>,
    #[serde(rename = "Port", default)]
    pub port: u16,
    #[serde(rename = "Address", default)]
    pub address: String,
}

impl From<AgentService> for Service {
    fn from(agent: AgentService) -> Self {
        Service {
            id: agent.id,
            name: agent.service,
            ip: agent.address,
            port: agent.port,
            tags: agent.tags.unwrap_or_default(),
            ..Default::default()
        }
    }
}

/// Entry of `GET /v1/catalog/service/{name}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CatalogService {
    #[serde(rename = "Node", default)]
    pub node: String,
    #[serde(rename = "ServiceID", default)]
    pub service_id: String,
    #[serde(rename = "ServiceName", default)]
    pub service_name: String,
    #[serde(rename = "ServiceAddress", default)]
    pub service_address: String,
    #[serde(rename = "ServicePort", default)]
    pub service_port: u16,
}

/// Key-value entry with its value decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvPair {
    pub key: String,
    pub value: Vec<u8>,
}

/// Entry of `GET /v1/kv/{prefix}?recurse` as sent on the wire
#[derive(Debug, Deserialize)]
pub(crate) struct RawKvPair {
    #[serde(rename = "Key")]
    pub key: String,
    /// Base64 encoded; `null` for folder entries
    #[serde(rename = "Value", default)]
    pub value: Option<String>,
}
