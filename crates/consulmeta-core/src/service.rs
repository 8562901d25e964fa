//! Service records handed to registry adapters
//!
//! A [`Service`] is produced by the bridge from a running container and only
//! read by adapters. The [`ServiceOrigin`] carries the container-side details
//! used when building script checks.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Container-side origin of a published service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceOrigin {
    /// Full container ID
    pub container_id: String,
    /// Port exposed inside the container (e.g. `"80"`)
    pub exposed_port: String,
    /// Host IP the port is bound to
    pub host_ip: String,
    /// Host port the container port is published on
    pub host_port: String,
}

/// A service instance as seen by the bridge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Service {
    /// Unique instance ID
    pub id: String,
    /// Service name, shared by all instances of the same service
    pub name: String,
    /// Advertised address
    pub ip: String,
    /// Advertised port
    pub port: u16,
    /// Catalog tags, order preserved
    pub tags: Vec<String>,
    /// Free-form attributes; written as metadata and read for check configuration
    pub attrs: BTreeMap<String, String>,
    /// Container origin
    pub origin: ServiceOrigin,
}

impl Service {
    /// Create a service with the given ID and name
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the advertised address and port
    pub fn with_address(mut self, ip: impl Into<String>, port: u16) -> Self {
        self.ip = ip.into();
        self.port = port;
        self
    }

    /// Append a tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Set an attribute, replacing any previous value for the key
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// Set the container origin
    pub fn with_origin(mut self, origin: ServiceOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Look up an attribute, treating an empty value as absent
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}
