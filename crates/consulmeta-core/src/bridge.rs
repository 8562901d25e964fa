//! Capability contract between the bridge and registry adapters
//!
//! The bridge drives adapters through [`RegistryAdapter`] and builds them
//! from a URI through an [`AdapterFactory`]. Factories are registered
//! explicitly in an [`AdapterRegistry`] by the composition root; the URI
//! scheme selects which one is used.

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::service::Service;

/// Opaque error returned across the adapter boundary.
///
/// Display and source are those of the wrapped error, so a store error
/// reaches the bridge unchanged.
#[derive(Debug)]
pub struct AdapterError {
    inner: Box<dyn std::error::Error + Send + Sync + 'static>,
}

impl AdapterError {
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            inner: Box::new(error),
        }
    }

    /// Borrow the wrapped error as a concrete type
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        self.inner.downcast_ref::<E>()
    }
}

impl std::fmt::Display for AdapterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.inner, f)
    }
}

impl std::error::Error for AdapterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}

/// Result type for adapter operations
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Errors from adapter construction
#[derive(Error, Debug)]
pub enum FactoryError {
    #[error("No adapter registered for scheme: {0}")]
    UnknownAdapter(String),
    #[error("Failed to construct adapter: {0}")]
    Construction(String),
}

/// Operations the bridge performs on a registry
#[async_trait]
pub trait RegistryAdapter: Send + Sync {
    /// Check that the registry is reachable
    async fn ping(&self) -> AdapterResult<()>;

    /// Publish a service
    async fn register(&self, service: &Service) -> AdapterResult<()>;

    /// Withdraw a service
    async fn deregister(&self, service: &Service) -> AdapterResult<()>;

    /// Periodic refresh of a registered service
    async fn refresh(&self, service: &Service) -> AdapterResult<()>;

    /// List the services currently known to the registry
    async fn services(&self) -> AdapterResult<Vec<Service>>;
}

/// Builds a [`RegistryAdapter`] from a configuration URI
pub trait AdapterFactory: Send + Sync {
    fn create(&self, uri: &Url) -> Result<Box<dyn RegistryAdapter>, FactoryError>;
}

/// Named adapter factories, keyed by URI scheme
#[derive(Default)]
pub struct AdapterRegistry {
    factories: BTreeMap<String, Box<dyn AdapterFactory>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `name`, returning any factory it replaces
    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: Box<dyn AdapterFactory>,
    ) -> Option<Box<dyn AdapterFactory>> {
        let name = name.into();
        debug!(adapter = %name, "Registered adapter factory");
        self.factories.insert(name, factory)
    }

    /// Registered adapter names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Create an adapter using the factory named by the URI scheme
    pub fn create(&self, uri: &Url) -> Result<Box<dyn RegistryAdapter>, FactoryError> {
        let factory = self
            .factories
            .get(uri.scheme())
            .ok_or_else(|| FactoryError::UnknownAdapter(uri.scheme().to_string()))?;
        factory.create(uri)
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("factories", &self.names())
            .finish()
    }
}
