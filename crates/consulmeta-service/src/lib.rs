//! Consul store client and the consulmeta registration adapter
//!
//! The composition root makes the adapter available to the bridge with
//! [`register_adapters`]:
//!
//! ```no_run
//! use consulmeta_core::AdapterRegistry;
//!
//! let mut registry = AdapterRegistry::new();
//! consulmeta_service::register_adapters(&mut registry);
//!
//! let uri = url::Url::parse("consulmeta://localhost:8500/services").unwrap();
//! let adapter = registry.create(&uri).unwrap();
//! # drop(adapter);
//! ```

pub mod adapters;
pub mod client;
pub mod error;

pub use adapters::{AdapterConfig, ConsulMetaAdapter, ConsulMetaFactory, ADAPTER_NAME};
pub use client::{ClientConfig, ConsulHttpClient, ConsulStore};
pub use error::{StoreError, StoreResult};

use consulmeta_core::AdapterRegistry;

/// Register every adapter this crate provides
pub fn register_adapters(registry: &mut AdapterRegistry) {
    registry.register(ADAPTER_NAME, Box::new(ConsulMetaFactory));
}
