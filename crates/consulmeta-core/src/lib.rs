//! Core types for the consulmeta registration adapter
//!
//! This crate holds everything about a registration that does not touch the
//! network: the [`Service`] record, health check resolution, the metadata key
//! layout, and the contract adapters implement for the bridge.

pub mod bridge;
pub mod check;
pub mod metadata;
pub mod service;

pub use bridge::{
    AdapterError, AdapterFactory, AdapterRegistry, AdapterResult, FactoryError, RegistryAdapter,
};
pub use check::{CheckKind, CheckSpec, HealthCheck, DEFAULT_INTERVAL};
pub use metadata::KeyPrefix;
pub use service::{Service, ServiceOrigin};
