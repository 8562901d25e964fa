//! Registry adapters built on the Consul store client
//!
//! - consulmeta: catalog registration with service attributes mirrored into KV

pub mod consulmeta;

pub use consulmeta::{AdapterConfig, ConsulMetaAdapter, ConsulMetaFactory, ADAPTER_NAME};
