//! Subcommand implementations

use anyhow::{Context, Result};
use consulmeta_core::{RegistryAdapter, Service};
use consulmeta_service::{AdapterConfig, ConsulMetaAdapter};
use std::path::Path;
use tracing::info;
use url::Url;

pub async fn ping(adapter: &dyn RegistryAdapter) -> Result<()> {
    adapter.ping().await.context("Store is not reachable")?;
    println!("ok");
    Ok(())
}

pub async fn services(adapter: &dyn RegistryAdapter) -> Result<()> {
    let services = adapter.services().await.context("Failed to list services")?;
    println!("{}", serde_json::to_string_pretty(&services)?);
    Ok(())
}

pub async fn register(adapter: &dyn RegistryAdapter, file: &Path) -> Result<()> {
    let raw = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let service: Service = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid service description in {}", file.display()))?;

    if service.name.is_empty() {
        anyhow::bail!("Service in {} has no name", file.display());
    }

    adapter
        .register(&service)
        .await
        .with_context(|| format!("Failed to register {}", service.id))?;
    info!(service_id = %service.id, "Service registered");
    Ok(())
}

pub async fn deregister(adapter: &dyn RegistryAdapter, id: String, name: String) -> Result<()> {
    let service = Service::new(id, name);
    adapter
        .deregister(&service)
        .await
        .with_context(|| format!("Failed to deregister {}", service.id))?;
    info!(service_id = %service.id, "Service deregistered");
    Ok(())
}

/// Metadata is specific to the consulmeta adapter, so it is built directly
pub async fn metadata(uri: &Url, name: &str) -> Result<()> {
    let adapter = ConsulMetaAdapter::from_config(&AdapterConfig::from_uri(uri))
        .context("Failed to create consulmeta adapter")?;
    let metadata = adapter
        .metadata(name)
        .await
        .with_context(|| format!("Failed to read metadata for {}", name))?;
    println!("{}", serde_json::to_string_pretty(&metadata)?);
    Ok(())
}
