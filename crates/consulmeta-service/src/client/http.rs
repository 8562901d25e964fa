//! Consul HTTP API client

use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client as HttpClient, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tracing::{debug, instrument};
use url::Url;

use super::config::ClientConfig;
use super::types::{AgentService, CatalogService, KvPair, RawKvPair, ServiceRegistration};
use super::ConsulStore;
use crate::error::{StoreError, StoreResult};

const TOKEN_HEADER: &str = "X-Consul-Token";

/// Encode a key or name for use in a URL path, keeping `/` as separator.
/// Everything else outside the unreserved set is escaped, `\` included.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Client for the subset of the Consul agent API used by the adapter
#[derive(Debug, Clone)]
pub struct ConsulHttpClient {
    http: HttpClient,
    base_url: Url,
    token: Option<String>,
}

impl ConsulHttpClient {
    pub fn new(config: ClientConfig) -> StoreResult<Self> {
        let base_url = config.base_url()?;
        let http = HttpClient::builder()
            .user_agent(concat!("consulmeta/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url,
            token: config.token,
        })
    }

    /// Root URL requests are issued against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str, recurse: bool) -> StoreResult<Url> {
        let mut url = self
            .base_url
            .join(&format!("v1/{}", path))
            .map_err(|e| StoreError::InvalidConfig(format!("Invalid request path '{}': {}", path, e)))?;
        if recurse {
            url.set_query(Some("recurse"));
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let mut request = self.http.request(method, url);
        if let Some(ref token) = self.token {
            request = request.header(TOKEN_HEADER, token);
        }
        request
    }

    /// Send a request, turning non-success statuses into errors
    async fn send(&self, request: RequestBuilder) -> StoreResult<Response> {
        let response = request.send().await?;
        if response.status().is_success() {
            return Ok(response);
        }
        Err(status_error(response).await)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> StoreResult<T> {
        let url = self.url(path, false)?;
        debug!(url = %url, "GET");
        let response = self.send(self.request(Method::GET, url)).await?;
        response
            .json()
            .await
            .map_err(|e| StoreError::Decode(format!("GET {}: {}", path, e)))
    }
}

async fn status_error(response: Response) -> StoreError {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    StoreError::Status {
        status,
        body: body.trim().to_string(),
    }
}

#[async_trait]
impl ConsulStore for ConsulHttpClient {
    #[instrument(skip(self))]
    async fn leader(&self) -> StoreResult<String> {
        self.get_json("status/leader").await
    }

    #[instrument(skip(self, value), fields(len = value.len()))]
    async fn kv_put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let url = self.url(&format!("kv/{}", encode_path(key)), false)?;
        debug!(url = %url, "PUT");
        self.send(self.request(Method::PUT, url).body(value.to_vec()))
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn kv_list(&self, prefix: &str) -> StoreResult<Vec<KvPair>> {
        let url = self.url(&format!("kv/{}", encode_path(prefix)), true)?;
        debug!(url = %url, "GET");
        let response = self.request(Method::GET, url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let raw: Vec<RawKvPair> = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(format!("GET kv/{}: {}", prefix, e)))?;

        raw.into_iter()
            .map(|pair| -> StoreResult<KvPair> {
                let value = match pair.value {
                    Some(encoded) => base64::engine::general_purpose::STANDARD
                        .decode(encoded.as_bytes())
                        .map_err(|e| {
                            StoreError::Decode(format!("Invalid value for key {}: {}", pair.key, e))
                        })?,
                    None => Vec::new(),
                };
                Ok(KvPair {
                    key: pair.key,
                    value,
                })
            })
            .collect()
    }

    #[instrument(skip(self))]
    async fn kv_delete_tree(&self, prefix: &str) -> StoreResult<()> {
        let url = self.url(&format!("kv/{}", encode_path(prefix)), true)?;
        debug!(url = %url, "DELETE");
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    #[instrument(skip(self, registration), fields(service_id = %registration.id))]
    async fn agent_service_register(&self, registration: &ServiceRegistration) -> StoreResult<()> {
        let url = self.url("agent/service/register", false)?;
        debug!(url = %url, "PUT");
        self.send(self.request(Method::PUT, url).json(registration))
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn agent_service_deregister(&self, service_id: &str) -> StoreResult<()> {
        let url = self.url(
            &format!("agent/service/deregister/{}", encode_path(service_id)),
            false,
        )?;
        debug!(url = %url, "PUT");
        self.send(self.request(Method::PUT, url)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn catalog_service(&self, name: &str) -> StoreResult<Vec<CatalogService>> {
        let services: Option<Vec<CatalogService>> = self
            .get_json(&format!("catalog/service/{}", encode_path(name)))
            .await?;
        Ok(services.unwrap_or_default())
    }

    #[instrument(skip(self))]
    async fn agent_services(&self) -> StoreResult<HashMap<String, AgentService>> {
        let services: Option<HashMap<String, AgentService>> =
            self.get_json("agent/services").await?;
        Ok(services.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ConsulHttpClient {
        let config = ClientConfig::default().with_address(&server.uri());
        ConsulHttpClient::new(config).unwrap()
    }

    #[test]
    fn test_encode_path_keeps_separators() {
        assert_eq!(encode_path("svc/web/version"), "svc/web/version");
        assert_eq!(encode_path("svc/web/a b?"), "svc/web/a%20b%3F");
        assert_eq!(encode_path("svc/web/"), "svc/web/");
        assert_eq!(encode_path("svc/web/a\\b"), "svc/web/a%5Cb");
    }

    #[tokio::test]
    async fn test_leader() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/status/leader"))
            .respond_with(ResponseTemplate::new(200).set_body_json("10.0.0.1:8300"))
            .mount(&server)
            .await;

        let leader = client_for(&server).leader().await.unwrap();
        assert_eq!(leader, "10.0.0.1:8300");
    }

    #[tokio::test]
    async fn test_token_header_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/kv/svc/web/version"))
            .and(header("X-Consul-Token", "secret"))
            .and(body_string("1.2.3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(true))
            .expect(1)
            .mount(&server)
            .await;

        let config = ClientConfig::default()
            .with_address(&server.uri())
            .with_token("secret");
        let client = ConsulHttpClient::new(config).unwrap();

        client.kv_put("svc/web/version", b"1.2.3").await.unwrap();
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/agent/service/register"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Invalid check\n"))
            .mount(&server)
            .await;

        let registration = ServiceRegistration::for_service(&consulmeta_core::Service::new(
            "web-1", "web",
        ));
        let err = client_for(&server)
            .agent_service_register(&registration)
            .await
            .unwrap_err();

        match err {
            StoreError::Status { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, "Invalid check");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_backslash_stays_in_key() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/kv/svc/web/a%5Cb"))
            .respond_with(ResponseTemplate::new(200).set_body_json(true))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/v1/agent/service/deregister/web%5C1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.kv_put("svc/web/a\\b", b"1").await.unwrap();
        client.agent_service_deregister("web\\1").await.unwrap();
    }

    #[tokio::test]
    async fn test_kv_list_decodes_values() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/kv/svc/web/"))
            .and(query_param("recurse", ""))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"Key": "svc/web/", "Value": null},
                {"Key": "svc/web/version", "Value": "MS4yLjM="}
            ])))
            .mount(&server)
            .await;

        let pairs = client_for(&server).kv_list("svc/web/").await.unwrap();
        assert_eq!(pairs.len(), 2);
        assert!(pairs[0].value.is_empty());
        assert_eq!(pairs[1].key, "svc/web/version");
        assert_eq!(pairs[1].value, b"1.2.3".to_vec());
    }

    #[tokio::test]
    async fn test_kv_list_not_found_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/kv/svc/missing/"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let pairs = client_for(&server).kv_list("svc/missing/").await.unwrap();
        assert!(pairs.is_empty());
    }

    #[tokio::test]
    async fn test_catalog_service_null_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/catalog/service/web"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .mount(&server)
            .await;

        let services = client_for(&server).catalog_service("web").await.unwrap();
        assert!(services.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_agent() {
        // Nothing listens on port 1
        let config = ClientConfig::default().with_address("127.0.0.1:1");
        let client = ConsulHttpClient::new(config).unwrap();

        let err = client.leader().await.unwrap_err();
        assert!(matches!(err, StoreError::Transport(_)));
    }
}
