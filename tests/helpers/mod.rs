#![allow(dead_code)] // Test helpers appear unused when compiled independently

use consulmeta_core::KeyPrefix;
use consulmeta_service::{ClientConfig, ConsulHttpClient, ConsulMetaAdapter};
use std::collections::BTreeMap;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Adapter talking to `server` with the given key prefix
pub fn adapter_for(server: &MockServer, prefix: &str) -> ConsulMetaAdapter {
    let config = ClientConfig::default().with_address(&server.uri());
    let client = ConsulHttpClient::new(config).unwrap();
    ConsulMetaAdapter::new(Arc::new(client), KeyPrefix::new(prefix))
}

/// Accept every KV write
pub async fn mount_kv_put_ok(server: &MockServer) {
    Mock::given(method("PUT"))
        .and(wiremock::matchers::path_regex(r"^/v1/kv/.+"))
        .respond_with(ResponseTemplate::new(200).set_body_json(true))
        .mount(server)
        .await;
}

/// Accept every agent registration
pub async fn mount_register_ok(server: &MockServer) {
    Mock::given(method("PUT"))
        .and(path("/v1/agent/service/register"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

/// Requests received with the given method whose path starts with `prefix`
pub async fn requests_to(server: &MockServer, verb: &str, prefix: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.to_string() == verb && r.url.path().starts_with(prefix))
        .collect()
}

/// KV writes received, as key -> value
pub async fn kv_writes(server: &MockServer) -> BTreeMap<String, String> {
    requests_to(server, "PUT", "/v1/kv/")
        .await
        .into_iter()
        .map(|r| {
            let key = r.url.path().trim_start_matches("/v1/kv/").to_string();
            (key, String::from_utf8(r.body).unwrap())
        })
        .collect()
}
