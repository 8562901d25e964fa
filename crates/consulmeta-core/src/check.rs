//! Health check resolution
//!
//! Services opt into a catalog health check through attributes. The
//! recognized keys are parsed once into a [`CheckSpec`], which is then turned
//! into the [`HealthCheck`] attached to the registration.
//!
//! Resolution is first-match-wins in this order:
//!
//! ```text
//! check_http   -> HTTP check on http://{ip}:{port}{path} (+ check_timeout)
//! check_cmd    -> script "check-cmd {container[..12]} {exposed_port} {cmd}"
//! check_script -> script with $SERVICE_IP / $SERVICE_PORT substituted
//! check_ttl    -> TTL check, never an interval
//! ```
//!
//! HTTP and script checks take `check_interval`, defaulting to
//! [`DEFAULT_INTERVAL`].

use serde::{Deserialize, Serialize};

use crate::service::Service;

/// Interval applied to HTTP and script checks without `check_interval`
pub const DEFAULT_INTERVAL: &str = "10s";

/// Attribute selecting an HTTP check path
pub const ATTR_CHECK_HTTP: &str = "check_http";
/// Attribute setting the HTTP check timeout
pub const ATTR_CHECK_TIMEOUT: &str = "check_timeout";
/// Attribute selecting a `check-cmd` helper check
pub const ATTR_CHECK_CMD: &str = "check_cmd";
/// Attribute selecting an interpolated script check
pub const ATTR_CHECK_SCRIPT: &str = "check_script";
/// Attribute selecting a TTL check
pub const ATTR_CHECK_TTL: &str = "check_ttl";
/// Attribute overriding the check interval
pub const ATTR_CHECK_INTERVAL: &str = "check_interval";

const CONTAINER_ID_PREFIX_LEN: usize = 12;

/// Kind of check requested by a service's attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckKind {
    /// HTTP GET against a path on the service's own address
    Http {
        path: String,
        timeout: Option<String>,
    },
    /// Command run through the external `check-cmd` helper
    Cmd(String),
    /// Shell script with `$SERVICE_IP` and `$SERVICE_PORT` placeholders
    Script(String),
    /// Time-to-live check updated by the service itself
    Ttl(String),
}

/// Check configuration parsed from a service's attribute map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckSpec {
    pub kind: CheckKind,
    /// Raw `check_interval` value, if any
    pub interval: Option<String>,
}

impl CheckSpec {
    /// Parse the service's check attributes. Returns `None` when no check is
    /// requested.
    pub fn from_service(service: &Service) -> Option<Self> {
        let get = |key: &str| service.attr(key).map(str::to_string);

        let kind = if let Some(path) = get(ATTR_CHECK_HTTP) {
            CheckKind::Http {
                path,
                timeout: get(ATTR_CHECK_TIMEOUT),
            }
        } else if let Some(cmd) = get(ATTR_CHECK_CMD) {
            CheckKind::Cmd(cmd)
        } else if let Some(script) = get(ATTR_CHECK_SCRIPT) {
            CheckKind::Script(script)
        } else if let Some(ttl) = get(ATTR_CHECK_TTL) {
            CheckKind::Ttl(ttl)
        } else {
            return None;
        };

        Some(Self {
            kind,
            interval: get(ATTR_CHECK_INTERVAL),
        })
    }

    /// Build the catalog check for `service`
    pub fn to_check(&self, service: &Service) -> HealthCheck {
        let mut check = HealthCheck::default();

        match &self.kind {
            CheckKind::Http { path, timeout } => {
                check.http = Some(format!("http://{}:{}{}", service.ip, service.port, path));
                check.timeout = timeout.clone();
            }
            CheckKind::Cmd(cmd) => {
                let id = &service.origin.container_id;
                let short_id = id.get(..CONTAINER_ID_PREFIX_LEN).unwrap_or(id.as_str());
                check.script = Some(format!(
                    "check-cmd {} {} {}",
                    short_id, service.origin.exposed_port, cmd
                ));
            }
            CheckKind::Script(script) => {
                check.script = Some(interpolate(script, service));
            }
            CheckKind::Ttl(ttl) => {
                check.ttl = Some(ttl.clone());
                return check;
            }
        }

        check.interval = Some(
            self.interval
                .clone()
                .unwrap_or_else(|| DEFAULT_INTERVAL.to_string()),
        );
        check
    }
}

/// Substitute the origin's host IP and port into a check script
fn interpolate(script: &str, service: &Service) -> String {
    script
        .replace("$SERVICE_IP", &service.origin.host_ip)
        .replace("$SERVICE_PORT", &service.origin.host_port)
}

/// Health check attached to a catalog registration
///
/// At most one of `http`, `script` and `ttl` is set. Field names follow the
/// Consul agent API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    #[serde(rename = "HTTP", default, skip_serializing_if = "Option::is_none")]
    pub http: Option<String>,
    #[serde(rename = "Script", default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(rename = "TTL", default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,
    #[serde(rename = "Interval", default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    #[serde(rename = "Timeout", default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

impl HealthCheck {
    /// Resolve the check for a service, or `None` if it requests no check
    pub fn for_service(service: &Service) -> Option<Self> {
        CheckSpec::from_service(service).map(|spec| spec.to_check(service))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ServiceOrigin;

    fn service() -> Service {
        Service::new("web-1", "web")
            .with_address("192.168.1.10", 8080)
            .with_origin(ServiceOrigin {
                container_id: "0123456789abcdef0123".to_string(),
                exposed_port: "80".to_string(),
                host_ip: "10.0.0.1".to_string(),
                host_port: "8080".to_string(),
            })
    }

    #[test]
    fn test_http_check_with_timeout() {
        let svc = service()
            .with_attr("check_http", "/health")
            .with_attr("check_timeout", "3s");

        let check = HealthCheck::for_service(&svc).unwrap();
        assert_eq!(check.http.as_deref(), Some("http://192.168.1.10:8080/health"));
        assert_eq!(check.timeout.as_deref(), Some("3s"));
        assert_eq!(check.interval.as_deref(), Some(DEFAULT_INTERVAL));
        assert!(check.script.is_none());
        assert!(check.ttl.is_none());
    }

    #[test]
    fn test_http_wins_over_cmd() {
        let svc = service()
            .with_attr("check_cmd", "/bin/true")
            .with_attr("check_http", "/ping");

        let check = HealthCheck::for_service(&svc).unwrap();
        assert!(check.http.is_some());
        assert!(check.script.is_none());
    }

    #[test]
    fn test_cmd_check_uses_short_container_id() {
        let svc = service()
            .with_attr("check_cmd", "/bin/check --fast")
            .with_attr("check_interval", "30s");

        let check = HealthCheck::for_service(&svc).unwrap();
        assert_eq!(
            check.script.as_deref(),
            Some("check-cmd 0123456789ab 80 /bin/check --fast")
        );
        assert_eq!(check.interval.as_deref(), Some("30s"));
    }

    #[test]
    fn test_cmd_check_with_short_container_id() {
        let mut svc = service().with_attr("check_cmd", "true");
        svc.origin.container_id = "abc".to_string();

        let check = HealthCheck::for_service(&svc).unwrap();
        assert_eq!(check.script.as_deref(), Some("check-cmd abc 80 true"));
    }

    #[test]
    fn test_cmd_wins_over_script() {
        let svc = service()
            .with_attr("check_script", "ping $SERVICE_IP")
            .with_attr("check_cmd", "true");

        let check = HealthCheck::for_service(&svc).unwrap();
        assert!(check.script.unwrap().starts_with("check-cmd "));
    }

    #[test]
    fn test_script_interpolation() {
        let svc = service().with_attr("check_script", "ping $SERVICE_IP:$SERVICE_PORT");

        let check = HealthCheck::for_service(&svc).unwrap();
        assert_eq!(check.script.as_deref(), Some("ping 10.0.0.1:8080"));
        assert_eq!(check.interval.as_deref(), Some("10s"));
    }

    #[test]
    fn test_script_replaces_every_occurrence() {
        let svc = service().with_attr(
            "check_script",
            "a $SERVICE_IP b $SERVICE_IP c $SERVICE_PORT $SERVICE_PORT",
        );

        let check = HealthCheck::for_service(&svc).unwrap();
        assert_eq!(
            check.script.as_deref(),
            Some("a 10.0.0.1 b 10.0.0.1 c 8080 8080")
        );
    }

    #[test]
    fn test_ttl_check_has_no_interval() {
        let svc = service()
            .with_attr("check_ttl", "30s")
            .with_attr("check_interval", "5s");

        let check = HealthCheck::for_service(&svc).unwrap();
        assert_eq!(check.ttl.as_deref(), Some("30s"));
        assert!(check.interval.is_none());
        assert!(check.http.is_none());
        assert!(check.script.is_none());
    }

    #[test]
    fn test_no_check_attributes() {
        let svc = service()
            .with_attr("check_interval", "5s")
            .with_attr("check_timeout", "1s")
            .with_attr("version", "2");

        assert!(CheckSpec::from_service(&svc).is_none());
        assert!(HealthCheck::for_service(&svc).is_none());
    }

    #[test]
    fn test_empty_check_attribute_falls_through() {
        let svc = service()
            .with_attr("check_http", "")
            .with_attr("check_ttl", "15s");

        let spec = CheckSpec::from_service(&svc).unwrap();
        assert_eq!(spec.kind, CheckKind::Ttl("15s".to_string()));
    }

    #[test]
    fn test_check_wire_format() {
        let svc = service().with_attr("check_http", "/health");
        let check = HealthCheck::for_service(&svc).unwrap();

        let json = serde_json::to_value(&check).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "HTTP": "http://192.168.1.10:8080/health",
                "Interval": "10s"
            })
        );
    }
}
