//! Key layout for service metadata
//!
//! Each attribute of a service is stored under
//! `{prefix}/{service name}/{attribute}`. The KV namespace rejects keys with a
//! leading separator, so the joined base path has it stripped.

use serde::{Deserialize, Serialize};

const SEPARATOR: char = '/';

/// Configured key prefix under which service metadata is nested
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyPrefix(String);

impl KeyPrefix {
    /// Wrap a raw prefix, usually the path of the adapter URI
    pub fn new(prefix: impl Into<String>) -> Self {
        Self(prefix.into())
    }

    /// The prefix as configured
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Base path for a service's metadata, without a leading separator
    pub fn base_path(&self, service_name: &str) -> String {
        let joined = join(&[self.0.as_str(), service_name]);
        match joined.strip_prefix(SEPARATOR) {
            Some(stripped) => stripped.to_string(),
            None => joined,
        }
    }

    /// Key holding one attribute of a service
    pub fn key(&self, service_name: &str, attribute: &str) -> String {
        join(&[self.base_path(service_name).as_str(), attribute])
    }

    /// Subtree covering every attribute of a service, with trailing separator
    pub fn subtree(&self, service_name: &str) -> String {
        let mut base = self.base_path(service_name);
        base.push(SEPARATOR);
        base
    }
}

impl std::fmt::Display for KeyPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for KeyPrefix {
    fn from(prefix: &str) -> Self {
        Self::new(prefix)
    }
}

/// Join path elements with `/` and clean the result.
///
/// Empty elements are ignored; an all-empty input yields an empty string.
pub fn join(elements: &[&str]) -> String {
    let non_empty: Vec<&str> = elements.iter().copied().filter(|e| !e.is_empty()).collect();
    if non_empty.is_empty() {
        return String::new();
    }
    clean(&non_empty.join("/"))
}

/// Lexically clean a slash-separated path: collapse repeated separators,
/// drop `.` segments and resolve `..` against preceding segments.
pub fn clean(path: &str) -> String {
    let rooted = path.starts_with(SEPARATOR);
    let mut out: Vec<&str> = Vec::new();

    for segment in path.split(SEPARATOR) {
        match segment {
            "" | "." => {}
            ".." => match out.last() {
                Some(&last) if last != ".." => {
                    out.pop();
                }
                _ if !rooted => out.push(".."),
                _ => {}
            },
            other => out.push(other),
        }
    }

    let body = out.join("/");
    match (rooted, body.is_empty()) {
        (true, _) => format!("/{}", body),
        (false, true) => ".".to_string(),
        (false, false) => body,
    }
}
