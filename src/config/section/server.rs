//! `[server]` section configuration.
//!
//! Settings for the server-rendering function and its request transform.
//!
//! # Example
//!
//! ```toml
//! [server]
//! memory = 1024                  # MB
//! timeout = 20                   # seconds
//! architecture = "arm64"         # x86_64 | arm64
//! cache_headers = ["x-locale"]   # Forwarded to the server, part of the cache key
//! injection = ['request.headers["x-edge"] = { value: "1" };']
//!
//! [server.environment]
//! SESSION_SECRET = "..."
//! ```

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::plan::{Architecture, FunctionSettings};

const MEMORY_MB: RangeInclusive<u32> = 128..=10240;
const TIMEOUT_SECS: RangeInclusive<u32> = 1..=900;
const EDGE_TIMEOUT_SECS: RangeInclusive<u32> = 1..=30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub memory: u32,
    pub timeout: u32,
    pub architecture: Architecture,
    pub environment: BTreeMap<String, String>,
    pub cache_headers: Vec<String>,
    /// JS statements added to the server request transform.
    pub injection: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let settings = FunctionSettings::default();
        Self {
            memory: settings.memory_mb,
            timeout: settings.timeout_secs,
            architecture: settings.architecture,
            environment: BTreeMap::new(),
            cache_headers: Vec::new(),
            injection: Vec::new(),
        }
    }
}

pub struct ServerFields {
    pub memory: FieldPath,
    pub timeout: FieldPath,
    pub architecture: FieldPath,
    pub environment: FieldPath,
    pub cache_headers: FieldPath,
}

impl ServerConfig {
    pub const FIELDS: ServerFields = ServerFields {
        memory: FieldPath::new("server.memory"),
        timeout: FieldPath::new("server.timeout"),
        architecture: FieldPath::new("server.architecture"),
        environment: FieldPath::new("server.environment"),
        cache_headers: FieldPath::new("server.cache_headers"),
    };

    pub fn function_settings(&self) -> FunctionSettings {
        FunctionSettings {
            memory_mb: self.memory,
            timeout_secs: self.timeout,
            architecture: self.architecture,
            environment: self.environment.clone(),
        }
    }

    /// Header names, lowercased and deduplicated in first-seen order.
    pub fn cache_header_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::with_capacity(self.cache_headers.len());
        for header in &self.cache_headers {
            let header = header.trim().to_ascii_lowercase();
            if !names.contains(&header) {
                names.push(header);
            }
        }
        names
    }

    pub fn validate(&self, edge: bool, diag: &mut ConfigDiagnostics) {
        let fields = &Self::FIELDS;

        if !MEMORY_MB.contains(&self.memory) {
            diag.error(
                fields.memory,
                format!(
                    "{} MB is outside {}..={} MB",
                    self.memory,
                    MEMORY_MB.start(),
                    MEMORY_MB.end()
                ),
            );
        }

        let timeouts = if edge { EDGE_TIMEOUT_SECS } else { TIMEOUT_SECS };
        if !timeouts.contains(&self.timeout) {
            let message = format!(
                "{}s is outside {}..={}s",
                self.timeout,
                timeouts.start(),
                timeouts.end()
            );
            if edge {
                diag.error_with_hint(fields.timeout, message, "edge functions run at most 30s");
            } else {
                diag.error(fields.timeout, message);
            }
        }

        if edge && !self.environment.is_empty() {
            diag.error_with_hint(
                fields.environment,
                "edge functions do not support environment variables",
                "remove [server.environment] or set site.edge = false",
            );
        }

        if edge && self.architecture != Architecture::X86_64 {
            diag.error(fields.architecture, "edge functions only run on x86_64");
        }

        for header in &self.cache_headers {
            if !is_header_name(header.trim()) {
                diag.error(fields.cache_headers, format!("`{header}` is not a valid header name"));
            }
        }
    }
}

/// RFC 9110 token characters.
fn is_header_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    fn errors(server: &ServerConfig, edge: bool) -> ConfigDiagnostics {
        let mut diag = ConfigDiagnostics::new();
        server.validate(edge, &mut diag);
        diag
    }

    #[test]
    fn test_server_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.server.memory, 1024);
        assert_eq!(config.server.timeout, 20);
        assert_eq!(config.server.architecture, Architecture::X86_64);
        assert!(errors(&config.server, false).is_empty());
        assert!(errors(&config.server, true).is_empty());
    }

    #[test]
    fn test_server_full() {
        let config = test_parse_config(
            "[server]\nmemory = 2048\ntimeout = 60\narchitecture = \"arm64\"\ncache_headers = [\"X-Locale\", \"x-locale\"]\ninjection = [\"a();\"]\n[server.environment]\nKEY = \"v\"",
        );
        let settings = config.server.function_settings();
        assert_eq!(settings.memory_mb, 2048);
        assert_eq!(settings.architecture, Architecture::Arm64);
        assert_eq!(settings.environment["KEY"], "v");
        assert_eq!(config.server.cache_header_names(), ["x-locale"]);
        assert_eq!(config.server.injection, ["a();"]);
    }

    #[test]
    fn test_memory_bounds() {
        let config = test_parse_config("[server]\nmemory = 64");
        assert!(errors(&config.server, false).has(ServerConfig::FIELDS.memory));

        let config = test_parse_config("[server]\nmemory = 10240");
        assert!(errors(&config.server, false).is_empty());
    }

    #[test]
    fn test_edge_timeout_is_tighter() {
        let config = test_parse_config("[server]\ntimeout = 60");
        assert!(errors(&config.server, false).is_empty());
        assert!(errors(&config.server, true).has(ServerConfig::FIELDS.timeout));
    }

    #[test]
    fn test_edge_rejects_environment_and_arm() {
        let config =
            test_parse_config("[server]\narchitecture = \"arm64\"\n[server.environment]\nA = \"1\"");
        let diag = errors(&config.server, true);
        assert!(diag.has(ServerConfig::FIELDS.environment));
        assert!(diag.has(ServerConfig::FIELDS.architecture));
        assert!(errors(&config.server, false).is_empty());
    }

    #[test]
    fn test_bad_header_name() {
        let config = test_parse_config("[server]\ncache_headers = [\"x locale\", \"\"]");
        assert_eq!(errors(&config.server, false).len(), 2);
    }
}
