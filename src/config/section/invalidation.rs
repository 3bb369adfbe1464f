//! `[invalidation]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [invalidation]
//! paths = "all"           # or ["/index.html", "/blog/*"]
//! wait = false            # Block the deploy until the CDN confirms
//! timeout = 600           # seconds, wait mode only
//! poll_interval = 5       # seconds, wait mode only
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::plan::{InvalidationPaths, InvalidationPolicy};
use crate::sync::WaitOptions;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvalidationConfig {
    pub paths: InvalidationPaths,
    pub wait: bool,
    pub timeout: u64,
    pub poll_interval: u64,
}

impl Default for InvalidationConfig {
    fn default() -> Self {
        let wait = WaitOptions::default();
        Self {
            paths: InvalidationPaths::All,
            wait: false,
            timeout: wait.timeout.as_secs(),
            poll_interval: wait.poll_interval.as_secs(),
        }
    }
}

pub struct InvalidationFields {
    pub paths: FieldPath,
    pub timeout: FieldPath,
    pub poll_interval: FieldPath,
}

impl InvalidationConfig {
    pub const FIELDS: InvalidationFields = InvalidationFields {
        paths: FieldPath::new("invalidation.paths"),
        timeout: FieldPath::new("invalidation.timeout"),
        poll_interval: FieldPath::new("invalidation.poll_interval"),
    };

    pub fn policy(&self) -> InvalidationPolicy {
        InvalidationPolicy {
            paths: self.paths.clone(),
            wait: self.wait,
        }
    }

    pub fn wait_options(&self) -> WaitOptions {
        WaitOptions {
            timeout: Duration::from_secs(self.timeout),
            poll_interval: Duration::from_secs(self.poll_interval),
        }
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        let fields = &Self::FIELDS;

        if let InvalidationPaths::List(paths) = &self.paths {
            if paths.is_empty() {
                diag.error_with_hint(fields.paths, "empty path list", "use paths = \"all\"");
            }
            for path in paths {
                if path.trim().is_empty() || path.chars().any(char::is_whitespace) {
                    diag.error(fields.paths, format!("`{path}` is not a valid path"));
                }
            }
        }

        if self.timeout == 0 {
            diag.error(fields.timeout, "must be at least 1 second");
        }
        if self.poll_interval == 0 {
            diag.error(fields.poll_interval, "must be at least 1 second");
        } else if self.poll_interval > self.timeout {
            diag.warn(fields.poll_interval, "longer than the timeout, status is polled once");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_invalidation_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.invalidation.policy(), InvalidationPolicy::default());
        assert_eq!(config.invalidation.wait_options(), WaitOptions::default());
    }

    #[test]
    fn test_path_list() {
        let config =
            test_parse_config("[invalidation]\npaths = [\"/index.html\", \"blog/*\"]\nwait = true");
        let policy = config.invalidation.policy();
        assert!(policy.wait);
        assert_eq!(policy.paths.to_cdn_paths(), ["/index.html", "/blog/*"]);
    }

    #[test]
    fn test_unknown_keyword_is_a_parse_error() {
        let result: Result<crate::config::SiteConfig, _> =
            toml::from_str("[invalidation]\npaths = \"some\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate() {
        let config =
            test_parse_config("[invalidation]\npaths = []\ntimeout = 0\npoll_interval = 0");
        let mut diag = ConfigDiagnostics::new();
        config.invalidation.validate(&mut diag);
        assert_eq!(diag.len(), 3);
    }

    #[test]
    fn test_wait_options_from_seconds() {
        let config = test_parse_config("[invalidation]\ntimeout = 30\npoll_interval = 2");
        let wait = config.invalidation.wait_options();
        assert_eq!(wait.timeout, Duration::from_secs(30));
        assert_eq!(wait.poll_interval, Duration::from_secs(2));
    }
}
