//! `[domain]` section configuration.
//!
//! Passed through to the distribution; DNS and certificates are managed
//! elsewhere.
//!
//! ```toml
//! [domain]
//! name = "example.com"
//! aliases = ["www.example.com"]
//! ```

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::plan::DomainAlias;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainConfig {
    pub name: Option<String>,
    pub aliases: Vec<String>,
}

pub struct DomainFields {
    pub name: FieldPath,
    pub aliases: FieldPath,
}

impl DomainConfig {
    pub const FIELDS: DomainFields = DomainFields {
        name: FieldPath::new("domain.name"),
        aliases: FieldPath::new("domain.aliases"),
    };

    pub fn alias(&self) -> Option<DomainAlias> {
        self.name.as_ref().map(|name| DomainAlias {
            name: name.clone(),
            aliases: self.aliases.clone(),
        })
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        let fields = &Self::FIELDS;

        match &self.name {
            Some(name) if !is_hostname(name) => {
                diag.error_with_hint(
                    fields.name,
                    format!("`{name}` is not a hostname"),
                    "give the bare host, without scheme or path",
                );
            }
            Some(_) => {}
            None if !self.aliases.is_empty() => {
                diag.warn(fields.aliases, "ignored without domain.name");
            }
            None => {}
        }

        for alias in &self.aliases {
            if !is_hostname(alias) {
                diag.error(fields.aliases, format!("`{alias}` is not a hostname"));
            }
        }
    }
}

fn is_hostname(host: &str) -> bool {
    !host.is_empty()
        && !host.contains("://")
        && matches!(url::Host::parse(host), Ok(url::Host::Domain(_)))
}
