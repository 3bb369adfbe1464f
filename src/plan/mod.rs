//! Deployment plan model.
//!
//! # Module Structure
//!
//! ```text
//! plan/
//! ├── pattern    # PathPattern (exact / prefix / catch-all)
//! ├── origin     # Origin (storage | function)
//! ├── function   # Function, ServerWrapper, FunctionSettings
//! ├── behavior   # Behavior, CachePolicy, edge associations
//! ├── builder    # BuildMetadata + options -> Plan
//! ├── validate   # Plan -> ValidatedPlan | PlanDiagnostics
//! └── metadata   # SiteMetadata (`_metadata` record)
//! ```
//!
//! Origins and functions are ordered lists addressed by name through
//! [`OriginRef`] and [`FunctionRef`]. Behaviors are an ordered list; the
//! catch-all is the last element.

mod behavior;
mod builder;
mod function;
mod metadata;
mod origin;
mod pattern;
mod validate;

pub use behavior::{
    AllowedMethods, AssociationTarget, Behavior, BehaviorKind, CachePolicy, EdgeEvent,
    RequestTransform,
};
pub use builder::{BuildOptions, PlanBuilder, Transforms};
pub use function::{Architecture, Function, FunctionSettings, Runtime, ServerWrapper};
pub use metadata::SiteMetadata;
pub use origin::{Origin, OriginKind};
pub use pattern::PathPattern;
pub use validate::{PlanDiagnostics, ValidatedPlan, check, validate};

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};
use serde_json::Value;

use crate::layout::SiteMode;

/// Name of the storage origin every plan carries.
pub const STORAGE_ORIGIN: &str = "assets";

/// Name of the server function (and of its origin in regional mode).
pub const SERVER: &str = "server";

// ============================================================================
// References
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct OriginRef(String);

impl OriginRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OriginRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FunctionRef(String);

impl FunctionRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FunctionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Invalidation / domain
// ============================================================================

/// `paths = "all"` or `paths = ["/index.html", "blog/*"]`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InvalidationPaths {
    #[default]
    All,
    List(Vec<String>),
}

impl InvalidationPaths {
    /// CDN invalidation paths, each with a leading `/`.
    pub fn to_cdn_paths(&self) -> Vec<String> {
        match self {
            Self::All => vec!["/*".to_string()],
            Self::List(paths) => paths
                .iter()
                .map(|p| format!("/{}", p.trim_start_matches('/')))
                .collect(),
        }
    }
}

impl Serialize for InvalidationPaths {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::All => serializer.serialize_str("all"),
            Self::List(paths) => paths.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for InvalidationPaths {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Keyword(String),
            List(Vec<String>),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Keyword(s) if s == "all" => Ok(Self::All),
            Raw::Keyword(s) => Err(D::Error::custom(format!(
                "expected \"all\" or a list of paths, found \"{s}\""
            ))),
            Raw::List(paths) => Ok(Self::List(paths)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct InvalidationPolicy {
    pub paths: InvalidationPaths,
    pub wait: bool,
}

/// Custom domain, passed through to the distribution untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainAlias {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

// ============================================================================
// Plan
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    pub mode: SiteMode,
    pub edge_mode: bool,
    pub origins: Vec<Origin>,
    pub functions: Vec<Function>,
    pub behaviors: Vec<Behavior>,
    pub invalidation: InvalidationPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<DomainAlias>,
    /// Distribution-level pass-through.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<Value>,
}

impl Plan {
    /// An empty plan; the builder fills it step by step.
    pub fn empty(mode: SiteMode, edge_mode: bool) -> Self {
        Self {
            mode,
            edge_mode,
            origins: Vec::new(),
            functions: Vec::new(),
            behaviors: Vec::new(),
            invalidation: InvalidationPolicy::default(),
            domain: None,
            transform: None,
        }
    }

    pub fn origin(&self, r: &OriginRef) -> Option<&Origin> {
        self.origins.iter().find(|o| o.name == r.as_str())
    }

    pub fn function(&self, r: &FunctionRef) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == r.as_str())
    }

    /// The first storage origin (every built plan has exactly one).
    pub fn storage_origin(&self) -> Option<&Origin> {
        self.origins.iter().find(|o| o.is_storage())
    }

    #[cfg(test)]
    pub fn catch_all(&self) -> Option<&Behavior> {
        self.behaviors.iter().find(|b| b.pattern.is_catch_all())
    }

    pub fn edge_functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter().filter(|f| f.is_edge())
    }

    pub fn regional_functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter().filter(|f| !f.is_edge())
    }

    /// Pretty JSON for `plan --json`.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Wrapper {
        paths: InvalidationPaths,
    }

    #[test]
    fn test_invalidation_paths_parse() {
        let all: Wrapper = toml::from_str("paths = \"all\"").unwrap();
        assert_eq!(all.paths, InvalidationPaths::All);

        let list: Wrapper = toml::from_str("paths = [\"/index.html\", \"about/*\"]").unwrap();
        assert_eq!(
            list.paths.to_cdn_paths(),
            vec!["/index.html".to_string(), "/about/*".to_string()]
        );

        assert!(toml::from_str::<Wrapper>("paths = \"some\"").is_err());
    }

    #[test]
    fn test_invalidation_all_is_wildcard() {
        assert_eq!(InvalidationPaths::All.to_cdn_paths(), vec!["/*".to_string()]);
        assert_eq!(
            serde_json::to_string(&InvalidationPaths::All).unwrap(),
            "\"all\""
        );
    }
}
