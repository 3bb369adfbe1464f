//! Cache behaviors and their edge associations.
//!
//! A behavior's request transform is derived from its kind alone:
//!
//! | Kind     | Request transform                               |
//! |----------|-------------------------------------------------|
//! | `static` | percent-encode each URI segment, then injections |
//! | `server` | forward `Host` as `x-forwarded-host`, then injections |

use serde::Serialize;
use serde_json::Value;

use super::{FunctionRef, OriginRef, PathPattern};
use crate::embed::{STATIC_REQUEST_JS, SERVER_REQUEST_JS, TransformVars};

/// Statement prepended to every static request transform.
pub const URL_ENCODE_INJECTION: &str =
    r#"request.uri = request.uri.split("/").map(encodeURIComponent).join("/");"#;

/// Statement that opens every server request transform.
pub const FORWARD_HOST_INJECTION: &str =
    r#"request.headers["x-forwarded-host"] = request.headers.host;"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BehaviorKind {
    Static,
    Server,
}

impl BehaviorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Server => "server",
        }
    }
}

impl std::fmt::Display for BehaviorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CDN request lifecycle points a function can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeEvent {
    ViewerRequest,
    OriginRequest,
}

/// Lightweight CDN function rewriting the viewer request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestTransform {
    pub name: String,
    pub code: String,
}

impl RequestTransform {
    /// The transform for a behavior kind with user injections appended.
    pub fn for_kind(kind: BehaviorKind, injections: &[String]) -> Self {
        let (lead, template) = match kind {
            BehaviorKind::Static => (URL_ENCODE_INJECTION, STATIC_REQUEST_JS),
            BehaviorKind::Server => (FORWARD_HOST_INJECTION, SERVER_REQUEST_JS),
        };
        let statements: Vec<&str> = std::iter::once(lead)
            .chain(injections.iter().map(String::as_str))
            .collect();

        Self {
            name: format!("{kind}-request"),
            code: template.render(&TransformVars {
                injections: &statements,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AssociationTarget {
    Transform(RequestTransform),
    EdgeFunction { function: FunctionRef },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Association {
    pub event: EdgeEvent,
    #[serde(flatten)]
    pub target: AssociationTarget,
}

impl Association {
    pub fn transform(transform: RequestTransform) -> Self {
        Self {
            event: EdgeEvent::ViewerRequest,
            target: AssociationTarget::Transform(transform),
        }
    }

    pub fn edge_function(function: FunctionRef) -> Self {
        Self {
            event: EdgeEvent::OriginRequest,
            target: AssociationTarget::EdgeFunction { function },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AllowedMethods {
    /// GET, HEAD, OPTIONS
    ReadOnly,
    /// GET, HEAD, OPTIONS, PUT, PATCH, POST, DELETE
    All,
}

/// Cache key and TTL settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CachePolicy {
    pub name: String,
    pub min_ttl: u64,
    pub default_ttl: u64,
    pub max_ttl: u64,
    /// Headers included in the cache key (and forwarded).
    pub headers: Vec<String>,
    pub query_strings: bool,
    pub cookies: bool,
    pub compress: bool,
}

impl CachePolicy {
    const YEAR: u64 = 31_536_000;

    /// Long-lived caching of storage objects; the key is the path only.
    pub fn static_assets() -> Self {
        Self {
            name: "static-assets".to_string(),
            min_ttl: 1,
            default_ttl: 86_400,
            max_ttl: Self::YEAR,
            headers: Vec::new(),
            query_strings: false,
            cookies: false,
            compress: true,
        }
    }

    /// Server responses are cached only when they say so.
    pub fn server(headers: &[String]) -> Self {
        Self {
            name: "server".to_string(),
            min_ttl: 0,
            default_ttl: 0,
            max_ttl: Self::YEAR,
            headers: headers.to_vec(),
            query_strings: true,
            cookies: false,
            compress: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Behavior {
    pub pattern: PathPattern,
    pub kind: BehaviorKind,
    pub origin: OriginRef,
    pub methods: AllowedMethods,
    pub cache_policy: CachePolicy,
    pub associations: Vec<Association>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<Value>,
}

impl Behavior {
    /// A static route served from storage.
    pub fn static_route(pattern: PathPattern, origin: OriginRef, injections: &[String]) -> Self {
        Self {
            pattern,
            kind: BehaviorKind::Static,
            origin,
            methods: AllowedMethods::ReadOnly,
            cache_policy: CachePolicy::static_assets(),
            associations: vec![Association::transform(RequestTransform::for_kind(
                BehaviorKind::Static,
                injections,
            ))],
            transform: None,
        }
    }

    /// The default behavior routing everything else to the server.
    pub fn catch_all(
        origin: OriginRef,
        edge_function: Option<FunctionRef>,
        injections: &[String],
        cache_headers: &[String],
    ) -> Self {
        let mut associations = vec![Association::transform(RequestTransform::for_kind(
            BehaviorKind::Server,
            injections,
        ))];
        associations.extend(edge_function.map(Association::edge_function));

        Self {
            pattern: PathPattern::CatchAll,
            kind: BehaviorKind::Server,
            origin,
            methods: AllowedMethods::All,
            cache_policy: CachePolicy::server(cache_headers),
            associations,
            transform: None,
        }
    }

    pub fn with_transform(mut self, transform: Option<Value>) -> Self {
        self.transform = transform;
        self
    }

    /// The edge function invoked for this behavior, if any.
    pub fn edge_function(&self) -> Option<&FunctionRef> {
        self.associations.iter().find_map(|a| match &a.target {
            AssociationTarget::EdgeFunction { function } => Some(function),
            AssociationTarget::Transform(_) => None,
        })
    }

    pub fn request_transform(&self) -> Option<&RequestTransform> {
        self.associations.iter().find_map(|a| match &a.target {
            AssociationTarget::Transform(t) => Some(t),
            AssociationTarget::EdgeFunction { .. } => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_transform_starts_with_url_encoding() {
        let injections = vec!["request.headers[\"x-test\"] = {value: \"1\"};".to_string()];
        let transform = RequestTransform::for_kind(BehaviorKind::Static, &injections);

        let encode_at = transform.code.find(URL_ENCODE_INJECTION).unwrap();
        let user_at = transform.code.find("x-test").unwrap();
        assert!(encode_at < user_at);
        assert_eq!(transform.name, "static-request");
    }

    #[test]
    fn test_transform_is_pure_function_of_kind() {
        let a = RequestTransform::for_kind(BehaviorKind::Server, &[]);
        let b = RequestTransform::for_kind(BehaviorKind::Server, &[]);
        assert_eq!(a, b);
        assert!(a.code.contains(FORWARD_HOST_INJECTION));
        assert!(!a.code.contains(URL_ENCODE_INJECTION));
    }

    #[test]
    fn test_catch_all_associations() {
        let regional = Behavior::catch_all(OriginRef::new("server"), None, &[], &[]);
        assert_eq!(regional.associations.len(), 1);
        assert!(regional.edge_function().is_none());

        let edge = Behavior::catch_all(
            OriginRef::new("assets"),
            Some(FunctionRef::new("server")),
            &[],
            &[],
        );
        assert_eq!(edge.associations.len(), 2);
        assert_eq!(edge.edge_function(), Some(&FunctionRef::new("server")));
        assert!(edge.request_transform().is_some());
    }
}
