//! BuildMetadata + options -> Plan.
//!
//! Every step takes the plan by value and returns the next one, so each
//! intermediate state is an ordinary value that can be inspected in tests.
//!
//! ```text
//! empty ─▶ storage ─▶ server ─▶ static routes ─▶ catch-all ─▶ Plan
//! ```

use serde_json::Value;

use super::{
    Behavior, DomainAlias, Function, FunctionRef, FunctionSettings, InvalidationPolicy, Origin,
    OriginRef, Plan, SERVER, STORAGE_ORIGIN, ServerWrapper,
};
use crate::layout::BuildMetadata;

/// Opaque per-resource overrides copied from `[transform]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transforms {
    pub server: Option<Value>,
    pub assets: Option<Value>,
    pub distribution: Option<Value>,
    /// Copied onto every static behavior.
    pub static_behaviors: Option<Value>,
    /// Copied onto the catch-all.
    pub server_behavior: Option<Value>,
}

/// Everything the builder needs besides the build output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildOptions {
    pub edge_mode: bool,
    /// Statements appended to the static request transform.
    pub static_injections: Vec<String>,
    /// Statements appended to the server request transform.
    pub server_injections: Vec<String>,
    pub function: FunctionSettings,
    pub region: Option<String>,
    /// Headers forwarded to the server and part of its cache key.
    pub cache_headers: Vec<String>,
    pub invalidation: InvalidationPolicy,
    pub domain: Option<DomainAlias>,
    pub transforms: Transforms,
}

pub struct PlanBuilder<'a> {
    metadata: &'a BuildMetadata,
    options: &'a BuildOptions,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(metadata: &'a BuildMetadata, options: &'a BuildOptions) -> Self {
        Self { metadata, options }
    }

    /// Run every step. Total: the result always has a catch-all.
    pub fn build(&self) -> Plan {
        let wrapper = ServerWrapper::select(self.options.edge_mode);
        let plan = Plan::empty(self.metadata.mode, self.options.edge_mode);

        let plan = self.register_storage(plan);
        let plan = self.register_server(plan, wrapper);
        let plan = self.add_static_routes(plan);
        let plan = self.add_catch_all(plan);
        self.attach_policies(plan)
    }

    fn register_storage(&self, mut plan: Plan) -> Plan {
        plan.origins.push(
            Origin::storage(STORAGE_ORIGIN).with_transform(self.options.transforms.assets.clone()),
        );
        plan
    }

    /// Edge: one edge function, no server origin. Regional: a function
    /// plus the origin that fronts it.
    fn register_server(&self, mut plan: Plan, wrapper: ServerWrapper) -> Plan {
        let function = Function::server(
            SERVER,
            wrapper,
            self.metadata.server.clone(),
            self.options.region.clone(),
            self.options.function.clone(),
        )
        .with_transform(self.options.transforms.server.clone());

        if !function.is_edge() {
            plan.origins
                .push(Origin::function(SERVER, FunctionRef::new(SERVER)));
        }
        plan.functions.push(function);
        plan
    }

    fn add_static_routes(&self, mut plan: Plan) -> Plan {
        let storage = OriginRef::new(STORAGE_ORIGIN);
        plan.behaviors
            .extend(self.metadata.static_routes.iter().map(|pattern| {
                Behavior::static_route(
                    pattern.clone(),
                    storage.clone(),
                    &self.options.static_injections,
                )
                .with_transform(self.options.transforms.static_behaviors.clone())
            }));
        plan
    }

    fn add_catch_all(&self, mut plan: Plan) -> Plan {
        let (origin, edge_function) = if plan.edge_mode {
            (OriginRef::new(STORAGE_ORIGIN), Some(FunctionRef::new(SERVER)))
        } else {
            (OriginRef::new(SERVER), None)
        };

        plan.behaviors.push(
            Behavior::catch_all(
                origin,
                edge_function,
                &self.options.server_injections,
                &self.options.cache_headers,
            )
            .with_transform(self.options.transforms.server_behavior.clone()),
        );
        plan
    }

    fn attach_policies(&self, mut plan: Plan) -> Plan {
        plan.invalidation = self.options.invalidation.clone();
        plan.domain = self.options.domain.clone();
        plan.transform = self.options.transforms.distribution.clone();
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{ServerEntry, SiteMode};
    use crate::plan::{BehaviorKind, OriginKind, PathPattern, Runtime};
    use std::path::PathBuf;

    fn metadata(routes: Vec<PathPattern>) -> BuildMetadata {
        BuildMetadata {
            mode: SiteMode::Deployed,
            assets_path: PathBuf::from("/app/build/client"),
            assets_versioned_sub_dir: Some(PathBuf::from("assets")),
            static_routes: routes,
            server: ServerEntry {
                dir: PathBuf::from("/app/build/server"),
                module: "index.js".to_string(),
            },
        }
    }

    fn shape(plan: &Plan) -> Vec<String> {
        plan.behaviors
            .iter()
            .map(|b| format!("{}:{}", b.kind, b.pattern))
            .collect()
    }

    #[test]
    fn test_favicon_and_assets_scenario() {
        let meta = metadata(vec![PathPattern::file("favicon.ico"), PathPattern::dir("assets")]);
        let plan = PlanBuilder::new(&meta, &BuildOptions::default()).build();

        assert_eq!(
            shape(&plan),
            ["static:favicon.ico", "static:assets/*", "server:*"]
        );
        assert!(!plan.edge_mode);
    }

    #[test]
    fn test_n_static_plus_one_catch_all() {
        for n in 0..6 {
            let routes = (0..n).map(|i| PathPattern::file(format!("f{i}.txt"))).collect();
            let plan = PlanBuilder::new(&metadata(routes), &BuildOptions::default()).build();

            assert_eq!(plan.behaviors.len(), n + 1);
            assert_eq!(plan.behaviors.iter().filter(|b| b.kind == BehaviorKind::Static).count(), n);
            let last = plan.behaviors.last().unwrap();
            assert!(last.pattern.is_catch_all());
            assert_eq!(last.kind, BehaviorKind::Server);
        }
    }

    #[test]
    fn test_regional_mode() {
        let meta = metadata(vec![PathPattern::dir("assets")]);
        let plan = PlanBuilder::new(&meta, &BuildOptions::default()).build();

        assert_eq!(plan.origins.len(), 2);
        let server_origin = plan.origin(&OriginRef::new(SERVER)).unwrap();
        assert_eq!(
            server_origin.kind,
            OriginKind::Function {
                function: FunctionRef::new(SERVER)
            }
        );
        assert_eq!(plan.functions.len(), 1);
        assert_eq!(plan.functions[0].runtime, Runtime::Regional);

        let catch_all = plan.catch_all().unwrap();
        assert_eq!(catch_all.origin, OriginRef::new(SERVER));
        assert!(catch_all.edge_function().is_none());
    }

    #[test]
    fn test_edge_mode() {
        let meta = metadata(vec![PathPattern::dir("assets")]);
        let options = BuildOptions {
            edge_mode: true,
            ..BuildOptions::default()
        };
        let plan = PlanBuilder::new(&meta, &options).build();

        assert_eq!(plan.edge_functions().count(), 1);
        assert_eq!(plan.edge_functions().next().unwrap().name, SERVER);
        assert!(plan.origins.iter().all(Origin::is_storage));

        let catch_all = plan.catch_all().unwrap();
        assert_eq!(catch_all.edge_function(), Some(&FunctionRef::new(SERVER)));
        assert_eq!(catch_all.origin, OriginRef::new(STORAGE_ORIGIN));
    }

    #[test]
    fn test_injections_reach_transforms() {
        let meta = metadata(vec![PathPattern::dir("assets")]);
        let options = BuildOptions {
            static_injections: vec!["/* static */".into()],
            server_injections: vec!["/* server */".into()],
            ..BuildOptions::default()
        };
        let plan = PlanBuilder::new(&meta, &options).build();

        let static_code = &plan.behaviors[0].request_transform().unwrap().code;
        let server_code = &plan.catch_all().unwrap().request_transform().unwrap().code;
        assert!(static_code.contains("/* static */"));
        assert!(!static_code.contains("/* server */"));
        assert!(server_code.contains("/* server */"));
    }

    #[test]
    fn test_build_is_deterministic() {
        let meta = metadata(vec![PathPattern::file("robots.txt"), PathPattern::dir("_app")]);
        let options = BuildOptions {
            transforms: Transforms {
                distribution: Some(serde_json::json!({ "priceClass": "PriceClass_100" })),
                ..Transforms::default()
            },
            ..BuildOptions::default()
        };
        let a = PlanBuilder::new(&meta, &options).build();
        let b = PlanBuilder::new(&meta, &options).build();

        assert_eq!(a, b);
        assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
        assert!(a.transform.is_some());
    }

    #[test]
    fn test_behavior_transforms_by_kind() {
        let meta = metadata(vec![PathPattern::file("robots.txt"), PathPattern::dir("_app")]);
        let options = BuildOptions {
            transforms: Transforms {
                static_behaviors: Some(serde_json::json!({ "compress": false })),
                server_behavior: Some(serde_json::json!({ "realtimeLogs": true })),
                ..Transforms::default()
            },
            ..BuildOptions::default()
        };
        let plan = PlanBuilder::new(&meta, &options).build();

        let (statics, server): (Vec<_>, Vec<_>) = plan
            .behaviors
            .iter()
            .partition(|b| b.kind == BehaviorKind::Static);
        assert_eq!(statics.len(), 2);
        assert!(
            statics
                .iter()
                .all(|b| b.transform == Some(serde_json::json!({ "compress": false })))
        );
        assert_eq!(
            server[0].transform,
            Some(serde_json::json!({ "realtimeLogs": true }))
        );
        assert!(plan.to_json().unwrap().contains("realtimeLogs"));
    }
}
