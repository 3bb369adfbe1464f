//! Provisioning adapter.
//!
//! Interprets a [`ValidatedPlan`] against a [`ProvisioningEngine`]. The
//! adapter decides nothing: origins, functions and the ordered behavior
//! list come straight from the plan.
//!
//! ```text
//! storage origins ─┐
//!                  ├─▶ distribution ─▶ ProvisionedSite
//! functions ───────┘
//! ```
//!
//! Engine errors are surfaced with the resource that caused them and are
//! never retried here.

mod dry_run;

pub use dry_run::DryRunEngine;
#[cfg(test)]
pub use dry_run::EngineCall;

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::error::DeployError;
use crate::plan::{
    AllowedMethods, BehaviorKind, CachePolicy, DomainAlias, Function, FunctionSettings, Origin,
    OriginKind, Plan, RequestTransform, Runtime, ValidatedPlan,
};
use crate::utils::hash::ContentHash;
use crate::{debug, log};

// ============================================================================
// Errors and handles
// ============================================================================

/// Failures reported by an engine.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("rejected by engine: {0}")]
    Rejected(String),

    #[error("quota exceeded: {0}")]
    Quota(String),

    #[error("engine unavailable: {0}")]
    Unavailable(String),

    #[error("`{0}` was not provisioned before it was referenced")]
    MissingDependency(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    StorageOrigin,
    Function,
    Distribution,
    Invalidation,
}

impl ResourceKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StorageOrigin => "storage origin",
            Self::Function => "function",
            Self::Distribution => "distribution",
            Self::Invalidation => "invalidation",
        }
    }
}

/// The plan node an engine call was made for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResourceId {
    pub kind: ResourceKind,
    pub name: String,
}

impl ResourceId {
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} `{}`", self.kind.as_str(), self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceHandle {
    pub id: String,
    pub arn: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistributionHandle {
    pub id: String,
    pub domain_name: String,
}

// ============================================================================
// Engine specs
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageOriginSpec {
    pub name: String,
    pub origin_path: String,
    pub transform: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionSpec {
    pub name: String,
    pub runtime: Runtime,
    pub region: Option<String>,
    /// Directory uploaded as the function code.
    pub bundle: PathBuf,
    /// Wrapper written into the bundle next to the server module.
    pub wrapper_file: &'static str,
    pub wrapper_source: String,
    pub handler: &'static str,
    pub settings: FunctionSettings,
    pub transform: Option<Value>,
}

impl FunctionSpec {
    fn from_function(function: &Function) -> Self {
        Self {
            name: function.name.clone(),
            runtime: function.runtime,
            region: function.region.clone(),
            bundle: function.bundle.clone(),
            wrapper_file: function.wrapper.file_name(),
            wrapper_source: function.wrapper.render(&function.entry),
            handler: function.wrapper.handler(),
            settings: function.settings.clone(),
            transform: function.transform.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OriginTarget {
    Storage {
        bucket: ResourceHandle,
        origin_path: String,
    },
    Function {
        function: ResourceHandle,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OriginBinding {
    pub name: String,
    #[serde(flatten)]
    pub target: OriginTarget,
    pub transform: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BehaviorSpec {
    /// Encoded pattern; `*` for the default behavior.
    pub pattern: String,
    pub kind: BehaviorKind,
    pub origin: String,
    pub methods: AllowedMethods,
    pub cache_policy: CachePolicy,
    pub viewer_request: Option<RequestTransform>,
    pub origin_request: Option<ResourceHandle>,
    pub transform: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionSpec {
    pub origins: Vec<OriginBinding>,
    /// Evaluated first to last; the default behavior is last.
    pub behaviors: Vec<BehaviorSpec>,
    pub domain: Option<DomainAlias>,
    pub transform: Option<Value>,
}

/// One object written to the asset bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetUpload {
    pub key: String,
    pub source: PathBuf,
    pub size: u64,
    pub hash: ContentHash,
    pub cache_control: String,
    pub content_type: String,
}

/// Result of issuing an invalidation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invalidation {
    /// The engine finished synchronously.
    Completed,
    /// Poll [`ProvisioningEngine::invalidation_status`] with this ticket.
    Pending(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationStatus {
    Pending,
    Completed,
}

// ============================================================================
// Engine
// ============================================================================

/// Upsert-style resource API. Implementations own idempotency and diffing.
#[async_trait]
pub trait ProvisioningEngine: Send + Sync {
    async fn upsert_storage_origin(
        &self,
        spec: &StorageOriginSpec,
    ) -> Result<ResourceHandle, ProvisionError>;

    async fn upsert_compute_function(
        &self,
        spec: &FunctionSpec,
    ) -> Result<ResourceHandle, ProvisionError>;

    async fn upsert_distribution(
        &self,
        spec: &DistributionSpec,
    ) -> Result<DistributionHandle, ProvisionError>;

    async fn invalidate(
        &self,
        distribution: &DistributionHandle,
        paths: &[String],
    ) -> Result<Invalidation, ProvisionError>;

    async fn invalidation_status(
        &self,
        distribution: &DistributionHandle,
        ticket: &str,
    ) -> Result<InvalidationStatus, ProvisionError>;

    async fn upload_asset(
        &self,
        bucket: &ResourceHandle,
        upload: &AssetUpload,
    ) -> Result<(), ProvisionError>;
}

/// Handles to everything the distribution serves from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionedSite {
    pub url: String,
    pub distribution: DistributionHandle,
    pub server_functions: Vec<ResourceHandle>,
    pub edge_functions: Vec<ResourceHandle>,
    pub asset_bucket: ResourceHandle,
}

// ============================================================================
// Adapter
// ============================================================================

/// Provision every resource in `plan`, dependencies first.
pub async fn provision<E>(engine: &E, plan: ValidatedPlan) -> Result<ProvisionedSite, DeployError>
where
    E: ProvisioningEngine + ?Sized,
{
    let plan = plan.into_inner();

    let buckets = upsert_storage(engine, &plan).await?;
    let functions = upsert_functions(engine, &plan).await?;
    let spec = distribution_spec(&plan, &buckets, &functions)?;

    let distribution_id = ResourceId::new(ResourceKind::Distribution, "site");
    debug!("provision"; "distribution with {} behaviors", spec.behaviors.len());
    let distribution = engine
        .upsert_distribution(&spec)
        .await
        .map_err(|source| DeployError::Provisioning {
            resource: distribution_id,
            source,
        })?;

    let asset_bucket = plan
        .storage_origin()
        .and_then(|origin| buckets.get(&origin.name))
        .cloned()
        .ok_or_else(|| missing(ResourceKind::StorageOrigin, "storage origin"))?;

    let (edge, regional): (Vec<_>, Vec<_>) = plan.functions.iter().partition(|f| f.is_edge());
    let lookup = |list: Vec<&Function>| -> Result<Vec<ResourceHandle>, DeployError> {
        list.into_iter()
            .map(|f| {
                functions
                    .get(&f.name)
                    .cloned()
                    .ok_or_else(|| missing(ResourceKind::Function, &f.name))
            })
            .collect()
    };

    let url = match &plan.domain {
        Some(domain) => format!("https://{}", domain.name),
        None => format!("https://{}", distribution.domain_name),
    };
    log!("provision"; "distribution {} ready at {}", distribution.id, url);

    Ok(ProvisionedSite {
        url,
        distribution,
        server_functions: lookup(regional)?,
        edge_functions: lookup(edge)?,
        asset_bucket,
    })
}

fn missing(kind: ResourceKind, name: &str) -> DeployError {
    DeployError::Provisioning {
        resource: ResourceId::new(kind, name),
        source: ProvisionError::MissingDependency(name.to_string()),
    }
}

async fn upsert_storage<E: ProvisioningEngine + ?Sized>(
    engine: &E,
    plan: &Plan,
) -> Result<FxHashMap<String, ResourceHandle>, DeployError> {
    let mut handles = FxHashMap::default();
    for origin in plan.origins.iter().filter(|o| o.is_storage()) {
        let OriginKind::Storage { origin_path } = &origin.kind else {
            continue;
        };
        let spec = StorageOriginSpec {
            name: origin.name.clone(),
            origin_path: origin_path.clone(),
            transform: origin.transform.clone(),
        };
        let handle = engine.upsert_storage_origin(&spec).await.map_err(|source| {
            DeployError::Provisioning {
                resource: ResourceId::new(ResourceKind::StorageOrigin, &origin.name),
                source,
            }
        })?;
        debug!("provision"; "storage origin {} -> {}", origin.name, handle.id);
        handles.insert(origin.name.clone(), handle);
    }
    Ok(handles)
}

async fn upsert_functions<E: ProvisioningEngine + ?Sized>(
    engine: &E,
    plan: &Plan,
) -> Result<FxHashMap<String, ResourceHandle>, DeployError> {
    let mut handles = FxHashMap::default();
    for function in &plan.functions {
        let spec = FunctionSpec::from_function(function);
        let handle = engine.upsert_compute_function(&spec).await.map_err(|source| {
            DeployError::Provisioning {
                resource: ResourceId::new(ResourceKind::Function, &function.name),
                source,
            }
        })?;
        debug!("provision"; "{:?} function {} -> {}", function.runtime, function.name, handle.id);
        handles.insert(function.name.clone(), handle);
    }
    Ok(handles)
}

fn distribution_spec(
    plan: &Plan,
    buckets: &FxHashMap<String, ResourceHandle>,
    functions: &FxHashMap<String, ResourceHandle>,
) -> Result<DistributionSpec, DeployError> {
    let origins = plan
        .origins
        .iter()
        .map(|origin| bind_origin(origin, buckets, functions))
        .collect::<Result<Vec<_>, _>>()?;

    let behaviors = plan
        .behaviors
        .iter()
        .map(|behavior| {
            let origin_request = behavior
                .edge_function()
                .map(|f| {
                    functions
                        .get(f.as_str())
                        .cloned()
                        .ok_or_else(|| missing(ResourceKind::Function, f.as_str()))
                })
                .transpose()?;

            Ok(BehaviorSpec {
                pattern: behavior.pattern.to_cdn(),
                kind: behavior.kind,
                origin: behavior.origin.to_string(),
                methods: behavior.methods,
                cache_policy: behavior.cache_policy.clone(),
                viewer_request: behavior.request_transform().cloned(),
                origin_request,
                transform: behavior.transform.clone(),
            })
        })
        .collect::<Result<Vec<_>, DeployError>>()?;

    Ok(DistributionSpec {
        origins,
        behaviors,
        domain: plan.domain.clone(),
        transform: plan.transform.clone(),
    })
}

fn bind_origin(
    origin: &Origin,
    buckets: &FxHashMap<String, ResourceHandle>,
    functions: &FxHashMap<String, ResourceHandle>,
) -> Result<OriginBinding, DeployError> {
    let target = match &origin.kind {
        OriginKind::Storage { origin_path } => OriginTarget::Storage {
            bucket: buckets
                .get(&origin.name)
                .cloned()
                .ok_or_else(|| missing(ResourceKind::StorageOrigin, &origin.name))?,
            origin_path: origin_path.clone(),
        },
        OriginKind::Function { function } => OriginTarget::Function {
            function: functions
                .get(function.as_str())
                .cloned()
                .ok_or_else(|| missing(ResourceKind::Function, function.as_str()))?,
        },
    };

    Ok(OriginBinding {
        name: origin.name.clone(),
        target,
        transform: origin.transform.clone(),
    })
}
