//! In-memory engine for `deploy --dry-run` and tests.
//!
//! Records every call and returns deterministic handles. Distributions with
//! more behaviors than a CDN accepts by default are refused with
//! [`ProvisionError::Quota`]. Tests can also make it reject specific
//! resources or keep invalidations pending for a number of status polls.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashSet;

use super::{
    AssetUpload, DistributionHandle, DistributionSpec, FunctionSpec, Invalidation,
    InvalidationStatus, ProvisionError, ProvisioningEngine, ResourceHandle, StorageOriginSpec,
};

/// Path-pattern behaviors a distribution accepts besides the default one.
pub const BEHAVIOR_QUOTA: usize = 25;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    StorageOrigin(String),
    Function(String),
    Distribution { patterns: Vec<String> },
    Invalidate(Vec<String>),
    InvalidationStatus(String),
    Upload(String),
}

pub struct DryRunEngine {
    calls: Mutex<Vec<EngineCall>>,
    /// Resource names and object keys to reject.
    fail_on: FxHashSet<String>,
    /// Status polls answered with `Pending` before `Completed`.
    pending_polls: usize,
    upload_delay: Duration,
    behavior_quota: usize,
    polls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for DryRunEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DryRunEngine {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_on: FxHashSet::default(),
            pending_polls: 0,
            upload_delay: Duration::ZERO,
            behavior_quota: BEHAVIOR_QUOTA,
            polls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Reject any upsert or upload for `name`.
    #[cfg(test)]
    pub fn fail_on(mut self, name: impl Into<String>) -> Self {
        self.fail_on.insert(name.into());
        self
    }

    /// Keep invalidations pending for `polls` status checks.
    /// `usize::MAX` never completes.
    #[cfg(test)]
    pub fn with_pending_polls(mut self, polls: usize) -> Self {
        self.pending_polls = polls;
        self
    }

    #[cfg(test)]
    pub fn with_upload_delay(mut self, delay: Duration) -> Self {
        self.upload_delay = delay;
        self
    }

    #[cfg(test)]
    pub fn with_behavior_quota(mut self, quota: usize) -> Self {
        self.behavior_quota = quota;
        self
    }

    #[cfg(test)]
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().clone()
    }

    /// Highest number of uploads observed running at once.
    #[cfg(test)]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().push(call);
    }

    fn check(&self, name: &str) -> Result<(), ProvisionError> {
        if self.fail_on.contains(name) {
            Err(ProvisionError::Rejected(format!("dry run configured to fail on `{name}`")))
        } else {
            Ok(())
        }
    }

    fn handle(kind: &str, name: &str) -> ResourceHandle {
        ResourceHandle {
            id: format!("dry-{kind}-{name}"),
            arn: format!("arn:dryrun:{kind}:{name}"),
        }
    }
}

#[async_trait]
impl ProvisioningEngine for DryRunEngine {
    async fn upsert_storage_origin(
        &self,
        spec: &StorageOriginSpec,
    ) -> Result<ResourceHandle, ProvisionError> {
        self.record(EngineCall::StorageOrigin(spec.name.clone()));
        self.check(&spec.name)?;
        Ok(Self::handle("bucket", &spec.name))
    }

    async fn upsert_compute_function(
        &self,
        spec: &FunctionSpec,
    ) -> Result<ResourceHandle, ProvisionError> {
        self.record(EngineCall::Function(spec.name.clone()));
        self.check(&spec.name)?;
        Ok(Self::handle("function", &spec.name))
    }

    async fn upsert_distribution(
        &self,
        spec: &DistributionSpec,
    ) -> Result<DistributionHandle, ProvisionError> {
        let patterns: Vec<String> = spec.behaviors.iter().map(|b| b.pattern.clone()).collect();
        let routed = patterns.iter().filter(|p| p.as_str() != "*").count();
        self.record(EngineCall::Distribution { patterns });
        self.check("distribution")?;
        if routed > self.behavior_quota {
            return Err(ProvisionError::Quota(format!(
                "{routed} path behaviors, the distribution allows {}",
                self.behavior_quota
            )));
        }
        Ok(DistributionHandle {
            id: "dry-distribution".to_string(),
            domain_name: "dry-distribution.cdn.invalid".to_string(),
        })
    }

    async fn invalidate(
        &self,
        _distribution: &DistributionHandle,
        paths: &[String],
    ) -> Result<Invalidation, ProvisionError> {
        self.record(EngineCall::Invalidate(paths.to_vec()));
        self.check("invalidation")?;
        let n = self
            .calls
            .lock()
            .iter()
            .filter(|c| matches!(c, EngineCall::Invalidate(_)))
            .count();
        Ok(Invalidation::Pending(format!("dry-invalidation-{n}")))
    }

    async fn invalidation_status(
        &self,
        _distribution: &DistributionHandle,
        ticket: &str,
    ) -> Result<InvalidationStatus, ProvisionError> {
        self.record(EngineCall::InvalidationStatus(ticket.to_string()));
        let seen = self.polls.fetch_add(1, Ordering::SeqCst);
        if seen >= self.pending_polls {
            Ok(InvalidationStatus::Completed)
        } else {
            Ok(InvalidationStatus::Pending)
        }
    }

    async fn upload_asset(
        &self,
        _bucket: &ResourceHandle,
        upload: &AssetUpload,
    ) -> Result<(), ProvisionError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.upload_delay.is_zero() {
            tokio::time::sleep(self.upload_delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.record(EngineCall::Upload(upload.key.clone()));
        self.check(&upload.key)
    }
}
