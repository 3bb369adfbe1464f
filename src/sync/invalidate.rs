//! CDN invalidation, optionally waiting for completion.
//!
//! The request is issued exactly once. In wait mode the ticket is polled
//! until the engine reports completion, the timeout elapses, or the deploy
//! is aborted. Nothing is re-issued after a timeout or abort.

use std::time::Duration;

use crate::debug;
use crate::error::DeployError;
use crate::plan::InvalidationPolicy;
use crate::provision::{
    DistributionHandle, Invalidation, InvalidationStatus, ProvisionError, ProvisioningEngine,
    ResourceId, ResourceKind,
};

use super::abort::AbortSignal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(600),
            poll_interval: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidationOutcome {
    /// Issued without waiting; completion is best effort.
    Issued { ticket: String },
    /// The engine confirmed completion.
    Completed { ticket: Option<String> },
}

/// Invalidate `policy.paths` on the distribution.
pub async fn invalidate<E: ProvisioningEngine + ?Sized>(
    engine: &E,
    distribution: &DistributionHandle,
    policy: &InvalidationPolicy,
    wait: WaitOptions,
    mut abort: AbortSignal,
) -> Result<InvalidationOutcome, DeployError> {
    let paths = policy.paths.to_cdn_paths();
    let provisioning = |source: ProvisionError| DeployError::Provisioning {
        resource: ResourceId::new(ResourceKind::Invalidation, &distribution.id),
        source,
    };

    let ticket = match engine.invalidate(distribution, &paths).await.map_err(provisioning)? {
        Invalidation::Completed => return Ok(InvalidationOutcome::Completed { ticket: None }),
        Invalidation::Pending(ticket) => ticket,
    };
    debug!("invalidate"; "{} for {}", ticket, paths.join(", "));

    if !policy.wait {
        return Ok(InvalidationOutcome::Issued { ticket });
    }

    let deadline = tokio::time::sleep(wait.timeout);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            biased;
            () = abort.aborted() => return Err(DeployError::InvalidationAborted { ticket }),
            () = &mut deadline => {
                return Err(DeployError::InvalidationTimeout { ticket, timeout: wait.timeout });
            }
            status = engine.invalidation_status(distribution, &ticket) => {
                if status.map_err(provisioning)? == InvalidationStatus::Completed {
                    return Ok(InvalidationOutcome::Completed { ticket: Some(ticket) });
                }
            }
        }

        tokio::select! {
            biased;
            () = abort.aborted() => return Err(DeployError::InvalidationAborted { ticket }),
            () = &mut deadline => {
                return Err(DeployError::InvalidationTimeout { ticket, timeout: wait.timeout });
            }
            () = tokio::time::sleep(wait.poll_interval) => {}
        }
    }
}
