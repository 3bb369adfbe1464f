//! Deploy pipeline errors.
//!
//! | Variant               | Stage              | Fatal |
//! |-----------------------|--------------------|-------|
//! | `BuildOutputMissing`  | metadata loader    | yes   |
//! | `Validation`          | plan validator     | yes   |
//! | `Provisioning`        | provisioning       | yes   |
//! | `FileOption`          | asset sync         | yes   |
//! | `UploadFailed`        | asset sync         | yes   |
//! | `InvalidationTimeout` | invalidation wait  | no    |
//! | `InvalidationAborted` | invalidation wait  | no    |

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::plan::PlanDiagnostics;
use crate::provision::{ProvisionError, ResourceId};

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("build output missing: {what} not found at `{}`", path.display())]
    BuildOutputMissing { what: &'static str, path: PathBuf },

    #[error("IO error when reading `{}`", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    // NOTE: No #[from] source here, Display already renders every issue
    #[error("{0}")]
    Validation(PlanDiagnostics),

    #[error("failed to provision {resource}")]
    Provisioning {
        resource: ResourceId,
        #[source]
        source: ProvisionError,
    },

    #[error("invalid file_options glob `{pattern}`")]
    FileOption {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("failed to upload `{key}`")]
    UploadFailed {
        key: String,
        #[source]
        source: ProvisionError,
    },

    #[error("invalidation `{ticket}` not confirmed after {}s", timeout.as_secs())]
    InvalidationTimeout { ticket: String, timeout: Duration },

    #[error("invalidation `{ticket}` wait aborted")]
    InvalidationAborted { ticket: String },
}

impl DeployError {
    /// Warning-level failures: the site is live, only cache freshness lags.
    pub const fn is_warning(&self) -> bool {
        matches!(
            self,
            Self::InvalidationTimeout { .. } | Self::InvalidationAborted { .. }
        )
    }
}

impl From<PlanDiagnostics> for DeployError {
    fn from(diag: PlanDiagnostics) -> Self {
        Self::Validation(diag)
    }
}
