//! Asset sync and invalidation driver.
//!
//! # Module Structure
//!
//! ```text
//! sync/
//! ├── manifest    # files -> AssetUpload (key, hash, headers)
//! ├── upload      # bounded concurrent uploads
//! ├── invalidate  # issue + optional wait
//! └── abort       # Ctrl+C -> AbortSignal
//! ```
//!
//! Upload failures are fatal and skip invalidation. Invalidation failures
//! are warnings: the site is already live.

pub mod abort;
mod invalidate;
mod manifest;
mod upload;

pub use abort::{AbortSignal, register_abort, setup_shutdown_handler};
pub use invalidate::{InvalidationOutcome, WaitOptions, invalidate};
pub use manifest::{
    AssetOptions, FileOption, NON_VERSIONED_CACHE_CONTROL, VERSIONED_CACHE_CONTROL,
    build_manifest,
};
pub use upload::{UploadSummary, upload_all};

use std::sync::Arc;

use crate::error::DeployError;
use crate::layout::BuildMetadata;
use crate::logger::ProgressLine;
use crate::plan::InvalidationPolicy;
use crate::provision::{ProvisionedSite, ProvisioningEngine};
use crate::utils::plural_count;
use crate::{debug, log};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub assets: AssetOptions,
    pub upload_concurrency: usize,
    pub wait: WaitOptions,
    /// Draw the upload progress line.
    pub progress: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            assets: AssetOptions::default(),
            upload_concurrency: 16,
            wait: WaitOptions::default(),
            progress: false,
        }
    }
}

#[derive(Debug)]
pub struct SyncReport {
    pub uploads: UploadSummary,
    /// `None` when nothing was invalidated (placeholder mode).
    pub invalidation: Option<Result<InvalidationOutcome, DeployError>>,
}

impl SyncReport {
    /// Invalidation failure, if any. Always warning-level.
    pub fn warning(&self) -> Option<&DeployError> {
        self.invalidation.as_ref().and_then(|r| r.as_ref().err())
    }
}

/// Upload the build's assets, then invalidate per `policy`.
pub async fn sync_site<E>(
    engine: Arc<E>,
    site: &ProvisionedSite,
    metadata: &BuildMetadata,
    policy: &InvalidationPolicy,
    options: &SyncOptions,
    abort: AbortSignal,
) -> Result<SyncReport, DeployError>
where
    E: ProvisioningEngine + ?Sized + 'static,
{
    if metadata.is_placeholder() {
        debug!("sync"; "placeholder build, nothing to upload");
        return Ok(SyncReport {
            uploads: UploadSummary::default(),
            invalidation: None,
        });
    }

    let manifest = build_manifest(metadata, &options.assets)?;
    log!(
        "sync";
        "{} ({} versioned, {} bytes)",
        plural_count(manifest.len(), "file"),
        manifest.versioned,
        manifest.total_bytes()
    );

    let items = [("upload", manifest.len())];
    let progress = if options.progress {
        ProgressLine::new("sync", &items)
    } else {
        ProgressLine::hidden("sync", &items)
    };
    let uploads = upload_all(
        Arc::clone(&engine),
        &site.asset_bucket,
        manifest,
        options.upload_concurrency,
        progress,
    )
    .await?;

    let invalidation = invalidate(
        &*engine,
        &site.distribution,
        policy,
        options.wait,
        abort,
    )
    .await;

    match &invalidation {
        Ok(InvalidationOutcome::Issued { ticket }) => {
            log!("sync"; "invalidation {ticket} issued");
        }
        Ok(InvalidationOutcome::Completed { .. }) => log!("sync"; "invalidation completed"),
        Err(e) if e.is_warning() => log!("warning"; "{e}, cached pages may be stale"),
        Err(e) => log!("warning"; "invalidation failed: {e}"),
    }

    Ok(SyncReport {
        uploads,
        invalidation: Some(invalidation),
    })
}
