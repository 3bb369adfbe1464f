//! `edgeship deploy`: provision, sync assets, invalidate, record the result.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};

use super::common::{Compiled, compile};
use crate::config::SiteConfig;
use crate::error::DeployError;
use crate::plan::{SiteMetadata, validate};
use crate::provision::{DryRunEngine, ProvisionedSite, ProvisioningEngine, provision};
use crate::sync::{AbortSignal, SyncReport, register_abort, sync_site};
use crate::utils::plural_count;
use crate::{debug, log};

pub fn deploy_site(config: &SiteConfig, dry_run: bool) -> Result<()> {
    if !dry_run {
        bail!("no provisioning engine is linked into this build, run with --dry-run");
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let engine = Arc::new(DryRunEngine::new());
    let abort = register_abort();
    let path = runtime.block_on(run(config, engine, abort))?;
    log!("deploy"; "wrote {}", path.display());
    Ok(())
}

/// Full pipeline against `engine`. Returns the metadata file path.
async fn run<E>(config: &SiteConfig, engine: Arc<E>, abort: AbortSignal) -> Result<PathBuf>
where
    E: ProvisioningEngine + ?Sized + 'static,
{
    let Compiled { metadata, plan } = compile(config)?;
    let plan = validate(plan).map_err(DeployError::from)?;
    let policy = plan.plan().invalidation.clone();

    let site = provision(&*engine, plan).await?;
    let report = sync_site(
        Arc::clone(&engine),
        &site,
        &metadata,
        &policy,
        &config.sync_options(!crate::logger::is_verbose()),
        abort,
    )
    .await?;
    report_sync(&report);

    let record = site_metadata(config, &site, metadata.is_placeholder());
    write_metadata(config, &record)
}

fn report_sync(report: &SyncReport) {
    if report.invalidation.is_none() {
        return;
    }
    log!(
        "deploy";
        "uploaded {} ({} bytes)",
        plural_count(report.uploads.uploaded, "file"),
        report.uploads.bytes
    );
    if let Some(warning) = report.warning() {
        debug!("deploy"; "finished with warning: {warning}");
    }
}

fn site_metadata(config: &SiteConfig, site: &ProvisionedSite, placeholder: bool) -> SiteMetadata {
    let path = config.app_root().to_path_buf();
    if placeholder {
        return SiteMetadata::placeholder(path, config.site.edge);
    }

    let url = config.site.url.clone().unwrap_or_else(|| site.url.clone());
    let server_function = site
        .server_functions
        .first()
        .or_else(|| site.edge_functions.first())
        .map(|handle| handle.arn.clone());
    SiteMetadata::deployed(path, url, config.site.edge, server_function)
}

fn write_metadata(config: &SiteConfig, record: &SiteMetadata) -> Result<PathBuf> {
    let dir = config.state_dir();
    fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let path = dir.join("metadata.json");
    let json = record.to_json().context("failed to serialize site metadata")?;
    fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}
