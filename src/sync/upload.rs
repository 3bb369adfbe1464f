//! Bounded concurrent uploads to the asset bucket.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::DeployError;
use crate::logger::ProgressLine;
use crate::provision::{ProvisionError, ProvisioningEngine, ResourceHandle};
use crate::{debug, log};

use super::manifest::AssetManifest;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadSummary {
    pub uploaded: usize,
    pub failed: usize,
    pub bytes: u64,
}

/// Upload every manifest entry, at most `concurrency` at a time.
///
/// A failure does not cancel other uploads. Once everything in flight has
/// finished, the first failure is returned.
pub async fn upload_all<E>(
    engine: Arc<E>,
    bucket: &ResourceHandle,
    manifest: AssetManifest,
    concurrency: usize,
    progress: ProgressLine,
) -> Result<UploadSummary, DeployError>
where
    E: ProvisioningEngine + ?Sized + 'static,
{
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let progress = Arc::new(progress);
    let mut tasks = JoinSet::new();

    for upload in manifest.entries {
        // the semaphore is never closed
        let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
            break;
        };
        let engine = Arc::clone(&engine);
        let bucket = bucket.clone();
        let progress = Arc::clone(&progress);

        tasks.spawn(async move {
            let result = engine.upload_asset(&bucket, &upload).await;
            drop(permit);
            progress.inc("upload");
            match result {
                Ok(()) => Ok(upload.size),
                Err(source) => Err(DeployError::UploadFailed {
                    key: upload.key,
                    source,
                }),
            }
        });
    }

    let mut summary = UploadSummary::default();
    let mut first_error = None;

    while let Some(joined) = tasks.join_next().await {
        let result = joined.unwrap_or_else(|e| {
            Err(DeployError::UploadFailed {
                key: "<task>".to_string(),
                source: ProvisionError::Unavailable(e.to_string()),
            })
        });
        match result {
            Ok(bytes) => {
                summary.uploaded += 1;
                summary.bytes += bytes;
            }
            Err(e) => {
                summary.failed += 1;
                debug!("upload"; "{e}");
                first_error.get_or_insert(e);
            }
        }
    }

    if let Ok(progress) = Arc::try_unwrap(progress) {
        progress.finish();
    }

    match first_error {
        Some(e) => {
            log!("error"; "{} of {} uploads failed", summary.failed, summary.failed + summary.uploaded);
            Err(e)
        }
        None => Ok(summary),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provision::{AssetUpload, DryRunEngine, EngineCall};
    use crate::utils::hash;
    use std::path::PathBuf;
    use std::time::Duration;

    fn manifest(n: usize) -> AssetManifest {
        let entries = (0..n)
            .map(|i| AssetUpload {
                key: format!("assets/{i}.js"),
                source: PathBuf::from(format!("/tmp/{i}.js")),
                size: 10,
                hash: hash::compute(i.to_string()),
                cache_control: "public".to_string(),
                content_type: "text/javascript".to_string(),
            })
            .collect();
        AssetManifest {
            entries,
            versioned: n,
        }
    }

    fn bucket() -> ResourceHandle {
        ResourceHandle {
            id: "b".into(),
            arn: "arn:b".into(),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_bounded() {
        let engine = Arc::new(DryRunEngine::new().with_upload_delay(Duration::from_millis(20)));
        let progress = ProgressLine::hidden("sync", &[("upload", 12)]);

        let summary = upload_all(Arc::clone(&engine), &bucket(), manifest(12), 3, progress)
            .await
            .unwrap();

        assert_eq!(summary.uploaded, 12);
        assert_eq!(summary.bytes, 120);
        assert!(engine.max_in_flight() <= 3, "{}", engine.max_in_flight());
        assert!(engine.max_in_flight() >= 2);
    }

    #[tokio::test]
    async fn test_failure_reported_after_drain() {
        let engine = Arc::new(DryRunEngine::new().fail_on("assets/2.js"));
        let progress = ProgressLine::hidden("sync", &[("upload", 5)]);

        let err = upload_all(Arc::clone(&engine), &bucket(), manifest(5), 2, progress)
            .await
            .unwrap_err();

        match err {
            DeployError::UploadFailed { key, .. } => assert_eq!(key, "assets/2.js"),
            other => panic!("unexpected error: {other}"),
        }
        let uploads = engine
            .calls()
            .iter()
            .filter(|c| matches!(c, EngineCall::Upload(_)))
            .count();
        assert_eq!(uploads, 5);
    }
}
