//! Upload manifest: every file under the assets root with its object key,
//! content hash and headers.
//!
//! | File                          | Cache-Control                  |
//! |-------------------------------|--------------------------------|
//! | under the versioned sub dir   | `versioned_cache_control`      |
//! | anything else                 | `non_versioned_cache_control`  |
//! | matched by a `file_options`   | the option's value (first wins)|

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use jwalk::WalkDir;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::DeployError;
use crate::layout::BuildMetadata;
use crate::provision::AssetUpload;
use crate::utils::path::{is_hidden, to_object_key};
use crate::utils::{hash, mime};

/// Content-hashed files never change under the same name.
pub const VERSIONED_CACHE_CONTROL: &str = "public,max-age=31536000,immutable";

/// Browsers revalidate, the CDN keeps a day and serves stale while refreshing.
pub const NON_VERSIONED_CACHE_CONTROL: &str =
    "public,max-age=0,s-maxage=86400,stale-while-revalidate=8640";

/// Header overrides for object keys matching `files`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOption {
    pub files: String,
    pub cache_control: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetOptions {
    pub versioned_cache_control: String,
    pub non_versioned_cache_control: String,
    /// Charset appended to text content types.
    pub text_encoding: Option<String>,
    pub file_options: Vec<FileOption>,
}

impl Default for AssetOptions {
    fn default() -> Self {
        Self {
            versioned_cache_control: VERSIONED_CACHE_CONTROL.to_string(),
            non_versioned_cache_control: NON_VERSIONED_CACHE_CONTROL.to_string(),
            text_encoding: Some("utf-8".to_string()),
            file_options: Vec::new(),
        }
    }
}

/// Compiled `file_options`; the first matching option wins.
pub struct FileRules<'a> {
    set: GlobSet,
    options: &'a [FileOption],
}

impl<'a> FileRules<'a> {
    pub fn compile(options: &'a [FileOption]) -> Result<Self, DeployError> {
        let mut builder = GlobSetBuilder::new();
        for option in options {
            let glob = Glob::new(&option.files).map_err(|source| DeployError::FileOption {
                pattern: option.files.clone(),
                source,
            })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|source| DeployError::FileOption {
            pattern: String::new(),
            source,
        })?;
        Ok(Self { set, options })
    }

    pub fn find(&self, key: &str) -> Option<&'a FileOption> {
        self.set
            .matches(key)
            .into_iter()
            .min()
            .map(|index| &self.options[index])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetManifest {
    /// Sorted by key.
    pub entries: Vec<AssetUpload>,
    pub versioned: usize,
}

impl AssetManifest {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&AssetUpload> {
        self.entries.iter().find(|e| e.key == key)
    }
}

/// Walk the assets root and describe every upload.
///
/// Placeholder metadata yields an empty manifest without touching disk.
pub fn build_manifest(
    metadata: &BuildMetadata,
    options: &AssetOptions,
) -> Result<AssetManifest, DeployError> {
    if metadata.is_placeholder() {
        return Ok(AssetManifest::default());
    }

    let rules = FileRules::compile(&options.file_options)?;
    let root = &metadata.assets_path;
    let versioned_dir = metadata.versioned_dir();

    let mut files = collect_files(root)?;
    files.sort();

    let entries = files
        .par_iter()
        .map(|path| describe(root, path, versioned_dir.as_deref(), options, &rules))
        .collect::<Result<Vec<_>, _>>()?;

    let versioned = versioned_dir.as_ref().map_or(0, |dir| {
        files.iter().filter(|path| path.starts_with(dir)).count()
    });

    Ok(AssetManifest { entries, versioned })
}

/// Every file below `root`, seen the way the route scan sees the top level:
/// symlinks are followed and hidden entries other than `.well-known` are
/// skipped. Any unreadable entry fails the walk.
fn collect_files(root: &Path) -> Result<Vec<PathBuf>, DeployError> {
    let walk = WalkDir::new(root)
        .follow_links(true)
        .skip_hidden(false)
        .process_read_dir(|_, _, _, children| {
            children.retain(|entry| {
                let name = match entry {
                    Ok(e) => Some(e.file_name()),
                    Err(e) => e.path().and_then(Path::file_name),
                };
                !name.is_some_and(|name| is_hidden(&name.to_string_lossy()))
            });
        });

    let mut files = Vec::new();
    for entry in walk {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            DeployError::Io(path, e.into())
        })?;
        if entry.file_type().is_file() {
            files.push(entry.path());
        }
    }
    Ok(files)
}

fn describe(
    root: &Path,
    path: &Path,
    versioned_dir: Option<&Path>,
    options: &AssetOptions,
    rules: &FileRules<'_>,
) -> Result<AssetUpload, DeployError> {
    let io_err = |e| DeployError::Io(path.to_path_buf(), e);

    let rel = path.strip_prefix(root).unwrap_or(path);
    let key = to_object_key(rel);
    let size = path.metadata().map_err(io_err)?.len();
    let hash = hash::compute_file(path).map_err(io_err)?;

    let is_versioned = versioned_dir.is_some_and(|dir| path.starts_with(dir));
    let option = rules.find(&key);

    let cache_control = option
        .and_then(|o| o.cache_control.clone())
        .unwrap_or_else(|| {
            if is_versioned {
                options.versioned_cache_control.clone()
            } else {
                options.non_versioned_cache_control.clone()
            }
        });
    let content_type = option
        .and_then(|o| o.content_type.clone())
        .unwrap_or_else(|| mime::content_type(path, options.text_encoding.as_deref()));

    Ok(AssetUpload {
        key,
        source: path.to_path_buf(),
        size,
        hash,
        cache_control,
        content_type,
    })
}
