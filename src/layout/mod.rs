//! Build metadata loader.
//!
//! Turns a framework's build output directory into [`BuildMetadata`]: where
//! the static assets are, which subdirectory holds content-hashed files,
//! the top-level static routes, and the server entry the wrapper imports.
//!
//! Framework differences live entirely in [`BuildLayout`] implementations
//! (see [`framework`]). The loader itself only checks that the layout's
//! paths exist and lists the assets root.
//!
//! ```text
//! build/client/            <- assets_path
//! ├── assets/              -> "assets/*"   (versioned sub dir)
//! ├── favicon.ico          -> "favicon.ico"
//! └── robots.txt           -> "robots.txt"
//! build/server/index.js    <- server entry
//! ```

pub mod framework;
mod scan;

pub use framework::{BuildLayout, CustomLayout, Framework};
pub use scan::scan_static_routes;

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::debug;
use crate::error::DeployError;
use crate::plan::PathPattern;

/// Whether the metadata describes a real build or the dev placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteMode {
    Placeholder,
    Deployed,
}

impl SiteMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Placeholder => "placeholder",
            Self::Deployed => "deployed",
        }
    }
}

/// The server bundle and the module the wrapper imports from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerEntry {
    /// Bundle directory (absolute in deployed mode).
    pub dir: PathBuf,
    /// Module path relative to `dir`, e.g. `index.js`.
    pub module: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildMetadata {
    pub mode: SiteMode,
    pub assets_path: PathBuf,
    /// Relative to `assets_path`.
    pub assets_versioned_sub_dir: Option<PathBuf>,
    /// Top-level entries of `assets_path`, files before directories.
    pub static_routes: Vec<PathPattern>,
    pub server: ServerEntry,
}

impl BuildMetadata {
    /// Metadata used in local development mode. Touches no files.
    pub fn placeholder() -> Self {
        Self {
            mode: SiteMode::Placeholder,
            assets_path: PathBuf::from("placeholder"),
            assets_versioned_sub_dir: None,
            static_routes: vec![PathPattern::dir("assets"), PathPattern::file("favicon.ico")],
            server: ServerEntry {
                dir: PathBuf::from("placeholder"),
                module: "index.mjs".to_string(),
            },
        }
    }

    #[inline]
    pub fn is_placeholder(&self) -> bool {
        self.mode == SiteMode::Placeholder
    }

    /// Absolute versioned directory, if the layout declares one.
    pub fn versioned_dir(&self) -> Option<PathBuf> {
        self.assets_versioned_sub_dir
            .as_ref()
            .map(|sub| self.assets_path.join(sub))
    }
}

/// Load metadata for the app rooted at `root`.
///
/// `alt_bundler` selects the layout variant produced by the framework's
/// alternate bundler configuration.
pub fn load(
    layout: &dyn BuildLayout,
    root: &Path,
    alt_bundler: bool,
) -> Result<BuildMetadata, DeployError> {
    let paths = layout.paths(alt_bundler);

    let assets_path = root.join(&paths.assets);
    if !assets_path.is_dir() {
        return Err(DeployError::BuildOutputMissing {
            what: "assets directory",
            path: assets_path,
        });
    }

    let server_dir = root.join(&paths.server_dir);
    let handler = server_dir.join(&paths.server_module);
    if !handler.is_file() {
        return Err(DeployError::BuildOutputMissing {
            what: "server entry",
            path: handler,
        });
    }

    if let Some(versioned) = &paths.versioned
        && !assets_path.join(versioned).is_dir()
    {
        debug!("layout"; "versioned dir `{}` not present, all assets are short-lived", versioned.display());
    }

    let static_routes = scan_static_routes(&assets_path)?;
    debug!("layout"; "{}: {} static routes under {}", layout.name(), static_routes.len(), assets_path.display());

    Ok(BuildMetadata {
        mode: SiteMode::Deployed,
        assets_path,
        assets_versioned_sub_dir: paths.versioned,
        static_routes,
        server: ServerEntry {
            dir: server_dir,
            module: paths.server_module,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn remix_vite_fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        let client = dir.path().join("build/client");
        fs::create_dir_all(client.join("assets")).unwrap();
        fs::write(client.join("assets/entry-abc123.js"), "x").unwrap();
        fs::write(client.join("favicon.ico"), "icon").unwrap();
        fs::create_dir_all(dir.path().join("build/server")).unwrap();
        fs::write(dir.path().join("build/server/index.js"), "export {}").unwrap();
        dir
    }

    #[test]
    fn test_load_remix_vite() {
        let dir = remix_vite_fixture();
        let meta = load(&framework::Remix, dir.path(), true).unwrap();

        assert_eq!(meta.mode, SiteMode::Deployed);
        assert_eq!(meta.assets_path, dir.path().join("build/client"));
        assert_eq!(meta.assets_versioned_sub_dir, Some(PathBuf::from("assets")));
        assert_eq!(
            meta.static_routes,
            vec![PathPattern::file("favicon.ico"), PathPattern::dir("assets")]
        );
        assert_eq!(meta.server.dir, dir.path().join("build/server"));
        assert_eq!(meta.server.module, "index.js");
        assert_eq!(
            meta.versioned_dir(),
            Some(dir.path().join("build/client/assets"))
        );
    }

    #[test]
    fn test_missing_assets_dir() {
        let dir = remix_vite_fixture();
        // classic layout expects `public/`, which the fixture lacks
        let err = load(&framework::Remix, dir.path(), false).unwrap_err();
        match err {
            DeployError::BuildOutputMissing { what, path } => {
                assert_eq!(what, "assets directory");
                assert_eq!(path, dir.path().join("public"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_server_entry() {
        let dir = remix_vite_fixture();
        fs::remove_file(dir.path().join("build/server/index.js")).unwrap();

        let err = load(&framework::Remix, dir.path(), true).unwrap_err();
        assert!(matches!(
            err,
            DeployError::BuildOutputMissing { what: "server entry", .. }
        ));
    }

    #[test]
    fn test_placeholder_is_fixed() {
        let meta = BuildMetadata::placeholder();
        assert!(meta.is_placeholder());
        assert_eq!(meta.assets_path, PathBuf::from("placeholder"));
        assert_eq!(
            meta.static_routes,
            vec![PathPattern::dir("assets"), PathPattern::file("favicon.ico")]
        );
    }
}
