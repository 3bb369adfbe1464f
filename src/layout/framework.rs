//! Per-framework build output layouts.
//!
//! Each supported framework family knows where its build tool writes the
//! client assets, which of those are content-hashed, and which module is the
//! server entry. Nothing here touches the file system.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Paths relative to the app root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutPaths {
    pub assets: PathBuf,
    /// Relative to `assets`.
    pub versioned: Option<PathBuf>,
    pub server_dir: PathBuf,
    /// Relative to `server_dir`.
    pub server_module: String,
}

impl LayoutPaths {
    fn new(assets: &str, versioned: &str, server_dir: &str, server_module: &str) -> Self {
        Self {
            assets: PathBuf::from(assets),
            versioned: Some(PathBuf::from(versioned)),
            server_dir: PathBuf::from(server_dir),
            server_module: server_module.to_string(),
        }
    }
}

/// Where a framework family puts its build output.
pub trait BuildLayout: Send + Sync {
    fn name(&self) -> &'static str;

    /// `alt_bundler` selects the layout of the alternate bundler config.
    fn paths(&self, alt_bundler: bool) -> LayoutPaths;
}

pub struct Remix;
pub struct Astro;
pub struct NextJs;
pub struct SvelteKit;
pub struct SolidStart;

impl BuildLayout for Remix {
    fn name(&self) -> &'static str {
        "remix"
    }

    fn paths(&self, alt_bundler: bool) -> LayoutPaths {
        if alt_bundler {
            LayoutPaths::new("build/client", "assets", "build/server", "index.js")
        } else {
            LayoutPaths::new("public", "build", "build", "index.js")
        }
    }
}

impl BuildLayout for Astro {
    fn name(&self) -> &'static str {
        "astro"
    }

    fn paths(&self, _alt_bundler: bool) -> LayoutPaths {
        LayoutPaths::new("dist/client", "_astro", "dist/server", "entry.mjs")
    }
}

impl BuildLayout for NextJs {
    fn name(&self) -> &'static str {
        "nextjs"
    }

    fn paths(&self, _alt_bundler: bool) -> LayoutPaths {
        LayoutPaths::new(
            ".open-next/assets",
            "_next",
            ".open-next/server-functions/default",
            "index.mjs",
        )
    }
}

impl BuildLayout for SvelteKit {
    fn name(&self) -> &'static str {
        "sveltekit"
    }

    fn paths(&self, _alt_bundler: bool) -> LayoutPaths {
        LayoutPaths::new(
            ".svelte-kit/output/client",
            "_app",
            ".svelte-kit/output/server",
            "index.js",
        )
    }
}

impl BuildLayout for SolidStart {
    fn name(&self) -> &'static str {
        "solid-start"
    }

    fn paths(&self, alt_bundler: bool) -> LayoutPaths {
        if alt_bundler {
            LayoutPaths::new(".output/public", "_build", ".output/server", "index.mjs")
        } else {
            LayoutPaths::new("dist/public", "assets", "dist/server", "index.js")
        }
    }
}

/// Layout given explicitly in `[site.custom]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomLayout {
    pub assets: PathBuf,
    pub versioned: Option<PathBuf>,
    /// Server entry file, relative to the app root.
    pub server: PathBuf,
}

impl BuildLayout for CustomLayout {
    fn name(&self) -> &'static str {
        "custom"
    }

    fn paths(&self, _alt_bundler: bool) -> LayoutPaths {
        let server_dir = self
            .server
            .parent()
            .map(PathBuf::from)
            .unwrap_or_default();
        let server_module = self
            .server
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        LayoutPaths {
            assets: self.assets.clone(),
            versioned: self.versioned.clone(),
            server_dir,
            server_module,
        }
    }
}

/// Framework family named by `site.framework`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Framework {
    #[default]
    Remix,
    Astro,
    Nextjs,
    Sveltekit,
    SolidStart,
    Custom,
}

impl Framework {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Remix => "remix",
            Self::Astro => "astro",
            Self::Nextjs => "nextjs",
            Self::Sveltekit => "sveltekit",
            Self::SolidStart => "solid-start",
            Self::Custom => "custom",
        }
    }

    /// Built-in layout, `None` for [`Framework::Custom`].
    pub fn builtin(self) -> Option<&'static dyn BuildLayout> {
        match self {
            Self::Remix => Some(&Remix),
            Self::Astro => Some(&Astro),
            Self::Nextjs => Some(&NextJs),
            Self::Sveltekit => Some(&SvelteKit),
            Self::SolidStart => Some(&SolidStart),
            Self::Custom => None,
        }
    }
}
