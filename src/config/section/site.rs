//! `[site]` section configuration.
//!
//! Which framework built the app, where the app lives, and how it is served.
//!
//! # Example
//!
//! ```toml
//! [site]
//! framework = "remix"         # remix | astro | nextjs | sveltekit | solid-start | custom
//! path = "."                  # App root, relative to edgeship.toml
//! alt_bundler = false         # Framework's alternative bundler layout (e.g. Remix + Vite)
//! edge = false                # Render at edge locations instead of one region
//! dev = false                 # Deploy the placeholder site
//! region = "us-east-1"        # Regional function placement
//! url = "https://example.com" # Reported url override
//!
//! [site.custom]               # Only with framework = "custom"
//! assets = "dist/client"
//! versioned = "assets"
//! server = "dist/server/entry.mjs"
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::layout::{CustomLayout, Framework};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSectionConfig {
    pub framework: Framework,

    /// App root. Relative paths resolve against the config file's directory.
    pub path: PathBuf,

    pub alt_bundler: bool,

    pub edge: bool,

    /// Placeholder deploy: no build output needed.
    pub dev: bool,

    pub url: Option<String>,

    pub region: Option<String>,

    pub custom: Option<CustomLayoutConfig>,
}

impl Default for SiteSectionConfig {
    fn default() -> Self {
        Self {
            framework: Framework::default(),
            path: PathBuf::from("."),
            alt_bundler: false,
            edge: false,
            dev: false,
            url: None,
            region: None,
            custom: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomLayoutConfig {
    pub assets: PathBuf,
    #[serde(default)]
    pub versioned: Option<PathBuf>,
    pub server: PathBuf,
}

impl From<&CustomLayoutConfig> for CustomLayout {
    fn from(config: &CustomLayoutConfig) -> Self {
        Self {
            assets: config.assets.clone(),
            versioned: config.versioned.clone(),
            server: config.server.clone(),
        }
    }
}

pub struct SiteFields {
    pub framework: FieldPath,
    pub url: FieldPath,
    pub region: FieldPath,
    pub custom: FieldPath,
    pub custom_assets: FieldPath,
    pub custom_server: FieldPath,
}

impl SiteSectionConfig {
    pub const FIELDS: SiteFields = SiteFields {
        framework: FieldPath::new("site.framework"),
        url: FieldPath::new("site.url"),
        region: FieldPath::new("site.region"),
        custom: FieldPath::new("site.custom"),
        custom_assets: FieldPath::new("site.custom.assets"),
        custom_server: FieldPath::new("site.custom.server"),
    };

    /// # Checks
    /// - `framework = "custom"` requires `[site.custom]`, and vice versa.
    /// - custom paths are relative to the app root.
    /// - `url` parses as an http(s) url.
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        let fields = &Self::FIELDS;

        match (&self.framework, &self.custom) {
            (Framework::Custom, None) => diag.error_with_hint(
                fields.custom,
                "framework = \"custom\" needs a [site.custom] section",
                "set `assets` and `server` relative to the app root",
            ),
            (Framework::Custom, Some(custom)) => {
                if custom.assets.is_absolute() {
                    diag.error(fields.custom_assets, "must be relative to the app root");
                }
                if custom.server.is_absolute() {
                    diag.error(fields.custom_server, "must be relative to the app root");
                }
                if custom.server.file_name().is_none() {
                    diag.error(fields.custom_server, "must name the server entry file");
                }
            }
            (framework, Some(_)) => diag.warn(
                fields.framework,
                format!(
                    "`{}` ignores [site.custom], set framework = \"custom\" to use it",
                    framework.as_str()
                ),
            ),
            (_, None) => {}
        }

        if let Some(url) = &self.url {
            match url::Url::parse(url) {
                Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
                Ok(parsed) => diag.error(
                    fields.url,
                    format!("unsupported scheme `{}`", parsed.scheme()),
                ),
                Err(e) => diag.error(fields.url, format!("invalid url: {e}")),
            }
        }

        if self.edge && self.region.is_some() {
            diag.warn(fields.region, "ignored in edge mode");
        }
    }
}
