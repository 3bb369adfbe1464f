//! Deploy configuration for `edgeship.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # One module per TOML section
//! │   ├── site       # [site], [site.custom]
//! │   ├── server     # [server]
//! │   ├── assets     # [assets], [[assets.file_options]]
//! │   ├── invalidation
//! │   ├── domain
//! │   └── transform
//! ├── types/         # ConfigError, ConfigDiagnostics, FieldPath
//! └── mod.rs         # SiteConfig (this file)
//! ```
//!
//! Loading is: locate file (upward from cwd) → parse, warning on unknown
//! keys → resolve paths against the config directory → apply CLI flags →
//! validate every section, reporting all problems at once.

pub mod section;
pub mod types;
mod util;

use util::find_config_file;

pub use section::{
    AssetsConfig, DomainConfig, InvalidationConfig, ServerConfig, SiteSectionConfig,
    TransformConfig,
};
pub use types::{ConfigDiagnostics, ConfigError, FieldPath};

use crate::cli::{Cli, Commands, ModeArgs};
use crate::layout::{self, BuildMetadata, CustomLayout, Framework};
use crate::plan::BuildOptions;
use crate::sync::SyncOptions;
use crate::utils::path::{normalize_path, resolve_against};
use crate::{debug, log};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing edgeship.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Directory holding the config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub site: SiteSectionConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub assets: AssetsConfig,

    #[serde(default)]
    pub invalidation: InvalidationConfig,

    #[serde(default)]
    pub domain: DomainConfig,

    #[serde(default)]
    pub transform: TransformConfig,
}

impl SiteConfig {
    /// Locate, parse, finalize and validate the config for `cli`.
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = find_config_file(&cli.config)
            .ok_or_else(|| ConfigError::NotFound(cli.config.clone()))?;
        debug!("config"; "using {}", config_path.display());

        let mut config = Self::from_path(&config_path)?;
        config.config_path = normalize_path(&config_path);
        config.finalize(cli);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {field}");
        }
    }

    /// Resolve paths and apply command-line overrides.
    fn finalize(&mut self, cli: &Cli) {
        self.root = self
            .config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        self.site.path = normalize_path(&resolve_against(&self.root, &self.site.path));

        crate::logger::set_verbose(cli.verbose);
        self.apply_command_options(cli);
    }

    fn apply_command_options(&mut self, cli: &Cli) {
        match &cli.command {
            Commands::Plan { mode, .. } | Commands::Check { mode } => self.apply_mode_args(mode),
            Commands::Deploy { mode, no_wait, .. } => {
                self.apply_mode_args(mode);
                if *no_wait {
                    self.invalidation.wait = false;
                }
            }
        }
    }

    fn apply_mode_args(&mut self, mode: &ModeArgs) {
        if mode.dev {
            self.site.dev = true;
        }
        if mode.edge {
            self.site.edge = true;
        }
    }

    /// App root: `site.path` resolved against the config directory.
    pub fn app_root(&self) -> &Path {
        &self.site.path
    }

    /// Where deploy records are written.
    pub fn state_dir(&self) -> PathBuf {
        self.app_root().join(".edgeship")
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate every section, collecting all errors before failing.
    pub fn validate(&self) -> Result<()> {
        let diag = self.diagnostics();
        diag.print_warnings();
        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }

    fn diagnostics(&self) -> ConfigDiagnostics {
        let mut diag = ConfigDiagnostics::new();

        if !self.site.path.is_dir() {
            diag.error(
                FieldPath::new("site.path"),
                format!("app root `{}` is not a directory", self.site.path.display()),
            );
        }

        self.site.validate(&mut diag);
        self.server.validate(self.site.edge, &mut diag);
        self.assets.validate(&mut diag);
        self.invalidation.validate(&mut diag);
        self.domain.validate(&mut diag);
        self.transform.validate(&mut diag);
        diag
    }

    // ========================================================================
    // pipeline inputs
    // ========================================================================

    /// Read the build output, or the placeholder layout in dev mode.
    pub fn load_metadata(&self) -> Result<BuildMetadata> {
        if self.site.dev {
            debug!("config"; "dev mode, using placeholder site");
            return Ok(BuildMetadata::placeholder());
        }

        let root = self.app_root();
        let alt_bundler = self.site.alt_bundler;
        let metadata = match (self.site.framework.builtin(), &self.site.custom) {
            (Some(builtin), _) => layout::load(builtin, root, alt_bundler)?,
            (None, Some(custom)) => layout::load(&CustomLayout::from(custom), root, alt_bundler)?,
            (None, None) => bail!("framework = \"custom\" needs a [site.custom] section"),
        };
        Ok(metadata)
    }

    pub fn framework(&self) -> Framework {
        self.site.framework
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            edge_mode: self.site.edge,
            static_injections: self.assets.injection.clone(),
            server_injections: self.server.injection.clone(),
            function: self.server.function_settings(),
            region: self.site.region.clone(),
            cache_headers: self.server.cache_header_names(),
            invalidation: self.invalidation.policy(),
            domain: self.domain.alias(),
            transforms: self.transform.transforms(),
        }
    }

    pub fn sync_options(&self, progress: bool) -> SyncOptions {
        SyncOptions {
            assets: self.assets.asset_options(),
            upload_concurrency: self.assets.upload_concurrency,
            wait: self.invalidation.wait_options(),
            progress,
        }
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config content.
/// Panics if there are unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> SiteConfig {
    let (parsed, ignored) = SiteConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{Architecture, InvalidationPaths};
    use clap::Parser;
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("edgeship").chain(args.iter().copied()))
    }

    fn finalized(dir: &TempDir, content: &str, args: &[&str]) -> SiteConfig {
        let path = dir.path().join("edgeship.toml");
        fs::write(&path, content).unwrap();
        let mut config = SiteConfig::from_path(&path).unwrap();
        config.config_path = path;
        config.finalize(&cli(args));
        config
    }

    #[test]
    fn test_invalid_toml() {
        let result: Result<SiteConfig, _> = toml::from_str("[site\nedge = true");
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_fields_detected() {
        let content = "[site]\nedge = true\n[unknown_section]\nfield = \"value\"";
        let (config, ignored) = SiteConfig::parse_with_ignored(content).unwrap();

        assert!(config.site.edge);
        assert!(ignored.iter().any(|f| f.contains("unknown_section")));
    }

    #[test]
    fn test_no_unknown_fields() {
        let (_, ignored) = SiteConfig::parse_with_ignored("[server]\nmemory = 512").unwrap();
        assert!(ignored.is_empty());
    }

    #[test]
    fn test_site_path_resolved_against_config_dir() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("web")).unwrap();
        let config = finalized(&dir, "[site]\npath = \"web\"", &["check"]);

        assert_eq!(config.root, dir.path());
        assert_eq!(config.app_root(), normalize_path(&dir.path().join("web")));
        assert_eq!(config.state_dir(), config.app_root().join(".edgeship"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_app_root_reported() {
        let dir = TempDir::new().unwrap();
        let config = finalized(&dir, "[site]\npath = \"nowhere\"", &["check"]);
        assert!(config.diagnostics().has(FieldPath::new("site.path")));
    }

    #[test]
    fn test_cli_overrides() {
        let dir = TempDir::new().unwrap();
        let content = "[invalidation]\nwait = true";

        let config = finalized(&dir, content, &["plan", "--dev", "--edge"]);
        assert!(config.site.dev);
        assert!(config.site.edge);
        assert!(config.invalidation.wait);

        let config = finalized(&dir, content, &["deploy", "--dry-run", "--no-wait"]);
        assert!(!config.invalidation.wait);
        assert!(!config.site.edge);
    }

    #[test]
    fn test_all_sections_validated_together() {
        let dir = TempDir::new().unwrap();
        let content = "[site]\nedge = true\n[server]\nmemory = 1\ntimeout = 300\n[assets]\nupload_concurrency = 0";
        let config = finalized(&dir, content, &["check"]);

        let diag = config.diagnostics();
        assert_eq!(diag.len(), 3);
        assert!(diag.has(ServerConfig::FIELDS.timeout));
    }

    #[test]
    fn test_build_options_from_sections() {
        let config = test_parse_config(
            "[site]\nregion = \"eu-west-1\"\n[server]\narchitecture = \"arm64\"\ninjection = [\"s();\"]\ncache_headers = [\"X-Locale\"]\n[assets]\ninjection = [\"a();\"]\n[invalidation]\npaths = [\"/\"]\nwait = true\n[domain]\nname = \"example.com\"",
        );
        let options = config.build_options();

        assert!(!options.edge_mode);
        assert_eq!(options.static_injections, ["a();"]);
        assert_eq!(options.server_injections, ["s();"]);
        assert_eq!(options.function.architecture, Architecture::Arm64);
        assert_eq!(options.region.as_deref(), Some("eu-west-1"));
        assert_eq!(options.cache_headers, ["x-locale"]);
        assert_eq!(options.invalidation.paths, InvalidationPaths::List(vec!["/".into()]));
        assert!(options.invalidation.wait);
        assert_eq!(options.domain.unwrap().name, "example.com");
    }

    #[test]
    fn test_sync_options_from_sections() {
        let config = test_parse_config("[assets]\nupload_concurrency = 4\n[invalidation]\ntimeout = 60");
        let options = config.sync_options(false);
        assert_eq!(options.upload_concurrency, 4);
        assert_eq!(options.wait.timeout.as_secs(), 60);
        assert!(!options.progress);
    }

    #[test]
    fn test_dev_mode_uses_placeholder() {
        let config = test_parse_config("[site]\ndev = true");
        let metadata = config.load_metadata().unwrap();
        assert!(metadata.is_placeholder());
    }

    #[test]
    fn test_dev_mode_never_reads_app_root() {
        let dir = TempDir::new().unwrap();
        let mut config = test_parse_config("[site]\ndev = true\nframework = \"astro\"");
        config.site.path = dir.path().join("does/not/exist");

        let metadata = config.load_metadata().unwrap();
        assert_eq!(metadata, BuildMetadata::placeholder());
        assert!(!config.site.path.exists());
    }

    #[test]
    fn test_load_metadata_custom_layout() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("out/client/assets")).unwrap();
        fs::create_dir_all(dir.path().join("out/server")).unwrap();
        fs::write(dir.path().join("out/server/entry.mjs"), "export {}").unwrap();
        fs::write(dir.path().join("out/client/robots.txt"), "").unwrap();

        let content = "[site]\nframework = \"custom\"\n[site.custom]\nassets = \"out/client\"\nversioned = \"assets\"\nserver = \"out/server/entry.mjs\"";
        let config = finalized(&dir, content, &["plan"]);
        let metadata = config.load_metadata().unwrap();

        assert_eq!(metadata.server.module, "entry.mjs");
        assert_eq!(metadata.static_routes.len(), 2);
    }
}
