//! `[assets]` section configuration.
//!
//! Upload headers and the static request transform.
//!
//! # Example
//!
//! ```toml
//! [assets]
//! versioned_cache_control = "public,max-age=31536000,immutable"
//! non_versioned_cache_control = "public,max-age=0,s-maxage=86400,stale-while-revalidate=8640"
//! text_encoding = "utf-8"     # Charset for text types, "none" to omit
//! upload_concurrency = 16
//! injection = []              # JS statements for the static request transform
//!
//! [[assets.file_options]]
//! files = "**/*.woff2"
//! cache_control = "public,max-age=31536000,immutable"
//! content_type = "font/woff2"
//! ```

use globset::Glob;
use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::sync::{AssetOptions, FileOption, NON_VERSIONED_CACHE_CONTROL, VERSIONED_CACHE_CONTROL};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    pub versioned_cache_control: String,
    pub non_versioned_cache_control: String,
    pub text_encoding: String,
    pub upload_concurrency: usize,
    pub injection: Vec<String>,
    /// Checked in order; the first matching entry wins.
    pub file_options: Vec<FileOption>,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            versioned_cache_control: VERSIONED_CACHE_CONTROL.to_string(),
            non_versioned_cache_control: NON_VERSIONED_CACHE_CONTROL.to_string(),
            text_encoding: "utf-8".to_string(),
            upload_concurrency: 16,
            injection: Vec::new(),
            file_options: Vec::new(),
        }
    }
}

pub struct AssetsFields {
    pub versioned_cache_control: FieldPath,
    pub non_versioned_cache_control: FieldPath,
    pub upload_concurrency: FieldPath,
    pub file_options: FieldPath,
}

impl AssetsConfig {
    pub const FIELDS: AssetsFields = AssetsFields {
        versioned_cache_control: FieldPath::new("assets.versioned_cache_control"),
        non_versioned_cache_control: FieldPath::new("assets.non_versioned_cache_control"),
        upload_concurrency: FieldPath::new("assets.upload_concurrency"),
        file_options: FieldPath::new("assets.file_options"),
    };

    pub fn asset_options(&self) -> AssetOptions {
        let text_encoding = match self.text_encoding.trim() {
            "" | "none" => None,
            charset => Some(charset.to_ascii_lowercase()),
        };
        AssetOptions {
            versioned_cache_control: self.versioned_cache_control.clone(),
            non_versioned_cache_control: self.non_versioned_cache_control.clone(),
            text_encoding,
            file_options: self.file_options.clone(),
        }
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        let fields = &Self::FIELDS;

        if self.versioned_cache_control.trim().is_empty() {
            diag.error(fields.versioned_cache_control, "must not be empty");
        }
        if self.non_versioned_cache_control.trim().is_empty() {
            diag.error(fields.non_versioned_cache_control, "must not be empty");
        }
        if self.upload_concurrency == 0 {
            diag.error(fields.upload_concurrency, "must be at least 1");
        }

        for (i, option) in self.file_options.iter().enumerate() {
            if let Err(e) = Glob::new(&option.files) {
                diag.error_with_hint(
                    fields.file_options,
                    format!("entry {}: invalid glob `{}`: {}", i + 1, option.files, e.kind()),
                    "globs match object keys such as `assets/app.js`",
                );
            }
            if option.cache_control.is_none() && option.content_type.is_none() {
                diag.warn(
                    fields.file_options,
                    format!("entry {} (`{}`) sets no headers", i + 1, option.files),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_assets_defaults() {
        let config = test_parse_config("");
        let options = config.assets.asset_options();
        assert_eq!(options, AssetOptions::default());
        assert_eq!(config.assets.upload_concurrency, 16);
    }

    #[test]
    fn test_text_encoding_none() {
        let config = test_parse_config("[assets]\ntext_encoding = \"none\"");
        assert!(config.assets.asset_options().text_encoding.is_none());
    }

    #[test]
    fn test_file_options_parsed_in_order() {
        let config = test_parse_config(
            "[[assets.file_options]]\nfiles = \"**/*.woff2\"\ncontent_type = \"font/woff2\"\n\n[[assets.file_options]]\nfiles = \"**\"\ncache_control = \"no-cache\"",
        );
        let options = config.assets.asset_options().file_options;
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].files, "**/*.woff2");
        assert_eq!(options[1].cache_control.as_deref(), Some("no-cache"));

        let mut diag = ConfigDiagnostics::new();
        config.assets.validate(&mut diag);
        assert!(diag.is_empty());
    }

    #[test]
    fn test_invalid_glob_and_zero_concurrency() {
        let config = test_parse_config(
            "[assets]\nupload_concurrency = 0\n[[assets.file_options]]\nfiles = \"assets/[\"\ncache_control = \"x\"",
        );
        let mut diag = ConfigDiagnostics::new();
        config.assets.validate(&mut diag);
        assert!(diag.has(AssetsConfig::FIELDS.upload_concurrency));
        assert!(diag.has(AssetsConfig::FIELDS.file_options));
    }

    #[test]
    fn test_headerless_file_option_warns() {
        let config = test_parse_config("[[assets.file_options]]\nfiles = \"*.txt\"");
        let mut diag = ConfigDiagnostics::new();
        config.assets.validate(&mut diag);
        assert!(diag.is_empty());
        assert_eq!(diag.warnings().len(), 1);
    }
}
