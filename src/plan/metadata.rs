//! `_metadata` record consumed by downstream tooling.

use std::path::PathBuf;

use serde::Serialize;

use crate::layout::SiteMode;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteMetadata {
    pub mode: SiteMode,
    /// App root the site was built from.
    pub path: PathBuf,
    pub url: Option<String>,
    pub edge_mode: bool,
    pub server_function_arn: Option<String>,
}

impl SiteMetadata {
    /// Local development: nothing is live yet.
    pub fn placeholder(path: PathBuf, edge_mode: bool) -> Self {
        Self {
            mode: SiteMode::Placeholder,
            path,
            url: None,
            edge_mode,
            server_function_arn: None,
        }
    }

    pub fn deployed(
        path: PathBuf,
        url: String,
        edge_mode: bool,
        server_function_arn: Option<String>,
    ) -> Self {
        Self {
            mode: SiteMode::Deployed,
            path,
            url: Some(url),
            edge_mode,
            server_function_arn,
        }
    }

    /// `{ "_metadata": { .. } }`, pretty printed.
    pub fn to_json(&self) -> serde_json::Result<String> {
        #[derive(Serialize)]
        struct Envelope<'a> {
            #[serde(rename = "_metadata")]
            metadata: &'a SiteMetadata,
        }
        serde_json::to_string_pretty(&Envelope { metadata: self })
    }
}
