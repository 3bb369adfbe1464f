//! Server functions and their runtime wrappers.
//!
//! The wrapper is chosen once, when the plan is built. Provisioning renders
//! the selected template around the framework's server entry and never
//! re-decides the runtime.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::embed::{SERVER_EDGE_MJS, SERVER_REGIONAL_MJS, WrapperVars};
use crate::layout::ServerEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Runtime {
    /// Replicated to every CDN edge, invoked before origin selection.
    Edge,
    /// Deployed to one region, reached as an origin.
    Regional,
}

/// The two fixed server entry wrappers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerWrapper {
    Edge,
    Regional,
}

impl ServerWrapper {
    pub const fn select(edge_mode: bool) -> Self {
        if edge_mode { Self::Edge } else { Self::Regional }
    }

    pub const fn runtime(self) -> Runtime {
        match self {
            Self::Edge => Runtime::Edge,
            Self::Regional => Runtime::Regional,
        }
    }

    /// File name the wrapper is written as inside the function bundle.
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Edge => "server.edge.mjs",
            Self::Regional => "server.regional.mjs",
        }
    }

    /// `module.export` the runtime invokes.
    pub const fn handler(self) -> &'static str {
        match self {
            Self::Edge => "server.edge.handler",
            Self::Regional => "server.regional.handler",
        }
    }

    /// Wrapper source importing the framework's server module.
    pub fn render(self, entry: &ServerEntry) -> String {
        let vars = WrapperVars {
            server_module: &entry.module,
        };
        match self {
            Self::Edge => SERVER_EDGE_MJS.render(&vars),
            Self::Regional => SERVER_REGIONAL_MJS.render(&vars),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Architecture {
    #[default]
    X86_64,
    Arm64,
}

/// Runtime settings copied from `[server]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionSettings {
    pub memory_mb: u32,
    pub timeout_secs: u32,
    pub architecture: Architecture,
    pub environment: BTreeMap<String, String>,
}

impl Default for FunctionSettings {
    fn default() -> Self {
        Self {
            memory_mb: 1024,
            timeout_secs: 20,
            architecture: Architecture::default(),
            environment: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Function {
    pub name: String,
    pub runtime: Runtime,
    pub wrapper: ServerWrapper,
    /// Directory bundled as the function code.
    pub bundle: PathBuf,
    pub entry: ServerEntry,
    /// `None` for edge functions, which are replicated globally.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(flatten)]
    pub settings: FunctionSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<Value>,
}

impl Function {
    /// Build the server function for the chosen wrapper.
    pub fn server(
        name: impl Into<String>,
        wrapper: ServerWrapper,
        entry: ServerEntry,
        region: Option<String>,
        settings: FunctionSettings,
    ) -> Self {
        let runtime = wrapper.runtime();
        Self {
            name: name.into(),
            runtime,
            wrapper,
            bundle: entry.dir.clone(),
            entry,
            region: match runtime {
                Runtime::Edge => None,
                Runtime::Regional => region,
            },
            settings,
            transform: None,
        }
    }

    pub fn with_transform(mut self, transform: Option<Value>) -> Self {
        self.transform = transform;
        self
    }

    #[inline]
    pub fn is_edge(&self) -> bool {
        self.runtime == Runtime::Edge
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> ServerEntry {
        ServerEntry {
            dir: PathBuf::from("/app/build/server"),
            module: "index.js".to_string(),
        }
    }

    #[test]
    fn test_wrapper_selection() {
        assert_eq!(ServerWrapper::select(true), ServerWrapper::Edge);
        assert_eq!(ServerWrapper::select(false), ServerWrapper::Regional);
        assert_eq!(ServerWrapper::Edge.runtime(), Runtime::Edge);
        assert_ne!(
            ServerWrapper::Edge.file_name(),
            ServerWrapper::Regional.file_name()
        );
    }

    #[test]
    fn test_wrapper_imports_server_module() {
        for wrapper in [ServerWrapper::Edge, ServerWrapper::Regional] {
            let source = wrapper.render(&entry());
            assert!(source.contains("./index.js"), "{wrapper:?}: {source}");
            assert!(source.contains("export async function handler"));
        }
    }

    #[test]
    fn test_edge_function_has_no_region() {
        let edge = Function::server(
            "server",
            ServerWrapper::Edge,
            entry(),
            Some("eu-west-1".into()),
            FunctionSettings::default(),
        );
        assert!(edge.is_edge());
        assert_eq!(edge.region, None);

        let regional = Function::server(
            "server",
            ServerWrapper::Regional,
            entry(),
            Some("eu-west-1".into()),
            FunctionSettings::default(),
        );
        assert_eq!(regional.region.as_deref(), Some("eu-west-1"));
    }
}
