//! Embedded JavaScript sources.
//!
//! # Module Structure
//!
//! - `template` - Template types for typed variable injection
//! - `wrapper/` - server entry wrappers (edge, regional)
//! - `edge/` - viewer-request transform functions (static, server)
//!
//! # Usage
//!
//! ```ignore
//! use embed::{SERVER_REGIONAL_MJS, WrapperVars};
//!
//! let js = SERVER_REGIONAL_MJS.render(&WrapperVars { server_module: "index.js" });
//! ```

mod template;

pub use template::{Template, TemplateVars};

// ============================================================================
// Server wrappers
// ============================================================================

/// Variables for the server wrappers.
pub struct WrapperVars<'a> {
    /// Module path relative to the bundle root, e.g. `index.js`.
    pub server_module: &'a str,
}

impl TemplateVars for WrapperVars<'_> {
    fn apply(&self, content: &str) -> String {
        let module = self.server_module.trim_start_matches("./");
        content.replace("__SERVER_MODULE__", &format!("./{module}"))
    }
}

/// Wrapper invoked inline by the CDN on origin-request.
pub const SERVER_EDGE_MJS: Template<WrapperVars<'static>> =
    Template::new(include_str!("wrapper/server.edge.mjs"));

/// Wrapper invoked through the function's HTTPS endpoint.
pub const SERVER_REGIONAL_MJS: Template<WrapperVars<'static>> =
    Template::new(include_str!("wrapper/server.regional.mjs"));

// ============================================================================
// Request transforms
// ============================================================================

/// Variables for the request transform functions.
pub struct TransformVars<'a> {
    /// Statements, in order, run against `request` before it is returned.
    pub injections: &'a [&'a str],
}

impl TemplateVars for TransformVars<'_> {
    fn apply(&self, content: &str) -> String {
        let body = self
            .injections
            .iter()
            .map(|stmt| format!("  {}", stmt.trim()))
            .collect::<Vec<_>>()
            .join("\n");
        content.replace("  __INJECTIONS__", &body)
    }
}

pub const STATIC_REQUEST_JS: Template<TransformVars<'static>> =
    Template::new(include_str!("edge/static-request.js"));

pub const SERVER_REQUEST_JS: Template<TransformVars<'static>> =
    Template::new(include_str!("edge/server-request.js"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapper_module_is_relative_import() {
        for template in [SERVER_EDGE_MJS, SERVER_REGIONAL_MJS] {
            let js = template.render(&WrapperVars {
                server_module: "./entry.mjs",
            });
            assert!(js.contains("\"./entry.mjs\""));
            assert!(!js.contains("__SERVER_MODULE__"));
        }
    }

    #[test]
    fn test_injections_in_order() {
        let js = STATIC_REQUEST_JS.render(&TransformVars {
            injections: &["first();", "second();"],
        });
        let first = js.find("first();").unwrap();
        let second = js.find("second();").unwrap();
        assert!(first < second);
        assert!(js.contains("return request;"));
        assert!(!js.contains("__INJECTIONS__"));
    }
}
