//! `[transform]` section configuration.
//!
//! Opaque tables merged into the provisioning specs of the server function,
//! the asset bucket, the distribution and its behaviors. Their shape belongs
//! to the provisioning engine and is not checked here beyond being tables.
//!
//! ```toml
//! [transform.server]
//! tracing = "Active"
//!
//! [transform.distribution]
//! price_class = "PriceClass_100"
//!
//! [transform.static_behaviors]   # every static route
//! response_headers_policy = "security-headers"
//!
//! [transform.server_behavior]    # the catch-all
//! realtime_logs = true
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::plan::Transforms;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    pub server: Option<Value>,
    pub assets: Option<Value>,
    pub distribution: Option<Value>,
    pub static_behaviors: Option<Value>,
    pub server_behavior: Option<Value>,
}

pub struct TransformFields {
    pub server: FieldPath,
    pub assets: FieldPath,
    pub distribution: FieldPath,
    pub static_behaviors: FieldPath,
    pub server_behavior: FieldPath,
}

impl TransformConfig {
    pub const FIELDS: TransformFields = TransformFields {
        server: FieldPath::new("transform.server"),
        assets: FieldPath::new("transform.assets"),
        distribution: FieldPath::new("transform.distribution"),
        static_behaviors: FieldPath::new("transform.static_behaviors"),
        server_behavior: FieldPath::new("transform.server_behavior"),
    };

    pub fn transforms(&self) -> Transforms {
        Transforms {
            server: self.server.clone(),
            assets: self.assets.clone(),
            distribution: self.distribution.clone(),
            static_behaviors: self.static_behaviors.clone(),
            server_behavior: self.server_behavior.clone(),
        }
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        let fields = &Self::FIELDS;
        for (field, value) in [
            (fields.server, &self.server),
            (fields.assets, &self.assets),
            (fields.distribution, &self.distribution),
            (fields.static_behaviors, &self.static_behaviors),
            (fields.server_behavior, &self.server_behavior),
        ] {
            if value.as_ref().is_some_and(|v| !v.is_object()) {
                diag.error(field, "must be a table");
            }
        }
    }
}
