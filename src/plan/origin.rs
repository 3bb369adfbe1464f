//! Origins: named backends a behavior routes to.

use serde::Serialize;
use serde_json::Value;

use super::FunctionRef;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Origin {
    pub name: String,
    #[serde(flatten)]
    pub kind: OriginKind,
    /// Opaque pass-through for the engine.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OriginKind {
    /// Asset bucket. `origin_path` is the key prefix requests are mapped to.
    Storage { origin_path: String },
    /// Regional server function reached over HTTPS.
    Function { function: FunctionRef },
}

impl Origin {
    pub fn storage(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: OriginKind::Storage {
                origin_path: "/".to_string(),
            },
            transform: None,
        }
    }

    pub fn function(name: impl Into<String>, function: FunctionRef) -> Self {
        Self {
            name: name.into(),
            kind: OriginKind::Function { function },
            transform: None,
        }
    }

    pub fn with_transform(mut self, transform: Option<Value>) -> Self {
        self.transform = transform;
        self
    }

    #[inline]
    pub const fn is_storage(&self) -> bool {
        matches!(self.kind, OriginKind::Storage { .. })
    }

    /// The function this origin fronts, if it is function-backed.
    pub fn backing_function(&self) -> Option<&FunctionRef> {
        match &self.kind {
            OriginKind::Function { function } => Some(function),
            OriginKind::Storage { .. } => None,
        }
    }
}
