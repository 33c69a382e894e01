use std::fmt;

use serde::Serialize;

/// Soft problems reported while compiling. Compilation carries on after each.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompileEvent {
    /// A required input had neither a connection nor a control value
    MissingInput { node: String, block: String, key: String },
    /// An output could not be computed and resolved to absent
    Warning {
        node: String,
        block: String,
        key: String,
        message: String,
    },
}

impl CompileEvent {
    pub fn node(&self) -> &str {
        match self {
            CompileEvent::MissingInput { node, .. } | CompileEvent::Warning { node, .. } => node,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            CompileEvent::MissingInput { key, .. } | CompileEvent::Warning { key, .. } => key,
        }
    }
}

impl fmt::Display for CompileEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileEvent::MissingInput { node, block, key } => {
                write!(f, "Missing input on {} ({}): {}", block, node, key)
            }
            CompileEvent::Warning {
                node,
                block,
                key,
                message,
            } => write!(f, "[{}.{}] ({}) {}", block, key, node, message),
        }
    }
}
