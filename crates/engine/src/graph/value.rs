//! Values flowing through a compile pass: control values read from the graph,
//! type values, and whatever a backend callback chooses to produce (usually code text).

use std::fmt;

use itertools::Itertools;
use serde::Serialize;

use super::type_system::{Type, TypeRegistry};
use super::ControlValue;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(f64),
    Text(String),
    Type(Type),
    /// Reference to another node of the graph by id
    Node(String),
    List(Vec<Value>),
}

impl Value {
    pub fn text(text: impl Into<String>) -> Self {
        Value::Text(text.into())
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<&Type> {
        match self {
            Value::Type(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Resolve a stored control value, looking up type names in `registry`.
    pub fn from_control(control: &ControlValue, registry: &TypeRegistry) -> Result<Self> {
        Ok(match control {
            ControlValue::Boolean(b) => Value::Bool(*b),
            ControlValue::Number(n) => Value::Number(*n),
            ControlValue::String(s) => Value::Text(s.clone()),
            ControlValue::Type(portable) => Value::Type(registry.from_portable(portable)?),
            ControlValue::Node(id) => Value::Node(id.clone()),
        })
    }

    /// The storable form of this value. Lists are never stored in a control.
    pub fn to_control(&self) -> Option<ControlValue> {
        match self {
            Value::Bool(b) => Some(ControlValue::Boolean(*b)),
            Value::Number(n) => Some(ControlValue::Number(*n)),
            Value::Text(s) => Some(ControlValue::String(s.clone())),
            Value::Type(t) => Some(ControlValue::Type(t.to_portable())),
            Value::Node(id) => Some(ControlValue::Node(id.clone())),
            Value::List(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            // Whole numbers print without a fraction at any magnitude; `+ 0.0` folds -0
            Value::Number(n) if n.is_finite() && n.fract() == 0.0 => write!(f, "{:.0}", n + 0.0),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
            Value::Type(t) => f.write_str(&t.to_type_string()),
            Value::Node(id) => f.write_str(id),
            Value::List(items) => write!(f, "{}", items.iter().join(", ")),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<Type> for Value {
    fn from(t: Type) -> Self {
        Value::Type(t)
    }
}
