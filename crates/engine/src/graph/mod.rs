use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub mod builtin_types;
pub mod schema;
pub mod type_system;
pub mod value;

pub use builtin_types::{names, MOTOKO, TYPE_KEY};
pub use schema::*;
pub use type_system::*;
pub use value::Value;

use crate::error::{EngineError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphDescription {
    pub nodes: Vec<NodeInstance>,
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub metadata: GraphMetadata,
}

/// One placed block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInstance {
    pub id: String,
    /// Name of the block schema
    pub block: String,
    #[serde(default)]
    pub controls: BTreeMap<String, ControlValue>,
}

/// A link from an output socket to an input socket. Order among connections
/// sharing a socket is the order they appear in [`GraphDescription::connections`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub source_node: String,
    pub source_pin: String,
    pub target_node: String,
    pub target_pin: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphMetadata {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ControlValue {
    Boolean(bool),
    Number(f64),
    String(String),
    Type(PortableType),
    Node(String),
}

/// Which socket of a property a connection is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Input,
    Output,
}

/// The far end of a connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub node: String,
    pub key: String,
}

/// What the compiler needs from a node graph.
pub trait GraphAccessor {
    /// Block schema name of `node`, or `None` if there is no such node.
    fn block_name(&self, node: &str) -> Option<&str>;

    /// Peers connected to the `side` socket of `node.key`, in connection order.
    fn connections(&self, node: &str, side: Side, key: &str) -> Vec<Endpoint>;

    fn control(&self, node: &str, key: &str) -> Option<ControlValue>;

    fn node_ids(&self) -> Vec<String>;
}

impl GraphDescription {
    pub fn new(name: &str) -> Self {
        Self {
            nodes: Vec::new(),
            connections: Vec::new(),
            metadata: GraphMetadata {
                name: name.to_string(),
                description: String::new(),
                version: "1.0.0".to_string(),
            },
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn node(&self, id: &str) -> Option<&NodeInstance> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut NodeInstance> {
        self.nodes.iter_mut().find(|node| node.id == id)
    }

    /// Adds `node`, replacing any node with the same id.
    pub fn add_node(&mut self, node: NodeInstance) {
        match self.nodes.iter().position(|n| n.id == node.id) {
            Some(index) => self.nodes[index] = node,
            None => self.nodes.push(node),
        }
    }

    pub fn connect(&mut self, source_node: &str, source_pin: &str, target_node: &str, target_pin: &str) -> Result<()> {
        for id in [source_node, target_node] {
            if self.node(id).is_none() {
                return Err(EngineError::UnknownNode(id.to_string()));
            }
        }
        self.connections.push(Connection::new(source_node, source_pin, target_node, target_pin));
        Ok(())
    }

    pub fn remove_node(&mut self, node_id: &str) {
        // Remove all connections involving this node
        self.connections
            .retain(|conn| conn.source_node != node_id && conn.target_node != node_id);
        self.nodes.retain(|node| node.id != node_id);
    }

    pub fn set_control(&mut self, node_id: &str, key: &str, value: ControlValue) -> Result<()> {
        let node = self
            .node_mut(node_id)
            .ok_or_else(|| EngineError::UnknownNode(node_id.to_string()))?;
        node.controls.insert(key.to_string(), value);
        Ok(())
    }
}

impl GraphAccessor for GraphDescription {
    fn block_name(&self, node: &str) -> Option<&str> {
        self.node(node).map(|n| n.block.as_str())
    }

    fn connections(&self, node: &str, side: Side, key: &str) -> Vec<Endpoint> {
        self.connections
            .iter()
            .filter_map(|conn| match side {
                Side::Input if conn.target_node == node && conn.target_pin == key => Some(Endpoint {
                    node: conn.source_node.clone(),
                    key: conn.source_pin.clone(),
                }),
                Side::Output if conn.source_node == node && conn.source_pin == key => Some(Endpoint {
                    node: conn.target_node.clone(),
                    key: conn.target_pin.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    fn control(&self, node: &str, key: &str) -> Option<ControlValue> {
        self.node(node)?.controls.get(key).cloned()
    }

    fn node_ids(&self) -> Vec<String> {
        self.nodes.iter().map(|node| node.id.clone()).collect()
    }
}

impl NodeInstance {
    pub fn new(id: &str, block: &str) -> Self {
        Self {
            id: id.to_string(),
            block: block.to_string(),
            controls: BTreeMap::new(),
        }
    }

    /// A fresh node of `schema`. Every control property, and every single
    /// forward input whose type has a default, gets a control seeded with
    /// that default.
    pub fn from_schema(id: &str, schema: &BlockSchema) -> Self {
        let mut node = Self::new(id, &schema.name);
        for prop in schema.props() {
            let wants_control = prop.is_control()
                || (prop.is_input() && !prop.multi && !prop.ty.is_reversed());
            if !wants_control {
                continue;
            }
            if let Some(control) = prop.ty.default_value().and_then(|v| v.to_control()) {
                node.controls.insert(prop.key.clone(), control);
            }
        }
        node
    }

    pub fn with_control(mut self, key: &str, value: ControlValue) -> Self {
        self.controls.insert(key.to_string(), value);
        self
    }
}

impl Connection {
    pub fn new(source_node: &str, source_pin: &str, target_node: &str, target_pin: &str) -> Self {
        Self {
            source_node: source_node.to_string(),
            source_pin: source_pin.to_string(),
            target_node: target_node.to_string(),
            target_pin: target_pin.to_string(),
        }
    }
}

impl From<bool> for ControlValue {
    fn from(b: bool) -> Self {
        ControlValue::Boolean(b)
    }
}

impl From<f64> for ControlValue {
    fn from(n: f64) -> Self {
        ControlValue::Number(n)
    }
}

impl From<&str> for ControlValue {
    fn from(s: &str) -> Self {
        ControlValue::String(s.to_string())
    }
}

impl From<String> for ControlValue {
    fn from(s: String) -> Self {
        ControlValue::String(s)
    }
}
