use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use crate::compiler::events::CompileEvent;
use crate::compiler::Compiler;
use crate::error::{EngineError, Result};
use crate::graph::{BlockSchema, Value};

/// Input and control values of one node, computed on first read.
///
/// Scoped to a single output computation: values are memoized for the life of
/// this struct and never shared between calls.
pub struct InputArgs<'c, 'a> {
    compiler: &'c Compiler<'a>,
    node: String,
    schema: Arc<BlockSchema>,
    cache: RefCell<HashMap<String, Option<Value>>>,
}

impl<'c, 'a> InputArgs<'c, 'a> {
    pub(crate) fn new(compiler: &'c Compiler<'a>, node: &str, schema: Arc<BlockSchema>) -> Self {
        Self {
            compiler,
            node: node.to_string(),
            schema,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn schema(&self) -> &BlockSchema {
        &self.schema
    }

    /// Keys readable through [`InputArgs::get`], in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.schema
            .props()
            .iter()
            .filter(|p| !p.is_output())
            .map(|p| p.key.as_str())
    }

    /// Value of an input or control property.
    ///
    /// An absent required value emits a `MissingInput` event the first time it
    /// is read.
    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        if let Some(value) = self.cache.borrow().get(key) {
            return Ok(value.clone());
        }

        let prop = match self.schema.prop(key) {
            Some(prop) if !prop.is_output() => prop,
            _ => {
                return Err(EngineError::UnknownInput {
                    block: self.schema.name.clone(),
                    key: key.to_string(),
                })
            }
        };

        let value = self.compiler.get_input(&self.node, key)?;
        if value.is_none() && !prop.optional {
            tracing::warn!(node = %self.node, block = %self.schema.name, key, "Missing input");
            self.compiler.emit(CompileEvent::MissingInput {
                node: self.node.clone(),
                block: self.schema.name.clone(),
                key: key.to_string(),
            });
        }

        self.cache.borrow_mut().insert(key.to_string(), value.clone());
        Ok(value)
    }

    /// Rendered value of `key`, empty when absent.
    pub fn text(&self, key: &str) -> Result<String> {
        Ok(self.get(key)?.map(|v| v.to_string()).unwrap_or_default())
    }

    /// Rendered items of a multi input. A scalar yields one item.
    pub fn texts(&self, key: &str) -> Result<Vec<String>> {
        Ok(match self.get(key)? {
            Some(Value::List(items)) => items.iter().map(Value::to_string).collect(),
            Some(value) => vec![value.to_string()],
            None => Vec::new(),
        })
    }

    /// Compute every readable value up front.
    pub fn prefetch(&self) -> Result<()> {
        let keys: Vec<String> = self.keys().map(str::to_string).collect();
        for key in keys {
            self.get(&key)?;
        }
        Ok(())
    }
}
