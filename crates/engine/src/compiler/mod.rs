//! # The Block Graph Compiler
//!
//! Turns a node graph into target-language source by evaluating node outputs
//! on demand.
//!
//! ## Evaluation
//!
//! Computing an output runs the property's callback for the active compile key.
//! The callback pulls the node's inputs through a lazy [`InputArgs`] view, and
//! each input in turn computes the output of the node it is connected to:
//!
//! - **Forward types** read the connections arriving at the input socket
//! - **Reverse-flow types** (effects, members) read the connections leaving
//!   from the output socket of the same key
//! - **Unconnected inputs** fall back to the node's control value
//!
//! ## Fault isolation
//!
//! A callback failure becomes a warning event and an absent value for that one
//! output; every other output still compiles. Schema errors (unknown nodes,
//! blocks or properties) are returned to the caller.

use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{EngineError, Result};
use crate::graph::{
    BlockCatalog, BlockSchema, Direction, GraphAccessor, PropertyDescriptor, ResolveType, Side, Type,
    TypeRegistry, Value, TYPE_KEY,
};

pub mod events;
pub mod input_args;
pub mod program;

#[cfg(test)]
mod tests;

pub use events::CompileEvent;
pub use input_args::InputArgs;
pub use program::{CompileReport, CompiledOutput};

/// Replaces the per-property callback for every output.
pub type DefaultCompile =
    Arc<dyn Fn(&PropertyDescriptor, &str, &str, &Compiler<'_>) -> anyhow::Result<Option<Value>> + Send + Sync>;

/// Applied to every computed output and control value.
pub type PostCompile = Arc<dyn Fn(Option<Value>, &str, &str, &Compiler<'_>) -> Option<Value> + Send + Sync>;

#[derive(Clone, Default)]
pub struct CompileOptions {
    pub default_compile: Option<DefaultCompile>,
    pub post_compile: Option<PostCompile>,
}

impl CompileOptions {
    pub fn default_compile<F>(mut self, compile: F) -> Self
    where
        F: Fn(&PropertyDescriptor, &str, &str, &Compiler<'_>) -> anyhow::Result<Option<Value>>
            + Send
            + Sync
            + 'static,
    {
        self.default_compile = Some(Arc::new(compile));
        self
    }

    pub fn post_compile<F>(mut self, post: F) -> Self
    where
        F: Fn(Option<Value>, &str, &str, &Compiler<'_>) -> Option<Value> + Send + Sync + 'static,
    {
        self.post_compile = Some(Arc::new(post));
        self
    }
}

type Listener<'a> = Box<dyn Fn(&CompileEvent) + 'a>;

pub struct Compiler<'a> {
    graph: &'a dyn GraphAccessor,
    blocks: &'a BlockCatalog,
    types: &'a TypeRegistry,
    compile_key: String,
    options: CompileOptions,
    events: RefCell<Vec<CompileEvent>>,
    listeners: Vec<Listener<'a>>,
    in_progress: RefCell<HashSet<(String, String)>>,
}

/// Marks an output as being computed until dropped.
struct InProgress<'c> {
    set: &'c RefCell<HashSet<(String, String)>>,
    entry: (String, String),
}

impl Drop for InProgress<'_> {
    fn drop(&mut self) {
        self.set.borrow_mut().remove(&self.entry);
    }
}

impl<'a> Compiler<'a> {
    pub fn new(
        graph: &'a dyn GraphAccessor,
        blocks: &'a BlockCatalog,
        types: &'a TypeRegistry,
        compile_key: impl Into<String>,
    ) -> Self {
        Self {
            graph,
            blocks,
            types,
            compile_key: compile_key.into(),
            options: CompileOptions::default(),
            events: RefCell::new(Vec::new()),
            listeners: Vec::new(),
            in_progress: RefCell::new(HashSet::new()),
        }
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    /// Called synchronously for every event, in addition to collecting it.
    pub fn on_event(&mut self, listener: impl Fn(&CompileEvent) + 'a) {
        self.listeners.push(Box::new(listener));
    }

    pub fn compile_key(&self) -> &str {
        &self.compile_key
    }

    pub fn graph(&self) -> &'a dyn GraphAccessor {
        self.graph
    }

    pub fn blocks(&self) -> &'a BlockCatalog {
        self.blocks
    }

    pub fn types(&self) -> &'a TypeRegistry {
        self.types
    }

    /// Events emitted so far.
    pub fn events(&self) -> Vec<CompileEvent> {
        self.events.borrow().clone()
    }

    pub fn take_events(&self) -> Vec<CompileEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    pub(crate) fn emit(&self, event: CompileEvent) {
        for listener in &self.listeners {
            listener(&event);
        }
        self.events.borrow_mut().push(event);
    }

    /// Block schema of `node`.
    pub fn schema(&self, node: &str) -> Result<Arc<BlockSchema>> {
        let name = self
            .graph
            .block_name(node)
            .ok_or_else(|| EngineError::UnknownNode(node.to_string()))?;
        Ok(self.blocks.get(name)?.clone())
    }

    /// Compute the value of `node.key`.
    ///
    /// Callback failures and cycles resolve to `Ok(None)` with a warning event.
    pub fn get_output(&self, node: &str, key: &str) -> Result<Option<Value>> {
        let schema = self.schema(node)?;
        let prop = schema.try_prop(key)?;

        let Some(_guard) = self.enter(node, key) else {
            let err = EngineError::CycleDetected {
                node: node.to_string(),
                key: key.to_string(),
            };
            self.warn(node, &schema.name, key, err.to_string());
            return Ok(None);
        };

        tracing::debug!(node, block = %schema.name, key, compile_key = %self.compile_key, "Compiling output");
        let args = InputArgs::new(self, node, schema.clone());
        let result = if let Some(compile) = &self.options.default_compile {
            compile(prop, node, key, self)
        } else if let Some(compile) = prop.compiler(&self.compile_key) {
            compile(&args, node, self)
        } else {
            Ok(None)
        };

        match result {
            Ok(value) => Ok(self.post_process(value, node, key)),
            Err(err) => {
                self.warn(node, &schema.name, key, format!("{:#}", err));
                Ok(None)
            }
        }
    }

    /// Value flowing into `node.key`.
    ///
    /// A multi input yields a [`Value::List`] in connection order, skipping
    /// peers that resolved to nothing. Output properties yield `None`.
    pub fn get_input(&self, node: &str, key: &str) -> Result<Option<Value>> {
        let schema = self.schema(node)?;
        let prop = schema.try_prop(key)?;

        match prop.direction {
            Direction::Input => {
                let reversed = prop.ty.is_reversed();
                let side = if reversed { Side::Output } else { Side::Input };
                let peers = self.graph.connections(node, side, key);

                if prop.multi {
                    let mut values = Vec::with_capacity(peers.len());
                    for peer in &peers {
                        if let Some(value) = self.get_output(&peer.node, &peer.key)? {
                            values.push(value);
                        }
                    }
                    return Ok(Some(Value::List(values)));
                }
                if let Some(peer) = peers.first() {
                    return self.get_output(&peer.node, &peer.key);
                }
                if reversed {
                    return Ok(None);
                }
                self.graph
                    .control(node, key)
                    .map(|control| Value::from_control(&control, self.types))
                    .transpose()
            }
            Direction::Control => {
                let value = self
                    .graph
                    .control(node, key)
                    .map(|control| Value::from_control(&control, self.types))
                    .transpose()?;
                Ok(self.post_process(value, node, key))
            }
            Direction::Output => Ok(None),
        }
    }

    /// Lazy view over the inputs and controls of `node`.
    pub fn input_args(&self, node: &str) -> Result<InputArgs<'_, 'a>> {
        let schema = self.schema(node)?;
        Ok(InputArgs::new(self, node, schema))
    }

    /// Render a type for the active compile key.
    pub fn get_type_string(&self, ty: impl ResolveType) -> Result<String> {
        Ok(self.types.resolve(ty)?.render_for(&self.compile_key))
    }

    /// Type flowing into `node.key`, computed with the `type` callbacks over
    /// the same graph. Events of that pass are added to this compiler's.
    pub fn infer_type(&self, node: &str, key: &str) -> Result<Option<Type>> {
        let inference = Compiler::new(self.graph, self.blocks, self.types, TYPE_KEY);
        let value = inference.get_input(node, key)?;
        for event in inference.take_events() {
            self.emit(event);
        }
        Ok(value.and_then(|v| v.as_type().cloned()))
    }

    fn enter(&self, node: &str, key: &str) -> Option<InProgress<'_>> {
        let entry = (node.to_string(), key.to_string());
        if !self.in_progress.borrow_mut().insert(entry.clone()) {
            return None;
        }
        Some(InProgress {
            set: &self.in_progress,
            entry,
        })
    }

    fn post_process(&self, value: Option<Value>, node: &str, key: &str) -> Option<Value> {
        match &self.options.post_compile {
            Some(post) => post(value, node, key, self),
            None => value,
        }
    }

    fn warn(&self, node: &str, block: &str, key: &str, message: String) {
        tracing::warn!(node, block, key, "[{}.{}] {}", block, key, message);
        self.emit(CompileEvent::Warning {
            node: node.to_string(),
            block: block.to_string(),
            key: key.to_string(),
            message,
        });
    }
}
