//! Whole-program compilation: every output of every global node.

use serde::Serialize;

use crate::compiler::{CompileEvent, Compiler};
use crate::error::Result;
use crate::graph::{Endpoint, Value};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledOutput {
    pub node: String,
    pub block: String,
    pub key: String,
    pub value: Option<Value>,
}

/// Everything a compile pass produced. Outputs that failed are present with
/// no value; the reason is among the events.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompileReport {
    pub outputs: Vec<CompiledOutput>,
    pub events: Vec<CompileEvent>,
}

impl CompileReport {
    /// Computed values joined by `separator`.
    pub fn render(&self, separator: &str) -> String {
        self.outputs
            .iter()
            .filter_map(|output| output.value.as_ref())
            .map(Value::to_string)
            .collect::<Vec<_>>()
            .join(separator)
    }

    pub fn has_warnings(&self) -> bool {
        !self.events.is_empty()
    }
}

impl Compiler<'_> {
    /// Compile the outputs of all global nodes, in graph order.
    pub fn compile_program(&self) -> Result<CompileReport> {
        let mut targets = Vec::new();
        for node in self.graph().node_ids() {
            let schema = self.schema(&node)?;
            if !schema.global {
                continue;
            }
            for prop in schema.outputs() {
                targets.push(Endpoint {
                    node: node.clone(),
                    key: prop.key.clone(),
                });
            }
        }
        self.compile_outputs(&targets)
    }

    /// Compile the given outputs and collect the events raised on the way.
    pub fn compile_outputs(&self, targets: &[Endpoint]) -> Result<CompileReport> {
        let mut outputs = Vec::with_capacity(targets.len());
        for target in targets {
            let schema = self.schema(&target.node)?;
            let value = self.get_output(&target.node, &target.key)?;
            outputs.push(CompiledOutput {
                node: target.node.clone(),
                block: schema.name.clone(),
                key: target.key.clone(),
                value,
            });
        }

        let events = self.take_events();
        tracing::info!(
            compile_key = %self.compile_key(),
            outputs = outputs.len(),
            warnings = events.len(),
            "Compiled program"
        );
        Ok(CompileReport { outputs, events })
    }
}
