//! Blocks command line compiler
//!
//! Loads a graph file, compiles every global block with the standard catalog
//! and reports the program along with any warnings.

pub mod config;
pub mod logging;

use std::path::Path;

use anyhow::{Context, Result};
use blocks_engine::graph::{GraphDescription, TypeRegistry};
use blocks_engine::{CompileReport, Compiler};

pub use config::{Cli, Config};

/// Compile a graph with the standard catalog.
pub fn compile_graph(graph: &GraphDescription, config: &Config) -> Result<CompileReport> {
    let types = TypeRegistry::with_builtin_types().context("Failed to build type lattice")?;
    let catalog = blocks_std::standard_catalog(&types).context("Failed to load block catalog")?;

    let mut compiler = Compiler::new(graph, &catalog, &types, config.compile_key.as_str());
    compiler.on_event(|event| tracing::debug!(node = event.node(), key = event.key(), "{}", event));
    let report = compiler.compile_program().context("Failed to compile graph")?;
    Ok(report)
}

/// Read and compile a graph file.
pub fn compile_file(path: &Path, config: &Config) -> Result<CompileReport> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read graph file {}", path.display()))?;
    let graph = GraphDescription::from_json(&json)
        .with_context(|| format!("Failed to parse graph file {}", path.display()))?;
    tracing::info!(graph = %graph.metadata.name, nodes = graph.nodes.len(), "Loaded graph");
    compile_graph(&graph, config)
}

/// Write `report` as pretty JSON.
pub fn write_report(report: &CompileReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write report {}", path.display()))
}
