//! Blocks Engine
//!
//! Type lattice, block schemas and the graph compiler that turns visual block
//! programs into target-language source.

pub mod compiler;
pub mod error;
pub mod graph;

pub use compiler::{CompileEvent, CompileOptions, CompileReport, Compiler, InputArgs};
pub use error::{EngineError, Result};
pub use graph::{
    BlockCatalog, BlockDecl, BlockSchema, ControlValue, GraphAccessor, GraphDescription, NodeInstance, PropDecl,
    Type, TypeRegistry, Value,
};

pub const ENGINE_NAME: &str = env!("CARGO_PKG_NAME");
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
