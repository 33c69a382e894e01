//! # Math Blocks
//!
//! Integer arithmetic and text concatenation.

use blocks_engine::graph::{names, BlockDecl, TypeRegistry};
use blocks_engine::Result;

use crate::patterns::binary_operator_block;

pub fn blocks(types: &TypeRegistry) -> Result<Vec<BlockDecl>> {
    let int = types.resolve(names::INT)?;
    let text = types.resolve(names::TEXT)?;
    Ok(vec![
        binary_operator_block("Add", int.clone(), "+").category("math"),
        binary_operator_block("Subtract", int.clone(), "-").category("math"),
        binary_operator_block("Multiply", int, "*").category("math"),
        // Motoko concatenates text with `#`
        binary_operator_block("Concat", text, "#").category("text"),
    ])
}
