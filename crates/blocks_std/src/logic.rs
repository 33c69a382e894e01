//! # Logic Blocks
//!
//! Boolean operators over `Bool`: And, Or, Not.

use blocks_engine::graph::{names, BlockDecl, TypeRegistry};
use blocks_engine::Result;

use crate::patterns::{binary_operator_block, unary_operator_block};

pub fn blocks(types: &TypeRegistry) -> Result<Vec<BlockDecl>> {
    let bool_ty = types.resolve(names::BOOL)?;
    Ok(vec![
        binary_operator_block("And", bool_ty.clone(), "and").category("logic"),
        binary_operator_block("Or", bool_ty.clone(), "or").category("logic"),
        unary_operator_block("Not", bool_ty, "not").category("logic"),
    ])
}
