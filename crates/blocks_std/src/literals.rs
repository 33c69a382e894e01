//! # Literal Blocks
//!
//! One block per primitive value type, each holding its value in a control.

use blocks_engine::graph::{names, BlockDecl, TypeRegistry, Value};
use blocks_engine::Result;

use crate::patterns::{literal_block, quote_char, quote_text};

fn render_plain(value: &Value) -> anyhow::Result<String> {
    Ok(value.to_string())
}

fn render_text(value: &Value) -> anyhow::Result<String> {
    Ok(quote_text(&value.to_string()))
}

fn render_char(value: &Value) -> anyhow::Result<String> {
    quote_char(&value.to_string())
}

fn render_float(value: &Value) -> anyhow::Result<String> {
    Ok(match value.as_number() {
        Some(n) => format!("{:?}", n),
        None => value.to_string(),
    })
}

fn render_nat(value: &Value) -> anyhow::Result<String> {
    match value.as_number() {
        Some(n) if n < 0.0 => anyhow::bail!("Nat literal {} is negative", value),
        _ => Ok(value.to_string()),
    }
}

pub fn blocks(types: &TypeRegistry) -> Result<Vec<BlockDecl>> {
    Ok(vec![
        literal_block("LiteralBool", types.resolve(names::BOOL)?, render_plain),
        literal_block("LiteralInt", types.resolve(names::INT)?, render_plain),
        literal_block("LiteralNat", types.resolve(names::NAT)?, render_nat),
        literal_block("LiteralFloat", types.resolve(names::FLOAT)?, render_float),
        literal_block("LiteralText", types.resolve(names::TEXT)?, render_text),
        literal_block("LiteralChar", types.resolve(names::CHAR)?, render_char),
    ])
}
