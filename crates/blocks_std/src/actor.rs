//! # Actor Blocks
//!
//! The top-level `Actor` (a global block, compiled as a program root), its
//! `Func` members and the statements collected into a member body.
//!
//! Members and statements are reverse-flow types: the actor's `members` input
//! and the function's `body` input are stored as connections leaving those
//! nodes.

use blocks_engine::graph::{names, BlockDecl, PropDecl, TypeRegistry, Value, MOTOKO};
use blocks_engine::Result;

use crate::patterns::statement_block;

pub fn blocks(types: &TypeRegistry) -> Result<Vec<BlockDecl>> {
    let identifier = types.resolve(names::IDENTIFIER)?;
    let text = types.resolve(names::TEXT)?;
    let unit_effect = types.instantiate(names::EFFECT, [types.unit_type()?])?;

    let actor = BlockDecl::split("Actor")
        .category("actors")
        .global()
        .input(PropDecl::new("name", identifier.clone()).optional())
        .input(PropDecl::new("members", types.resolve(names::MEMBER)?).multi())
        .output(
            PropDecl::new("actor", types.resolve(names::ACTOR)?).compile(MOTOKO, |args, _, _| {
                let name = args.get("name")?.map(|n| format!(" {}", n)).unwrap_or_default();
                let members = args.texts("members")?;
                Ok(Some(Value::text(format!("actor{} {{ {} }};", name, members.join(" ")))))
            }),
        );

    let func = BlockDecl::split("Func")
        .category("members")
        .input(PropDecl::new("name", identifier))
        .input(PropDecl::new("body", unit_effect.clone()).multi())
        .output(
            PropDecl::new("member", types.resolve(names::MEMBER)?).compile(MOTOKO, |args, node, _| {
                let Some(name) = args.get("name")? else {
                    anyhow::bail!("Function {} has no name", node);
                };
                let body = args.texts("body")?;
                Ok(Some(Value::text(format!(
                    "public func {}() : async () {{ {} }};",
                    name,
                    body.join(" ")
                ))))
            }),
        );

    let print = statement_block(
        "Print",
        unit_effect,
        vec![PropDecl::new("message", text)],
        |args| Ok(format!("Debug.print({});", args.text("message")?)),
    );

    Ok(vec![actor, func, print])
}
