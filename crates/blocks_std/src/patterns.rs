//! # Block Patterns
//!
//! Builders for the shapes most blocks share:
//! - Literals (a control value exposed as an output)
//! - Unary and binary operators over one value type
//! - Statements (effects chained into a member body)

use blocks_engine::graph::{BlockDecl, PropDecl, Type, Value, MOTOKO, TYPE_KEY};
use blocks_engine::InputArgs;

/// Property key of a literal's control.
pub const VALUE: &str = "value";
/// Output key of literals and operators.
pub const RESULT: &str = "result";
/// Output key of statements.
pub const STATEMENT: &str = "statement";

/// Renders a literal value as Motoko source. An error surfaces as a warning
/// on the literal's output.
pub type LiteralRenderer = fn(&Value) -> anyhow::Result<String>;

/// A block holding one value of `ty` in a control.
///
/// The output renders the control with `render`; under the `type` key it
/// reports `ty`.
pub fn literal_block(name: &str, ty: Type, render: LiteralRenderer) -> BlockDecl {
    let inferred = ty.clone();
    BlockDecl::unified(
        name,
        [
            PropDecl::new(VALUE, ty.clone()).control(),
            PropDecl::new(RESULT, ty)
                .output()
                .compile(MOTOKO, move |args, _, _| {
                    Ok(args.get(VALUE)?.map(|v| render(&v)).transpose()?.map(Value::text))
                })
                .compile(TYPE_KEY, move |_, _, _| Ok(Some(Value::Type(inferred.clone())))),
        ],
    )
    .category("literals")
}

/// `(a op b)` over two inputs of `ty`.
pub fn binary_operator_block(name: &str, ty: Type, operator: &'static str) -> BlockDecl {
    let inferred = ty.clone();
    BlockDecl::split(name)
        .input(PropDecl::new("a", ty.clone()))
        .input(PropDecl::new("b", ty.clone()))
        .output(
            PropDecl::new(RESULT, ty)
                .compile(MOTOKO, move |args, _, _| {
                    Ok(Some(Value::text(format!(
                        "({} {} {})",
                        args.text("a")?,
                        operator,
                        args.text("b")?
                    ))))
                })
                .compile(TYPE_KEY, move |_, _, _| Ok(Some(Value::Type(inferred.clone())))),
        )
        .category("operators")
}

/// `(op value)` over one input of `ty`.
pub fn unary_operator_block(name: &str, ty: Type, operator: &'static str) -> BlockDecl {
    let inferred = ty.clone();
    BlockDecl::split(name)
        .input(PropDecl::new(VALUE, ty.clone()))
        .output(
            PropDecl::new(RESULT, ty)
                .compile(MOTOKO, move |args, _, _| {
                    Ok(Some(Value::text(format!("({} {})", operator, args.text(VALUE)?))))
                })
                .compile(TYPE_KEY, move |_, _, _| Ok(Some(Value::Type(inferred.clone())))),
        )
        .category("operators")
}

/// A statement over `inputs`, rendered by `render` into an `effect`-typed
/// output that member bodies collect.
pub fn statement_block<F>(name: &str, effect: Type, inputs: Vec<PropDecl>, render: F) -> BlockDecl
where
    F: Fn(&InputArgs<'_, '_>) -> anyhow::Result<String> + Send + Sync + 'static,
{
    let decl = inputs
        .into_iter()
        .fold(BlockDecl::split(name), |decl, prop| decl.input(prop));
    decl.output(
        PropDecl::new(STATEMENT, effect)
            .compile(MOTOKO, move |args, _, _| Ok(Some(Value::text(render(args)?)))),
    )
    .category("statements")
}

/// Motoko text literal.
pub fn quote_text(text: &str) -> String {
    format!("\"{}\"", text.escape_default())
}

/// Motoko char literal of the first character of `text`.
pub fn quote_char(text: &str) -> anyhow::Result<String> {
    let Some(c) = text.chars().next() else {
        anyhow::bail!("Char literal is empty");
    };
    Ok(format!("'{}'", c.escape_default()))
}
