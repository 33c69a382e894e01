//! The bootstrap lattice.
//!
//! Two disjoint roots: `Any` for values flowing from outputs into inputs, and
//! `AnyReversed` for statement-like types (effects, members, actors) whose
//! connections are traversed the other way around.

use itertools::Itertools;

use super::type_system::{Type, TypeDecl, TypeRegistry};
use super::value::Value;
use crate::error::Result;

/// Compile key of the Motoko backend.
pub const MOTOKO: &str = "motoko";

/// Compile key used for type inference.
pub const TYPE_KEY: &str = "type";

pub mod names {
    pub const ANY: &str = "Any";
    pub const ANY_REVERSED: &str = "AnyReversed";
    pub const TYPE: &str = "Type";
    pub const NODE: &str = "Node";
    pub const VALUE: &str = "Value";
    pub const IDENTIFIER: &str = "Identifier";
    pub const EFFECT: &str = "Effect";
    pub const MEMBER: &str = "Member";
    pub const ACTOR: &str = "Actor";
    pub const MODULE: &str = "Module";
    pub const PARAM: &str = "Param";
    pub const BOOL: &str = "Bool";
    pub const CHAR: &str = "Char";
    pub const TEXT: &str = "Text";
    pub const FLOAT: &str = "Float";
    pub const INT: &str = "Int";
    pub const NAT: &str = "Nat";
    pub const BLOB: &str = "Blob";
    pub const PRINCIPAL: &str = "Principal";
    pub const ERROR: &str = "Error";
    pub const TUPLE: &str = "Tuple";
    pub const OBJECT: &str = "Object";
    pub const FUNCTION: &str = "Function";
    pub const OPTIONAL: &str = "Optional";
    pub const ASYNC: &str = "Async";
}

use names::*;

fn first(generics: &[String]) -> String {
    generics.first().cloned().unwrap_or_default()
}

fn tuple_string(generics: &[String], ty: &Type) -> String {
    if ty.is_base() {
        ty.name().to_string()
    } else {
        format!("({})", generics.join(", "))
    }
}

fn field_names<'a>(generics: &'a [String], ty: &'a Type) -> impl Iterator<Item = (String, &'a String)> {
    generics.iter().enumerate().map(move |(i, g)| {
        let name = ty
            .data()
            .generic_names
            .get(i)
            .cloned()
            .unwrap_or_else(|| format!("_{}", i));
        (name, g)
    })
}

impl TypeRegistry {
    /// A registry holding the full bootstrap lattice.
    pub fn with_builtin_types() -> Result<Self> {
        let mut registry = TypeRegistry::new();
        register_builtin_types(&mut registry)?;
        Ok(registry)
    }

    /// `Tuple` with no generics.
    pub fn unit_type(&self) -> Result<Type> {
        self.instantiate(TUPLE, Vec::<Type>::new())
    }
}

pub fn register_builtin_types(registry: &mut TypeRegistry) -> Result<()> {
    registry.register(TypeDecl::new(ANY).category("default").reversed(false))?;
    registry.register(TypeDecl::new(ANY_REVERSED).category("default").reversed(true))?;

    registry.register(
        TypeDecl::new(TYPE)
            .parent(ANY)
            .category("types")
            .generic(ANY)
            .default_value_with(|ty| ty.generics().first().cloned().map(Value::Type)),
    )?;
    registry.register(TypeDecl::new(NODE).parent(ANY).category("nodes"))?;

    // Categories
    registry.register(TypeDecl::new(VALUE).parent(ANY).abstract_type().category("values"))?;
    registry.register(TypeDecl::new(IDENTIFIER).parent(ANY))?;
    registry.register(
        TypeDecl::new(EFFECT)
            .parent(ANY_REVERSED)
            .category("effects")
            .generic(VALUE)
            .renderer(MOTOKO, |generics, _| first(generics)),
    )?;
    registry.register(TypeDecl::new(MEMBER).parent(ANY_REVERSED).category("members"))?;
    registry.register(TypeDecl::new(ACTOR).parent(ANY_REVERSED).category("actors"))?;
    registry.register(TypeDecl::new(MODULE).parent(ANY_REVERSED).category("modules"))?;
    registry.register(TypeDecl::new(PARAM).parent(ANY_REVERSED).category("parameters"))?;

    // Values
    registry.register(TypeDecl::new(BOOL).parent(VALUE).default_value(false))?;
    registry.register(TypeDecl::new(CHAR).parent(VALUE))?;
    registry.register(TypeDecl::new(TEXT).parent(VALUE).default_value(""))?;
    registry.register(TypeDecl::new(FLOAT).parent(VALUE).default_value(0.0))?;
    registry.register(TypeDecl::new(INT).parent(FLOAT).category("integers"))?;
    registry.register(TypeDecl::new(NAT).parent(FLOAT).category("naturals"))?;
    registry.register(TypeDecl::new(BLOB).parent(VALUE))?;
    registry.register(TypeDecl::new(PRINCIPAL).parent(VALUE))?;
    registry.register(TypeDecl::new(ERROR).parent(VALUE))?;
    registry.register(
        TypeDecl::new(TUPLE)
            .parent(VALUE)
            .abstract_type()
            .arbitrary_generics()
            .category("tuples")
            .type_string(tuple_string),
    )?;
    registry.register(
        TypeDecl::new(OBJECT)
            .parent(VALUE)
            .abstract_type()
            .arbitrary_generics()
            .category("objects")
            .type_string(|generics, ty| {
                let fields = field_names(generics, ty).map(|(name, g)| format!("{}: {}", name, g));
                format!("({})", fields.format(", "))
            })
            .renderer(MOTOKO, |generics, ty| {
                let fields = field_names(generics, ty).map(|(name, g)| format!("{} : {}", name, g));
                format!("{{ {} }}", fields.format("; "))
            }),
    )?;
    registry.register(
        TypeDecl::new(FUNCTION)
            .parent(VALUE)
            .generic(VALUE)
            .generic(VALUE)
            .generic_names(["input", "output"])
            .category("functions")
            .type_string(|generics, _| generics.iter().join(" -> ")),
    )?;
    registry.register(
        TypeDecl::new(OPTIONAL)
            .parent(VALUE)
            .generic(VALUE)
            .category("optionals")
            .renderer(MOTOKO, |generics, _| format!("?{}", first(generics))),
    )?;
    registry.register(
        TypeDecl::new(ASYNC)
            .parent(VALUE)
            .generic(VALUE)
            .category("futures")
            .renderer(MOTOKO, |generics, _| format!("async {}", first(generics))),
    )?;

    tracing::debug!(count = registry.len(), "Registered builtin types");
    Ok(())
}
