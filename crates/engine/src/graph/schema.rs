//! # Block Schemas
//!
//! A block declares its properties either as one unified list, where each
//! entry's direction is inferred (output over input over control), or as three
//! separate input/output/control lists. [`normalize`] turns both shapes into the
//! same keyed [`BlockSchema`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::type_system::Type;
use super::value::Value;
use crate::compiler::{Compiler, InputArgs};
use crate::error::{EngineError, Result};

/// Backend callback computing one output of a node.
///
/// Receives the node's lazy input arguments, the node id and the compiler.
pub type OutputCompiler =
    Arc<dyn Fn(&InputArgs<'_, '_>, &str, &Compiler<'_>) -> anyhow::Result<Option<Value>> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Input,
    Output,
    Control,
}

/// A property as declared, before its direction is settled.
#[derive(Clone)]
pub struct PropDecl {
    key: String,
    ty: Type,
    input: bool,
    output: bool,
    control: bool,
    multi: bool,
    optional: bool,
    compilers: HashMap<String, OutputCompiler>,
}

impl PropDecl {
    pub fn new(key: impl Into<String>, ty: Type) -> Self {
        Self {
            key: key.into(),
            ty,
            input: false,
            output: false,
            control: false,
            multi: false,
            optional: false,
            compilers: HashMap::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn input(mut self) -> Self {
        self.input = true;
        self
    }

    pub fn output(mut self) -> Self {
        self.output = true;
        self
    }

    pub fn control(mut self) -> Self {
        self.control = true;
        self
    }

    pub fn multi(mut self) -> Self {
        self.multi = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Attach the callback used to compile this property under `compile_key`.
    pub fn compile<F>(mut self, compile_key: impl Into<String>, compile: F) -> Self
    where
        F: Fn(&InputArgs<'_, '_>, &str, &Compiler<'_>) -> anyhow::Result<Option<Value>>
            + Send
            + Sync
            + 'static,
    {
        self.compilers.insert(compile_key.into(), Arc::new(compile));
        self
    }

    /// Output wins over input, input over control.
    fn inferred_direction(&self) -> Option<Direction> {
        if self.output {
            Some(Direction::Output)
        } else if self.input {
            Some(Direction::Input)
        } else if self.control {
            Some(Direction::Control)
        } else {
            None
        }
    }

    fn describe(&self, direction: Direction) -> PropertyDescriptor {
        PropertyDescriptor {
            key: self.key.clone(),
            ty: self.ty.clone(),
            direction,
            multi: self.multi,
            optional: self.optional,
            compilers: self.compilers.clone(),
        }
    }
}

impl fmt::Debug for PropDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropDecl")
            .field("key", &self.key)
            .field("ty", &self.ty)
            .field("input", &self.input)
            .field("output", &self.output)
            .field("control", &self.control)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum PropsShape {
    Unified(Vec<Arc<PropDecl>>),
    Split {
        inputs: Vec<Arc<PropDecl>>,
        outputs: Vec<Arc<PropDecl>>,
        controls: Vec<Arc<PropDecl>>,
    },
}

/// Raw declaration of a block kind.
#[derive(Debug, Clone)]
pub struct BlockDecl {
    pub name: String,
    pub category: Option<String>,
    /// Global blocks are the roots of whole-program compilation
    pub global: bool,
    pub shape: PropsShape,
}

impl BlockDecl {
    pub fn unified(name: impl Into<String>, props: impl IntoIterator<Item = PropDecl>) -> Self {
        Self {
            name: name.into(),
            category: None,
            global: false,
            shape: PropsShape::Unified(props.into_iter().map(Arc::new).collect()),
        }
    }

    pub fn split(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: None,
            global: false,
            shape: PropsShape::Split {
                inputs: Vec::new(),
                outputs: Vec::new(),
                controls: Vec::new(),
            },
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn global(mut self) -> Self {
        self.global = true;
        self
    }

    pub fn input(self, prop: impl Into<Arc<PropDecl>>) -> Self {
        self.push(Direction::Input, prop.into())
    }

    pub fn output(self, prop: impl Into<Arc<PropDecl>>) -> Self {
        self.push(Direction::Output, prop.into())
    }

    pub fn control(self, prop: impl Into<Arc<PropDecl>>) -> Self {
        self.push(Direction::Control, prop.into())
    }

    fn push(mut self, direction: Direction, mut prop: Arc<PropDecl>) -> Self {
        match &mut self.shape {
            PropsShape::Unified(props) => {
                // A unified list reads direction from the flags
                if prop.inferred_direction().is_none() {
                    let decl = Arc::make_mut(&mut prop);
                    match direction {
                        Direction::Input => decl.input = true,
                        Direction::Output => decl.output = true,
                        Direction::Control => decl.control = true,
                    }
                }
                props.push(prop);
            }
            PropsShape::Split {
                inputs,
                outputs,
                controls,
            } => match direction {
                Direction::Input => inputs.push(prop),
                Direction::Output => outputs.push(prop),
                Direction::Control => controls.push(prop),
            },
        }
        self
    }
}

/// A normalized property.
#[derive(Clone)]
pub struct PropertyDescriptor {
    pub key: String,
    pub ty: Type,
    pub direction: Direction,
    pub multi: bool,
    pub optional: bool,
    compilers: HashMap<String, OutputCompiler>,
}

impl PropertyDescriptor {
    pub fn compiler(&self, compile_key: &str) -> Option<&OutputCompiler> {
        self.compilers.get(compile_key)
    }

    pub fn is_input(&self) -> bool {
        self.direction == Direction::Input
    }

    pub fn is_output(&self) -> bool {
        self.direction == Direction::Output
    }

    pub fn is_control(&self) -> bool {
        self.direction == Direction::Control
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.compilers.keys().collect();
        keys.sort();
        f.debug_struct("PropertyDescriptor")
            .field("key", &self.key)
            .field("ty", &self.ty)
            .field("direction", &self.direction)
            .field("multi", &self.multi)
            .field("optional", &self.optional)
            .field("compilers", &keys)
            .finish()
    }
}

/// Immutable property table of one block kind.
#[derive(Debug, Clone)]
pub struct BlockSchema {
    pub name: String,
    pub category: Option<String>,
    pub global: bool,
    props: Vec<PropertyDescriptor>,
    index: HashMap<String, usize>,
}

impl BlockSchema {
    pub fn prop(&self, key: &str) -> Option<&PropertyDescriptor> {
        self.index.get(key).map(|&i| &self.props[i])
    }

    pub fn try_prop(&self, key: &str) -> Result<&PropertyDescriptor> {
        self.prop(key).ok_or_else(|| EngineError::PropertyNotFound {
            block: self.name.clone(),
            key: key.to_string(),
        })
    }

    /// Properties in merge order.
    pub fn props(&self) -> &[PropertyDescriptor] {
        &self.props
    }

    pub fn inputs(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.props.iter().filter(|p| p.is_input())
    }

    pub fn outputs(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.props.iter().filter(|p| p.is_output())
    }

    pub fn controls(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.props.iter().filter(|p| p.is_control())
    }
}

struct SchemaBuilder<'a> {
    block: &'a str,
    claimed: HashMap<String, (usize, Arc<PropDecl>)>,
    props: Vec<PropertyDescriptor>,
}

impl<'a> SchemaBuilder<'a> {
    fn claim(&mut self, prop: &Arc<PropDecl>, direction: Direction) -> Result<()> {
        if let Some((_, existing)) = self.claimed.get(&prop.key) {
            if Arc::ptr_eq(existing, prop) {
                return Ok(());
            }
            return Err(EngineError::DuplicateProperty {
                block: self.block.to_string(),
                key: prop.key.clone(),
            });
        }
        self.claimed
            .insert(prop.key.clone(), (self.props.len(), prop.clone()));
        self.props.push(prop.describe(direction));
        Ok(())
    }
}

/// Merge a block declaration into its property table.
pub fn normalize(decl: &BlockDecl) -> Result<BlockSchema> {
    let mut builder = SchemaBuilder {
        block: &decl.name,
        claimed: HashMap::new(),
        props: Vec::new(),
    };

    match &decl.shape {
        PropsShape::Unified(props) => {
            for prop in props {
                let direction = prop.inferred_direction().ok_or_else(|| {
                    EngineError::UndirectedProperty {
                        block: decl.name.clone(),
                        key: prop.key.clone(),
                    }
                })?;
                builder.claim(prop, direction)?;
            }
        }
        PropsShape::Split {
            inputs,
            outputs,
            controls,
        } => {
            for prop in outputs {
                builder.claim(prop, Direction::Output)?;
            }
            for prop in inputs {
                builder.claim(prop, Direction::Input)?;
            }
            for prop in controls {
                builder.claim(prop, Direction::Control)?;
            }
        }
    }

    let index = builder
        .claimed
        .into_iter()
        .map(|(key, (i, _))| (key, i))
        .collect();
    Ok(BlockSchema {
        name: decl.name.clone(),
        category: decl.category.clone(),
        global: decl.global,
        props: builder.props,
        index,
    })
}

/// All block kinds known to a compiler, keyed by name.
#[derive(Debug, Default, Clone)]
pub struct BlockCatalog {
    blocks: HashMap<String, Arc<BlockSchema>>,
    order: Vec<String>,
}

impl BlockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, decl: BlockDecl) -> Result<Arc<BlockSchema>> {
        if self.blocks.contains_key(&decl.name) {
            return Err(EngineError::DuplicateBlock(decl.name));
        }
        let schema = Arc::new(normalize(&decl)?);
        tracing::debug!(block = %schema.name, props = schema.props.len(), "Loaded block");
        self.order.push(schema.name.clone());
        self.blocks.insert(schema.name.clone(), schema.clone());
        Ok(schema)
    }

    pub fn get(&self, name: &str) -> Result<&Arc<BlockSchema>> {
        self.blocks
            .get(name)
            .ok_or_else(|| EngineError::UnknownBlock(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.blocks.contains_key(name)
    }

    /// Blocks in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<BlockSchema>> {
        self.order.iter().filter_map(|name| self.blocks.get(name))
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::TypeRegistry;

    fn types() -> TypeRegistry {
        TypeRegistry::with_builtin_types().unwrap()
    }

    fn directions(schema: &BlockSchema) -> Vec<(&str, Direction)> {
        schema.props().iter().map(|p| (p.key.as_str(), p.direction)).collect()
    }

    #[test]
    fn test_unified_direction_precedence() {
        let types = types();
        let bool_ty = types.resolve("Bool").unwrap();
        let decl = BlockDecl::unified(
            "Mixed",
            [
                PropDecl::new("a", bool_ty.clone()).input().control(),
                PropDecl::new("out", bool_ty.clone()).output().input(),
                PropDecl::new("flag", bool_ty).control(),
            ],
        );
        let schema = normalize(&decl).unwrap();
        assert_eq!(
            directions(&schema),
            vec![
                ("a", Direction::Input),
                ("out", Direction::Output),
                ("flag", Direction::Control)
            ]
        );
    }

    #[test]
    fn test_split_and_unified_are_equivalent() {
        let types = types();
        let bool_ty = types.resolve("Bool").unwrap();
        let unified = normalize(&BlockDecl::unified(
            "And",
            [
                PropDecl::new("result", bool_ty.clone()).output(),
                PropDecl::new("a", bool_ty.clone()).input(),
                PropDecl::new("b", bool_ty.clone()).input(),
            ],
        ))
        .unwrap();
        let split = normalize(
            &BlockDecl::split("And")
                .input(PropDecl::new("a", bool_ty.clone()))
                .input(PropDecl::new("b", bool_ty.clone()))
                .output(PropDecl::new("result", bool_ty)),
        )
        .unwrap();

        let mut left = directions(&unified);
        let mut right = directions(&split);
        left.sort_by_key(|(key, _)| *key);
        right.sort_by_key(|(key, _)| *key);
        assert_eq!(left, right);
        // Outputs are merged first
        assert_eq!(split.props()[0].key, "result");
    }

    #[test]
    fn test_same_descriptor_in_two_lists_is_skipped() {
        let types = types();
        let shared = Arc::new(PropDecl::new("value", types.resolve("Int").unwrap()));
        let schema = normalize(
            &BlockDecl::split("Literal")
                .control(shared.clone())
                .output(shared),
        )
        .unwrap();
        assert_eq!(directions(&schema), vec![("value", Direction::Output)]);
    }

    #[test]
    fn test_duplicate_property() {
        let types = types();
        let int = types.resolve("Int").unwrap();
        let err = normalize(
            &BlockDecl::split("Broken")
                .input(PropDecl::new("x", int.clone()))
                .control(PropDecl::new("x", int.clone())),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            EngineError::DuplicateProperty { ref block, ref key } if block == "Broken" && key == "x"
        ));

        let err = normalize(&BlockDecl::unified(
            "Broken",
            [PropDecl::new("x", int.clone()).input(), PropDecl::new("x", int).output()],
        ))
        .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateProperty { .. }));
    }

    #[test]
    fn test_undirected_property() {
        let types = types();
        let err = normalize(&BlockDecl::unified(
            "Broken",
            [PropDecl::new("x", types.resolve("Int").unwrap())],
        ))
        .unwrap_err();
        assert!(matches!(err, EngineError::UndirectedProperty { .. }));
    }

    #[test]
    fn test_unified_builder_sets_direction() {
        let types = types();
        let int = types.resolve("Int").unwrap();
        let schema = normalize(
            &BlockDecl::unified("Inc", Vec::<PropDecl>::new())
                .input(PropDecl::new("x", int.clone()))
                .control(PropDecl::new("step", int.clone()))
                .output(PropDecl::new("result", int.clone()))
                // An explicit flag wins over the builder method
                .input(PropDecl::new("label", int).control()),
        )
        .unwrap();

        assert_eq!(schema.try_prop("x").unwrap().direction, Direction::Input);
        assert_eq!(schema.try_prop("step").unwrap().direction, Direction::Control);
        assert_eq!(schema.try_prop("result").unwrap().direction, Direction::Output);
        assert_eq!(schema.try_prop("label").unwrap().direction, Direction::Control);
    }

    #[test]
    fn test_catalog() {
        let types = types();
        let mut catalog = BlockCatalog::new();
        let decl = BlockDecl::unified(
            "Flag",
            [PropDecl::new("value", types.resolve("Bool").unwrap()).control()],
        )
        .category("values");
        catalog.insert(decl.clone()).unwrap();

        assert!(matches!(catalog.insert(decl), Err(EngineError::DuplicateBlock(name)) if name == "Flag"));
        assert!(matches!(catalog.get("Missing"), Err(EngineError::UnknownBlock(_))));

        let schema = catalog.get("Flag").unwrap();
        assert_eq!(schema.category.as_deref(), Some("values"));
        assert!(schema.prop("value").unwrap().is_control());
        assert!(matches!(
            schema.try_prop("other"),
            Err(EngineError::PropertyNotFound { .. })
        ));
    }
}
