//! # Type Lattice
//!
//! Named types forming rooted trees through single-parent inheritance, with
//! generic parameters, abstractness and per-backend renderers.
//!
//! Base types are registered once in a [`TypeRegistry`]. Generic instantiations
//! (`Optional<Int>`, `(Int, Text)`) are plain values built on demand with
//! [`Type::of`] and never stored in the registry. Equality is structural: two
//! types are equal when their names and generics are equal.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use itertools::Itertools;
use serde::{Deserialize, Serialize, Serializer};
use smallvec::SmallVec;

use super::value::Value;
use crate::error::{EngineError, Result};

pub type Generics = SmallVec<[Type; 2]>;

/// Free-form annotations (UI hints etc.), inherited like [`TypeData`].
pub type Meta = BTreeMap<String, serde_json::Value>;

/// Renders a type to a string. Receives the already rendered generics.
pub type TypeRenderer = Arc<dyn Fn(&[String], &Type) -> String + Send + Sync>;

pub type DefaultValueFn = Arc<dyn Fn(&Type) -> Option<Value> + Send + Sync>;

#[derive(Clone)]
pub enum DefaultValue {
    Static(Value),
    /// Computed from the type itself, for generic-dependent defaults
    Computed(DefaultValueFn),
}

/// Behavior attached to a type.
///
/// A child starts from its parent's data and overrides it field by field.
/// `is_abstract` and `arbitrary_generics` are the exception: they are never
/// inherited and must be stated by every type that wants them.
#[derive(Clone, Default)]
pub struct TypeData {
    pub is_abstract: bool,
    pub arbitrary_generics: bool,
    /// Connections of this type are traversed in the opposite direction
    pub reversed: bool,
    pub category: Option<String>,
    pub default_value: Option<DefaultValue>,
    pub generic_names: Vec<String>,
    /// Backend-independent renderer; falls back to `Name<A, B>`
    pub type_string: Option<TypeRenderer>,
    /// Renderers keyed by compile key
    pub renderers: HashMap<String, TypeRenderer>,
}

impl TypeData {
    fn inherited(&self) -> Self {
        Self {
            is_abstract: false,
            arbitrary_generics: false,
            ..self.clone()
        }
    }
}

impl fmt::Debug for TypeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeData")
            .field("is_abstract", &self.is_abstract)
            .field("arbitrary_generics", &self.arbitrary_generics)
            .field("reversed", &self.reversed)
            .field("category", &self.category)
            .field("has_default_value", &self.default_value.is_some())
            .field("generic_names", &self.generic_names)
            .field("renderers", &self.renderers.keys().sorted().collect::<Vec<_>>())
            .finish()
    }
}

struct TypeInner {
    name: String,
    parent: Option<Type>,
    generics: Generics,
    data: Arc<TypeData>,
    meta: Arc<Meta>,
    base: bool,
}

/// A node of the type lattice. Cheap to clone.
#[derive(Clone)]
pub struct Type(Arc<TypeInner>);

impl Type {
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn parent(&self) -> Option<&Type> {
        self.0.parent.as_ref()
    }

    pub fn generics(&self) -> &[Type] {
        &self.0.generics
    }

    pub fn data(&self) -> &TypeData {
        &self.0.data
    }

    pub fn meta(&self) -> &Meta {
        &self.0.meta
    }

    /// Whether this is a registered base type rather than an instantiation.
    pub fn is_base(&self) -> bool {
        self.0.base
    }

    pub fn is_reversed(&self) -> bool {
        self.0.data.reversed
    }

    pub fn is_abstract(&self) -> bool {
        self.0.data.is_abstract || self.0.generics.iter().any(Type::is_abstract)
    }

    pub fn default_value(&self) -> Option<Value> {
        match self.0.data.default_value.as_ref()? {
            DefaultValue::Static(value) => Some(value.clone()),
            DefaultValue::Computed(compute) => compute(self),
        }
    }

    /// `self` is a subtype of `other` when the names match and every generic is a
    /// subtype of the generic in the same position, or when `self`'s parent is.
    ///
    /// Instantiations have their base as parent, so `Tuple<Int, Text>` is a
    /// subtype of `Tuple` whatever the arity.
    pub fn is_subtype(&self, other: &Type) -> bool {
        if self.name() == other.name() && generics_fit(self.generics(), other.generics()) {
            return true;
        }
        match self.parent() {
            Some(parent) => parent.is_subtype(other),
            None => false,
        }
    }

    /// Narrowing toward `self`'s lineage: `self` if it is a subtype of `other`,
    /// `other` if it is a subtype of `self`, otherwise retry from `self`'s parent.
    pub fn shared_type(&self, other: &Type) -> Option<Type> {
        if self == other || self.is_subtype(other) {
            return Some(self.clone());
        }
        if other.is_subtype(self) {
            return Some(other.clone());
        }
        self.parent()?.shared_type(other)
    }

    /// Instantiate this type with the given generics.
    ///
    /// For a fixed-arity type each generic must be a subtype of the slot it fills.
    /// Passing no generics (or the current ones) returns the type unchanged.
    pub fn of(&self, generics: impl IntoIterator<Item = Type>) -> Result<Type> {
        let generics: Generics = generics.into_iter().collect();
        let arbitrary = self.data().arbitrary_generics;
        if !arbitrary && (generics.is_empty() || generics.as_slice() == self.generics()) {
            return Ok(self.clone());
        }
        let fits = arbitrary || generics_fit(&generics, self.generics());

        let instance = Type(Arc::new(TypeInner {
            name: self.0.name.clone(),
            parent: Some(self.clone()),
            generics,
            data: Arc::new(self.0.data.inherited()),
            meta: self.0.meta.clone(),
            base: false,
        }));

        if !fits {
            return Err(EngineError::IncompatibleGenerics {
                base: self.to_type_string(),
                requested: instance.to_type_string(),
            });
        }
        Ok(instance)
    }

    /// Copy of this type with `meta` merged over its annotations.
    pub fn with_meta(&self, meta: Meta) -> Type {
        let mut merged = (*self.0.meta).clone();
        merged.extend(meta);
        Type(Arc::new(TypeInner {
            name: self.0.name.clone(),
            parent: self.0.parent.clone(),
            generics: self.0.generics.clone(),
            data: self.0.data.clone(),
            meta: Arc::new(merged),
            base: self.0.base,
        }))
    }

    /// Copy of this type with its generic slots renamed (record fields).
    pub fn with_generic_names<I, S>(&self, names: I) -> Type
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut data = (*self.0.data).clone();
        data.generic_names = names.into_iter().map(Into::into).collect();
        Type(Arc::new(TypeInner {
            name: self.0.name.clone(),
            parent: self.0.parent.clone(),
            generics: self.0.generics.clone(),
            data: Arc::new(data),
            meta: self.0.meta.clone(),
            base: self.0.base,
        }))
    }

    /// Backend-independent rendering, e.g. `Optional<Int>` or `(Int, Text)`.
    pub fn to_type_string(&self) -> String {
        let generics: Vec<String> = self.generics().iter().map(Type::to_type_string).collect();
        match &self.data().type_string {
            Some(render) => render(generics.as_slice(), self),
            None if generics.is_empty() => self.name().to_string(),
            None => format!("{}<{}>", self.name(), generics.join(", ")),
        }
    }

    /// Rendering for one backend. Types without a renderer for `compile_key`
    /// fall back to [`Type::to_type_string`].
    pub fn render_for(&self, compile_key: &str) -> String {
        match self.data().renderers.get(compile_key) {
            Some(render) => {
                let generics: Vec<String> = self
                    .generics()
                    .iter()
                    .map(|g| g.render_for(compile_key))
                    .collect();
                render(generics.as_slice(), self)
            }
            None => self.to_type_string(),
        }
    }

    pub fn to_portable(&self) -> PortableType {
        PortableType {
            name: self.name().to_string(),
            generics: self.generics().iter().map(Type::to_portable).collect(),
        }
    }
}

fn generics_fit(generics: &[Type], slots: &[Type]) -> bool {
    generics.len() == slots.len() && generics.iter().zip(slots).all(|(g, slot)| g.is_subtype(slot))
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
            || (self.name() == other.name() && self.generics() == other.generics())
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
        self.generics().hash(state);
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({})", self.to_type_string())
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_type_string())
    }
}

impl Serialize for Type {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_portable().serialize(serializer)
    }
}

/// Parent- and meta-free form of a type, for persistence and interchange.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortableType {
    pub name: String,
    #[serde(default)]
    pub generics: Vec<PortableType>,
}

impl PortableType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            generics: Vec::new(),
        }
    }

    pub fn with_generics(name: impl Into<String>, generics: Vec<PortableType>) -> Self {
        Self {
            name: name.into(),
            generics,
        }
    }
}

impl From<&str> for PortableType {
    fn from(name: &str) -> Self {
        PortableType::new(name)
    }
}

impl From<&Type> for PortableType {
    fn from(ty: &Type) -> Self {
        ty.to_portable()
    }
}

/// Anything that names a type: a registered name, a portable description or a
/// type that is already resolved.
pub trait ResolveType {
    fn resolve_in(&self, registry: &TypeRegistry) -> Result<Type>;
}

impl ResolveType for str {
    fn resolve_in(&self, registry: &TypeRegistry) -> Result<Type> {
        registry
            .get(self)
            .cloned()
            .ok_or_else(|| EngineError::UnknownType(self.to_string()))
    }
}

impl ResolveType for String {
    fn resolve_in(&self, registry: &TypeRegistry) -> Result<Type> {
        self.as_str().resolve_in(registry)
    }
}

impl ResolveType for Type {
    fn resolve_in(&self, _registry: &TypeRegistry) -> Result<Type> {
        Ok(self.clone())
    }
}

impl ResolveType for PortableType {
    fn resolve_in(&self, registry: &TypeRegistry) -> Result<Type> {
        registry.from_portable(self)
    }
}

impl<T: ResolveType + ?Sized> ResolveType for &T {
    fn resolve_in(&self, registry: &TypeRegistry) -> Result<Type> {
        (**self).resolve_in(registry)
    }
}

/// Declaration of a base type, consumed by [`TypeRegistry::register`].
pub struct TypeDecl {
    name: String,
    parent: Option<String>,
    generics: Vec<PortableType>,
    is_abstract: bool,
    arbitrary_generics: bool,
    reversed: Option<bool>,
    category: Option<String>,
    default_value: Option<DefaultValue>,
    generic_names: Option<Vec<String>>,
    type_string: Option<TypeRenderer>,
    renderers: HashMap<String, TypeRenderer>,
    meta: Meta,
}

impl TypeDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            generics: Vec::new(),
            is_abstract: false,
            arbitrary_generics: false,
            reversed: None,
            category: None,
            default_value: None,
            generic_names: None,
            type_string: None,
            renderers: HashMap::new(),
            meta: Meta::new(),
        }
    }

    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn generic(mut self, generic: impl Into<PortableType>) -> Self {
        self.generics.push(generic.into());
        self
    }

    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn arbitrary_generics(mut self) -> Self {
        self.arbitrary_generics = true;
        self
    }

    pub fn reversed(mut self, reversed: bool) -> Self {
        self.reversed = Some(reversed);
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(DefaultValue::Static(value.into()));
        self
    }

    pub fn default_value_with<F>(mut self, compute: F) -> Self
    where
        F: Fn(&Type) -> Option<Value> + Send + Sync + 'static,
    {
        self.default_value = Some(DefaultValue::Computed(Arc::new(compute)));
        self
    }

    pub fn generic_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.generic_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn type_string<F>(mut self, render: F) -> Self
    where
        F: Fn(&[String], &Type) -> String + Send + Sync + 'static,
    {
        self.type_string = Some(Arc::new(render));
        self
    }

    pub fn renderer<F>(mut self, compile_key: impl Into<String>, render: F) -> Self
    where
        F: Fn(&[String], &Type) -> String + Send + Sync + 'static,
    {
        self.renderers.insert(compile_key.into(), Arc::new(render));
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }
}

/// Registry of base types. Passed explicitly wherever types are resolved.
#[derive(Default, Clone)]
pub struct TypeRegistry {
    types: HashMap<String, Type>,
    order: Vec<String>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a base type. Its data and meta are its parent's, overridden by
    /// whatever the declaration states, and frozen from here on.
    pub fn register(&mut self, decl: TypeDecl) -> Result<Type> {
        if self.types.contains_key(&decl.name) {
            return Err(EngineError::DuplicateType(decl.name));
        }

        let parent = decl
            .parent
            .as_deref()
            .map(|name| self.resolve(name))
            .transpose()?;
        let generics = decl
            .generics
            .iter()
            .map(|g| self.from_portable(g))
            .collect::<Result<Generics>>()?;

        let mut data = parent
            .as_ref()
            .map(|p| p.data().inherited())
            .unwrap_or_default();
        data.is_abstract = decl.is_abstract;
        data.arbitrary_generics = decl.arbitrary_generics;
        if let Some(reversed) = decl.reversed {
            data.reversed = reversed;
        }
        if decl.category.is_some() {
            data.category = decl.category;
        }
        if decl.default_value.is_some() {
            data.default_value = decl.default_value;
        }
        if let Some(names) = decl.generic_names {
            data.generic_names = names;
        }
        if decl.type_string.is_some() {
            data.type_string = decl.type_string;
        }
        data.renderers.extend(decl.renderers);

        let mut meta = parent.as_ref().map(|p| p.meta().clone()).unwrap_or_default();
        meta.extend(decl.meta);

        let ty = Type(Arc::new(TypeInner {
            name: decl.name.clone(),
            parent,
            generics,
            data: Arc::new(data),
            meta: Arc::new(meta),
            base: true,
        }));

        tracing::debug!(name = %decl.name, parent = ?ty.parent().map(Type::name), "Registered type");
        self.order.push(decl.name.clone());
        self.types.insert(decl.name, ty.clone());
        Ok(ty)
    }

    pub fn get(&self, name: &str) -> Option<&Type> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn resolve(&self, ty: impl ResolveType) -> Result<Type> {
        ty.resolve_in(self)
    }

    pub fn instantiate<I, T>(&self, base: impl ResolveType, generics: I) -> Result<Type>
    where
        I: IntoIterator<Item = T>,
        T: ResolveType,
    {
        let base = self.resolve(base)?;
        let generics = generics
            .into_iter()
            .map(|g| self.resolve(g))
            .collect::<Result<Vec<_>>>()?;
        base.of(generics)
    }

    pub fn from_portable(&self, portable: &PortableType) -> Result<Type> {
        let base = self.resolve(portable.name.as_str())?;
        let generics = portable
            .generics
            .iter()
            .map(|g| self.from_portable(g))
            .collect::<Result<Vec<_>>>()?;
        base.of(generics)
    }

    pub fn from_json(&self, json: &str) -> Result<Type> {
        let portable: PortableType = serde_json::from_str(json)?;
        self.from_portable(&portable)
    }

    /// Base types in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Type> {
        self.order.iter().filter_map(|name| self.types.get(name))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
