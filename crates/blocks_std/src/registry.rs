//! # Standard Catalog
//!
//! Collects every block of this crate into one [`BlockCatalog`].

use blocks_engine::graph::{BlockCatalog, TypeRegistry};
use blocks_engine::Result;

use crate::{actor, literals, logic, math};

/// All standard blocks, with types resolved in `types`.
pub fn standard_catalog(types: &TypeRegistry) -> Result<BlockCatalog> {
    let mut catalog = BlockCatalog::new();
    let decls = [
        literals::blocks(types)?,
        logic::blocks(types)?,
        math::blocks(types)?,
        actor::blocks(types)?,
    ];
    for decl in decls.into_iter().flatten() {
        catalog.insert(decl)?;
    }
    tracing::debug!(blocks = catalog.len(), "Loaded standard catalog");
    Ok(catalog)
}
