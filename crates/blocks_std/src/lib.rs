//! # Blocks Standard Library
//!
//! The standard block catalog, compiled to Motoko.
//!
//! - Literals for every primitive value type
//! - Boolean logic and integer arithmetic
//! - Actors, functions and statements

pub mod actor;
pub mod literals;
pub mod logic;
pub mod math;
pub mod patterns;
pub mod registry;

pub use registry::standard_catalog;
