//! Composition policy definitions.

pub mod attributes;

pub use attributes::{AttributeKind, AttributePolicy, AttributeRule};
