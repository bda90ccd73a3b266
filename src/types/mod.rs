//! Core types for event graphs.

pub mod vector;
pub mod vertex;
pub mod particle;
pub mod attribute;
pub mod event;

pub use vector::FourVector;
pub use vertex::{Vertex, VertexId};
pub use particle::{Particle, ParticleId};
pub use attribute::{
    classify, classify_scalar, AttributeError, AttributeValue, CrossSection, PdfInfo, Scalar,
    TypedValue,
};
pub use event::{
    Event, GraphError, LengthUnit, MomentumUnit, ObjectAttribute, RunInfo, Units,
};
