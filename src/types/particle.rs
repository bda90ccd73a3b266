//! Particle types for event graphs.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::vector::FourVector;
use super::vertex::VertexId;

/// Identifier of a particle within one event (positive by convention).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParticleId(pub i32);

impl ParticleId {
    /// Get the raw id.
    pub fn get(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for ParticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A directed edge of the event graph.
///
/// `production_vertex` is where the particle was emitted and `end_vertex`
/// where it is absorbed or decays. Either end may be open. A production
/// vertex may also name a vertex that the event does not contain, which
/// is how incomplete upstream records show up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    /// Id, unique within the owning event.
    pub id: ParticleId,
    /// Momentum `(px, py, pz, e)`.
    pub momentum: FourVector,
    /// Generated mass.
    pub mass: f64,
    /// PDG species code.
    pub pid: i32,
    /// Status code.
    pub status: i32,
    /// Vertex that emitted this particle.
    pub production_vertex: Option<VertexId>,
    /// Vertex that absorbs this particle.
    pub end_vertex: Option<VertexId>,
    /// Id of the particle this one was copied from, if it is a copy.
    pub source_id: Option<ParticleId>,
}

impl Particle {
    /// Create a new particle with open ends.
    ///
    /// The generated mass defaults to the invariant mass of `momentum`.
    pub fn new(id: ParticleId, momentum: FourVector, pid: i32, status: i32) -> Self {
        Self {
            id,
            momentum,
            mass: momentum.m(),
            pid,
            status,
            production_vertex: None,
            end_vertex: None,
            source_id: None,
        }
    }

    /// Set the generated mass.
    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }

    /// Set the production vertex.
    pub fn produced_at(mut self, vertex: VertexId) -> Self {
        self.production_vertex = Some(vertex);
        self
    }

    /// Set the end vertex.
    pub fn ending_at(mut self, vertex: VertexId) -> Self {
        self.end_vertex = Some(vertex);
        self
    }

    /// Record the id of the particle this one copies.
    pub fn traced_from(mut self, source: ParticleId) -> Self {
        self.source_id = Some(source);
        self
    }
}
