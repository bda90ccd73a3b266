//! Vertex types for event graphs.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::vector::FourVector;

/// Identifier of a vertex within one event.
///
/// Vertex ids are negative by convention (-1, -2, ...). They are unique
/// inside one event only; two events may reuse the same ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VertexId(pub i32);

impl VertexId {
    /// Get the raw id.
    pub fn get(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An interaction point in spacetime.
///
/// Edges are not stored on the vertex; a particle names the vertices it
/// leaves and enters, and the event answers incoming/outgoing queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    /// Id, unique within the owning event.
    pub id: VertexId,
    /// Position `(x, y, z, t)`.
    pub position: FourVector,
    /// Status code (meaning is generator specific).
    pub status: i32,
    /// Id of the vertex this one was copied from, if it is a copy.
    pub source_id: Option<VertexId>,
}

impl Vertex {
    /// Create a new vertex.
    pub fn new(id: VertexId, position: FourVector, status: i32) -> Self {
        Self {
            id,
            position,
            status,
            source_id: None,
        }
    }

    /// Record the id of the vertex this one copies.
    pub fn traced_from(mut self, source: VertexId) -> Self {
        self.source_id = Some(source);
        self
    }
}
