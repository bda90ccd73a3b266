//! The event graph record.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::attribute::AttributeValue;
use super::particle::{Particle, ParticleId};
use super::vector::FourVector;
use super::vertex::{Vertex, VertexId};

/// Error type for graph mutations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// A vertex with this id is already in the event.
    #[error("Duplicate vertex id: {0}")]
    DuplicateVertex(VertexId),
    /// A particle with this id is already in the event.
    #[error("Duplicate particle id: {0}")]
    DuplicateParticle(ParticleId),
    /// Vertex not found.
    #[error("Vertex not found: {0}")]
    VertexNotFound(VertexId),
    /// Particle not found.
    #[error("Particle not found: {0}")]
    ParticleNotFound(ParticleId),
    /// No fresh id is left in the `i32` id range.
    #[error("No fresh {0} id left")]
    IdSpaceExhausted(&'static str),
}

/// Momentum unit of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MomentumUnit {
    /// MeV.
    Mev,
    /// GeV.
    Gev,
}

/// Length unit of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LengthUnit {
    /// Millimetre.
    Mm,
    /// Centimetre.
    Cm,
}

/// Units of an event's momenta and positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Units {
    /// Momentum unit.
    pub momentum: MomentumUnit,
    /// Length unit.
    pub length: LengthUnit,
}

impl Units {
    /// Parse the unit tokens of a `U` line.
    pub fn parse(momentum: &str, length: &str) -> Option<Self> {
        let momentum = match momentum.to_uppercase().as_str() {
            "MEV" => MomentumUnit::Mev,
            "GEV" => MomentumUnit::Gev,
            _ => return None,
        };
        let length = match length.to_uppercase().as_str() {
            "MM" => LengthUnit::Mm,
            "CM" => LengthUnit::Cm,
            _ => return None,
        };
        Some(Self { momentum, length })
    }
}

impl Default for Units {
    fn default() -> Self {
        Self {
            momentum: MomentumUnit::Gev,
            length: LengthUnit::Mm,
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let momentum = match self.momentum {
            MomentumUnit::Mev => "MEV",
            MomentumUnit::Gev => "GEV",
        };
        let length = match self.length {
            LengthUnit::Mm => "MM",
            LengthUnit::Cm => "CM",
        };
        write!(f, "{} {}", momentum, length)
    }
}

/// Attribute attached to a single vertex or particle.
///
/// `object_id` follows the log convention: positive for particles,
/// negative for vertices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectAttribute {
    /// Id of the owning vertex or particle.
    pub object_id: i32,
    /// Attribute name.
    pub name: String,
    /// Raw attribute text.
    pub value: String,
}

/// Run-level information found in a log header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    /// Names of the event weights, in weight order.
    pub weight_names: Vec<String>,
    /// Tool descriptions, as written.
    pub tools: Vec<String>,
    /// Run attributes `(name, raw text)`, in file order.
    pub attributes: Vec<(String, String)>,
}

impl RunInfo {
    /// Whether there is nothing to write.
    pub fn is_empty(&self) -> bool {
        self.weight_names.is_empty() && self.tools.is_empty() && self.attributes.is_empty()
    }
}

/// One event: a directed acyclic graph of vertices and particles plus
/// its attributes and weights.
///
/// Vertices and particles are kept in insertion order. Particles refer
/// to vertices by id; `insert_particle` does not check that the ids
/// resolve, so records with missing vertices can be represented as they
/// were read. [`Event::dangling_production`] lists such particles.
#[derive(Debug, Clone, Default)]
pub struct Event {
    event_number: i64,
    units: Units,
    vertices: Vec<Vertex>,
    particles: Vec<Particle>,
    vertex_index: HashMap<VertexId, usize>,
    particle_index: HashMap<ParticleId, usize>,
    /// Lowest vertex id seen (0 when empty).
    min_vertex_id: i32,
    /// Highest particle id seen (0 when empty).
    max_particle_id: i32,
    attributes: Vec<(String, AttributeValue)>,
    object_attributes: Vec<ObjectAttribute>,
    weights: Vec<f64>,
}

impl Event {
    /// Create an empty event.
    pub fn new(event_number: i64) -> Self {
        Self {
            event_number,
            ..Self::default()
        }
    }

    /// Event number.
    pub fn event_number(&self) -> i64 {
        self.event_number
    }

    /// Set the event number.
    pub fn set_event_number(&mut self, event_number: i64) {
        self.event_number = event_number;
    }

    /// Units of momenta and positions.
    pub fn units(&self) -> Units {
        self.units
    }

    /// Set the units.
    pub fn set_units(&mut self, units: Units) {
        self.units = units;
    }

    // ─────────────────────────────────────────────────────────────────────
    // Graph
    // ─────────────────────────────────────────────────────────────────────

    /// Insert a vertex under its own id.
    pub fn insert_vertex(&mut self, vertex: Vertex) -> Result<(), GraphError> {
        if self.vertex_index.contains_key(&vertex.id) {
            return Err(GraphError::DuplicateVertex(vertex.id));
        }
        self.min_vertex_id = self.min_vertex_id.min(vertex.id.0);
        self.vertex_index.insert(vertex.id, self.vertices.len());
        self.vertices.push(vertex);
        Ok(())
    }

    /// Insert a particle under its own id.
    ///
    /// Vertex references are stored as given.
    pub fn insert_particle(&mut self, particle: Particle) -> Result<(), GraphError> {
        if self.particle_index.contains_key(&particle.id) {
            return Err(GraphError::DuplicateParticle(particle.id));
        }
        self.max_particle_id = self.max_particle_id.max(particle.id.0);
        self.particle_index.insert(particle.id, self.particles.len());
        self.particles.push(particle);
        Ok(())
    }

    /// A vertex id not used by this event, below every id handed out so far.
    pub fn next_vertex_id(&self) -> Result<VertexId, GraphError> {
        self.min_vertex_id
            .min(0)
            .checked_sub(1)
            .map(VertexId)
            .ok_or(GraphError::IdSpaceExhausted("vertex"))
    }

    /// A particle id not used by this event, above every id handed out so far.
    pub fn next_particle_id(&self) -> Result<ParticleId, GraphError> {
        self.max_particle_id
            .max(0)
            .checked_add(1)
            .map(ParticleId)
            .ok_or(GraphError::IdSpaceExhausted("particle"))
    }

    /// Add a vertex under a fresh id.
    pub fn add_vertex(&mut self, position: FourVector, status: i32) -> Result<VertexId, GraphError> {
        let id = self.next_vertex_id()?;
        self.min_vertex_id = id.0;
        self.vertex_index.insert(id, self.vertices.len());
        self.vertices.push(Vertex::new(id, position, status));
        Ok(id)
    }

    /// Add a particle with open ends under a fresh id.
    pub fn add_particle(
        &mut self,
        momentum: FourVector,
        pid: i32,
        status: i32,
    ) -> Result<ParticleId, GraphError> {
        let id = self.next_particle_id()?;
        self.max_particle_id = id.0;
        self.particle_index.insert(id, self.particles.len());
        self.particles.push(Particle::new(id, momentum, pid, status));
        Ok(id)
    }

    /// Attach `particle` as an incoming edge of `vertex`.
    pub fn attach_incoming(&mut self, particle: ParticleId, vertex: VertexId) -> Result<(), GraphError> {
        if !self.contains_vertex(vertex) {
            return Err(GraphError::VertexNotFound(vertex));
        }
        self.particle_mut(particle)?.end_vertex = Some(vertex);
        Ok(())
    }

    /// Attach `particle` as an outgoing edge of `vertex`.
    pub fn attach_outgoing(&mut self, particle: ParticleId, vertex: VertexId) -> Result<(), GraphError> {
        if !self.contains_vertex(vertex) {
            return Err(GraphError::VertexNotFound(vertex));
        }
        self.particle_mut(particle)?.production_vertex = Some(vertex);
        Ok(())
    }

    /// All vertices, in insertion order.
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// All particles, in insertion order.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Look up a vertex.
    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertex_index.get(&id).map(|&i| &self.vertices[i])
    }

    /// Look up a particle.
    pub fn particle(&self, id: ParticleId) -> Option<&Particle> {
        self.particle_index.get(&id).map(|&i| &self.particles[i])
    }

    /// Mutable particle lookup.
    pub(crate) fn particle_mut(&mut self, id: ParticleId) -> Result<&mut Particle, GraphError> {
        match self.particle_index.get(&id) {
            Some(&i) => Ok(&mut self.particles[i]),
            None => Err(GraphError::ParticleNotFound(id)),
        }
    }

    /// Whether the vertex is a member of this event.
    pub fn contains_vertex(&self, id: VertexId) -> bool {
        self.vertex_index.contains_key(&id)
    }

    /// Particles absorbed by `vertex`.
    pub fn particles_in(&self, vertex: VertexId) -> impl Iterator<Item = &Particle> + '_ {
        self.particles
            .iter()
            .filter(move |p| p.end_vertex == Some(vertex))
    }

    /// Particles emitted by `vertex`.
    pub fn particles_out(&self, vertex: VertexId) -> impl Iterator<Item = &Particle> + '_ {
        self.particles
            .iter()
            .filter(move |p| p.production_vertex == Some(vertex))
    }

    /// Particles whose production vertex is set but not a member of this event.
    pub fn dangling_production(&self) -> impl Iterator<Item = &Particle> + '_ {
        self.particles.iter().filter(|p| {
            p.production_vertex
                .map_or(false, |v| !self.contains_vertex(v))
        })
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of particles.
    pub fn num_particles(&self) -> usize {
        self.particles.len()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Attributes and weights
    // ─────────────────────────────────────────────────────────────────────

    /// Event-level attributes, in insertion order.
    pub fn attributes(&self) -> &[(String, AttributeValue)] {
        &self.attributes
    }

    /// Look up an event-level attribute.
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Set an event-level attribute, replacing any value of the same name in place.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: AttributeValue) {
        let name = name.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Attributes of individual vertices and particles.
    pub fn object_attributes(&self) -> &[ObjectAttribute] {
        &self.object_attributes
    }

    /// Attach an attribute to a vertex or particle id.
    pub fn add_object_attribute(&mut self, attribute: ObjectAttribute) {
        self.object_attributes.push(attribute);
    }

    /// Event weights.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Mutable access to the event weights.
    pub fn weights_mut(&mut self) -> &mut Vec<f64> {
        &mut self.weights
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(id: i32) -> Vertex {
        Vertex::new(VertexId(id), FourVector::zero(), 0)
    }

    fn particle(id: i32) -> Particle {
        Particle::new(ParticleId(id), FourVector::new(0.0, 0.0, 1.0, 1.0), 22, 1)
    }

    #[test]
    fn test_fresh_ids_follow_inserted_ids() {
        let mut evt = Event::new(0);
        evt.insert_vertex(vertex(-4)).unwrap();
        evt.insert_particle(particle(7)).unwrap();

        assert_eq!(evt.add_vertex(FourVector::zero(), 0).unwrap(), VertexId(-5));
        assert_eq!(evt.add_particle(FourVector::zero(), 22, 1).unwrap(), ParticleId(8));
    }

    #[test]
    fn test_fresh_ids_exhausted_at_range_end() {
        let mut evt = Event::new(0);
        evt.insert_vertex(vertex(i32::MIN)).unwrap();
        evt.insert_particle(particle(i32::MAX)).unwrap();

        assert_eq!(evt.next_vertex_id(), Err(GraphError::IdSpaceExhausted("vertex")));
        assert_eq!(
            evt.add_particle(FourVector::zero(), 22, 1),
            Err(GraphError::IdSpaceExhausted("particle"))
        );
        assert_eq!(evt.num_particles(), 1);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut evt = Event::new(0);
        evt.insert_vertex(vertex(-1)).unwrap();
        assert_eq!(
            evt.insert_vertex(vertex(-1)),
            Err(GraphError::DuplicateVertex(VertexId(-1)))
        );
        evt.insert_particle(particle(1)).unwrap();
        assert_eq!(
            evt.insert_particle(particle(1)),
            Err(GraphError::DuplicateParticle(ParticleId(1)))
        );
    }

    #[test]
    fn test_incoming_and_outgoing() {
        let mut evt = Event::new(0);
        let v1 = evt.add_vertex(FourVector::zero(), 0).unwrap();
        let v2 = evt.add_vertex(FourVector::zero(), 0).unwrap();
        let p = evt.add_particle(FourVector::zero(), 11, 1).unwrap();
        evt.attach_outgoing(p, v1).unwrap();
        evt.attach_incoming(p, v2).unwrap();

        assert_eq!(evt.particles_out(v1).count(), 1);
        assert_eq!(evt.particles_in(v2).count(), 1);
        assert_eq!(evt.particles_in(v1).count(), 0);
        assert_eq!(
            evt.attach_incoming(p, VertexId(-99)),
            Err(GraphError::VertexNotFound(VertexId(-99)))
        );
    }

    #[test]
    fn test_dangling_production() {
        let mut evt = Event::new(0);
        evt.insert_vertex(vertex(-1)).unwrap();
        evt.insert_particle(particle(1).produced_at(VertexId(-1))).unwrap();
        evt.insert_particle(particle(2).produced_at(VertexId(-9))).unwrap();

        let dangling: Vec<_> = evt.dangling_production().map(|p| p.id).collect();
        assert_eq!(dangling, vec![ParticleId(2)]);
    }

    #[test]
    fn test_set_attribute_replaces_in_place() {
        let mut evt = Event::new(0);
        evt.set_attribute("a", AttributeValue::Integer(1));
        evt.set_attribute("b", AttributeValue::Integer(2));
        evt.set_attribute("a", AttributeValue::Float(1.5));

        let names: Vec<_> = evt.attributes().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(evt.attribute("a"), Some(&AttributeValue::Float(1.5)));
    }

    #[test]
    fn test_units_parse() {
        let units = Units::parse("MeV", "cm").unwrap();
        assert_eq!(units.to_string(), "MEV CM");
        assert!(Units::parse("TeV", "mm").is_none());
    }
}
