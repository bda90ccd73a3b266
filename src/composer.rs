//! Composition of several event graphs into one.
//!
//! A composite starts from a signal event and takes any number of pileup
//! events on top. Every merge copies the source graph into the composite:
//! new vertices and particles with fresh composite ids, the source ids
//! kept only as `source_id` for tracing back.
//!
//! ## Algorithm
//!
//! 1. Copy every source vertex (position, status) under a fresh id and
//!    remember source id → composite id for this merge only
//! 2. Copy every source particle (momentum, mass, pid, status) under a
//!    fresh id, then re-attach its ends through the map:
//!    - end vertex → incoming edge of the mapped vertex
//!    - production vertex → outgoing edge of the mapped vertex
//! 3. Append the source weights to the composite weights
//!
//! A particle whose production (or end) vertex is not part of the source
//! record keeps that end open. This is an upstream completeness gap, not
//! a failure: it is counted and logged, and the merge carries on.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::policy::AttributePolicy;
use crate::types::{AttributeError, Event, GraphError, Particle, ParticleId, Vertex, VertexId};

/// Id offset reserved for pileup records.
///
/// Not applied to any id: composite ids are always fresh. It is reported
/// in [`MergeReport::offset`] so a future disambiguation scheme has a
/// single place to hook in.
pub const PILEUP_ID_OFFSET: i64 = 1_000_000;

/// Error type for composition.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    /// A policy attribute is absent on the signal event.
    #[error("Signal event {event_number} has no attribute {name:?}")]
    MissingAttribute {
        /// Signal event number.
        event_number: i64,
        /// Attribute name.
        name: String,
    },
    /// A policy attribute could not be coerced to its kind.
    #[error("Attribute {name:?}: {source}")]
    Attribute {
        /// Attribute name.
        name: String,
        /// Underlying error.
        #[source]
        source: AttributeError,
    },
    /// Graph invariant violated while copying (internal consistency error).
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),
}

/// Role of a source record in a composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceRole {
    /// The primary interaction.
    Signal,
    /// An overlaid interaction.
    Pileup,
}

impl SourceRole {
    /// Id offset reserved for this role.
    pub fn offset(&self) -> i64 {
        match self {
            Self::Signal => 0,
            Self::Pileup => PILEUP_ID_OFFSET,
        }
    }
}

/// What one merge added to the composite.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeReport {
    /// Role of the merged source.
    pub role: SourceRole,
    /// Offset reserved for the role (not applied).
    pub offset: i64,
    /// Event number of the source.
    pub source_event_number: i64,
    /// Vertices added.
    pub vertices_added: usize,
    /// Particles added.
    pub particles_added: usize,
    /// Weights appended.
    pub weights_added: usize,
    /// Source ids of particles whose production vertex is not in the source.
    pub unattached_production: Vec<ParticleId>,
    /// Source ids of particles whose end vertex is not in the source.
    pub unattached_end: Vec<ParticleId>,
}

impl MergeReport {
    /// Whether every edge of the source was re-attached.
    pub fn is_complete(&self) -> bool {
        self.unattached_production.is_empty() && self.unattached_end.is_empty()
    }
}

/// Builds one composite event from a signal event and pileup events.
///
/// Not synchronised: merge calls into one composer must be serial.
#[derive(Debug)]
pub struct EventComposer {
    policy: AttributePolicy,
    event: Event,
    reports: Vec<MergeReport>,
}

impl EventComposer {
    /// Start a composite from `signal` with the default attribute policy.
    pub fn new(signal: &Event) -> Result<Self, ComposeError> {
        Self::with_policy(signal, AttributePolicy::default())
    }

    /// Start a composite from `signal`, copying the attributes named by `policy`.
    ///
    /// Fails if any policy attribute is missing from `signal` or does not
    /// coerce to its kind.
    pub fn with_policy(signal: &Event, policy: AttributePolicy) -> Result<Self, ComposeError> {
        let mut event = Event::new(signal.event_number());
        event.set_units(signal.units());

        for rule in &policy.rules {
            let raw = signal
                .attribute(&rule.name)
                .ok_or_else(|| ComposeError::MissingAttribute {
                    event_number: signal.event_number(),
                    name: rule.name.clone(),
                })?
                .to_text();
            let value = rule
                .kind
                .coerce(&raw)
                .map_err(|source| ComposeError::Attribute {
                    name: rule.name.clone(),
                    source,
                })?;
            event.set_attribute(rule.name.clone(), value);
        }

        let mut composer = Self {
            policy,
            event,
            reports: Vec::new(),
        };
        composer.merge(signal, SourceRole::Signal)?;
        Ok(composer)
    }

    /// Overlay a pileup event onto the composite.
    pub fn add_event(&mut self, pileup: &Event) -> Result<&MergeReport, ComposeError> {
        self.merge(pileup, SourceRole::Pileup)
    }

    /// Copy `source` into the composite.
    pub fn merge(&mut self, source: &Event, role: SourceRole) -> Result<&MergeReport, ComposeError> {
        let offset = role.offset();
        let mut vertex_map: HashMap<VertexId, VertexId> =
            HashMap::with_capacity(source.num_vertices());

        for v in source.vertices() {
            let id = self.event.next_vertex_id()?;
            self.event
                .insert_vertex(Vertex::new(id, v.position, v.status).traced_from(v.id))?;
            vertex_map.insert(v.id, id);
        }

        let mut unattached_production = Vec::new();
        let mut unattached_end = Vec::new();
        for p in source.particles() {
            let id = self.event.next_particle_id()?;
            self.event.insert_particle(
                Particle::new(id, p.momentum, p.pid, p.status)
                    .with_mass(p.mass)
                    .traced_from(p.id),
            )?;

            if let Some(end) = p.end_vertex {
                match vertex_map.get(&end) {
                    Some(&v) => self.event.attach_incoming(id, v)?,
                    None => unattached_end.push(p.id),
                }
            }
            if let Some(production) = p.production_vertex {
                match vertex_map.get(&production) {
                    Some(&v) => self.event.attach_outgoing(id, v)?,
                    None => unattached_production.push(p.id),
                }
            }
        }

        self.event.weights_mut().extend_from_slice(source.weights());

        if !unattached_production.is_empty() || !unattached_end.is_empty() {
            warn!(
                source_event = source.event_number(),
                ?role,
                unattached_production = unattached_production.len(),
                unattached_end = unattached_end.len(),
                "source references vertices it does not contain"
            );
        }
        debug!(
            source_event = source.event_number(),
            ?role,
            offset,
            vertices = source.num_vertices(),
            particles = source.num_particles(),
            "merged record"
        );

        self.reports.push(MergeReport {
            role,
            offset,
            source_event_number: source.event_number(),
            vertices_added: source.num_vertices(),
            particles_added: source.num_particles(),
            weights_added: source.weights().len(),
            unattached_production,
            unattached_end,
        });
        // Just pushed.
        Ok(&self.reports[self.reports.len() - 1])
    }

    /// The composite built so far.
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Take the composite.
    pub fn into_event(self) -> Event {
        self.event
    }

    /// Reports of every merge so far, signal first.
    pub fn reports(&self) -> &[MergeReport] {
        &self.reports
    }

    /// Total particles left without their production edge.
    pub fn unattached_production(&self) -> usize {
        self.reports.iter().map(|r| r.unattached_production.len()).sum()
    }

    /// Total particles left without their end edge.
    pub fn unattached_end(&self) -> usize {
        self.reports.iter().map(|r| r.unattached_end.len()).sum()
    }

    /// The attribute policy in use.
    pub fn policy(&self) -> &AttributePolicy {
        &self.policy
    }
}
