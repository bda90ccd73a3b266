//! Writer for `HepMC::Asciiv3` listings.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::debug;

use super::{EventWriter, RecordError, END_LISTING, START_LISTING, VERSION_PREFIX};
use crate::types::{Event, RunInfo, VertexId};
use crate::FORMAT_VERSION;

/// Writer of a text event log.
///
/// Ids are renumbered positionally on output: particles `1..n` in event
/// order, vertices `-1..-m` in the order they are emitted. A vertex is
/// emitted just before its first outgoing particle; vertices with no
/// outgoing particles follow the last particle.
///
/// The footer is written by [`EventWriter::close`], or on drop if the
/// writer was never closed.
pub struct AsciiWriter<W: Write> {
    output: W,
    run_info: Option<RunInfo>,
    header_written: bool,
    closed: bool,
}

impl AsciiWriter<BufWriter<File>> {
    /// Create (or truncate) a log file.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, RecordError> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> AsciiWriter<W> {
    /// Wrap an output.
    pub fn new(output: W) -> Self {
        Self {
            output,
            run_info: None,
            header_written: false,
            closed: false,
        }
    }

    /// Write this run information in the header.
    pub fn with_run_info(mut self, run_info: RunInfo) -> Self {
        self.run_info = Some(run_info);
        self
    }

    /// Borrow the underlying output.
    pub fn get_ref(&self) -> &W {
        &self.output
    }

    fn write_header(&mut self) -> Result<(), RecordError> {
        if self.header_written {
            return Ok(());
        }
        self.header_written = true;

        writeln!(self.output, "{} {}", VERSION_PREFIX, FORMAT_VERSION)?;
        writeln!(self.output, "{}", START_LISTING)?;
        if let Some(info) = &self.run_info {
            if !info.weight_names.is_empty() {
                writeln!(self.output, "W {}", info.weight_names.join(" "))?;
            }
            for tool in &info.tools {
                writeln!(self.output, "T {}", tool)?;
            }
            for (name, value) in &info.attributes {
                writeln!(self.output, "A 0 {} {}", name, value)?;
            }
        }
        Ok(())
    }
}

/// Order in which vertices and particles are written.
enum Emit {
    Vertex(usize),
    Particle(usize),
}

/// Shortest round-trip form, switching to exponent form for very large or small magnitudes.
fn fmt_float(x: f64) -> String {
    let magnitude = x.abs();
    if x == 0.0 || (1e-5..1e15).contains(&magnitude) {
        format!("{}", x)
    } else {
        format!("{:e}", x)
    }
}

/// 1-based output id of the object at `index`.
fn positional_id(what: &'static str, index: usize) -> Result<i32, RecordError> {
    index
        .checked_add(1)
        .and_then(|id| i32::try_from(id).ok())
        .ok_or(RecordError::TooManyObjects { what, count: index })
}

impl<W: Write> EventWriter for AsciiWriter<W> {
    fn write_event(&mut self, event: &Event) -> Result<(), RecordError> {
        if self.closed {
            return Err(RecordError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "write after close",
            )));
        }
        self.write_header()?;

        let particle_ids: HashMap<_, i32> = event
            .particles()
            .iter()
            .enumerate()
            .map(|(i, p)| Ok((p.id, positional_id("particle", i)?)))
            .collect::<Result<_, RecordError>>()?;
        let vertex_pos: HashMap<VertexId, usize> = event
            .vertices()
            .iter()
            .enumerate()
            .map(|(i, v)| (v.id, i))
            .collect();

        let mut incoming: HashMap<VertexId, Vec<i32>> = HashMap::new();
        for p in event.particles() {
            if let Some(end) = p.end_vertex {
                if vertex_pos.contains_key(&end) {
                    incoming.entry(end).or_default().push(particle_ids[&p.id]);
                }
            }
        }

        let mut vertex_ids: HashMap<VertexId, i32> = HashMap::new();
        let mut order: Vec<Emit> = Vec::with_capacity(event.num_vertices() + event.num_particles());
        for (i, p) in event.particles().iter().enumerate() {
            if let Some(&pos) = p.production_vertex.as_ref().and_then(|v| vertex_pos.get(v)) {
                let id = event.vertices()[pos].id;
                if !vertex_ids.contains_key(&id) {
                    vertex_ids.insert(id, -positional_id("vertex", vertex_ids.len())?);
                    order.push(Emit::Vertex(pos));
                }
            }
            order.push(Emit::Particle(i));
        }
        for (pos, v) in event.vertices().iter().enumerate() {
            if !vertex_ids.contains_key(&v.id) {
                vertex_ids.insert(v.id, -positional_id("vertex", vertex_ids.len())?);
                order.push(Emit::Vertex(pos));
            }
        }

        let out = &mut self.output;
        writeln!(
            out,
            "E {} {} {}",
            event.event_number(),
            event.num_vertices(),
            event.num_particles()
        )?;
        writeln!(out, "U {}", event.units())?;
        if !event.weights().is_empty() {
            let weights: Vec<String> = event.weights().iter().map(|w| fmt_float(*w)).collect();
            writeln!(out, "W {}", weights.join(" "))?;
        }
        for (name, value) in event.attributes() {
            writeln!(out, "A 0 {} {}", name, value)?;
        }
        for attr in event.object_attributes() {
            let id = if attr.object_id > 0 {
                particle_ids.get(&crate::types::ParticleId(attr.object_id)).copied()
            } else {
                vertex_ids.get(&VertexId(attr.object_id)).copied()
            };
            match id {
                Some(id) => writeln!(out, "A {} {} {}", id, attr.name, attr.value)?,
                None => debug!(object_id = attr.object_id, name = %attr.name, "dropping attribute of unknown object"),
            }
        }

        for emit in order {
            match emit {
                Emit::Vertex(pos) => {
                    let v = &event.vertices()[pos];
                    let ins: Vec<String> = incoming
                        .get(&v.id)
                        .map(|ids| ids.iter().map(|i| i.to_string()).collect())
                        .unwrap_or_default();
                    write!(out, "V {} {} [{}]", vertex_ids[&v.id], v.status, ins.join(","))?;
                    if !v.position.is_zero() {
                        write!(
                            out,
                            " @ {} {} {} {}",
                            fmt_float(v.position.x),
                            fmt_float(v.position.y),
                            fmt_float(v.position.z),
                            fmt_float(v.position.t)
                        )?;
                    }
                    writeln!(out)?;
                }
                Emit::Particle(i) => {
                    let p = &event.particles()[i];
                    let mother = p
                        .production_vertex
                        .and_then(|v| vertex_ids.get(&v).copied())
                        .unwrap_or(0);
                    writeln!(
                        out,
                        "P {} {} {} {} {} {} {} {} {}",
                        particle_ids[&p.id],
                        mother,
                        p.pid,
                        fmt_float(p.momentum.px()),
                        fmt_float(p.momentum.py()),
                        fmt_float(p.momentum.pz()),
                        fmt_float(p.momentum.e()),
                        fmt_float(p.mass),
                        p.status
                    )?;
                }
            }
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), RecordError> {
        if self.closed {
            return Ok(());
        }
        self.write_header()?;
        self.closed = true;
        writeln!(self.output, "{}", END_LISTING)?;
        self.output.flush()?;
        Ok(())
    }
}

impl<W: Write> Drop for AsciiWriter<W> {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_id_range() {
        assert_eq!(positional_id("particle", 0).unwrap(), 1);
        assert_eq!(positional_id("vertex", i32::MAX as usize - 1).unwrap(), i32::MAX);
        assert!(matches!(
            positional_id("vertex", i32::MAX as usize),
            Err(RecordError::TooManyObjects { what: "vertex", .. })
        ));
    }
    use crate::io::{AsciiReader, EventReader};
    use crate::types::{AttributeValue, FourVector, Particle, ParticleId, Vertex};
    use std::io::Cursor;

    fn written(event: &Event) -> String {
        let mut writer = AsciiWriter::new(Vec::new());
        writer.write_event(event).unwrap();
        writer.close().unwrap();
        String::from_utf8(writer.get_ref().clone()).unwrap()
    }

    #[test]
    fn test_empty_listing() {
        let mut writer = AsciiWriter::new(Vec::new());
        writer.close().unwrap();
        let text = String::from_utf8(writer.get_ref().clone()).unwrap();
        assert_eq!(
            text,
            format!("HepMC::Version {}\n{}\n{}\n", FORMAT_VERSION, START_LISTING, END_LISTING)
        );
    }

    #[test]
    fn test_positional_renumbering() {
        // Vertex -7 is inserted first but only emitted before particle 2,
        // after vertex -3 which produces particle 1.
        let mut evt = Event::new(5);
        evt.insert_vertex(Vertex::new(VertexId(-7), FourVector::zero(), 0)).unwrap();
        evt.insert_vertex(Vertex::new(VertexId(-3), FourVector::new(1.0, 0.0, 0.0, 0.5), 2)).unwrap();
        evt.insert_particle(
            Particle::new(ParticleId(10), FourVector::new(0.0, 0.0, 1.0, 1.0), 11, 1)
                .produced_at(VertexId(-3))
                .ending_at(VertexId(-7)),
        )
        .unwrap();
        evt.insert_particle(
            Particle::new(ParticleId(20), FourVector::new(0.0, 0.0, 1.0, 1.0), 22, 1)
                .produced_at(VertexId(-7)),
        )
        .unwrap();

        let text = written(&evt);
        let body: Vec<&str> = text.lines().filter(|l| l.starts_with(['V', 'P'])).collect();
        assert_eq!(
            body,
            vec![
                "V -1 2 [] @ 1 0 0 0.5",
                "P 1 -1 11 0 0 1 1 0 1",
                "V -2 0 [1]",
                "P 2 -2 22 0 0 1 1 0 1",
            ]
        );
    }

    #[test]
    fn test_dangling_production_written_as_root() {
        let mut evt = Event::new(0);
        evt.insert_particle(
            Particle::new(ParticleId(1), FourVector::new(0.0, 0.0, 1.0, 1.0), 22, 1)
                .produced_at(VertexId(-4)),
        )
        .unwrap();
        let text = written(&evt);
        assert!(text.contains("\nP 1 0 22 "));
    }

    #[test]
    fn test_reader_accepts_written_record() {
        let mut evt = Event::new(3);
        let v = evt.add_vertex(FourVector::new(0.0, 0.0, 0.0, 1.0), -1).unwrap();
        let beam = evt.add_particle(FourVector::new(0.0, 0.0, 7.0, 7.0), 2212, 4).unwrap();
        let out = evt.add_particle(FourVector::new(1.0, 2.0, 3.0, 4.0), 13, 1).unwrap();
        evt.attach_incoming(beam, v).unwrap();
        evt.attach_outgoing(out, v).unwrap();
        evt.weights_mut().extend([1.0, 0.25]);
        evt.set_attribute("mpi", AttributeValue::Integer(4));

        let text = written(&evt);
        let mut reader = AsciiReader::new(Cursor::new(text.into_bytes()));
        let back = reader.read_event().unwrap().unwrap();

        assert_eq!(back.event_number(), 3);
        assert_eq!(back.num_vertices(), 1);
        assert_eq!(back.num_particles(), 2);
        assert_eq!(back.weights(), &[1.0, 0.25]);
        assert_eq!(back.attribute("mpi"), Some(&AttributeValue::Text("4".into())));
        let vid = back.vertices()[0].id;
        assert_eq!(back.particles_in(vid).count(), 1);
        assert_eq!(back.particles_out(vid).count(), 1);
        assert_eq!(back.vertices()[0].position.t, 1.0);
    }

    #[test]
    fn test_fmt_float() {
        assert_eq!(fmt_float(91.1876), "91.1876");
        assert_eq!(fmt_float(6500.0), "6500");
        assert_eq!(fmt_float(1e-9), "1e-9");
        assert_eq!(fmt_float(0.0), "0");
    }
}
