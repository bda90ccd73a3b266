//! Forward reader for `HepMC::Asciiv3` listings.
//!
//! ## Line grammar
//!
//! ```text
//! E <number> <n_vertices> <n_particles> [@ x y z t]
//! U <MEV|GEV> <MM|CM>
//! W <weight>...
//! A <object_id> <name> <value text>
//! V <id> <status> [<p>,<p>,...] [@ x y z t]
//! P <id> <mother> <pid> <px> <py> <pz> <e> <mass> <status>
//! ```
//!
//! A negative `mother` is the production vertex id, a positive one is a
//! particle whose end vertex produced this one (created on demand with
//! the next positional id), zero means no production vertex.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use tracing::debug;

use super::{is_record_start, EventReader, RecordError, END_LISTING};
use crate::types::{
    AttributeValue, Event, FourVector, ObjectAttribute, Particle, ParticleId, RunInfo, Units,
    Vertex, VertexId,
};

/// Reader over a text event log.
///
/// The header is consumed lazily on the first `read_event`, `skip` or
/// `run_info` call.
pub struct AsciiReader<R> {
    input: R,
    line_no: usize,
    /// Record-start line read ahead of the record it opens.
    pending: Option<String>,
    header_done: bool,
    finished: bool,
    run_info: RunInfo,
}

impl AsciiReader<BufReader<File>> {
    /// Open a log file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RecordError> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> AsciiReader<R> {
    /// Wrap a buffered input.
    pub fn new(input: R) -> Self {
        Self {
            input,
            line_no: 0,
            pending: None,
            header_done: false,
            finished: false,
            run_info: RunInfo::default(),
        }
    }

    /// Run information from the listing header.
    pub fn run_info(&mut self) -> Result<&RunInfo, RecordError> {
        self.read_header()?;
        Ok(&self.run_info)
    }

    fn format_error(&self, message: impl Into<String>) -> RecordError {
        RecordError::Format {
            line: self.line_no,
            message: message.into(),
        }
    }

    fn next_line(&mut self) -> Result<Option<String>, RecordError> {
        if let Some(line) = self.pending.take() {
            return Ok(Some(line));
        }
        if self.finished {
            return Ok(None);
        }
        let mut buf = String::new();
        if self.input.read_line(&mut buf)? == 0 {
            self.finished = true;
            return Ok(None);
        }
        self.line_no += 1;
        let len = buf.trim_end_matches(['\n', '\r']).len();
        buf.truncate(len);
        Ok(Some(buf))
    }

    fn read_header(&mut self) -> Result<(), RecordError> {
        if self.header_done {
            return Ok(());
        }
        self.header_done = true;

        while let Some(line) = self.next_line()? {
            if line.trim().is_empty() {
                continue;
            }
            if is_record_start(&line) {
                self.pending = Some(line);
                break;
            }
            let first = line.as_bytes()[0];
            match first {
                b'H' if line.starts_with(END_LISTING) => {
                    self.finished = true;
                    break;
                }
                b'H' if line.starts_with("HepMC::") => {}
                b'W' => self
                    .run_info
                    .weight_names
                    .extend(line[1..].split_whitespace().map(String::from)),
                b'T' => self.run_info.tools.push(line[1..].trim().to_string()),
                b'A' => {
                    let (_, name, value) = split_attribute(&line[1..])
                        .ok_or_else(|| self.format_error("malformed run attribute"))?;
                    self.run_info
                        .attributes
                        .push((name.to_string(), value.to_string()));
                }
                _ => return Err(self.format_error(format!("unexpected header line {:?}", line))),
            }
        }
        Ok(())
    }

    /// Next record-start line, or `None` once the listing is over.
    fn next_record_start(&mut self) -> Result<Option<String>, RecordError> {
        while let Some(line) = self.next_line()? {
            if line.trim().is_empty() {
                continue;
            }
            if is_record_start(&line) {
                return Ok(Some(line));
            }
            if line.starts_with(END_LISTING) {
                self.finished = true;
                return Ok(None);
            }
            return Err(self.format_error(format!("expected a record start, found {:?}", line)));
        }
        Ok(None)
    }
}

impl<R: BufRead> EventReader for AsciiReader<R> {
    fn skip(&mut self, n: usize) -> Result<(), RecordError> {
        self.read_header()?;
        for skipped in 0..n {
            if self.next_record_start()?.is_none() {
                return Err(RecordError::Truncated {
                    requested: n,
                    available: skipped,
                });
            }
            while let Some(line) = self.next_line()? {
                if is_record_start(&line) {
                    self.pending = Some(line);
                    break;
                }
                if line.starts_with(END_LISTING) {
                    self.finished = true;
                    break;
                }
            }
        }
        Ok(())
    }

    fn read_event(&mut self) -> Result<Option<Event>, RecordError> {
        self.read_header()?;
        let header = match self.next_record_start()? {
            Some(line) => line,
            None => return Ok(None),
        };

        let mut builder = RecordBuilder::start(&header).map_err(|m| self.format_error(m))?;
        while let Some(line) = self.next_line()? {
            if line.trim().is_empty() {
                continue;
            }
            if is_record_start(&line) {
                self.pending = Some(line);
                break;
            }
            if line.starts_with(END_LISTING) {
                self.finished = true;
                break;
            }
            let line_no = self.line_no;
            builder.apply(&line).map_err(|e| e.at(line_no))?;
        }
        builder.finish().map_err(|e| e.at(self.line_no)).map(Some)
    }
}

/// Error raised while building one record, before the line number is known.
enum BuildError {
    Format(String),
    Graph(crate::types::GraphError),
}

impl BuildError {
    fn at(self, line: usize) -> RecordError {
        match self {
            Self::Format(message) => RecordError::Format { line, message },
            Self::Graph(source) => RecordError::Graph { line, source },
        }
    }
}

impl From<String> for BuildError {
    fn from(message: String) -> Self {
        Self::Format(message)
    }
}

impl From<crate::types::GraphError> for BuildError {
    fn from(e: crate::types::GraphError) -> Self {
        Self::Graph(e)
    }
}

/// Accumulates the lines of one record into an [`Event`].
struct RecordBuilder {
    event: Event,
    expected_vertices: usize,
    expected_particles: usize,
    /// Incoming particles listed by a vertex before the particle itself.
    forward_incoming: HashMap<ParticleId, VertexId>,
}

impl RecordBuilder {
    fn start(line: &str) -> Result<Self, String> {
        let mut tokens = line.split_whitespace().skip(1);
        let number: i64 = parse_next(&mut tokens, "event number")?;
        let expected_vertices: usize = parse_next(&mut tokens, "vertex count")?;
        let expected_particles: usize = parse_next(&mut tokens, "particle count")?;
        Ok(Self {
            event: Event::new(number),
            expected_vertices,
            expected_particles,
            forward_incoming: HashMap::new(),
        })
    }

    fn apply(&mut self, line: &str) -> Result<(), BuildError> {
        let tag = match line.as_bytes().first() {
            Some(&b) if b.is_ascii() => b,
            _ => return Err(format!("unexpected line {:?}", line).into()),
        };
        let body = &line[1..];
        match tag {
            b'U' => {
                let mut tokens = body.split_whitespace();
                let units = match (tokens.next(), tokens.next()) {
                    (Some(m), Some(l)) => Units::parse(m, l),
                    _ => None,
                };
                let units = units.ok_or_else(|| format!("bad units line {:?}", line))?;
                self.event.set_units(units);
            }
            b'W' => {
                for token in body.split_whitespace() {
                    let w = token
                        .parse::<f64>()
                        .map_err(|_| format!("bad weight {:?}", token))?;
                    self.event.weights_mut().push(w);
                }
            }
            b'A' => {
                let (id, name, value) =
                    split_attribute(body).ok_or_else(|| format!("bad attribute line {:?}", line))?;
                let object_id: i32 = id.parse().map_err(|_| format!("bad attribute id {:?}", id))?;
                if object_id == 0 {
                    self.event
                        .set_attribute(name, AttributeValue::Text(value.to_string()));
                } else {
                    self.event.add_object_attribute(ObjectAttribute {
                        object_id,
                        name: name.to_string(),
                        value: value.to_string(),
                    });
                }
            }
            b'V' => self.apply_vertex(body)?,
            b'P' => self.apply_particle(body)?,
            // Per-record tool lines carry nothing the graph needs.
            b'T' => {}
            _ => return Err(format!("unexpected line {:?}", line).into()),
        }
        Ok(())
    }

    fn apply_vertex(&mut self, body: &str) -> Result<(), BuildError> {
        let mut tokens = body.split_whitespace();
        let id = VertexId(parse_next(&mut tokens, "vertex id")?);
        let status: i32 = parse_next(&mut tokens, "vertex status")?;

        let rest: Vec<&str> = tokens.collect();
        let rest = rest.join(" ");
        let (incoming, after) = match rest.strip_prefix('[') {
            Some(inner) => {
                let (list, after) = inner
                    .split_once(']')
                    .ok_or_else(|| format!("unterminated incoming list on vertex {}", id))?;
                let ids = list
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| s.parse::<i32>().map(ParticleId))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| format!("bad incoming list on vertex {}", id))?;
                (ids, after.trim())
            }
            None => (Vec::new(), rest.as_str()),
        };
        let position = parse_position(after)?;

        self.event.insert_vertex(Vertex::new(id, position, status))?;
        for particle in incoming {
            if self.event.particle(particle).is_some() {
                self.event.attach_incoming(particle, id)?;
            } else {
                self.forward_incoming.insert(particle, id);
            }
        }
        Ok(())
    }

    fn apply_particle(&mut self, body: &str) -> Result<(), BuildError> {
        let mut tokens = body.split_whitespace();
        let id = ParticleId(parse_next(&mut tokens, "particle id")?);
        let mother: i32 = parse_next(&mut tokens, "mother id")?;
        let pid: i32 = parse_next(&mut tokens, "pid")?;
        let px: f64 = parse_next(&mut tokens, "px")?;
        let py: f64 = parse_next(&mut tokens, "py")?;
        let pz: f64 = parse_next(&mut tokens, "pz")?;
        let e: f64 = parse_next(&mut tokens, "e")?;
        let mass: f64 = parse_next(&mut tokens, "mass")?;
        let status: i32 = parse_next(&mut tokens, "particle status")?;

        let mut particle =
            Particle::new(id, FourVector::new(px, py, pz, e), pid, status).with_mass(mass);
        particle.end_vertex = self.forward_incoming.remove(&id);

        if mother < 0 {
            particle.production_vertex = Some(VertexId(mother));
        } else if mother > 0 {
            let mother_id = ParticleId(mother);
            let end = self
                .event
                .particle(mother_id)
                .ok_or_else(|| format!("particle {} names unknown mother {}", id, mother_id))?
                .end_vertex;
            let vertex = match end {
                Some(v) => v,
                None => {
                    let v = self.event.next_vertex_id()?;
                    self.event.insert_vertex(Vertex::new(v, FourVector::zero(), 0))?;
                    self.event.attach_incoming(mother_id, v)?;
                    v
                }
            };
            particle.production_vertex = Some(vertex);
        }

        self.event.insert_particle(particle)?;
        Ok(())
    }

    fn finish(self) -> Result<Event, BuildError> {
        if let Some((particle, vertex)) = self.forward_incoming.iter().next() {
            return Err(format!("vertex {} lists unknown incoming particle {}", vertex, particle).into());
        }
        if self.event.num_vertices() != self.expected_vertices
            || self.event.num_particles() != self.expected_particles
        {
            debug!(
                event_number = self.event.event_number(),
                expected_vertices = self.expected_vertices,
                vertices = self.event.num_vertices(),
                expected_particles = self.expected_particles,
                particles = self.event.num_particles(),
                "record counts differ from its header"
            );
        }
        Ok(self.event)
    }
}

/// Split `<id> <name> <value text>`.
fn split_attribute(body: &str) -> Option<(&str, &str, &str)> {
    let body = body.trim_start();
    let (id, rest) = body.split_once(char::is_whitespace)?;
    let rest = rest.trim_start();
    let (name, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    if name.is_empty() {
        return None;
    }
    Some((id, name, value.trim()))
}

fn parse_next<'a, T: FromStr>(
    tokens: &mut impl Iterator<Item = &'a str>,
    what: &str,
) -> Result<T, String> {
    let token = tokens.next().ok_or_else(|| format!("missing {}", what))?;
    token
        .parse()
        .map_err(|_| format!("bad {} {:?}", what, token))
}

/// Parse an optional `@ x y z t` suffix.
fn parse_position(text: &str) -> Result<FourVector, String> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(FourVector::zero());
    }
    let coords = text
        .strip_prefix('@')
        .ok_or_else(|| format!("unexpected trailing text {:?}", text))?;
    let mut tokens = coords.split_whitespace();
    Ok(FourVector::new(
        parse_next(&mut tokens, "x")?,
        parse_next(&mut tokens, "y")?,
        parse_next(&mut tokens, "z")?,
        parse_next(&mut tokens, "t")?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GraphError;
    use std::io::Cursor;

    const LISTING: &str = "\
HepMC::Version 3.02.06
HepMC::Asciiv3-START_EVENT_LISTING
W nominal alt
T pythia8|8.310|generator
E 0 2 3
U GEV MM
W 1.0 0.5
A 0 mpi 3
A 0 event_scale 91.1876
A 2 flow1 501
P 1 0 2212 0 0 6500 6500 0.938 4
V -1 0 [1] @ 0.1 0.2 0.3 0.4
P 2 -1 21 1 0 10 10.05 0 3
P 3 2 1 1 0 10 10.05 0 1
E 1 1 2
U GEV MM
P 1 0 11 0 0 5 5 0 4
V -1 0 [1]
P 2 -1 22 0 0 5 5 0 1
HepMC::Asciiv3-END_EVENT_LISTING
";

    fn reader(text: &str) -> AsciiReader<Cursor<Vec<u8>>> {
        AsciiReader::new(Cursor::new(text.as_bytes().to_vec()))
    }

    #[test]
    fn test_reads_header_run_info() {
        let mut r = reader(LISTING);
        let info = r.run_info().unwrap();
        assert_eq!(info.weight_names, vec!["nominal", "alt"]);
        assert_eq!(info.tools, vec!["pythia8|8.310|generator"]);
    }

    #[test]
    fn test_reads_graph() {
        let mut r = reader(LISTING);
        let evt = r.read_event().unwrap().unwrap();

        assert_eq!(evt.event_number(), 0);
        assert_eq!(evt.weights(), &[1.0, 0.5]);
        assert_eq!(evt.attribute("mpi"), Some(&AttributeValue::Text("3".into())));
        assert_eq!(evt.object_attributes().len(), 1);

        // Explicit vertex plus the implicit one created for particle 3's mother.
        assert_eq!(evt.num_vertices(), 2);
        assert_eq!(evt.num_particles(), 3);

        let v1 = evt.vertex(VertexId(-1)).unwrap();
        assert_eq!(v1.position, FourVector::new(0.1, 0.2, 0.3, 0.4));
        assert_eq!(evt.particle(ParticleId(1)).unwrap().end_vertex, Some(VertexId(-1)));
        assert_eq!(evt.particle(ParticleId(2)).unwrap().production_vertex, Some(VertexId(-1)));

        let implicit = evt.particle(ParticleId(3)).unwrap().production_vertex.unwrap();
        assert_eq!(implicit, VertexId(-2));
        assert_eq!(evt.particle(ParticleId(2)).unwrap().end_vertex, Some(implicit));
    }

    #[test]
    fn test_sequential_records_then_end() {
        let mut r = reader(LISTING);
        assert_eq!(r.read_event().unwrap().unwrap().event_number(), 0);
        assert_eq!(r.read_event().unwrap().unwrap().event_number(), 1);
        assert!(r.read_event().unwrap().is_none());
    }

    #[test]
    fn test_skip() {
        let mut r = reader(LISTING);
        r.skip(1).unwrap();
        assert_eq!(r.read_event().unwrap().unwrap().event_number(), 1);

        let mut r = reader(LISTING);
        r.skip(0).unwrap();
        assert_eq!(r.read_event().unwrap().unwrap().event_number(), 0);

        let mut r = reader(LISTING);
        assert!(matches!(
            r.skip(3),
            Err(RecordError::Truncated { requested: 3, available: 2 })
        ));
    }

    #[test]
    fn test_forward_incoming_reference() {
        let text = "E 4 1 1\nV -1 0 [1]\nP 1 0 22 0 0 1 1 0 1\n";
        let evt = reader(text).read_event().unwrap().unwrap();
        assert_eq!(evt.particle(ParticleId(1)).unwrap().end_vertex, Some(VertexId(-1)));
    }

    #[test]
    fn test_unknown_incoming_is_format_error() {
        let text = "E 4 1 0\nV -1 0 [7]\n";
        assert!(matches!(
            reader(text).read_event(),
            Err(RecordError::Format { .. })
        ));
    }

    #[test]
    fn test_missing_production_vertex_is_kept() {
        let text = "E 0 0 1\nP 1 -5 22 0 0 1 1 0 1\n";
        let evt = reader(text).read_event().unwrap().unwrap();
        assert_eq!(evt.dangling_production().count(), 1);
    }

    #[test]
    fn test_bad_particle_line() {
        let text = "E 0 0 1\nP 1 0 22 0 0 one 1 0 1\n";
        match reader(text).read_event() {
            Err(RecordError::Format { line, message }) => {
                assert_eq!(line, 2);
                assert!(message.contains("pz"));
            }
            other => panic!("expected format error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_non_ascii_line_is_format_error() {
        match reader("E 0 0 0\néx\n").read_event() {
            Err(RecordError::Format { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected format error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_record_start_needs_separate_token() {
        // Same rule as the backward count: " E" opens a record, "E1" does not.
        let mut r = reader(" E 4 0 0\n");
        assert_eq!(r.read_event().unwrap().unwrap().event_number(), 4);
        assert!(matches!(
            reader("E1 0 0\n").read_event(),
            Err(RecordError::Format { line: 1, .. })
        ));
    }

    #[test]
    fn test_implicit_vertex_past_id_range_is_graph_error() {
        let text = "E 0 1 2\nV -2147483648 0 []\nP 1 0 22 0 0 1 1 0 1\nP 2 1 22 0 0 1 1 0 1\n";
        match reader(text).read_event() {
            Err(RecordError::Graph { line, source }) => {
                assert_eq!(line, 4);
                assert_eq!(source, GraphError::IdSpaceExhausted("vertex"));
            }
            other => panic!("expected graph error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_duplicate_vertex_is_graph_error() {
        let text = "E 0 2 0\nV -1 0 []\nV -1 0 []\n";
        assert!(matches!(
            reader(text).read_event(),
            Err(RecordError::Graph { line: 3, .. })
        ));
    }
}
