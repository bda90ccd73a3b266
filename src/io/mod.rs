//! Record streams over event logs.
//!
//! The seeker and the CLI only talk to these traits. The text listing is
//! handled by [`AsciiReader`] and [`AsciiWriter`].

pub mod reader;
pub mod writer;

use crate::types::{Event, GraphError};

/// First line of a listing.
pub const VERSION_PREFIX: &str = "HepMC::Version";
/// Line opening the event listing.
pub const START_LISTING: &str = "HepMC::Asciiv3-START_EVENT_LISTING";
/// Line closing the event listing.
pub const END_LISTING: &str = "HepMC::Asciiv3-END_EVENT_LISTING";

/// Whether `line` opens a record: its first whitespace-separated token is `E`.
///
/// The backward count and the forward stream both go through this test.
pub fn is_record_start(line: &str) -> bool {
    line.split_whitespace().next() == Some("E")
}

/// Error type for record stream operations.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed line.
    #[error("Line {line}: {message}")]
    Format {
        /// 1-based line number.
        line: usize,
        /// What was wrong.
        message: String,
    },
    /// A line describes a graph the event cannot hold (duplicate ids, bad references).
    #[error("Line {line}: {source}")]
    Graph {
        /// 1-based line number.
        line: usize,
        /// Underlying graph error.
        #[source]
        source: GraphError,
    },
    /// An event has more vertices or particles than output ids can number.
    #[error("Too many {what} objects to number: {count}")]
    TooManyObjects {
        /// Object kind.
        what: &'static str,
        /// Objects numbered before the id range ran out.
        count: usize,
    },
    /// Fewer records than requested.
    #[error("Requested {requested} records, only {available} present")]
    Truncated {
        /// Records requested.
        requested: usize,
        /// Records actually present.
        available: usize,
    },
}

/// Sequential reader of event records.
pub trait EventReader {
    /// Advance past `n` records without building them.
    fn skip(&mut self, n: usize) -> Result<(), RecordError>;

    /// Build and return the next record, or `None` at the end of the stream.
    fn read_event(&mut self) -> Result<Option<Event>, RecordError>;
}

/// Sequential writer of event records.
pub trait EventWriter {
    /// Append one record.
    fn write_event(&mut self, event: &Event) -> Result<(), RecordError>;

    /// Finish the listing and flush. Further writes are an error.
    fn close(&mut self) -> Result<(), RecordError>;
}

pub use reader::AsciiReader;
pub use writer::AsciiWriter;
