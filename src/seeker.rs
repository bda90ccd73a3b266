//! Index-free random access into an event log.
//!
//! The seeker never builds or stores an index. The record count comes
//! from the trailing record-start line, found by scanning backward from
//! the end of the file; a record is fetched by streaming forward from the
//! start and skipping everything before it.
//!
//! ## Cost
//!
//! | Operation | Cost |
//! |-----------|------|
//! | `open` | O(bytes after the last record-start line) |
//! | `fetch_by_index(i)` | O(bytes before record `i`) |
//! | `fetch_next` | same as `fetch_by_index` |
//!
//! This suits logs read a handful of times. Repeated random access over
//! large logs re-reads the file on every call.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::io::{is_record_start, AsciiReader, EventReader, RecordError};
use crate::types::{Event, RunInfo};

/// Bytes read per step of the backward scan.
const BACKWARD_CHUNK: usize = 8 * 1024;

/// Error type for seeker operations.
#[derive(Debug, thiserror::Error)]
pub enum SeekerError {
    /// Underlying I/O failure.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Log path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The log has no usable record-start line, or fewer records than it claims.
    #[error("Malformed log {path}: {message}")]
    Format {
        /// Log path.
        path: PathBuf,
        /// What was wrong.
        message: String,
    },
    /// The log holds no records.
    #[error("Log has no records: {0}")]
    EmptyLog(PathBuf),
    /// Record stream error.
    #[error("Record error: {0}")]
    Record(#[from] RecordError),
}

/// Random access into a text event log.
///
/// ## Guarantees
///
/// - `total_count()` is computed once, when the seeker is opened
/// - indices wrap modulo `total_count()` instead of failing
/// - `fetch_next` cycles through every record in storage order, restarting
///   at 0 after the last
#[derive(Debug)]
pub struct EventSeeker {
    path: PathBuf,
    total: usize,
    cursor: usize,
}

impl EventSeeker {
    /// Open a log and count its records.
    ///
    /// Fails with [`SeekerError::EmptyLog`] if the log has no records and
    /// with [`SeekerError::Format`] if it has content but no record-start
    /// line.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SeekerError> {
        let path = path.as_ref().to_path_buf();
        let total = count_records(&path)?;
        debug!(path = %path.display(), total, "counted records");
        Ok(Self {
            path,
            total,
            cursor: 0,
        })
    }

    /// Path of the log.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records in the log.
    pub fn total_count(&self) -> usize {
        self.total
    }

    /// Index `fetch_next` will return next.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Fetch the record at `index`, wrapping modulo the record count.
    pub fn fetch_by_index(&self, index: usize) -> Result<Event, SeekerError> {
        let index = index % self.total;
        let mut reader = AsciiReader::open(&self.path)?;
        match reader.skip(index) {
            Ok(()) => {}
            Err(RecordError::Truncated { available, .. }) => {
                return Err(self.truncated(index, available));
            }
            Err(e) => return Err(e.into()),
        }
        reader
            .read_event()?
            .ok_or_else(|| self.truncated(index, index))
    }

    /// Fetch the record at the cursor, then advance it.
    ///
    /// The cursor only moves when the fetch succeeds.
    pub fn fetch_next(&mut self) -> Result<Event, SeekerError> {
        let event = self.fetch_by_index(self.cursor)?;
        self.cursor = (self.cursor + 1) % self.total;
        Ok(event)
    }

    /// Run information from the log header.
    pub fn run_info(&self) -> Result<RunInfo, SeekerError> {
        let mut reader = AsciiReader::open(&self.path)?;
        Ok(reader.run_info()?.clone())
    }

    fn truncated(&self, index: usize, available: usize) -> SeekerError {
        SeekerError::Format {
            path: self.path.clone(),
            message: format!(
                "trailer claims {} records but record {} is missing ({} present)",
                self.total, index, available
            ),
        }
    }
}

/// Count records from the number on the last record-start line.
fn count_records(path: &Path) -> Result<usize, SeekerError> {
    let io_error = |source: std::io::Error| SeekerError::Io {
        path: path.to_path_buf(),
        source,
    };
    let format_error = |message: String| SeekerError::Format {
        path: path.to_path_buf(),
        message,
    };

    let mut file = File::open(path).map_err(io_error)?;
    let scan = scan_backward(&mut file).map_err(io_error)?;

    let line = match scan {
        BackwardScan::Marker(line) => line,
        BackwardScan::HeaderOnly => return Err(SeekerError::EmptyLog(path.to_path_buf())),
        BackwardScan::NoMarker => {
            return Err(format_error("no record-start line found".to_string()));
        }
    };

    let token = line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| format_error(format!("record-start line has no number: {:?}", line)))?;
    let last: i64 = token
        .parse()
        .map_err(|_| format_error(format!("bad record number {:?}", token)))?;
    if last < 0 {
        return Err(format_error(format!("negative record number {}", last)));
    }
    usize::try_from(last)
        .ok()
        .and_then(|n| n.checked_add(1))
        .ok_or_else(|| format_error(format!("record number {} out of range", last)))
}

/// Outcome of the backward scan.
#[derive(Debug, PartialEq)]
enum BackwardScan {
    /// The last record-start line.
    Marker(String),
    /// Only blank, listing header/footer or run-level lines.
    HeaderOnly,
    /// Content, but no record-start line.
    NoMarker,
}

/// Scan the file backward byte by byte for the last line starting with `E`.
///
/// Bytes are accumulated in reverse until a newline closes the line. The
/// first line of the file has no newline before it and is checked when
/// the scan reaches offset 0.
fn scan_backward<R: Read + Seek>(file: &mut R) -> std::io::Result<BackwardScan> {
    let mut pos = file.seek(SeekFrom::End(0))?;
    let mut chunk = vec![0u8; BACKWARD_CHUNK];
    let mut line_rev: Vec<u8> = Vec::new();
    let mut saw_content = false;

    while pos > 0 {
        let step = pos.min(BACKWARD_CHUNK as u64) as usize;
        pos -= step as u64;
        file.seek(SeekFrom::Start(pos))?;
        file.read_exact(&mut chunk[..step])?;

        for &byte in chunk[..step].iter().rev() {
            if byte == b'\n' {
                if let Some(line) = classify_line(&mut line_rev, &mut saw_content) {
                    return Ok(BackwardScan::Marker(line));
                }
                line_rev.clear();
            } else {
                line_rev.push(byte);
            }
        }
    }
    if let Some(line) = classify_line(&mut line_rev, &mut saw_content) {
        return Ok(BackwardScan::Marker(line));
    }

    Ok(if saw_content {
        BackwardScan::NoMarker
    } else {
        BackwardScan::HeaderOnly
    })
}

/// Reverse an accumulated line; return it if it is a record-start line.
fn classify_line(line_rev: &mut Vec<u8>, saw_content: &mut bool) -> Option<String> {
    line_rev.reverse();
    let line = String::from_utf8_lossy(&line_rev[..]);
    let line = line.trim_end_matches('\r');
    if line.starts_with("HepMC::") {
        return None;
    }
    if is_record_start(line) {
        return Some(line.to_string());
    }
    match line.split_whitespace().next() {
        None => None,
        // Run-level lines may precede the first record.
        Some("W") | Some("T") | Some("A") => None,
        Some(_) => {
            *saw_content = true;
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn scan(text: &str) -> BackwardScan {
        scan_backward(&mut Cursor::new(text.as_bytes().to_vec())).unwrap()
    }

    #[test]
    fn test_scan_finds_last_marker() {
        let text = "E 0 1 1\nP 1 0 22 0 0 1 1 0 1\nE 1 1 1\nP 1 0 22 0 0 1 1 0 1\nHepMC::Asciiv3-END_EVENT_LISTING\n";
        assert_eq!(scan(text), BackwardScan::Marker("E 1 1 1".to_string()));
    }

    #[test]
    fn test_scan_without_trailing_newline() {
        assert_eq!(scan("E 7 0 0"), BackwardScan::Marker("E 7 0 0".to_string()));
        assert_eq!(scan("A 0 x 1\nE 2 0 0"), BackwardScan::Marker("E 2 0 0".to_string()));
    }

    #[test]
    fn test_scan_crlf() {
        assert_eq!(scan("E 3 0 0\r\n"), BackwardScan::Marker("E 3 0 0".to_string()));
    }

    #[test]
    fn test_scan_across_chunk_boundary() {
        let mut text = String::from("E 41 0 0\n");
        text.push_str(&"A 0 padding 1\n".repeat(BACKWARD_CHUNK / 7));
        assert_eq!(scan(&text), BackwardScan::Marker("E 41 0 0".to_string()));
    }

    #[test]
    fn test_scan_header_only_and_empty() {
        assert_eq!(scan(""), BackwardScan::HeaderOnly);
        assert_eq!(
            scan("HepMC::Version 3.02.06\nHepMC::Asciiv3-START_EVENT_LISTING\nHepMC::Asciiv3-END_EVENT_LISTING\n"),
            BackwardScan::HeaderOnly
        );
    }

    #[test]
    fn test_scan_run_info_without_records() {
        assert_eq!(
            scan("HepMC::Version 3.02.06\nW nominal\nT tool|1|x\nA 0 seed 7\n"),
            BackwardScan::HeaderOnly
        );
    }

    #[test]
    fn test_scan_no_marker() {
        assert_eq!(scan("P 1 0 22 0 0 1 1 0 1\n"), BackwardScan::NoMarker);
    }

    #[test]
    fn test_marker_with_leading_whitespace() {
        assert_eq!(scan(" E 5 0 0\n"), BackwardScan::Marker(" E 5 0 0".to_string()));
        assert_eq!(scan("E5 0 0\n"), BackwardScan::NoMarker);
    }

    #[test]
    fn test_marker_needs_separate_token() {
        // "Event" is not a record-start line.
        assert_eq!(scan("Event 1\n"), BackwardScan::NoMarker);
    }
}
